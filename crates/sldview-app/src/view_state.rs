//! View state of tracked diagrams.
//!
//! Every transition is a pure reducer over the previous snapshot; snapshots
//! are immutable and cheap to clone, so a snapshot captured by an earlier
//! callback never observes later mutations.

use crate::views_codec::{ViewEntry, decode_views, encode_views};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sldview_core::{DiagramId, DiagramKind, ViewStatus};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedView {
    pub id: DiagramId,
    pub kind: DiagramKind,
    pub status: ViewStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    Open { kind: DiagramKind, id: DiagramId },
    TogglePin(DiagramId),
    Minimize(DiagramId),
    Close(Vec<DiagramId>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    views: Arc<Vec<TrackedView>>,
    /// Most recently opened diagram, written as `lastOpen` in the URL.
    last_opened: Option<DiagramId>,
}

impl ViewState {
    pub fn views(&self) -> &[TrackedView] {
        &self.views
    }

    pub fn last_opened(&self) -> Option<&DiagramId> {
        self.last_opened.as_ref()
    }

    pub fn status(&self, id: &DiagramId) -> Option<ViewStatus> {
        self.views.iter().find(|v| &v.id == id).map(|v| v.status)
    }

    pub fn contains(&self, id: &DiagramId) -> bool {
        self.status(id).is_some()
    }

    /// Displayed diagrams in tracked order: every pinned one plus the opened
    /// one, if any.
    pub fn visible(&self) -> Vec<&TrackedView> {
        self.views.iter().filter(|v| v.status.is_displayed()).collect()
    }

    pub fn minimized(&self) -> Vec<&TrackedView> {
        self.views
            .iter()
            .filter(|v| v.status == ViewStatus::Minimized)
            .collect()
    }

    fn entries(&self) -> Vec<ViewEntry> {
        self.views
            .iter()
            .map(|v| ViewEntry {
                id: v.id.clone(),
                kind: v.kind,
                last_open: self.last_opened.as_ref() == Some(&v.id),
            })
            .collect()
    }
}

fn demote_opened(views: &mut [TrackedView], except: &DiagramId) {
    for view in views.iter_mut() {
        if view.status == ViewStatus::Opened && &view.id != except {
            view.status = ViewStatus::Minimized;
        }
    }
}

/// Apply `action` to `state`, returning the next snapshot. Returns an equal
/// snapshot when the action is a no-op.
pub fn reduce(state: &ViewState, action: &ViewAction) -> ViewState {
    let mut views = state.views.as_ref().clone();
    let mut last_opened = state.last_opened.clone();

    match action {
        ViewAction::Open { kind, id } => {
            match views.iter().position(|v| &v.id == id) {
                Some(index) if views[index].status.is_displayed() => return state.clone(),
                Some(index) => {
                    demote_opened(&mut views, id);
                    views[index].status = ViewStatus::Opened;
                }
                None => {
                    demote_opened(&mut views, id);
                    views.push(TrackedView {
                        id: id.clone(),
                        kind: *kind,
                        status: ViewStatus::Opened,
                    });
                }
            }
            last_opened = Some(id.clone());
        }
        ViewAction::TogglePin(id) => {
            let Some(index) = views.iter().position(|v| &v.id == id) else {
                return state.clone();
            };
            match views[index].status {
                ViewStatus::Opened => views[index].status = ViewStatus::Pinned,
                ViewStatus::Pinned => {
                    demote_opened(&mut views, id);
                    views[index].status = ViewStatus::Opened;
                    last_opened = Some(id.clone());
                }
                ViewStatus::Minimized => return state.clone(),
            }
        }
        ViewAction::Minimize(id) => {
            let Some(view) = views.iter_mut().find(|v| &v.id == id) else {
                return state.clone();
            };
            if view.status == ViewStatus::Minimized {
                return state.clone();
            }
            view.status = ViewStatus::Minimized;
        }
        ViewAction::Close(ids) => {
            let before = views.len();
            views.retain(|v| !ids.contains(&v.id));
            if views.len() == before {
                return state.clone();
            }
            if last_opened.as_ref().is_some_and(|id| ids.contains(id)) {
                last_opened = None;
            }
        }
    }

    ViewState {
        views: Arc::new(views),
        last_opened,
    }
}

/// Access to the page query string, the persistence medium of open views.
pub trait QueryStore: Send {
    fn query(&self) -> String;
    fn replace_query(&mut self, query: String);
}

/// Query string held in memory; clones share the same string.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueryStore {
    query: Arc<Mutex<String>>,
}

impl MemoryQueryStore {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Arc::new(Mutex::new(query.into())),
        }
    }
}

impl QueryStore for MemoryQueryStore {
    fn query(&self) -> String {
        self.query.lock().clone()
    }

    fn replace_query(&mut self, query: String) {
        *self.query.lock() = query;
    }
}

/// Tracks which diagrams are open, pinned or minimized and mirrors the open
/// set into the `views` query parameter.
pub struct ViewStateStore {
    state: ViewState,
    query: Box<dyn QueryStore>,
}

impl ViewStateStore {
    /// Create a store and replay the views found in the query string.
    ///
    /// Entries are opened in order, then the one flagged `lastOpen` is
    /// opened again so it ends up as the opened diagram. Should several be
    /// flagged, the last flagged one wins.
    pub fn restore(query: Box<dyn QueryStore>) -> Self {
        let mut store = Self {
            state: ViewState::default(),
            query,
        };

        let entries = match decode_views(&store.query.query()) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring views from query string: {e}");
                Vec::new()
            }
        };
        let last_open = entries.iter().rposition(|e| e.last_open);

        let mut state = ViewState::default();
        for entry in &entries {
            state = reduce(&state, &open_action(entry));
        }
        if let Some(index) = last_open {
            state = reduce(&state, &open_action(&entries[index]));
        }

        debug!(restored = state.views.len(), "Restored diagram views");
        store.state = state;
        if !entries.is_empty() {
            store.persist();
        }
        store
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.clone()
    }

    pub fn views(&self) -> &[TrackedView] {
        self.state.views()
    }

    pub fn status(&self, id: &DiagramId) -> Option<ViewStatus> {
        self.state.status(id)
    }

    pub fn open(&mut self, kind: DiagramKind, id: DiagramId) -> bool {
        self.apply(ViewAction::Open { kind, id }, true)
    }

    pub fn toggle_pin(&mut self, id: &DiagramId) -> bool {
        self.apply(ViewAction::TogglePin(id.clone()), false)
    }

    pub fn minimize(&mut self, id: &DiagramId) -> bool {
        self.apply(ViewAction::Minimize(id.clone()), false)
    }

    pub fn close(&mut self, ids: &[DiagramId]) -> bool {
        self.apply(ViewAction::Close(ids.to_vec()), true)
    }

    fn apply(&mut self, action: ViewAction, persisted: bool) -> bool {
        let next = reduce(&self.state, &action);
        if next == self.state {
            return false;
        }
        debug!(?action, "View state transition");
        self.state = next;
        if persisted {
            self.persist();
        }
        true
    }

    fn persist(&mut self) {
        let query = encode_views(&self.query.query(), &self.state.entries());
        self.query.replace_query(query);
    }
}

fn open_action(entry: &ViewEntry) -> ViewAction {
    ViewAction::Open {
        kind: entry.kind,
        id: entry.id.clone(),
    }
}
