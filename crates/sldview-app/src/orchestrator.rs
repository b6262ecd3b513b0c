//! Composition of the diagram panes: which are shown, which are chips in the
//! minimized strip, fullscreen, and the reaction to study notifications.

use crate::interactivity::{InteractionPolicy, MenuState, OpenMenu, Tooltip, build_callbacks};
use crate::messages::PaneMessage;
use crate::pane::{DiagramPane, FetchOutcome, FetchRequest, PaneBounds, PaneStatus};
use crate::services::{DiagramRenderer, EquipmentLookup, SvgFetcher, SwitchService};
use crate::settings::{DisplayParameters, ViewerSettings};
use crate::spawner::{TaskSpawner, spawn_fetch, spawn_switch_update};
use crate::urls::{StudyContext, svg_url};
use crate::view_state::{QueryStore, TrackedView, ViewStateStore};
use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use sldview_core::{DiagramDescriptor, DiagramId, DiagramKind, NodeId, ViewStatus};
use sldview_events::{Computation, DeletedEquipment, DeletedKind, Event, EventBus, EventListener};
use sldview_layout::DiagramGeometry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Services the orchestrator drives.
pub struct Collaborators {
    pub fetcher: Arc<dyn SvgFetcher>,
    pub switches: Arc<dyn SwitchService>,
    pub renderer: Box<dyn DiagramRenderer>,
    pub lookup: Box<dyn EquipmentLookup>,
    pub spawner: Arc<dyn TaskSpawner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaneVisibility {
    Shown,
    /// Mounted but not drawn: another pane is fullscreen, or the pane failed.
    Hidden,
}

/// One entry of the visible set, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaneLayout {
    pub id: DiagramId,
    pub kind: DiagramKind,
    pub name: String,
    pub status: ViewStatus,
    pub visibility: PaneVisibility,
    pub geometry: Option<DiagramGeometry>,
    pub banner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimizedChip {
    pub id: DiagramId,
    pub kind: DiagramKind,
    pub name: String,
}

/// Paper size a pane last reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportedSize {
    pub kind: DiagramKind,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Viewport {
    width: Option<f64>,
    height: Option<f64>,
}

pub struct DiagramPaneOrchestrator {
    settings: ViewerSettings,
    context: StudyContext,
    store: ViewStateStore,
    panes: HashMap<DiagramId, DiagramPane>,
    fullscreen: Option<DiagramId>,
    menus: MenuState,
    starting: HashSet<Computation>,
    building: HashSet<NodeId>,
    viewport: Viewport,
    reported: HashMap<DiagramId, ReportedSize>,
    collaborators: Collaborators,
    tx: Sender<PaneMessage>,
    rx: Receiver<PaneMessage>,
    notifications: EventBus,
}

impl DiagramPaneOrchestrator {
    /// Restore the views of the query string and start fetching them.
    pub fn new(
        settings: ViewerSettings,
        context: StudyContext,
        query: Box<dyn QueryStore>,
        collaborators: Collaborators,
    ) -> Self {
        let (tx, rx) = unbounded();
        let mut orchestrator = Self {
            settings,
            context,
            store: ViewStateStore::restore(query),
            panes: HashMap::new(),
            fullscreen: None,
            menus: MenuState::default(),
            starting: HashSet::new(),
            building: HashSet::new(),
            viewport: Viewport::default(),
            reported: HashMap::new(),
            collaborators,
            tx,
            rx,
            notifications: EventBus::new(),
        };
        let restored: Vec<TrackedView> = orchestrator.store.views().to_vec();
        for view in restored {
            orchestrator.ensure_pane(view.kind, view.id);
        }
        orchestrator
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn context(&self) -> &StudyContext {
        &self.context
    }

    /// Outbound notifications: snackbar messages and size reports.
    pub fn notifications(&self) -> &EventBus {
        &self.notifications
    }

    /// Channel renderer callbacks and background jobs post to.
    pub fn sender(&self) -> Sender<PaneMessage> {
        self.tx.clone()
    }

    pub fn views(&self) -> &[TrackedView] {
        self.store.views()
    }

    pub fn status(&self, id: &DiagramId) -> Option<ViewStatus> {
        self.store.status(id)
    }

    pub fn pane(&self, id: &DiagramId) -> Option<&DiagramPane> {
        self.panes.get(id)
    }

    pub fn menu(&self) -> Option<&OpenMenu> {
        self.menus.menu()
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.menus.tooltip()
    }

    pub fn close_menu(&mut self) {
        self.menus.close();
    }

    pub fn fullscreen(&self) -> Option<&DiagramId> {
        self.fullscreen.as_ref()
    }

    pub fn computation_starting(&self) -> bool {
        !self.starting.is_empty()
    }

    pub fn node_building(&self) -> bool {
        !self.building.is_empty()
    }

    // ------------------------------------------------------------------
    // View actions
    // ------------------------------------------------------------------

    pub fn open(&mut self, kind: DiagramKind, id: DiagramId) -> bool {
        let changed = self.store.open(kind, id.clone());
        self.ensure_pane(kind, id);
        self.sync_fullscreen();
        changed
    }

    pub fn toggle_pin(&mut self, id: &DiagramId) -> bool {
        let changed = self.store.toggle_pin(id);
        self.sync_fullscreen();
        changed
    }

    pub fn minimize(&mut self, id: &DiagramId) -> bool {
        let changed = self.store.minimize(id);
        self.sync_fullscreen();
        changed
    }

    /// Close diagrams. Ids that are not tracked are ignored.
    pub fn close(&mut self, ids: &[DiagramId]) -> bool {
        let changed = self.store.close(ids);
        for id in ids {
            if self.panes.remove(id).is_some() {
                debug!(diagram_id = %id, "Closed diagram pane");
            }
            self.menus.forget_pane(id);
            self.reported.remove(id);
        }
        self.sync_fullscreen();
        changed
    }

    /// Show a single displayed pane over the others, or leave fullscreen.
    /// Ids that are not displayed are ignored.
    pub fn set_fullscreen(&mut self, id: Option<DiagramId>) -> bool {
        if let Some(target) = &id
            && !self.is_displayed(target)
        {
            return false;
        }
        if self.fullscreen == id {
            return false;
        }
        self.fullscreen = id;
        true
    }

    pub fn toggle_fullscreen(&mut self, id: &DiagramId) -> bool {
        if self.fullscreen.as_ref() == Some(id) {
            self.set_fullscreen(None)
        } else {
            self.set_fullscreen(Some(id.clone()))
        }
    }

    fn is_displayed(&self, id: &DiagramId) -> bool {
        self.store.status(id).is_some_and(|s| s.is_displayed())
    }

    fn sync_fullscreen(&mut self) {
        if let Some(id) = &self.fullscreen
            && !self.is_displayed(id)
        {
            self.fullscreen = None;
        }
    }

    fn ensure_pane(&mut self, kind: DiagramKind, id: DiagramId) {
        if self.panes.contains_key(&id) {
            return;
        }
        let info = self
            .collaborators
            .lookup
            .equipment(kind, &id)
            .unwrap_or_default();
        let descriptor =
            DiagramDescriptor::new(id.clone(), kind, &info, self.settings.display.use_name);
        let pane = DiagramPane::new(descriptor, InteractionPolicy::Interactive);
        self.panes.insert(id.clone(), pane);
        self.refresh_url(&id);
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    /// Displayed views in tracked order: pinned ones and the opened one.
    pub fn visible(&self) -> Vec<DiagramId> {
        self.store
            .views()
            .iter()
            .filter(|v| v.status.is_displayed())
            .map(|v| v.id.clone())
            .collect()
    }

    pub fn minimized(&self) -> Vec<MinimizedChip> {
        self.store
            .views()
            .iter()
            .filter(|v| v.status == ViewStatus::Minimized)
            .map(|v| MinimizedChip {
                id: v.id.clone(),
                kind: v.kind,
                name: self.pane_name(&v.id),
            })
            .collect()
    }

    fn pane_name(&self, id: &DiagramId) -> String {
        self.panes
            .get(id)
            .map(|p| p.descriptor().name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn visibility(&self, id: &DiagramId) -> PaneVisibility {
        let hidden_by_fullscreen = self.fullscreen.as_ref().is_some_and(|f| f != id);
        let failed = self.panes.get(id).is_some_and(|p| p.should_hide());
        if hidden_by_fullscreen || failed {
            PaneVisibility::Hidden
        } else {
            PaneVisibility::Shown
        }
    }

    pub fn layout(&self) -> Vec<PaneLayout> {
        self.store
            .views()
            .iter()
            .filter(|v| v.status.is_displayed())
            .map(|v| {
                let pane = self.panes.get(&v.id);
                PaneLayout {
                    id: v.id.clone(),
                    kind: v.kind,
                    name: self.pane_name(&v.id),
                    status: v.status,
                    visibility: self.visibility(&v.id),
                    geometry: pane.and_then(|p| p.geometry().copied()),
                    banner: pane.and_then(|p| p.banner().map(str::to_string)),
                }
            })
            .collect()
    }

    fn shown(&self) -> Vec<DiagramId> {
        self.visible()
            .into_iter()
            .filter(|id| self.visibility(id) == PaneVisibility::Shown)
            .collect()
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Viewport {
            width: Some(width),
            height: Some(height),
        };
    }

    pub fn dismiss_banner(&mut self, id: &DiagramId) {
        if let Some(pane) = self.panes.get_mut(id) {
            pane.dismiss_banner();
        }
    }

    // ------------------------------------------------------------------
    // Size reporting
    // ------------------------------------------------------------------

    pub fn diagram_size_setter(
        &mut self,
        id: DiagramId,
        kind: DiagramKind,
        width: f64,
        height: f64,
    ) {
        self.reported.insert(
            id.clone(),
            ReportedSize {
                kind,
                width,
                height,
            },
        );
        self.notifications.publish(Event::DiagramSizeReported {
            id,
            kind,
            width,
            height,
        });
    }

    pub fn reported_sizes(&self) -> &HashMap<DiagramId, ReportedSize> {
        &self.reported
    }

    /// Width taken by the panes currently shown.
    pub fn total_reported_width(&self) -> f64 {
        self.shown()
            .iter()
            .filter_map(|id| self.reported.get(id))
            .map(|size| size.width)
            .sum()
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    fn fetch(&self, request: FetchRequest) {
        spawn_fetch(
            self.collaborators.spawner.as_ref(),
            self.collaborators.fetcher.clone(),
            self.tx.clone(),
            request,
        );
    }

    fn refresh_url(&mut self, id: &DiagramId) {
        let Some(pane) = self.panes.get_mut(id) else {
            return;
        };
        match svg_url(&self.context, pane.kind(), id, &self.settings.display) {
            Ok(url) => {
                if let Some(request) = pane.set_svg_url(url) {
                    self.fetch(request);
                }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(diagram_id = %id, "Cannot build diagram URL: {message}");
                pane.fail(message.clone());
                self.notifications.publish(Event::ShowError { message });
            }
        }
    }

    /// Rebuild every pane's URL; panes whose URL changed refetch.
    pub fn recompute_urls(&mut self) {
        let ids: Vec<DiagramId> = self.panes.keys().cloned().collect();
        for id in ids {
            self.refresh_url(&id);
        }
    }

    /// Refetch every tracked pane.
    pub fn reload_all(&mut self) {
        let requests: Vec<FetchRequest> = self
            .panes
            .values_mut()
            .filter_map(|pane| pane.force_reload())
            .collect();
        info!(count = requests.len(), "Reloading all diagrams");
        for request in requests {
            self.fetch(request);
        }
    }

    pub fn set_display_parameters(&mut self, display: DisplayParameters) {
        if self.settings.display == display {
            return;
        }
        self.settings.display = display;
        let use_name = self.settings.display.use_name;
        for pane in self.panes.values_mut() {
            let info = self
                .collaborators
                .lookup
                .equipment(pane.kind(), pane.id())
                .unwrap_or_default();
            let name = info.label(pane.id(), use_name);
            pane.set_name(name);
        }
        self.recompute_urls();
    }

    pub fn set_current_node(&mut self, node_id: NodeId) {
        if self.context.node_id == node_id {
            return;
        }
        self.context.node_id = node_id;
        self.recompute_urls();
    }

    /// Close the diagrams of deleted substations and voltage levels,
    /// including voltage levels of a deleted substation.
    pub fn close_deleted(&mut self, deleted: &[DeletedEquipment]) {
        let deleted: Vec<&DiagramId> = deleted
            .iter()
            .filter(|d| d.kind != DeletedKind::Other)
            .map(|d| &d.id)
            .collect();
        let doomed: Vec<DiagramId> = self
            .panes
            .values()
            .filter(|pane| deleted.iter().any(|id| pane.descriptor().depends_on(id)))
            .map(|pane| pane.id().clone())
            .collect();
        if !doomed.is_empty() {
            info!(closed = doomed.len(), "Closing diagrams of deleted equipment");
            self.close(&doomed);
        }
    }

    // ------------------------------------------------------------------
    // UI loop
    // ------------------------------------------------------------------

    /// Apply pending messages, then bring the shown panes up to date.
    /// Returns the number of messages handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.handle_message(message);
            handled += 1;
        }
        self.refresh();
        handled
    }

    pub fn handle_message(&mut self, message: PaneMessage) {
        match message {
            PaneMessage::SvgFetched { pane, url, result } => {
                let Some(target) = self.panes.get_mut(&pane) else {
                    debug!(diagram_id = %pane, "Response for a closed diagram");
                    return;
                };
                if let FetchOutcome::Failed(message) = target.apply_fetch(&url, result) {
                    self.notifications.publish(Event::ShowError { message });
                }
            }
            PaneMessage::SwitchUpdated { request, result } => {
                if let Some(pane) = self.panes.get_mut(&request.pane) {
                    pane.finish_switch(&request, result);
                }
            }
            PaneMessage::NextVoltageLevel {
                from,
                voltage_level_id,
            } => {
                debug!(from = %from, to = %voltage_level_id, "Navigating to voltage level");
                self.open(DiagramKind::VoltageLevel, DiagramId::new(voltage_level_id));
            }
            PaneMessage::BreakerClicked { pane, click } => {
                let Some(target) = self.panes.get_mut(&pane) else {
                    return;
                };
                if let Some(request) = target.begin_switch(click) {
                    spawn_switch_update(
                        self.collaborators.spawner.as_ref(),
                        self.collaborators.switches.clone(),
                        self.tx.clone(),
                        self.context.study_id.clone(),
                        self.context.node_id.clone(),
                        request,
                    );
                }
            }
            PaneMessage::MenuRequested { pane, click } => {
                self.menus.open(&pane, click);
            }
            PaneMessage::Hover { pane, event } => {
                self.menus.hover(&pane, event);
            }
        }
    }

    /// Draw shown panes whose content or interactivity changed and resize
    /// them to the current viewport.
    pub fn refresh(&mut self) {
        let shown = self.shown();
        let fullscreen = self.fullscreen.is_some();
        let bounds = PaneBounds {
            available_width: self.viewport.width,
            available_height: self.viewport.height,
            display_count: if fullscreen { 1 } else { shown.len().max(1) },
            fullscreen,
        };
        let (computation_starting, node_building) =
            (self.computation_starting(), self.node_building());

        let mut reports = Vec::new();
        for id in &shown {
            let Some(pane) = self.panes.get_mut(id) else {
                continue;
            };
            let gate = pane.gate(computation_starting, node_building);
            let callbacks = build_callbacks(id, pane.policy(), gate, &self.tx);
            if let Err(e) =
                pane.render(self.collaborators.renderer.as_mut(), &self.settings, callbacks)
            {
                warn!(diagram_id = %id, "Diagram render failed: {e}");
                self.notifications.publish(Event::ShowError {
                    message: e.message(),
                });
                continue;
            }
            if let Some(geometry) = pane.update_geometry(&self.settings, bounds) {
                reports.push((id.clone(), pane.kind(), geometry));
            }
        }
        for (id, kind, geometry) in reports {
            self.diagram_size_setter(id, kind, geometry.paper_width, geometry.paper_height);
        }
    }

    /// Panes that are fetching.
    pub fn loading(&self) -> Vec<DiagramId> {
        self.panes
            .values()
            .filter(|p| p.status() == PaneStatus::Loading)
            .map(|p| p.id().clone())
            .collect()
    }
}

impl EventListener for DiagramPaneOrchestrator {
    fn handle_event(&mut self, event: &Event) {
        match event {
            Event::LoadflowResultChanged | Event::ShortCircuitResultChanged => self.reload_all(),
            Event::SwitchesChanged { node_id } => {
                if *node_id == self.context.node_id {
                    self.reload_all();
                }
            }
            Event::EquipmentDeleted { deleted } => self.close_deleted(deleted),
            Event::ComputationStarting { computation } => {
                self.starting.insert(*computation);
            }
            Event::ComputationFinished { computation } => {
                self.starting.remove(computation);
            }
            Event::NodeBuildStatusChanged { node_id, building } => {
                if *building {
                    self.building.insert(node_id.clone());
                } else {
                    self.building.remove(node_id);
                }
            }
            Event::CurrentNodeChanged { node_id } => self.set_current_node(node_id.clone()),
            Event::DisplayParametersChanged => self.recompute_urls(),
            Event::DiagramSizeReported { .. } | Event::ShowError { .. } => {}
        }
    }
}
