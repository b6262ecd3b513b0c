//! Fetch and render lifecycle of a single diagram.
//!
//! ```text
//! Idle --set_svg_url--> Loading --fetch ok--> Ready
//!                          ^   \--fetch err-> Error
//!                          |
//!        force_reload / set_svg_url (from any state)
//! ```
//!
//! While loading again, the last good payload stays on screen until the new
//! one arrives.

use crate::interactivity::{
    BreakerClick, InteractionGate, InteractionPolicy, SwitchGuard, SwitchOutcome, SwitchRequest,
};
use crate::services::{DiagramHandle, DiagramRenderer, DrawRequest, RenderCallbacks};
use crate::settings::ViewerSettings;
use sldview_core::{
    DiagramDescriptor, DiagramId, DiagramKind, ServiceError, SvgDocument, SvgPayload,
};
use sldview_layout::{ContentKey, DiagramGeometry, SizeInputs, SizeState};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// A fetch the owner of the pane must run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub pane: DiagramId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// The response belongs to a URL the pane no longer shows.
    Stale,
    Failed(String),
}

/// Viewport facts a pane cannot know by itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaneBounds {
    pub available_width: Option<f64>,
    pub available_height: Option<f64>,
    pub display_count: usize,
    pub fullscreen: bool,
}

struct Rendered {
    handle: Box<dyn DiagramHandle>,
    svg_url: Option<String>,
}

pub struct DiagramPane {
    descriptor: DiagramDescriptor,
    policy: InteractionPolicy,
    status: PaneStatus,
    payload: SvgPayload,
    /// Bumped each time a fetched SVG is accepted.
    revision: u64,
    rendered: Option<Rendered>,
    size: SizeState,
    /// Content the renderer rejected; not retried until the key changes.
    failed_draw: Option<ContentKey>,
    switches: SwitchGuard,
    banner: Option<String>,
}

impl DiagramPane {
    pub fn new(descriptor: DiagramDescriptor, policy: InteractionPolicy) -> Self {
        Self {
            descriptor,
            policy,
            status: PaneStatus::Idle,
            payload: SvgPayload::default(),
            revision: 0,
            rendered: None,
            size: SizeState::default(),
            failed_draw: None,
            switches: SwitchGuard::default(),
            banner: None,
        }
    }

    pub fn id(&self) -> &DiagramId {
        &self.descriptor.id
    }

    pub fn kind(&self) -> DiagramKind {
        self.descriptor.kind
    }

    pub fn descriptor(&self) -> &DiagramDescriptor {
        &self.descriptor
    }

    pub fn set_name(&mut self, name: String) {
        self.descriptor.name = name;
    }

    pub fn policy(&self) -> InteractionPolicy {
        self.policy
    }

    pub fn status(&self) -> PaneStatus {
        self.status
    }

    pub fn payload(&self) -> &SvgPayload {
        &self.payload
    }

    pub fn svg_url(&self) -> Option<&str> {
        self.descriptor.svg_url.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == PaneStatus::Loading
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered.is_some()
    }

    /// Error panes render as an empty shell; callers hide them.
    pub fn should_hide(&self) -> bool {
        self.status == PaneStatus::Error
    }

    /// Pane-scoped error message of the last failed switch update.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn modification_in_progress(&self) -> bool {
        self.switches.in_progress()
    }

    pub fn geometry(&self) -> Option<&DiagramGeometry> {
        self.size.geometry()
    }

    pub fn preferred_size(&self) -> Option<(f64, f64)> {
        self.size.preferred()
    }

    pub fn view_box(&self) -> Option<sldview_core::ViewBox> {
        self.rendered.as_ref().and_then(|r| r.handle.view_box())
    }

    pub fn gate(&self, computation_starting: bool, node_building: bool) -> InteractionGate {
        InteractionGate {
            computation_starting,
            node_building,
            modification_in_progress: self.modification_in_progress(),
            loading: self.is_loading(),
        }
    }

    /// Point the pane at a new URL. Returns the fetch to run, or `None` when
    /// the URL is the one already in effect.
    pub fn set_svg_url(&mut self, url: String) -> Option<FetchRequest> {
        if self.descriptor.svg_url.as_deref() == Some(url.as_str())
            && self.status != PaneStatus::Idle
        {
            return None;
        }
        self.descriptor.svg_url = Some(url);
        self.start_loading()
    }

    /// Refetch the current URL, keeping the displayed payload meanwhile.
    pub fn force_reload(&mut self) -> Option<FetchRequest> {
        self.descriptor.svg_url.as_ref()?;
        self.start_loading()
    }

    fn start_loading(&mut self) -> Option<FetchRequest> {
        let url = self.descriptor.svg_url.clone()?;
        debug!(diagram_id = %self.descriptor.id, url = %url, "Loading diagram");
        self.status = PaneStatus::Loading;
        Some(FetchRequest {
            pane: self.descriptor.id.clone(),
            url,
        })
    }

    /// The URL could not even be built; nothing will be fetched.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.descriptor.svg_url = None;
        self.payload = SvgPayload::failed(String::new(), message);
        self.status = PaneStatus::Error;
    }

    /// Accept a fetch response. Responses for any URL but the current one
    /// are discarded.
    pub fn apply_fetch(
        &mut self,
        url: &str,
        result: Result<Option<SvgDocument>, ServiceError>,
    ) -> FetchOutcome {
        if self.descriptor.svg_url.as_deref() != Some(url) {
            debug!(
                diagram_id = %self.descriptor.id,
                url = %url,
                "Discarding stale diagram response"
            );
            return FetchOutcome::Stale;
        }

        match result {
            Ok(Some(document)) => {
                self.payload = SvgPayload::ready(url, document);
                self.revision += 1;
                self.status = PaneStatus::Ready;
                self.switches.reset();
                self.banner = None;
                FetchOutcome::Applied
            }
            Ok(None) => {
                let message = format!("No diagram available for {}", self.descriptor.id);
                self.fetch_failed(url, message)
            }
            Err(error) => self.fetch_failed(url, error.message()),
        }
    }

    fn fetch_failed(&mut self, url: &str, message: String) -> FetchOutcome {
        warn!(diagram_id = %self.descriptor.id, url = %url, "Diagram fetch failed: {message}");
        self.payload = SvgPayload::failed(url, message.clone());
        self.status = PaneStatus::Error;
        self.rendered = None;
        self.switches.reset();
        self.size.reset();
        FetchOutcome::Failed(message)
    }

    /// Draw the current payload if its content, kind or interactivity
    /// changed since the last draw. Returns true when a draw happened.
    ///
    /// The pan/zoom window of the previous drawing carries over when the new
    /// content comes from the same URL.
    pub fn render(
        &mut self,
        renderer: &mut dyn DiagramRenderer,
        settings: &ViewerSettings,
        callbacks: RenderCallbacks,
    ) -> Result<bool, ServiceError> {
        let Some(svg) = self.payload.svg() else {
            return Ok(false);
        };
        let key = ContentKey {
            revision: self.revision,
            kind: self.descriptor.kind,
            disabled: callbacks.is_disabled(),
        };
        if self.failed_draw == Some(key) {
            return Ok(false);
        }
        if !self.size.begin_content(key) && self.rendered.is_some() {
            return Ok(false);
        }

        let kind = self.descriptor.kind;
        let handle = renderer.draw(DrawRequest {
            svg,
            metadata: self.payload.metadata(),
            kind,
            min_width: settings.min_width,
            min_height: settings.min_height,
            max_width: settings.max_width.for_kind(kind),
            max_height: settings.max_height.for_kind(kind),
            arrow_color: &settings.arrow_color,
            callbacks,
        });
        let mut handle = match handle {
            Ok(handle) => handle,
            Err(error) => {
                self.failed_draw = Some(key);
                return Err(error);
            }
        };
        self.failed_draw = None;

        self.size.record_preferred(handle.width(), handle.height());
        self.switches.reapply(handle.as_mut());

        let svg_url = self.payload.svg_url().map(str::to_string);
        if let Some(previous) = self.rendered.take()
            && previous.svg_url == svg_url
            && let Some(view_box) = previous.handle.view_box()
        {
            handle.set_view_box(view_box);
        }
        if let Some(geometry) = self.size.geometry() {
            handle.set_dimensions(geometry.svg_width, geometry.svg_height);
        }

        debug!(
            diagram_id = %self.descriptor.id,
            revision = self.revision,
            interactive = !key.disabled,
            "Rendered diagram"
        );
        self.rendered = Some(Rendered { handle, svg_url });
        Ok(true)
    }

    /// Recompute the final size. Returns the new geometry when it changed;
    /// the drawing is only resized once both dimensions are known.
    pub fn update_geometry(
        &mut self,
        settings: &ViewerSettings,
        bounds: PaneBounds,
    ) -> Option<DiagramGeometry> {
        let inputs = SizeInputs {
            kind: self.descriptor.kind,
            available_width: bounds.available_width,
            available_height: bounds.available_height,
            preferred_width: self.size.preferred_width(),
            preferred_height: self.size.preferred_height(),
            chrome: settings.chrome,
            max_width: settings.max_width,
            max_height: settings.max_height,
            display_count: Some(bounds.display_count),
            fullscreen: bounds.fullscreen,
        };
        if !self.size.update_geometry(&inputs) {
            return None;
        }
        let geometry = *self.size.geometry()?;
        if let Some(rendered) = self.rendered.as_mut() {
            rendered
                .handle
                .set_dimensions(geometry.svg_width, geometry.svg_height);
        }
        Some(geometry)
    }

    /// Start a breaker toggle unless one is already running.
    pub fn begin_switch(&mut self, click: BreakerClick) -> Option<SwitchRequest> {
        let handle = self.rendered.as_mut().map(|r| r.handle.as_mut());
        let request = self.switches.begin(&self.descriptor.id, click, handle)?;
        self.banner = None;
        Some(request)
    }

    pub fn finish_switch(
        &mut self,
        request: &SwitchRequest,
        result: Result<(), ServiceError>,
    ) -> SwitchOutcome {
        let handle = self.rendered.as_mut().map(|r| r.handle.as_mut());
        let outcome = self.switches.finish(request, result, handle);
        if let SwitchOutcome::Failed { message, .. } = &outcome {
            self.banner = Some(message.clone());
        }
        outcome
    }
}
