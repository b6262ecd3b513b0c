//! Contracts of the collaborators the viewer drives: SVG fetching, switch
//! mutations, equipment lookup and the diagram renderer.

use crate::interactivity::{BreakerClick, EquipmentClick, HoverEvent};
use sldview_core::{
    DiagramId, DiagramKind, EquipmentInfo, NodeId, ServiceError, StudyId, SvgDocument, ViewBox,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Retrieves a diagram. `Ok(None)` means the server has no diagram for the URL.
pub trait SvgFetcher: Send + Sync {
    fn fetch_svg(&self, url: &str) -> Result<Option<SvgDocument>, ServiceError>;
}

/// Outcome of a switch mutation request that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchResponse {
    pub status: u16,
    pub message: Option<String>,
}

impl SwitchResponse {
    pub fn ok() -> Self {
        Self {
            status: 200,
            message: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// A non-ok response is a failure even though the call itself succeeded.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_ok() {
            Ok(())
        } else {
            let message = self
                .message
                .unwrap_or_else(|| format!("Switch update failed with status {}", self.status));
            Err(ServiceError::http(self.status, message))
        }
    }
}

pub trait SwitchService: Send + Sync {
    fn update_switch_state(
        &self,
        study_id: &StudyId,
        node_id: &NodeId,
        breaker_id: &str,
        open: bool,
    ) -> Result<SwitchResponse, ServiceError>;
}

/// Resolves names and substation membership from the network.
pub trait EquipmentLookup {
    fn equipment(&self, kind: DiagramKind, id: &DiagramId) -> Option<EquipmentInfo>;
}

impl EquipmentLookup for HashMap<DiagramId, EquipmentInfo> {
    fn equipment(&self, _kind: DiagramKind, id: &DiagramId) -> Option<EquipmentInfo> {
        self.get(id).cloned()
    }
}

pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Interaction hooks handed to the renderer. `None` disables that class of
/// interaction.
#[derive(Clone, Default)]
pub struct RenderCallbacks {
    pub on_next_voltage_level: Option<Callback<String>>,
    pub on_breaker: Option<Callback<BreakerClick>>,
    pub on_feeder_menu: Option<Callback<EquipmentClick>>,
    pub on_bus_menu: Option<Callback<EquipmentClick>>,
    pub on_hover: Option<Callback<HoverEvent>>,
}

impl RenderCallbacks {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_disabled(&self) -> bool {
        self.on_next_voltage_level.is_none()
            && self.on_breaker.is_none()
            && self.on_feeder_menu.is_none()
            && self.on_bus_menu.is_none()
            && self.on_hover.is_none()
    }
}

impl fmt::Debug for RenderCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderCallbacks")
            .field("on_next_voltage_level", &self.on_next_voltage_level.is_some())
            .field("on_breaker", &self.on_breaker.is_some())
            .field("on_feeder_menu", &self.on_feeder_menu.is_some())
            .field("on_bus_menu", &self.on_bus_menu.is_some())
            .field("on_hover", &self.on_hover.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DrawRequest<'a> {
    pub svg: &'a str,
    pub metadata: Option<&'a serde_json::Value>,
    pub kind: DiagramKind,
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
    pub arrow_color: &'a str,
    pub callbacks: RenderCallbacks,
}

/// Draws server markup into the pane's container.
pub trait DiagramRenderer {
    fn draw(&mut self, request: DrawRequest<'_>) -> Result<Box<dyn DiagramHandle>, ServiceError>;
}

/// A drawn diagram.
pub trait DiagramHandle {
    /// Natural width measured after drawing.
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn view_box(&self) -> Option<ViewBox>;
    fn set_view_box(&mut self, view_box: ViewBox);
    /// Set the width/height attributes of the root SVG element.
    fn set_dimensions(&mut self, width: f64, height: f64);
    fn has_class(&self, element_id: &str, class: &str) -> bool;
    /// Replace `from` with `to` on an element. Returns false when the element
    /// does not exist.
    fn replace_class(&mut self, element_id: &str, from: &str, to: &str) -> bool;
}
