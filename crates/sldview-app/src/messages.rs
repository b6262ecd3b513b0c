use crate::interactivity::{BreakerClick, EquipmentClick, HoverEvent, SwitchRequest};
use sldview_core::{DiagramId, ServiceError, SvgDocument};

/// Everything that reaches the UI loop from background jobs and renderer
/// callbacks. Drained in order by the owner of the panes.
#[derive(Debug, Clone)]
pub enum PaneMessage {
    SvgFetched {
        pane: DiagramId,
        url: String,
        result: Result<Option<SvgDocument>, ServiceError>,
    },
    SwitchUpdated {
        request: SwitchRequest,
        result: Result<(), ServiceError>,
    },
    NextVoltageLevel {
        from: DiagramId,
        voltage_level_id: String,
    },
    BreakerClicked {
        pane: DiagramId,
        click: BreakerClick,
    },
    MenuRequested {
        pane: DiagramId,
        click: EquipmentClick,
    },
    Hover {
        pane: DiagramId,
        event: HoverEvent,
    },
}
