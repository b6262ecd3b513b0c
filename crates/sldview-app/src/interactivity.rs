//! Bridge between renderer callbacks and application actions.
//!
//! Breaker clicks get optimistic feedback (the switch is redrawn in its
//! requested state at once) and are rolled back if the mutation fails.
//! Equipment clicks open a single context menu.

use crate::messages::PaneMessage;
use crate::services::RenderCallbacks;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use sldview_core::{DiagramId, EquipmentType, MenuKind, ServiceError, SwitchVisual};
use sldview_events::telemetry::{self, CommandSpan};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::services::DiagramHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerClick {
    pub breaker_id: String,
    /// State the user asks for: `true` to open the breaker.
    pub requested_open: bool,
    /// Id of the SVG element drawing the switch.
    pub element_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentClick {
    pub equipment_id: String,
    pub equipment_type: EquipmentType,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HoverEvent {
    Show {
        equipment_id: String,
        equipment_type: EquipmentType,
        x: f64,
        y: f64,
    },
    Hide,
}

/// Whether a pane may ever hand callbacks to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionPolicy {
    #[default]
    Interactive,
    /// Position diagrams and other previews.
    ReadOnly,
}

/// Conditions under which a diagram is about to go stale and must not be
/// interacted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InteractionGate {
    pub computation_starting: bool,
    pub node_building: bool,
    pub modification_in_progress: bool,
    pub loading: bool,
}

impl InteractionGate {
    pub fn allows_interaction(&self) -> bool {
        !(self.computation_starting
            || self.node_building
            || self.modification_in_progress
            || self.loading)
    }
}

/// Build the renderer callbacks of one pane. Every callback posts a message
/// for the UI loop; none runs application logic on the renderer's stack.
pub fn build_callbacks(
    pane: &DiagramId,
    policy: InteractionPolicy,
    gate: InteractionGate,
    sender: &Sender<PaneMessage>,
) -> RenderCallbacks {
    if policy == InteractionPolicy::ReadOnly || !gate.allows_interaction() {
        return RenderCallbacks::disabled();
    }

    let next = {
        let (tx, pane) = (sender.clone(), pane.clone());
        Arc::new(move |voltage_level_id: String| {
            let _ = tx.send(PaneMessage::NextVoltageLevel {
                from: pane.clone(),
                voltage_level_id,
            });
        })
    };
    let breaker = {
        let (tx, pane) = (sender.clone(), pane.clone());
        Arc::new(move |click: BreakerClick| {
            let _ = tx.send(PaneMessage::BreakerClicked {
                pane: pane.clone(),
                click,
            });
        })
    };
    let feeder = {
        let (tx, pane) = (sender.clone(), pane.clone());
        Arc::new(move |click: EquipmentClick| {
            let _ = tx.send(PaneMessage::MenuRequested {
                pane: pane.clone(),
                click,
            });
        })
    };
    let bus = {
        let (tx, pane) = (sender.clone(), pane.clone());
        Arc::new(move |click: EquipmentClick| {
            let _ = tx.send(PaneMessage::MenuRequested {
                pane: pane.clone(),
                click: EquipmentClick {
                    equipment_type: EquipmentType::Bus,
                    ..click
                },
            });
        })
    };
    let hover = {
        let (tx, pane) = (sender.clone(), pane.clone());
        Arc::new(move |event: HoverEvent| {
            let _ = tx.send(PaneMessage::Hover {
                pane: pane.clone(),
                event,
            });
        })
    };

    RenderCallbacks {
        on_next_voltage_level: Some(next),
        on_breaker: Some(breaker),
        on_feeder_menu: Some(feeder),
        on_bus_menu: Some(bus),
        on_hover: Some(hover),
    }
}

/// Temporary visual state applied ahead of confirmation from the server.
pub trait OptimisticMarker {
    fn mark(&mut self, element_id: &str, visual: SwitchVisual);
    /// Restore the element to what it showed before `mark`.
    fn unmark(&mut self, element_id: &str);
}

/// Original visuals of marked elements.
pub type MarkLedger = HashMap<String, SwitchVisual>;

/// Marker that swaps the open/closed CSS classes of the drawn SVG.
pub struct ClassMarker<'a> {
    handle: &'a mut dyn DiagramHandle,
    ledger: &'a mut MarkLedger,
}

impl<'a> ClassMarker<'a> {
    pub fn new(handle: &'a mut dyn DiagramHandle, ledger: &'a mut MarkLedger) -> Self {
        Self { handle, ledger }
    }

    fn current(&self, element_id: &str) -> SwitchVisual {
        SwitchVisual::from_open(
            self.handle
                .has_class(element_id, SwitchVisual::Open.css_class()),
        )
    }
}

impl OptimisticMarker for ClassMarker<'_> {
    fn mark(&mut self, element_id: &str, visual: SwitchVisual) {
        let current = self.current(element_id);
        self.ledger
            .entry(element_id.to_string())
            .or_insert(current);
        if current != visual {
            self.handle
                .replace_class(element_id, current.css_class(), visual.css_class());
        }
    }

    fn unmark(&mut self, element_id: &str) {
        let Some(original) = self.ledger.remove(element_id) else {
            return;
        };
        let current = self.current(element_id);
        if current != original {
            self.handle
                .replace_class(element_id, current.css_class(), original.css_class());
        }
    }
}

/// A switch mutation in flight for one pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchRequest {
    pub pane: DiagramId,
    pub breaker_id: String,
    pub open: bool,
    pub element_id: String,
    pub span: CommandSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Confirmed,
    /// `rolled_back` is false when a reload already replaced the drawing.
    Failed { message: String, rolled_back: bool },
}

/// Single-flight guard of a pane's breaker clicks.
#[derive(Debug, Default)]
pub struct SwitchGuard {
    in_flight: Option<SwitchRequest>,
    ledger: MarkLedger,
    /// Visual each touched switch must show until fresh content arrives.
    shown: HashMap<String, SwitchVisual>,
}

impl SwitchGuard {
    pub fn in_progress(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Accept a click unless a mutation is already running. The switch is
    /// marked in its requested state before the request is returned.
    pub fn begin(
        &mut self,
        pane: &DiagramId,
        click: BreakerClick,
        handle: Option<&mut (dyn DiagramHandle + '_)>,
    ) -> Option<SwitchRequest> {
        if let Some(current) = &self.in_flight {
            debug!(
                diagram_id = %pane,
                breaker_id = %click.breaker_id,
                pending = %current.breaker_id,
                "Ignoring breaker click while a switch update is in flight"
            );
            return None;
        }

        let visual = SwitchVisual::from_open(click.requested_open);
        if let Some(handle) = handle {
            ClassMarker::new(handle, &mut self.ledger).mark(&click.element_id, visual);
        }
        self.shown.insert(click.element_id.clone(), visual);

        let request = SwitchRequest {
            pane: pane.clone(),
            breaker_id: click.breaker_id,
            open: click.requested_open,
            element_id: click.element_id,
            span: CommandSpan::start(telemetry::CMD_UPDATE_SWITCH_STATE),
        };
        self.in_flight = Some(request.clone());
        Some(request)
    }

    pub fn finish(
        &mut self,
        request: &SwitchRequest,
        result: Result<(), ServiceError>,
        handle: Option<&mut (dyn DiagramHandle + '_)>,
    ) -> SwitchOutcome {
        let current = self.in_flight.as_ref() == Some(request);
        if current {
            self.in_flight = None;
        }

        match result {
            Ok(()) => {
                request.span.succeed();
                // The confirmed state is the new baseline until fresh content
                // replaces the drawing. A reload already did if not current.
                if current {
                    self.ledger.insert(
                        request.element_id.clone(),
                        SwitchVisual::from_open(request.open),
                    );
                }
                SwitchOutcome::Confirmed
            }
            Err(error) => {
                let message = error.message();
                request.span.fail(message.as_str());
                let mut rolled_back = false;
                if current {
                    match self.ledger.get(&request.element_id) {
                        Some(original) => {
                            self.shown.insert(request.element_id.clone(), *original)
                        }
                        None => self.shown.remove(&request.element_id),
                    };
                    if let Some(handle) = handle
                        && self.ledger.contains_key(&request.element_id)
                    {
                        ClassMarker::new(handle, &mut self.ledger).unmark(&request.element_id);
                        rolled_back = true;
                    }
                }
                SwitchOutcome::Failed {
                    message,
                    rolled_back,
                }
            }
        }
    }

    /// Re-apply pending visuals to a new drawing of the same content.
    pub fn reapply(&mut self, handle: &mut (dyn DiagramHandle + '_)) {
        let mut marker = ClassMarker::new(handle, &mut self.ledger);
        for (element_id, visual) in &self.shown {
            marker.mark(element_id, *visual);
        }
    }

    /// Fresh content arrived: it is the source of truth now.
    pub fn reset(&mut self) {
        if let Some(request) = self.in_flight.take() {
            request.span.note("superseded by diagram reload");
        }
        self.ledger.clear();
        self.shown.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenMenu {
    pub pane: DiagramId,
    pub equipment_id: String,
    pub equipment_type: EquipmentType,
    pub kind: MenuKind,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub pane: DiagramId,
    pub equipment_id: String,
    pub equipment_type: EquipmentType,
    pub x: f64,
    pub y: f64,
}

/// At most one context menu and one tooltip exist at any time.
#[derive(Debug, Default)]
pub struct MenuState {
    menu: Option<OpenMenu>,
    tooltip: Option<Tooltip>,
}

impl MenuState {
    pub fn menu(&self) -> Option<&OpenMenu> {
        self.menu.as_ref()
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    /// Open the menu for a clicked equipment, replacing any previous menu and
    /// hiding the tooltip. Types without a menu close everything and open
    /// nothing.
    pub fn open(&mut self, pane: &DiagramId, click: EquipmentClick) -> Option<&OpenMenu> {
        self.tooltip = None;
        let kind = MenuKind::for_equipment(&click.equipment_type);
        if kind == MenuKind::Unsupported {
            info!(
                equipment_id = %click.equipment_id,
                equipment_type = %click.equipment_type,
                "No context menu for equipment type"
            );
            self.menu = None;
            return None;
        }
        self.menu = Some(OpenMenu {
            pane: pane.clone(),
            equipment_id: click.equipment_id,
            equipment_type: click.equipment_type,
            kind,
            x: click.x,
            y: click.y,
        });
        self.menu.as_ref()
    }

    pub fn close(&mut self) {
        self.menu = None;
    }

    pub fn hover(&mut self, pane: &DiagramId, event: HoverEvent) {
        match event {
            HoverEvent::Show { .. } if self.menu.is_some() => {}
            HoverEvent::Show {
                equipment_id,
                equipment_type,
                x,
                y,
            } => {
                self.tooltip = Some(Tooltip {
                    pane: pane.clone(),
                    equipment_id,
                    equipment_type,
                    x,
                    y,
                });
            }
            HoverEvent::Hide => self.tooltip = None,
        }
    }

    /// Drop anything attached to a pane that went away.
    pub fn forget_pane(&mut self, pane: &DiagramId) {
        if self.menu.as_ref().is_some_and(|m| &m.pane == pane) {
            self.menu = None;
        }
        if self.tooltip.as_ref().is_some_and(|t| &t.pane == pane) {
            self.tooltip = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use sldview_core::ViewBox;
    use std::collections::HashSet;

    #[derive(Default)]
    struct FakeHandle {
        classes: HashMap<String, HashSet<String>>,
    }

    impl FakeHandle {
        fn with_switch(element_id: &str, visual: SwitchVisual) -> Self {
            let mut handle = Self::default();
            handle.classes.insert(
                element_id.to_string(),
                HashSet::from([visual.css_class().to_string()]),
            );
            handle
        }
    }

    impl DiagramHandle for FakeHandle {
        fn width(&self) -> f64 {
            100.0
        }
        fn height(&self) -> f64 {
            100.0
        }
        fn view_box(&self) -> Option<ViewBox> {
            None
        }
        fn set_view_box(&mut self, _view_box: ViewBox) {}
        fn set_dimensions(&mut self, _width: f64, _height: f64) {}
        fn has_class(&self, element_id: &str, class: &str) -> bool {
            self.classes
                .get(element_id)
                .is_some_and(|classes| classes.contains(class))
        }
        fn replace_class(&mut self, element_id: &str, from: &str, to: &str) -> bool {
            let Some(classes) = self.classes.get_mut(element_id) else {
                return false;
            };
            classes.remove(from);
            classes.insert(to.to_string());
            true
        }
    }

    fn click(requested_open: bool) -> BreakerClick {
        BreakerClick {
            breaker_id: "BRK1".to_string(),
            requested_open,
            element_id: "svg-brk1".to_string(),
        }
    }

    #[test]
    fn test_gate() {
        assert!(InteractionGate::default().allows_interaction());
        for gate in [
            InteractionGate {
                computation_starting: true,
                ..Default::default()
            },
            InteractionGate {
                node_building: true,
                ..Default::default()
            },
            InteractionGate {
                modification_in_progress: true,
                ..Default::default()
            },
            InteractionGate {
                loading: true,
                ..Default::default()
            },
        ] {
            assert!(!gate.allows_interaction());
        }
    }

    #[test]
    fn test_callbacks_post_messages() {
        let (tx, rx) = unbounded();
        let pane = DiagramId::from("VL1");
        let callbacks = build_callbacks(
            &pane,
            InteractionPolicy::Interactive,
            InteractionGate::default(),
            &tx,
        );
        (callbacks.on_next_voltage_level.unwrap())("VL2".to_string());
        (callbacks.on_bus_menu.unwrap())(EquipmentClick {
            equipment_id: "BBS1".to_string(),
            equipment_type: EquipmentType::Unknown("BUSBAR_SECTION".to_string()),
            x: 1.0,
            y: 2.0,
        });

        assert!(matches!(
            rx.try_recv().unwrap(),
            PaneMessage::NextVoltageLevel { voltage_level_id, .. } if voltage_level_id == "VL2"
        ));
        match rx.try_recv().unwrap() {
            PaneMessage::MenuRequested { pane: from, click } => {
                assert_eq!(from, pane);
                assert_eq!(click.equipment_type, EquipmentType::Bus);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_callbacks_disabled() {
        let (tx, _rx) = unbounded();
        let pane = DiagramId::from("VL1");
        let gate = InteractionGate {
            loading: true,
            ..Default::default()
        };
        assert!(build_callbacks(&pane, InteractionPolicy::Interactive, gate, &tx).is_disabled());
        assert!(
            build_callbacks(
                &pane,
                InteractionPolicy::ReadOnly,
                InteractionGate::default(),
                &tx
            )
            .is_disabled()
        );
    }

    #[test]
    fn test_guard_single_flight_and_rollback() {
        let pane = DiagramId::from("VL1");
        let mut handle = FakeHandle::with_switch("svg-brk1", SwitchVisual::Closed);
        let mut guard = SwitchGuard::default();

        let request = guard
            .begin(&pane, click(true), Some(&mut handle))
            .expect("first click accepted");
        assert!(handle.has_class("svg-brk1", "sld-open"));
        assert!(guard.begin(&pane, click(true), Some(&mut handle)).is_none());

        let outcome = guard.finish(
            &request,
            Err(ServiceError::http(403, "Forbidden")),
            Some(&mut handle),
        );
        assert_eq!(
            outcome,
            SwitchOutcome::Failed {
                message: "Forbidden".to_string(),
                rolled_back: true
            }
        );
        assert!(handle.has_class("svg-brk1", "sld-closed"));
        assert!(!handle.has_class("svg-brk1", "sld-open"));
        assert!(!guard.in_progress());
        assert!(guard.begin(&pane, click(true), Some(&mut handle)).is_some());
    }

    #[test]
    fn test_guard_success_keeps_mark() {
        let pane = DiagramId::from("VL1");
        let mut handle = FakeHandle::with_switch("svg-brk1", SwitchVisual::Open);
        let mut guard = SwitchGuard::default();
        let request = guard.begin(&pane, click(false), Some(&mut handle)).unwrap();
        assert_eq!(
            guard.finish(&request, Ok(()), Some(&mut handle)),
            SwitchOutcome::Confirmed
        );
        assert!(handle.has_class("svg-brk1", "sld-closed"));
        assert!(!guard.in_progress());
    }

    #[test]
    fn test_redraw_keeps_pending_visual() {
        let pane = DiagramId::from("VL1");
        let mut handle = FakeHandle::with_switch("svg-brk1", SwitchVisual::Closed);
        let mut guard = SwitchGuard::default();
        let request = guard.begin(&pane, click(true), Some(&mut handle)).unwrap();

        let mut redrawn = FakeHandle::with_switch("svg-brk1", SwitchVisual::Closed);
        guard.reapply(&mut redrawn);
        assert!(redrawn.has_class("svg-brk1", "sld-open"));

        guard.finish(
            &request,
            Err(ServiceError::http(403, "Forbidden")),
            Some(&mut redrawn),
        );
        assert!(redrawn.has_class("svg-brk1", "sld-closed"));

        let mut again = FakeHandle::with_switch("svg-brk1", SwitchVisual::Closed);
        guard.reapply(&mut again);
        assert!(again.has_class("svg-brk1", "sld-closed"));
    }

    #[test]
    fn test_failure_after_reload_does_not_roll_back() {
        let pane = DiagramId::from("VL1");
        let mut handle = FakeHandle::with_switch("svg-brk1", SwitchVisual::Closed);
        let mut guard = SwitchGuard::default();
        let request = guard.begin(&pane, click(true), Some(&mut handle)).unwrap();
        guard.reset();

        let mut fresh = FakeHandle::with_switch("svg-brk1", SwitchVisual::Closed);
        let outcome = guard.finish(
            &request,
            Err(ServiceError::Other("timeout".to_string())),
            Some(&mut fresh),
        );
        assert_eq!(
            outcome,
            SwitchOutcome::Failed {
                message: "timeout".to_string(),
                rolled_back: false
            }
        );
        assert!(fresh.has_class("svg-brk1", "sld-closed"));
    }

    #[test]
    fn test_late_success_after_reload_leaves_no_baseline() {
        let pane = DiagramId::from("VL1");
        let mut handle = FakeHandle::with_switch("svg-brk1", SwitchVisual::Closed);
        let mut guard = SwitchGuard::default();
        let stale = guard.begin(&pane, click(true), Some(&mut handle)).unwrap();
        guard.reset();

        let mut fresh = FakeHandle::with_switch("svg-brk1", SwitchVisual::Closed);
        assert_eq!(
            guard.finish(&stale, Ok(()), Some(&mut fresh)),
            SwitchOutcome::Confirmed
        );
        assert!(fresh.has_class("svg-brk1", "sld-closed"));

        let request = guard.begin(&pane, click(true), Some(&mut fresh)).unwrap();
        assert!(fresh.has_class("svg-brk1", "sld-open"));
        let outcome = guard.finish(
            &request,
            Err(ServiceError::http(403, "Forbidden")),
            Some(&mut fresh),
        );
        assert_eq!(
            outcome,
            SwitchOutcome::Failed {
                message: "Forbidden".to_string(),
                rolled_back: true
            }
        );
        assert!(fresh.has_class("svg-brk1", "sld-closed"));
        assert!(!fresh.has_class("svg-brk1", "sld-open"));
    }

    #[test]
    fn test_single_menu_and_tooltip() {
        let pane = DiagramId::from("VL1");
        let mut menus = MenuState::default();
        menus.hover(
            &pane,
            HoverEvent::Show {
                equipment_id: "L1".to_string(),
                equipment_type: EquipmentType::Line,
                x: 0.0,
                y: 0.0,
            },
        );
        assert!(menus.tooltip().is_some());

        let click = |id: &str, equipment_type| EquipmentClick {
            equipment_id: id.to_string(),
            equipment_type,
            x: 10.0,
            y: 20.0,
        };
        let kind = menus.open(&pane, click("L1", EquipmentType::Line)).map(|m| m.kind);
        assert_eq!(kind, Some(MenuKind::Branch));
        assert!(menus.tooltip().is_none());

        menus.open(&pane, click("G1", EquipmentType::Generator));
        assert_eq!(menus.menu().map(|m| m.equipment_id.as_str()), Some("G1"));

        assert!(menus.open(&pane, click("SW1", EquipmentType::Switch)).is_none());
        assert!(menus.menu().is_none());

        menus.open(&pane, click("G1", EquipmentType::Generator));
        menus.forget_pane(&pane);
        assert!(menus.menu().is_none());
    }
}
