use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use sldview_core::{DiagramId, DiagramKind, NodeId};

pub mod telemetry;

/// Kind of an equipment named in a deletion notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletedKind {
    Substation,
    VoltageLevel,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEquipment {
    pub id: DiagramId,
    pub kind: DeletedKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Computation {
    LoadFlow,
    SecurityAnalysis,
    SensitivityAnalysis,
    ShortCircuit,
    DynamicSimulation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // ========================================================================
    // Study notifications (inbound)
    // ========================================================================
    LoadflowResultChanged,
    ShortCircuitResultChanged,
    /// Switch states were modified on a node of the study tree.
    SwitchesChanged {
        node_id: NodeId,
    },
    EquipmentDeleted {
        deleted: Vec<DeletedEquipment>,
    },
    ComputationStarting {
        computation: Computation,
    },
    ComputationFinished {
        computation: Computation,
    },
    NodeBuildStatusChanged {
        node_id: NodeId,
        building: bool,
    },
    CurrentNodeChanged {
        node_id: NodeId,
    },
    DisplayParametersChanged,

    // ========================================================================
    // Diagram panes (outbound)
    // ========================================================================
    DiagramSizeReported {
        id: DiagramId,
        kind: DiagramKind,
        width: f64,
        height: f64,
    },

    /// Snackbar message for a failure the user should see.
    ShowError {
        message: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Dispatch all pending events to a listener.
    /// This is useful for processing events in the UI loop.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Trait for components that respond to events.
/// Implement this to receive events from the EventBus.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_publish_receive() {
        let bus = EventBus::new();
        let sender = bus.sender();
        let receiver = bus.receiver();

        let event = Event::EquipmentDeleted {
            deleted: vec![DeletedEquipment {
                id: DiagramId::from("S1"),
                kind: DeletedKind::Substation,
            }],
        };

        sender.send(event.clone()).unwrap();

        let received = receiver.recv().unwrap();
        match received {
            Event::EquipmentDeleted { deleted } => {
                assert_eq!(deleted.len(), 1);
                assert_eq!(deleted[0].id, DiagramId::from("S1"));
            }
            _ => panic!("Expected EquipmentDeleted event"),
        }
    }

    #[test]
    fn test_dispatch_to_listener() {
        struct Recorder(Vec<String>);
        impl EventListener for Recorder {
            fn handle_event(&mut self, event: &Event) {
                if let Event::ShowError { message } = event {
                    self.0.push(message.clone());
                }
            }
        }

        let bus = EventBus::new();
        bus.publish(Event::LoadflowResultChanged);
        bus.publish(Event::ShowError {
            message: "boom".to_string(),
        });

        let mut recorder = Recorder(Vec::new());
        bus.dispatch_to(&mut recorder);
        assert_eq!(recorder.0, vec!["boom".to_string()]);
        assert!(bus.receiver().try_recv().is_err());
    }

    #[test]
    fn test_events_serialize() {
        let json = serde_json::to_string(&Event::NodeBuildStatusChanged {
            node_id: NodeId("n1".to_string()),
            building: true,
        })
        .unwrap();
        assert!(json.contains("NodeBuildStatusChanged"));
    }
}
