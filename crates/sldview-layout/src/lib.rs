pub mod reconcile;
pub mod size_state;

pub use reconcile::{Chrome, DiagramGeometry, KindLimits, SizeInputs, reconcile};
pub use size_state::{ContentKey, GeometryCache, SizeState};
