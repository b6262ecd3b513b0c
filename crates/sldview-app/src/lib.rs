pub mod interactivity;
pub mod messages;
pub mod orchestrator;
pub mod pane;
pub mod position;
pub mod services;
pub mod settings;
pub mod spawner;
pub mod urls;
pub mod view_state;
pub mod views_codec;

pub use interactivity::{
    BreakerClick, EquipmentClick, HoverEvent, InteractionGate, InteractionPolicy, MenuState,
    OpenMenu, OptimisticMarker, SwitchGuard, SwitchOutcome, SwitchRequest, Tooltip,
};
pub use messages::PaneMessage;
pub use orchestrator::{
    Collaborators, DiagramPaneOrchestrator, MinimizedChip, PaneLayout, PaneVisibility,
    ReportedSize,
};
pub use pane::{DiagramPane, FetchOutcome, FetchRequest, PaneBounds, PaneStatus};
pub use position::PositionDiagram;
pub use services::{
    Callback, DiagramHandle, DiagramRenderer, DrawRequest, EquipmentLookup, RenderCallbacks,
    SvgFetcher, SwitchResponse, SwitchService,
};
pub use settings::{DisplayParameters, SettingsError, SubstationLayout, ViewerSettings};
pub use spawner::{Job, TaskSpawner, ThreadSpawner, TokioSpawner};
pub use urls::{StudyContext, UrlError, substation_svg_url, svg_url, voltage_level_svg_url};
pub use view_state::{
    MemoryQueryStore, QueryStore, TrackedView, ViewAction, ViewState, ViewStateStore, reduce,
};
pub use views_codec::{VIEWS_PARAM, ViewEntry, ViewsCodecError, decode_views, encode_views};
