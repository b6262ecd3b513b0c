use crate::interactivity::SwitchRequest;
use crate::messages::PaneMessage;
use crate::pane::FetchRequest;
use crate::services::{SvgFetcher, SwitchService};
use crossbeam_channel::Sender;
use sldview_core::{NodeId, StudyId};
use sldview_events::telemetry::{self, CommandSpan};
use std::sync::Arc;
use tracing::debug;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs blocking collaborator calls off the UI loop. Results come back as
/// channel messages, so spawners never touch pane state.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, job: Job);
}

/// One OS thread per job.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSpawner;

impl TaskSpawner for ThreadSpawner {
    fn spawn(&self, job: Job) {
        std::thread::spawn(job);
    }
}

/// Runs jobs on a tokio runtime's blocking pool.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime of the calling context, if any.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, job: Job) {
        // The join handle is dropped: completion is reported by the job itself.
        drop(self.handle.spawn_blocking(job));
        debug!("Spawned blocking job");
    }
}

/// Fetch a diagram in the background and post the response back.
pub fn spawn_fetch(
    spawner: &dyn TaskSpawner,
    fetcher: Arc<dyn SvgFetcher>,
    tx: Sender<PaneMessage>,
    request: FetchRequest,
) {
    let span = CommandSpan::start(telemetry::CMD_FETCH_SVG);
    spawner.spawn(Box::new(move || {
        let result = fetcher.fetch_svg(&request.url);
        match &result {
            Ok(_) => {
                span.succeed();
            }
            Err(e) => {
                span.fail(e.message());
            }
        }
        let _ = tx.send(PaneMessage::SvgFetched {
            pane: request.pane,
            url: request.url,
            result,
        });
    }));
}

/// Send a switch mutation in the background. Non-ok responses come back as
/// errors.
pub fn spawn_switch_update(
    spawner: &dyn TaskSpawner,
    switches: Arc<dyn SwitchService>,
    tx: Sender<PaneMessage>,
    study_id: StudyId,
    node_id: NodeId,
    request: SwitchRequest,
) {
    spawner.spawn(Box::new(move || {
        let result = switches
            .update_switch_state(&study_id, &node_id, &request.breaker_id, request.open)
            .and_then(|response| response.into_result());
        let _ = tx.send(PaneMessage::SwitchUpdated { request, result });
    }));
}
