#![allow(dead_code)]

use parking_lot::Mutex;
use sldview_app::{
    Collaborators, DiagramHandle, DiagramPaneOrchestrator, DiagramRenderer, DrawRequest, Job,
    MemoryQueryStore, RenderCallbacks, StudyContext, SvgFetcher, SwitchResponse, SwitchService,
    TaskSpawner, ViewerSettings,
};
use sldview_core::{
    DiagramId, EquipmentInfo, NodeId, ServiceError, StudyId, SvgDocument, SwitchVisual, ViewBox,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Queues jobs until the test runs them.
#[derive(Clone, Default)]
pub struct ManualSpawner {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl ManualSpawner {
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn run_oldest(&self) -> bool {
        let job = self.jobs.lock().pop_front();
        job.map(|job| job()).is_some()
    }

    pub fn run_newest(&self) -> bool {
        let job = self.jobs.lock().pop_back();
        job.map(|job| job()).is_some()
    }

    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_oldest() {
            ran += 1;
        }
        ran
    }
}

impl TaskSpawner for ManualSpawner {
    fn spawn(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }
}

/// Serves `<svg data-url="{url}"/>` for every URL unless a failure was
/// registered for a diagram id.
#[derive(Default)]
pub struct FakeFetcher {
    failures: Mutex<HashMap<String, ServiceError>>,
    missing: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn fail(&self, id: &str, error: ServiceError) {
        self.failures.lock().insert(id.to_string(), error);
    }

    pub fn recover(&self, id: &str) {
        self.failures.lock().remove(id);
        self.missing.lock().remove(id);
    }

    pub fn missing(&self, id: &str) {
        self.missing.lock().insert(id.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

fn targets(url: &str, id: &str) -> bool {
    url.contains(&format!("/{id}/svg-and-metadata"))
}

impl SvgFetcher for FakeFetcher {
    fn fetch_svg(&self, url: &str) -> Result<Option<SvgDocument>, ServiceError> {
        self.calls.lock().push(url.to_string());
        if let Some((_, error)) = self.failures.lock().iter().find(|(id, _)| targets(url, id)) {
            return Err(error.clone());
        }
        if self.missing.lock().iter().any(|id| targets(url, id)) {
            return Ok(None);
        }
        Ok(Some(SvgDocument {
            svg: format!("<svg data-url=\"{url}\"/>"),
            metadata: serde_json::json!({ "url": url }),
        }))
    }
}

/// Answers switch mutations from a script, then with 200.
#[derive(Default)]
pub struct FakeSwitches {
    script: Mutex<VecDeque<Result<SwitchResponse, ServiceError>>>,
    pub calls: Mutex<Vec<(String, bool)>>,
}

impl FakeSwitches {
    pub fn respond(&self, response: Result<SwitchResponse, ServiceError>) {
        self.script.lock().push_back(response);
    }
}

impl SwitchService for FakeSwitches {
    fn update_switch_state(
        &self,
        _study_id: &StudyId,
        _node_id: &NodeId,
        breaker_id: &str,
        open: bool,
    ) -> Result<SwitchResponse, ServiceError> {
        self.calls.lock().push((breaker_id.to_string(), open));
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(SwitchResponse::ok()))
    }
}

#[derive(Debug, Default)]
pub struct HandleState {
    pub classes: HashMap<String, HashSet<String>>,
    pub view_box: Option<ViewBox>,
    pub dimensions: Option<(f64, f64)>,
}

pub struct Draw {
    pub svg: String,
    pub callbacks: RenderCallbacks,
    pub state: Arc<Mutex<HandleState>>,
}

/// Records every draw. Each drawing measures `natural` and contains the
/// switches of `switches` in their initial state. While `reject` is set,
/// draws fail and only `rejected` counts them.
#[derive(Default)]
pub struct RenderLog {
    pub natural: (f64, f64),
    pub switches: HashMap<String, SwitchVisual>,
    pub draws: Vec<Draw>,
    pub reject: bool,
    pub rejected: usize,
}

impl RenderLog {
    pub fn last(&self) -> &Draw {
        self.draws.last().expect("nothing was drawn")
    }

    pub fn last_for(&self, id: &str) -> &Draw {
        self.draws
            .iter()
            .rev()
            .find(|draw| targets(&draw.svg, id))
            .expect("diagram was never drawn")
    }

    pub fn draws_for(&self, id: &str) -> usize {
        self.draws.iter().filter(|draw| targets(&draw.svg, id)).count()
    }
}

pub struct FakeRenderer {
    log: Arc<Mutex<RenderLog>>,
}

impl DiagramRenderer for FakeRenderer {
    fn draw(&mut self, request: DrawRequest<'_>) -> Result<Box<dyn DiagramHandle>, ServiceError> {
        let mut log = self.log.lock();
        if log.reject {
            log.rejected += 1;
            return Err(ServiceError::Render("Unsupported SVG".to_string()));
        }
        let classes = log
            .switches
            .iter()
            .map(|(id, visual)| (id.clone(), HashSet::from([visual.css_class().to_string()])))
            .collect();
        let (width, height) = log.natural;
        let state = Arc::new(Mutex::new(HandleState {
            classes,
            view_box: Some(ViewBox::new(0.0, 0.0, width, height)),
            dimensions: None,
        }));
        log.draws.push(Draw {
            svg: request.svg.to_string(),
            callbacks: request.callbacks,
            state: state.clone(),
        });
        Ok(Box::new(FakeHandle {
            width,
            height,
            state,
        }))
    }
}

struct FakeHandle {
    width: f64,
    height: f64,
    state: Arc<Mutex<HandleState>>,
}

impl DiagramHandle for FakeHandle {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn view_box(&self) -> Option<ViewBox> {
        self.state.lock().view_box
    }

    fn set_view_box(&mut self, view_box: ViewBox) {
        self.state.lock().view_box = Some(view_box);
    }

    fn set_dimensions(&mut self, width: f64, height: f64) {
        self.state.lock().dimensions = Some((width, height));
    }

    fn has_class(&self, element_id: &str, class: &str) -> bool {
        self.state
            .lock()
            .classes
            .get(element_id)
            .is_some_and(|classes| classes.contains(class))
    }

    fn replace_class(&mut self, element_id: &str, from: &str, to: &str) -> bool {
        let mut state = self.state.lock();
        let Some(classes) = state.classes.get_mut(element_id) else {
            return false;
        };
        classes.remove(from);
        classes.insert(to.to_string());
        true
    }
}

pub fn context() -> StudyContext {
    StudyContext {
        base_url: "http://gateway/study".to_string(),
        study_id: StudyId("study-1".to_string()),
        node_id: NodeId("root".to_string()),
    }
}

/// S1 holds VL1 and VL2; S2 holds VL3.
pub fn network() -> HashMap<DiagramId, EquipmentInfo> {
    let info = |name: &str, substation: Option<&str>, country: Option<&str>| EquipmentInfo {
        name: Some(name.to_string()),
        substation_id: substation.map(DiagramId::from),
        country: country.map(str::to_string),
    };
    HashMap::from([
        (DiagramId::from("S1"), info("Paris", None, Some("FR"))),
        (DiagramId::from("S2"), info("Lyon", None, Some("FR"))),
        (DiagramId::from("VL1"), info("Paris 400kV", Some("S1"), None)),
        (DiagramId::from("VL2"), info("Paris 225kV", Some("S1"), None)),
        (DiagramId::from("VL3"), info("Lyon 400kV", Some("S2"), None)),
    ])
}

pub struct Harness {
    pub orchestrator: DiagramPaneOrchestrator,
    pub spawner: ManualSpawner,
    pub fetcher: Arc<FakeFetcher>,
    pub switches: Arc<FakeSwitches>,
    pub renderer: Arc<Mutex<RenderLog>>,
    pub query: MemoryQueryStore,
}

impl Harness {
    pub fn new(query: &str) -> Self {
        Self::with_settings(query, ViewerSettings::default())
    }

    pub fn with_settings(query: &str, settings: ViewerSettings) -> Self {
        let spawner = ManualSpawner::default();
        let fetcher = Arc::new(FakeFetcher::default());
        let switches = Arc::new(FakeSwitches::default());
        let renderer = Arc::new(Mutex::new(RenderLog {
            natural: (400.0, 300.0),
            ..RenderLog::default()
        }));
        let query = MemoryQueryStore::new(query);
        let orchestrator = DiagramPaneOrchestrator::new(
            settings,
            context(),
            Box::new(query.clone()),
            Collaborators {
                fetcher: fetcher.clone(),
                switches: switches.clone(),
                renderer: Box::new(FakeRenderer {
                    log: renderer.clone(),
                }),
                lookup: Box::new(network()),
                spawner: Arc::new(spawner.clone()),
            },
        );
        Self {
            orchestrator,
            spawner,
            fetcher,
            switches,
            renderer,
            query,
        }
    }

    /// Run background jobs and pump the UI loop until nothing is left.
    pub fn settle(&mut self) {
        loop {
            let ran = self.spawner.run_all();
            let handled = self.orchestrator.pump();
            if ran == 0 && handled == 0 {
                break;
            }
        }
    }
}
