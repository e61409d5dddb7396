use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use host_integration::{Document, FrameClock, HostBindings, RouterOptions};
use shared::protocol::TransitionEvent;
use tokio::sync::broadcast;
use tracing::{debug, info};

pub mod config;
pub mod error;
pub mod interactions;
pub mod loader;
pub mod orchestrator;
pub mod overlay;
pub mod ready_gate;
pub mod registry;
pub mod scheduler;
pub mod stability;
pub mod viewport;

pub use config::{load_settings, load_settings_from, Settings};
pub use error::{LoadError, MountError, StartupError};
pub use orchestrator::TransitionOrchestrator;
pub use ready_gate::{ReadinessGate, ReadyOutcome, ReadySignal};
pub use registry::{
    ControllerRegistry, MountContext, MountOutcome, NoopController, PageController, PageHandle,
};

use crate::{
    loader::ResourceLoader,
    scheduler::TaskScheduler,
    stability::{LayoutFreeze, ScrollLock},
};

const EVENT_CAPACITY: usize = 256;
const TRANSITION_NAME: &str = "default";

pub struct AppSession {
    settings: Arc<Settings>,
    host: HostBindings,
    gate: Arc<ReadinessGate>,
    loader: Arc<ResourceLoader>,
    registry: ControllerRegistry,
    scheduler: TaskScheduler,
    freeze: LayoutFreeze,
    scroll: ScrollLock,
    events: broadcast::Sender<TransitionEvent>,
    wired: AtomicBool,
}

impl AppSession {
    pub fn new(settings: Settings, host: HostBindings) -> Arc<Self> {
        let settings = Arc::new(settings);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let gate = Arc::new(ReadinessGate::new());
        let loader = Arc::new(ResourceLoader::new(Arc::clone(&host.fetcher)));
        let registry = ControllerRegistry::new(
            Arc::clone(&settings),
            Arc::clone(&loader),
            Arc::clone(&gate),
        )
        .with_fault_sink(events.clone());

        Arc::new(Self {
            settings,
            host,
            gate,
            loader,
            registry,
            scheduler: TaskScheduler::new(),
            freeze: LayoutFreeze::new(),
            scroll: ScrollLock::new(),
            events,
            wired: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn settings_arc(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn host(&self) -> &HostBindings {
        &self.host
    }

    pub fn document(&self) -> &dyn Document {
        self.host.document.as_ref()
    }

    pub fn frames(&self) -> &dyn FrameClock {
        self.host.frames.as_ref()
    }

    pub fn gate(&self) -> &Arc<ReadinessGate> {
        &self.gate
    }

    pub fn ready(&self) -> ReadySignal {
        self.gate.handle()
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn freeze(&self) -> &LayoutFreeze {
        &self.freeze
    }

    pub fn scroll(&self) -> &ScrollLock {
        &self.scroll
    }

    pub(crate) fn lock_scroll(&self) {
        self.scroll.lock(self.document());
    }

    pub fn register_controller(
        &self,
        namespace: impl Into<String>,
        controller: Arc<dyn PageController>,
    ) {
        self.registry.register(namespace, controller);
    }

    pub async fn load_script_once(&self, url: &str) -> Result<(), LoadError> {
        self.loader.load_script_once(url).await
    }

    pub async fn load_css_once(&self, url: &str) -> Result<(), LoadError> {
        self.loader.load_css_once(url).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: TransitionEvent) {
        let _ = self.events.send(event);
    }

    pub fn is_wired(&self) -> bool {
        self.wired.load(Ordering::SeqCst)
    }

    /// Register the orchestrator with the router. A second call on the same session is a
    /// logged no-op returning `Ok(None)`; a missing router is fatal.
    pub fn wire_transitions(
        self: &Arc<Self>,
    ) -> Result<Option<Arc<TransitionOrchestrator>>, StartupError> {
        let router = self.host.router.clone().ok_or(StartupError::RouterMissing)?;

        if self.wired.swap(true, Ordering::SeqCst) {
            info!("transition core already initialized; skipping");
            return Ok(None);
        }

        let orchestrator = Arc::new(TransitionOrchestrator::new(Arc::clone(self)));
        let options = RouterOptions {
            name: TRANSITION_NAME.to_string(),
            timeout: self.settings.router_timeout(),
            sync: false,
            debug: self.settings.debug,
        };
        if let Err(err) = router.register(orchestrator.clone(), options) {
            self.wired.store(false, Ordering::SeqCst);
            return Err(StartupError::Registration(format!("{err:#}")));
        }

        self.document().set_manual_scroll_restoration();
        if self.settings.debug {
            debug!("transition core initialized");
        }
        Ok(Some(orchestrator))
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
