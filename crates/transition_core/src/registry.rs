use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use shared::{
    domain::{ElementId, NavigationData, Namespace},
    error::{FaultKind, FaultReport},
    protocol::TransitionEvent,
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    config::Settings,
    error::MountError,
    loader::ResourceLoader,
    ready_gate::{ReadinessGate, ReadySignal},
};

pub const FALLBACK_NAMESPACE: &str = "default";

pub struct MountContext {
    pub container: ElementId,
    pub namespace: Namespace,
    pub navigation: Option<NavigationData>,
    pub ready: ReadySignal,
}

type DisposeFn = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// What a controller leaves behind after `init`. Disposing releases everything the controller
/// acquired; a second dispose is a no-op.
pub struct PageHandle {
    dispose: Option<DisposeFn>,
}

impl PageHandle {
    pub fn new<F>(dispose: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    pub fn noop() -> Self {
        Self { dispose: None }
    }

    pub fn dispose(&mut self) -> anyhow::Result<()> {
        match self.dispose.take() {
            Some(dispose) => dispose(),
            None => Ok(()),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.dispose.is_none()
    }
}

impl fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

pub trait PageController: Send + Sync {
    fn init(&self, ctx: MountContext) -> anyhow::Result<PageHandle>;
}

pub struct NoopController;

impl PageController for NoopController {
    fn init(&self, _ctx: MountContext) -> anyhow::Result<PageHandle> {
        Ok(PageHandle::noop())
    }
}

impl<F> PageController for F
where
    F: Fn(MountContext) -> anyhow::Result<PageHandle> + Send + Sync,
{
    fn init(&self, ctx: MountContext) -> anyhow::Result<PageHandle> {
        self(ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Skipped,
    Mounted,
    Faulted,
}

pub struct ControllerRegistry {
    settings: Arc<Settings>,
    loader: Arc<ResourceLoader>,
    gate: Arc<ReadinessGate>,
    controllers: RwLock<HashMap<String, Arc<dyn PageController>>>,
    instances: Mutex<HashMap<Namespace, PageHandle>>,
    faults: Option<broadcast::Sender<TransitionEvent>>,
}

impl ControllerRegistry {
    pub fn new(settings: Arc<Settings>, loader: Arc<ResourceLoader>, gate: Arc<ReadinessGate>) -> Self {
        Self {
            settings,
            loader,
            gate,
            controllers: RwLock::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
            faults: None,
        }
    }

    pub fn with_fault_sink(mut self, sender: broadcast::Sender<TransitionEvent>) -> Self {
        self.faults = Some(sender);
        self
    }

    fn report(&self, namespace: &Namespace, message: String) {
        if let Some(faults) = &self.faults {
            let report = FaultReport::new(FaultKind::ControllerFault, message)
                .for_namespace(namespace.clone());
            let _ = faults.send(TransitionEvent::Fault(report));
        }
    }

    fn instances(&self) -> MutexGuard<'_, HashMap<Namespace, PageHandle>> {
        self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, namespace: impl Into<String>, controller: Arc<dyn PageController>) {
        self.controllers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.into(), controller);
    }

    fn controller_for(&self, namespace: &Namespace) -> Arc<dyn PageController> {
        let controllers = self.controllers.read().unwrap_or_else(PoisonError::into_inner);
        controllers
            .get(namespace.as_str())
            .or_else(|| controllers.get(FALLBACK_NAMESPACE))
            .cloned()
            .unwrap_or_else(|| Arc::new(NoopController))
    }

    pub fn is_mounted(&self, namespace: &Namespace) -> bool {
        self.instances().contains_key(namespace)
    }

    pub fn live_namespaces(&self) -> Vec<Namespace> {
        let mut live = self.instances().keys().cloned().collect::<Vec<_>>();
        live.sort();
        live
    }

    pub async fn mount(
        &self,
        namespace: &Namespace,
        container: ElementId,
        navigation: Option<NavigationData>,
    ) -> Result<MountOutcome, MountError> {
        if namespace.is_empty() {
            return Ok(MountOutcome::Skipped);
        }
        if !self.settings.is_known_namespace(namespace) {
            warn!(%namespace, "registry: unknown namespace, falling back to default controller");
        }

        let url = self
            .settings
            .controller_url(namespace)
            .map_err(|source| MountError::ControllerUrl {
                namespace: namespace.clone(),
                source,
            })?;
        if let Some(url) = url {
            self.loader.load_script_once(&url).await?;
        }

        let controller = self.controller_for(namespace);

        let previous = self.instances().remove(namespace);
        if let Some(previous) = previous {
            self.dispose_instance(namespace, previous);
        }

        let ctx = MountContext {
            container,
            namespace: namespace.clone(),
            navigation,
            ready: self.gate.handle(),
        };
        let handle = match controller.init(ctx) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(%namespace, %err, "registry: controller init failed; continuing without it");
                self.report(namespace, format!("init failed: {err:#}"));
                return Ok(MountOutcome::Faulted);
            }
        };

        let displaced = self.instances().insert(namespace.clone(), handle);
        if let Some(displaced) = displaced {
            self.dispose_instance(namespace, displaced);
        }
        if self.settings.debug {
            debug!(%namespace, "registry: mounted");
        }
        Ok(MountOutcome::Mounted)
    }

    pub fn unmount(&self, namespace: &Namespace) -> bool {
        let instance = self.instances().remove(namespace);
        let Some(instance) = instance else {
            return false;
        };
        self.dispose_instance(namespace, instance);
        if self.settings.debug {
            debug!(%namespace, "registry: unmounted");
        }
        true
    }

    fn dispose_instance(&self, namespace: &Namespace, mut instance: PageHandle) {
        if let Err(err) = instance.dispose() {
            warn!(%namespace, %err, "registry: controller dispose failed");
            self.report(namespace, format!("dispose failed: {err:#}"));
        }
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
