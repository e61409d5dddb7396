use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::domain::{ElementId, NavigationData};

pub mod sim;
pub mod timeline;

pub use timeline::{Ease, Stagger, StaggerFrom, Timeline, Tween, TweenProp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StyleProperty {
    Display,
    Opacity,
    Visibility,
    Transition,
    MinHeight,
}

impl StyleProperty {
    pub fn css_name(&self) -> &'static str {
        match self {
            StyleProperty::Display => "display",
            StyleProperty::Opacity => "opacity",
            StyleProperty::Visibility => "visibility",
            StyleProperty::Transition => "transition",
            StyleProperty::MinHeight => "min-height",
        }
    }
}

/// Synchronous view of the live document. Inline style getters return an empty string when
/// the property is unset, mirroring `element.style.<prop>`.
pub trait Document: Send + Sync {
    fn query(&self, selector: &str) -> Option<ElementId>;
    fn query_all(&self, selector: &str) -> Vec<ElementId>;
    fn query_within(&self, root: ElementId, selector: &str) -> Option<ElementId>;
    fn contains(&self, root: ElementId, element: ElementId) -> bool;
    fn inline_style(&self, element: ElementId, property: StyleProperty) -> String;
    fn set_inline_style(&self, element: ElementId, property: StyleProperty, value: &str);
    fn rendered_height(&self, element: ElementId) -> Option<f64>;
    fn scroll_to_top(&self);
    fn block_scroll_input(&self, keys: &[&str]);
    fn unblock_scroll_input(&self);
    fn dispatch_resize(&self);
    fn remove_body_class(&self, class: &str);
    fn session_flag(&self, key: &str) -> bool;
    fn set_session_flag(&self, key: &str);
    fn set_manual_scroll_restoration(&self);
}

#[async_trait]
pub trait Animator: Send + Sync {
    async fn play(&self, timeline: Timeline) -> anyhow::Result<()>;
    async fn play_intro(&self, logo: ElementId) -> anyhow::Result<()>;
}

pub trait InteractionRuntime: Send + Sync {
    fn reinitialize(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAnchor {
    Selector(String),
    Element(ElementId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportTrigger {
    pub id: u64,
    pub anchor: Option<TriggerAnchor>,
    pub animation_targets: Vec<ElementId>,
}

pub trait ViewportTriggers: Send + Sync {
    fn registrations(&self) -> Vec<ViewportTrigger>;
    fn kill(&self, id: u64) -> anyhow::Result<()>;
    fn refresh(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseMenuOptions {
    pub immediate: bool,
    pub force_after: Duration,
}

pub trait GlobalBehavior: Send + Sync {
    fn init_once(&self) -> anyhow::Result<()>;
    fn after_enter(&self, navigation: &NavigationData) -> anyhow::Result<()>;
    fn close_menu(&self, options: CloseMenuOptions) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Script,
    Stylesheet,
}

#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, kind: ResourceKind, url: &str) -> anyhow::Result<()>;
}

pub struct MissingResourceFetcher;

#[async_trait]
impl ResourceFetcher for MissingResourceFetcher {
    async fn fetch(&self, kind: ResourceKind, url: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("no resource fetcher available for {kind:?} {url}"))
    }
}

#[async_trait]
pub trait FrameClock: Send + Sync {
    async fn next_frame(&self);
}

pub struct IntervalFrameClock {
    interval: Duration,
}

impl IntervalFrameClock {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for IntervalFrameClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

#[async_trait]
impl FrameClock for IntervalFrameClock {
    async fn next_frame(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

#[async_trait]
pub trait TransitionHooks: Send + Sync {
    async fn once(&self, data: &NavigationData);
    async fn leave(&self, data: &NavigationData);
    async fn before_enter(&self, data: &NavigationData);
    async fn enter(&self, data: &NavigationData);
    async fn after(&self, data: &NavigationData);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterOptions {
    pub name: String,
    pub timeout: Duration,
    pub sync: bool,
    pub debug: bool,
}

pub trait Router: Send + Sync {
    fn register(
        &self,
        hooks: Arc<dyn TransitionHooks>,
        options: RouterOptions,
    ) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct HostBindings {
    pub router: Option<Arc<dyn Router>>,
    pub document: Arc<dyn Document>,
    pub animator: Option<Arc<dyn Animator>>,
    pub interactions: Option<Arc<dyn InteractionRuntime>>,
    pub triggers: Option<Arc<dyn ViewportTriggers>>,
    pub global: Option<Arc<dyn GlobalBehavior>>,
    pub fetcher: Arc<dyn ResourceFetcher>,
    pub frames: Arc<dyn FrameClock>,
}

impl HostBindings {
    pub fn new(document: Arc<dyn Document>) -> Self {
        Self {
            router: None,
            document,
            animator: None,
            interactions: None,
            triggers: None,
            global: None,
            fetcher: Arc::new(MissingResourceFetcher),
            frames: Arc::new(IntervalFrameClock::default()),
        }
    }
}
