use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::{ElementId, NavigationData, PageRef, TransitionPhase};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    Animator, CloseMenuOptions, Document, GlobalBehavior, HostBindings, IntervalFrameClock,
    InteractionRuntime, ResourceFetcher, ResourceKind, Router, RouterOptions, StyleProperty,
    Timeline, TransitionHooks, TriggerAnchor, TweenProp, ViewportTrigger, ViewportTriggers,
};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub const WRAPPER_SELECTOR: &str = "[data-barba=\"wrapper\"]";
pub const CONTAINER_SELECTOR: &str = "[data-barba=\"container\"]";
pub const OVERLAY_SELECTOR: &str = ".layout_transition_wrap";
pub const COLUMN_SELECTOR: &str = ".layout_column_el";
pub const LOGO_SELECTOR: &str = ".logo_wrap";
pub const FADE_SELECTOR: &str = "[data-transition-contain=\"fade\"]";
pub const SECTION_SELECTOR: &str = ".section";

const DEFAULT_PAGE_HEIGHT: f64 = 2400.0;

#[derive(Debug, Clone)]
struct SimElement {
    selectors: Vec<String>,
    parent: Option<ElementId>,
    styles: BTreeMap<StyleProperty, String>,
    height: f64,
    translate_y_vh: f32,
}

#[derive(Debug, Default)]
struct DocumentState {
    elements: BTreeMap<ElementId, SimElement>,
    next_id: u64,
    body_classes: HashSet<String>,
    session_flags: HashSet<String>,
    scroll_y: f64,
    blocked_keys: Option<Vec<String>>,
    resize_events: usize,
    manual_scroll_restoration: bool,
}

impl DocumentState {
    fn is_attached_descendant(&self, root: ElementId, element: ElementId) -> bool {
        let mut cursor = Some(element);
        while let Some(id) = cursor {
            if id == root {
                return true;
            }
            cursor = self.elements.get(&id).and_then(|el| el.parent);
        }
        false
    }
}

#[derive(Debug, Default)]
pub struct SimDocument {
    state: Mutex<DocumentState>,
}

impl SimDocument {
    pub fn new() -> Self {
        let document = Self::default();
        guard(&document.state)
            .body_classes
            .insert("first-load".to_string());
        document
    }

    pub fn insert(&self, parent: Option<ElementId>, selectors: &[&str], height: f64) -> ElementId {
        let mut state = guard(&self.state);
        state.next_id += 1;
        let id = ElementId(state.next_id);
        state.elements.insert(
            id,
            SimElement {
                selectors: selectors.iter().map(|s| s.to_string()).collect(),
                parent,
                styles: BTreeMap::new(),
                height,
                translate_y_vh: 0.0,
            },
        );
        id
    }

    pub fn remove(&self, element: ElementId) {
        let mut state = guard(&self.state);
        let doomed = state
            .elements
            .keys()
            .copied()
            .filter(|id| state.is_attached_descendant(element, *id))
            .collect::<Vec<_>>();
        for id in doomed {
            state.elements.remove(&id);
        }
    }

    pub fn exists(&self, element: ElementId) -> bool {
        guard(&self.state).elements.contains_key(&element)
    }

    pub fn set_height(&self, element: ElementId, height: f64) {
        if let Some(el) = guard(&self.state).elements.get_mut(&element) {
            el.height = height;
        }
    }

    pub fn translate_y_vh(&self, element: ElementId) -> Option<f32> {
        guard(&self.state)
            .elements
            .get(&element)
            .map(|el| el.translate_y_vh)
    }

    fn apply_tween_prop(&self, element: ElementId, prop: TweenProp) {
        let mut state = guard(&self.state);
        let Some(el) = state.elements.get_mut(&element) else {
            return;
        };
        match prop {
            TweenProp::Opacity(value) => {
                el.styles.insert(StyleProperty::Opacity, format!("{value}"));
            }
            TweenProp::TranslateYVh(value) => el.translate_y_vh = value,
        }
    }

    pub fn set_scroll_y(&self, y: f64) {
        guard(&self.state).scroll_y = y;
    }

    pub fn scroll_y(&self) -> f64 {
        guard(&self.state).scroll_y
    }

    pub fn scroll_blocked(&self) -> bool {
        guard(&self.state).blocked_keys.is_some()
    }

    pub fn blocked_keys(&self) -> Vec<String> {
        guard(&self.state).blocked_keys.clone().unwrap_or_default()
    }

    pub fn resize_events(&self) -> usize {
        guard(&self.state).resize_events
    }

    pub fn has_body_class(&self, class: &str) -> bool {
        guard(&self.state).body_classes.contains(class)
    }

    pub fn manual_scroll_restoration(&self) -> bool {
        guard(&self.state).manual_scroll_restoration
    }

    pub fn is_covering(&self, element: ElementId) -> bool {
        let state = guard(&self.state);
        let Some(el) = state.elements.get(&element) else {
            return false;
        };
        let display = el.styles.get(&StyleProperty::Display).map(String::as_str);
        let opacity = el
            .styles
            .get(&StyleProperty::Opacity)
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(1.0);
        display != Some("none") && opacity > 0.01
    }

    pub fn is_revealed(&self, element: ElementId) -> bool {
        let state = guard(&self.state);
        let Some(el) = state.elements.get(&element) else {
            return false;
        };
        el.styles.get(&StyleProperty::Opacity).map(String::as_str) == Some("1")
            && el.styles.get(&StyleProperty::Visibility).map(String::as_str) == Some("visible")
    }
}

impl Document for SimDocument {
    fn query(&self, selector: &str) -> Option<ElementId> {
        guard(&self.state)
            .elements
            .iter()
            .find(|(_, el)| el.selectors.iter().any(|s| s == selector))
            .map(|(id, _)| *id)
    }

    fn query_all(&self, selector: &str) -> Vec<ElementId> {
        guard(&self.state)
            .elements
            .iter()
            .filter(|(_, el)| el.selectors.iter().any(|s| s == selector))
            .map(|(id, _)| *id)
            .collect()
    }

    fn query_within(&self, root: ElementId, selector: &str) -> Option<ElementId> {
        let state = guard(&self.state);
        state
            .elements
            .iter()
            .filter(|(id, _)| **id != root)
            .filter(|(_, el)| el.selectors.iter().any(|s| s == selector))
            .map(|(id, _)| *id)
            .find(|id| state.is_attached_descendant(root, *id))
    }

    fn contains(&self, root: ElementId, element: ElementId) -> bool {
        let state = guard(&self.state);
        state.elements.contains_key(&root) && state.is_attached_descendant(root, element)
    }

    fn inline_style(&self, element: ElementId, property: StyleProperty) -> String {
        guard(&self.state)
            .elements
            .get(&element)
            .and_then(|el| el.styles.get(&property).cloned())
            .unwrap_or_default()
    }

    fn set_inline_style(&self, element: ElementId, property: StyleProperty, value: &str) {
        let mut state = guard(&self.state);
        let Some(el) = state.elements.get_mut(&element) else {
            return;
        };
        if value.is_empty() {
            el.styles.remove(&property);
        } else {
            el.styles.insert(property, value.to_string());
        }
    }

    fn rendered_height(&self, element: ElementId) -> Option<f64> {
        let state = guard(&self.state);
        let el = state.elements.get(&element)?;
        if el.styles.get(&StyleProperty::Display).map(String::as_str) == Some("none") {
            return Some(0.0);
        }
        Some(el.height)
    }

    fn scroll_to_top(&self) {
        guard(&self.state).scroll_y = 0.0;
    }

    fn block_scroll_input(&self, keys: &[&str]) {
        guard(&self.state).blocked_keys = Some(keys.iter().map(|k| k.to_string()).collect());
    }

    fn unblock_scroll_input(&self) {
        guard(&self.state).blocked_keys = None;
    }

    fn dispatch_resize(&self) {
        guard(&self.state).resize_events += 1;
    }

    fn remove_body_class(&self, class: &str) {
        guard(&self.state).body_classes.remove(class);
    }

    fn session_flag(&self, key: &str) -> bool {
        guard(&self.state).session_flags.contains(key)
    }

    fn set_session_flag(&self, key: &str) {
        guard(&self.state).session_flags.insert(key.to_string());
    }

    fn set_manual_scroll_restoration(&self) {
        guard(&self.state).manual_scroll_restoration = true;
    }
}

pub struct SimAnimator {
    document: Arc<SimDocument>,
    intro_duration: Duration,
    played: Mutex<Vec<&'static str>>,
    intros: AtomicUsize,
}

impl SimAnimator {
    pub fn new(document: Arc<SimDocument>) -> Self {
        Self {
            document,
            intro_duration: Duration::from_millis(900),
            played: Mutex::new(Vec::new()),
            intros: AtomicUsize::new(0),
        }
    }

    pub fn played(&self) -> Vec<&'static str> {
        guard(&self.played).clone()
    }

    pub fn intros(&self) -> usize {
        self.intros.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Animator for SimAnimator {
    async fn play(&self, timeline: Timeline) -> Result<()> {
        let started = Instant::now();
        let mut steps = Vec::new();
        for tween in &timeline.tweens {
            for (index, target) in tween.targets.iter().enumerate() {
                let start = tween.start_of(index);
                for prop in &tween.from {
                    steps.push((start, *target, *prop));
                }
                for prop in &tween.to {
                    steps.push((start + tween.duration, *target, *prop));
                }
            }
        }
        steps.sort_by_key(|(at, _, _)| *at);

        for (at, target, prop) in steps {
            tokio::time::sleep_until(started + at).await;
            self.document.apply_tween_prop(target, prop);
        }
        tokio::time::sleep_until(started + timeline.total_duration()).await;
        guard(&self.played).push(timeline.label);
        debug!(label = timeline.label, "sim animator: timeline complete");
        Ok(())
    }

    async fn play_intro(&self, logo: ElementId) -> Result<()> {
        self.document
            .set_inline_style(logo, StyleProperty::Opacity, "1");
        tokio::time::sleep(self.intro_duration).await;
        self.intros.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct SimInteractions {
    reinitializations: AtomicUsize,
    fail: AtomicBool,
}

impl SimInteractions {
    pub fn reinitializations(&self) -> usize {
        self.reinitializations.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl InteractionRuntime for SimInteractions {
    fn reinitialize(&self) -> Result<()> {
        self.reinitializations.fetch_add(1, Ordering::SeqCst);
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("interaction runtime is not ready"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct SimTriggers {
    registrations: Mutex<Vec<ViewportTrigger>>,
    next_id: AtomicU64,
    killed: Mutex<Vec<u64>>,
    refreshes: AtomicUsize,
}

impl SimTriggers {
    pub fn register(&self, anchor: Option<TriggerAnchor>, animation_targets: Vec<ElementId>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        guard(&self.registrations).push(ViewportTrigger {
            id,
            anchor,
            animation_targets,
        });
        id
    }

    pub fn live_ids(&self) -> Vec<u64> {
        guard(&self.registrations).iter().map(|t| t.id).collect()
    }

    pub fn killed(&self) -> Vec<u64> {
        guard(&self.killed).clone()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl ViewportTriggers for SimTriggers {
    fn registrations(&self) -> Vec<ViewportTrigger> {
        guard(&self.registrations).clone()
    }

    fn kill(&self, id: u64) -> Result<()> {
        let mut registrations = guard(&self.registrations);
        let before = registrations.len();
        registrations.retain(|t| t.id != id);
        if registrations.len() == before {
            return Err(anyhow!("trigger {id} is not registered"));
        }
        guard(&self.killed).push(id);
        Ok(())
    }

    fn refresh(&self) -> Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct SimGlobal {
    init_once_calls: AtomicUsize,
    menu_closes: Mutex<Vec<CloseMenuOptions>>,
    after_enter: Mutex<Vec<NavigationData>>,
    fail_menu: AtomicBool,
}

impl SimGlobal {
    pub fn init_once_calls(&self) -> usize {
        self.init_once_calls.load(Ordering::SeqCst)
    }

    pub fn menu_closes(&self) -> Vec<CloseMenuOptions> {
        guard(&self.menu_closes).clone()
    }

    pub fn after_enter_calls(&self) -> Vec<NavigationData> {
        guard(&self.after_enter).clone()
    }

    pub fn fail_menu(&self, fail: bool) {
        self.fail_menu.store(fail, Ordering::SeqCst);
    }
}

impl GlobalBehavior for SimGlobal {
    fn init_once(&self) -> Result<()> {
        self.init_once_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn after_enter(&self, navigation: &NavigationData) -> Result<()> {
        guard(&self.after_enter).push(navigation.clone());
        Ok(())
    }

    fn close_menu(&self, options: CloseMenuOptions) -> Result<()> {
        guard(&self.menu_closes).push(options);
        if self.fail_menu.load(Ordering::SeqCst) {
            return Err(anyhow!("menu timeline is locked"));
        }
        Ok(())
    }
}

pub struct SimFetcher {
    latency: Duration,
    fetched: Mutex<Vec<(ResourceKind, String)>>,
    failing: Mutex<HashSet<String>>,
}

impl SimFetcher {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fetched: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_url(&self, url: impl Into<String>) {
        guard(&self.failing).insert(url.into());
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        guard(&self.fetched)
            .iter()
            .filter(|(_, fetched)| fetched == url)
            .count()
    }

    pub fn total_fetches(&self) -> usize {
        guard(&self.fetched).len()
    }
}

#[async_trait]
impl ResourceFetcher for SimFetcher {
    async fn fetch(&self, kind: ResourceKind, url: &str) -> Result<()> {
        guard(&self.fetched).push((kind, url.to_string()));
        tokio::time::sleep(self.latency).await;
        if guard(&self.failing).contains(url) {
            return Err(anyhow!("network error loading {url}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseMark {
    pub navigation: u64,
    pub phase: TransitionPhase,
    pub started: Instant,
    pub finished: Instant,
    pub timed_out: bool,
}

/// Drives registered hooks the way the page-transition router does: one navigation at a
/// time, leave, swap containers, then enter, each phase bounded by the router timeout.
pub struct SimRouter {
    document: Arc<SimDocument>,
    wrapper: ElementId,
    registered: Mutex<Vec<(Arc<dyn TransitionHooks>, RouterOptions)>>,
    current: Mutex<Option<PageRef>>,
    navigation_lock: tokio::sync::Mutex<()>,
    navigations: AtomicU64,
    marks: Mutex<Vec<PhaseMark>>,
}

impl SimRouter {
    pub fn new(document: Arc<SimDocument>, wrapper: ElementId) -> Self {
        Self {
            document,
            wrapper,
            registered: Mutex::new(Vec::new()),
            current: Mutex::new(None),
            navigation_lock: tokio::sync::Mutex::new(()),
            navigations: AtomicU64::new(0),
            marks: Mutex::new(Vec::new()),
        }
    }

    pub fn registrations(&self) -> usize {
        guard(&self.registered).len()
    }

    pub fn options(&self) -> Option<RouterOptions> {
        guard(&self.registered).first().map(|(_, options)| options.clone())
    }

    pub fn current(&self) -> Option<PageRef> {
        guard(&self.current).clone()
    }

    pub fn marks(&self) -> Vec<PhaseMark> {
        guard(&self.marks).clone()
    }

    pub fn create_container(&self, namespace: &str) -> ElementId {
        let namespace_attr = format!("[data-barba-namespace=\"{namespace}\"]");
        let container = self.document.insert(
            Some(self.wrapper),
            &[CONTAINER_SELECTOR, namespace_attr.as_str()],
            DEFAULT_PAGE_HEIGHT,
        );
        self.document
            .insert(Some(container), &[SECTION_SELECTOR], DEFAULT_PAGE_HEIGHT / 2.0);
        container
    }

    fn hooks(&self) -> Result<(Arc<dyn TransitionHooks>, RouterOptions)> {
        guard(&self.registered)
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("no transition registered with the router"))
    }

    async fn run_phase<F>(&self, navigation: u64, phase: TransitionPhase, timeout: Duration, fut: F)
    where
        F: std::future::Future<Output = ()>,
    {
        let started = Instant::now();
        let timed_out = tokio::time::timeout(timeout, fut).await.is_err();
        if timed_out {
            warn!(navigation, %phase, "sim router: phase timed out");
        }
        guard(&self.marks).push(PhaseMark {
            navigation,
            phase,
            started,
            finished: Instant::now(),
            timed_out,
        });
    }

    pub async fn boot(&self, namespace: &str) -> Result<NavigationData> {
        let (hooks, options) = self.hooks()?;
        let _navigation = self.navigation_lock.lock().await;
        let id = self.navigations.fetch_add(1, Ordering::SeqCst);

        let existing = self.document.query(CONTAINER_SELECTOR);
        let container = existing.unwrap_or_else(|| self.create_container(namespace));
        let next = PageRef::new(container, namespace);
        *guard(&self.current) = Some(next.clone());
        let data = NavigationData::first_load(next);

        self.run_phase(id, TransitionPhase::Once, options.timeout, hooks.once(&data))
            .await;
        self.run_phase(id, TransitionPhase::After, options.timeout, hooks.after(&data))
            .await;
        Ok(data)
    }

    pub async fn navigate(&self, namespace: &str) -> Result<NavigationData> {
        let (hooks, options) = self.hooks()?;
        let _navigation = self.navigation_lock.lock().await;
        let id = self.navigations.fetch_add(1, Ordering::SeqCst);

        let current = self
            .current()
            .ok_or_else(|| anyhow!("router has not booted a page yet"))?;
        let placeholder = NavigationData::between(current.clone(), current.clone());
        self.run_phase(id, TransitionPhase::Leave, options.timeout, hooks.leave(&placeholder))
            .await;

        let container = self.create_container(namespace);
        self.document.remove(current.container);
        let next = PageRef::new(container, namespace);
        *guard(&self.current) = Some(next.clone());
        let data = NavigationData::between(current, next);

        self.run_phase(
            id,
            TransitionPhase::BeforeEnter,
            options.timeout,
            hooks.before_enter(&data),
        )
        .await;
        self.run_phase(id, TransitionPhase::Enter, options.timeout, hooks.enter(&data))
            .await;
        self.run_phase(id, TransitionPhase::After, options.timeout, hooks.after(&data))
            .await;
        Ok(data)
    }
}

impl Router for SimRouter {
    fn register(&self, hooks: Arc<dyn TransitionHooks>, options: RouterOptions) -> Result<()> {
        guard(&self.registered).push((hooks, options));
        Ok(())
    }
}

pub struct SimulatedSite {
    pub document: Arc<SimDocument>,
    pub animator: Arc<SimAnimator>,
    pub interactions: Arc<SimInteractions>,
    pub triggers: Arc<SimTriggers>,
    pub global: Arc<SimGlobal>,
    pub fetcher: Arc<SimFetcher>,
    pub router: Arc<SimRouter>,
    pub wrapper: ElementId,
    pub overlay: ElementId,
    pub columns: Vec<ElementId>,
    pub logo: ElementId,
    pub fade: ElementId,
    pub nav: ElementId,
}

impl SimulatedSite {
    pub fn build() -> Self {
        let document = Arc::new(SimDocument::new());
        let nav = document.insert(None, &[".nav"], 80.0);
        let logo = document.insert(Some(nav), &[LOGO_SELECTOR], 40.0);
        let overlay = document.insert(None, &[OVERLAY_SELECTOR], 900.0);
        document.set_inline_style(overlay, StyleProperty::Display, "flex");
        let columns = (0..4)
            .map(|_| document.insert(Some(overlay), &[COLUMN_SELECTOR], 900.0))
            .collect::<Vec<_>>();
        let wrapper = document.insert(None, &[WRAPPER_SELECTOR], DEFAULT_PAGE_HEIGHT);
        let fade = document.insert(Some(wrapper), &[FADE_SELECTOR], DEFAULT_PAGE_HEIGHT);

        Self {
            animator: Arc::new(SimAnimator::new(Arc::clone(&document))),
            interactions: Arc::new(SimInteractions::default()),
            triggers: Arc::new(SimTriggers::default()),
            global: Arc::new(SimGlobal::default()),
            fetcher: Arc::new(SimFetcher::new(Duration::from_millis(40))),
            router: Arc::new(SimRouter::new(Arc::clone(&document), wrapper)),
            document,
            wrapper,
            overlay,
            columns,
            logo,
            fade,
            nav,
        }
    }

    pub fn bindings(&self) -> HostBindings {
        HostBindings {
            router: Some(self.router.clone()),
            document: self.document.clone(),
            animator: Some(self.animator.clone()),
            interactions: Some(self.interactions.clone()),
            triggers: Some(self.triggers.clone()),
            global: Some(self.global.clone()),
            fetcher: self.fetcher.clone(),
            frames: Arc::new(IntervalFrameClock::default()),
        }
    }

    pub fn bindings_without_animator(&self) -> HostBindings {
        HostBindings {
            animator: None,
            ..self.bindings()
        }
    }

    pub fn overlay_covering(&self) -> bool {
        self.document.is_covering(self.overlay)
    }
}
