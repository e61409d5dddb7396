use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use host_integration::{CloseMenuOptions, StyleProperty, TransitionHooks};
use shared::{
    domain::{ElementId, NavigationData, Namespace, PageRef, TransitionPhase},
    error::{FaultKind, FaultReport},
    protocol::TransitionEvent,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    error::MountError,
    interactions::{InteractionThrottle, Reinit},
    overlay::{self, cover_timeline, reveal_timeline, Overlay, FIRST_LOAD_CLASS, LOGO_ANIMATED_FLAG},
    ready_gate::ReadyOutcome,
    registry::MountOutcome,
    viewport, AppSession,
};

type MountTask = JoinHandle<Result<MountOutcome, MountError>>;

pub struct TransitionOrchestrator {
    session: Arc<AppSession>,
    overlay: Overlay,
    interactions: InteractionThrottle,
    mid_enter_fired: Arc<AtomicBool>,
}

impl TransitionOrchestrator {
    pub(crate) fn new(session: Arc<AppSession>) -> Self {
        let host = session.host();
        let overlay = Overlay::new(
            Arc::clone(&host.document),
            Arc::clone(&host.frames),
            Arc::clone(session.settings_arc()),
        );
        let interactions = InteractionThrottle::new(host.interactions.clone());
        Self {
            session,
            overlay,
            interactions,
            mid_enter_fired: Arc::new(AtomicBool::new(false)),
        }
    }

    fn step(&self, phase: TransitionPhase, what: &str) {
        if self.session.settings().debug {
            debug!(%phase, "transition: {what}");
        }
    }

    fn degraded(&self, phase: TransitionPhase, what: &str, err: impl Display) {
        warn!(%phase, %err, "transition: {what} failed");
        self.session.publish(TransitionEvent::Fault(
            FaultReport::new(FaultKind::Degraded, format!("{what}: {err}")).in_phase(phase),
        ));
    }

    fn close_menu(&self, phase: TransitionPhase) {
        let Some(global) = &self.session.host().global else {
            return;
        };
        let options = CloseMenuOptions {
            immediate: false,
            force_after: Duration::from_millis(self.session.settings().timing.menu_close_grace_ms),
        };
        if let Err(err) = global.close_menu(options) {
            self.degraded(phase, "menu close", err);
        }
    }

    fn reinit_interactions(&self, phase: TransitionPhase) {
        match self.interactions.reinitialize() {
            Reinit::Ran => self.step(phase, "interactions reinitialized"),
            Reinit::Throttled | Reinit::Unavailable => {}
            Reinit::Failed(err) => self.degraded(phase, "interaction reinit", err),
        }
    }

    fn spawn_mount(&self, page: &PageRef, data: &NavigationData) -> MountTask {
        let session = Arc::clone(&self.session);
        let namespace = page.namespace.clone();
        let container = page.container;
        let navigation = data.clone();
        self.session.scheduler().spawn("controller-mount", async move {
            session
                .registry()
                .mount(&namespace, container, Some(navigation))
                .await
        })
    }

    async fn settle_mount(&self, phase: TransitionPhase, namespace: &Namespace, task: MountTask) {
        match task.await {
            Ok(Ok(MountOutcome::Mounted)) => self.step(phase, "controller mounted"),
            Ok(Ok(MountOutcome::Skipped | MountOutcome::Faulted)) => {}
            Ok(Err(err)) => {
                warn!(%phase, %namespace, %err, "transition: controller mount failed");
                let kind = match &err {
                    MountError::Load(_) => FaultKind::ResourceLoad,
                    MountError::ControllerUrl { .. } => FaultKind::ControllerFault,
                };
                self.session.publish(TransitionEvent::Fault(
                    FaultReport::new(kind, err.to_string())
                        .in_phase(phase)
                        .for_namespace(namespace.clone()),
                ));
            }
            Err(err) if err.is_cancelled() => {
                debug!(%phase, %namespace, "transition: controller mount cancelled");
            }
            Err(err) => {
                warn!(%phase, %namespace, %err, "transition: controller mount task panicked");
            }
        }
    }

    async fn await_readiness(&self, phase: TransitionPhase) {
        let settings = self.session.settings();
        let outcome = self
            .session
            .gate()
            .wait_with_timeout(settings.ready_timeout())
            .await;
        match outcome {
            ReadyOutcome::Signaled => self.step(phase, "page signaled ready"),
            ReadyOutcome::TimedOut => {
                debug!(%phase, token = self.session.gate().token().0, "transition: ready wait timed out");
            }
        }
        if !settings.reveal_delay().is_zero() {
            tokio::time::sleep(settings.reveal_delay()).await;
        }
    }

    fn fire_mid_enter(&self) {
        if self.mid_enter_fired.swap(true, Ordering::SeqCst) {
            return;
        }
        self.session.publish(TransitionEvent::MidEnter);

        let document = Arc::clone(&self.session.host().document);
        self.session.scheduler().schedule_after(
            "resize-dispatch",
            Duration::from_millis(self.session.settings().timing.resize_dispatch_delay_ms),
            async move { document.dispatch_resize() },
        );
    }

    async fn animate_leave(&self, phase: TransitionPhase) {
        let Some(animator) = self.session.host().animator.clone() else {
            return;
        };
        let columns = self.overlay.columns();
        if self.overlay.element().is_none() || columns.is_empty() {
            return;
        }

        self.overlay.ensure_visible();
        self.session.lock_scroll();
        if let Err(err) = animator.play(cover_timeline(&columns)).await {
            self.degraded(phase, "cover animation", err);
        }
    }

    async fn animate_enter(&self, phase: TransitionPhase, container: ElementId) {
        self.session.publish(TransitionEvent::RevealStarted);

        let Some(animator) = self.session.host().animator.clone() else {
            return;
        };
        let columns = self.overlay.columns();
        if self.overlay.element().is_none() || columns.is_empty() {
            return;
        }

        self.session.lock_scroll();
        self.overlay.ensure_visible();
        self.overlay.prepare_incoming(container);

        let play = animator.play(reveal_timeline(container, &columns));
        tokio::pin!(play);
        let cue = tokio::time::sleep(Duration::from_millis(
            self.session.settings().timing.mid_enter_cue_ms,
        ));
        tokio::pin!(cue);

        let finished_before_cue = tokio::select! {
            result = &mut play => Some(result),
            () = &mut cue => None,
        };
        let result = match finished_before_cue {
            Some(result) => result,
            None => {
                self.fire_mid_enter();
                play.await
            }
        };
        self.fire_mid_enter();
        if let Err(err) = result {
            self.degraded(phase, "reveal animation", err);
        }

        self.overlay.force_container_visible(container);
        if !self.overlay.wait_until_visible(container).await {
            warn!(%phase, ?container, "transition: container not visible after reveal");
        }
    }

    async fn first_load(&self, data: &NavigationData) {
        let phase = TransitionPhase::Once;
        self.step(phase, "first load");
        let session = &self.session;
        let document = session.document();

        if let Some(global) = &session.host().global {
            if let Err(err) = global.init_once() {
                self.degraded(phase, "global init", err);
            }
        }

        self.mid_enter_fired.store(false, Ordering::SeqCst);
        let _ = session.gate().create();

        self.overlay.ensure_visible();
        session.lock_scroll();

        if document.session_flag(LOGO_ANIMATED_FLAG) {
            document.remove_body_class(FIRST_LOAD_CLASS);
        }
        let animator = session.host().animator.clone();
        if let Err(err) = self.overlay.logo_intro(animator.as_deref()).await {
            self.degraded(phase, "logo intro", err);
        }

        let mount = self.spawn_mount(&data.next, data);

        overlay::wait_for_paint(session.frames()).await;
        self.reinit_interactions(phase);
        overlay::wait_for_paint(session.frames()).await;

        self.reveal(phase, data, mount).await;
    }

    async fn reveal(&self, phase: TransitionPhase, data: &NavigationData, mount: MountTask) {
        self.session.publish(TransitionEvent::BeforeReveal {
            navigation: data.clone(),
        });

        self.await_readiness(phase).await;
        self.animate_enter(phase, data.next.container).await;

        self.settle_mount(phase, &data.next.namespace, mount).await;
        self.session.publish(TransitionEvent::AfterReveal {
            navigation: data.clone(),
        });

        self.overlay.force_container_visible(data.next.container);
        self.step(phase, "revealed");
    }

    async fn leave_page(&self, data: &NavigationData) {
        let phase = TransitionPhase::Leave;
        self.step(phase, "leave");
        let session = &self.session;
        let document = session.document();

        self.close_menu(phase);
        self.overlay.force_opaque();
        session.lock_scroll();
        document.scroll_to_top();

        if let Some(current) = &data.current {
            session.freeze().freeze(
                document,
                &session.settings().selectors.wrapper,
                Some(current.container),
            );
            if let Some(triggers) = &session.host().triggers {
                viewport::release_triggers_in(document, triggers.as_ref(), current.container);
            }
            session.registry().unmount(&current.namespace);
        }

        self.animate_leave(phase).await;

        if let Some(outgoing) = data.current_container() {
            self.overlay.hide_container(outgoing);
        }

        let offset = session.settings().transition_offset();
        if !offset.is_zero() {
            tokio::time::sleep(offset).await;
        }
    }

    async fn prepare_enter(&self) {
        let phase = TransitionPhase::BeforeEnter;
        self.step(phase, "before enter");
        self.close_menu(phase);
        self.mid_enter_fired.store(false, Ordering::SeqCst);
        let wait = self.session.gate().create();
        debug!(token = wait.token().0, "transition: readiness gate created");
        self.reinit_interactions(phase);
    }

    async fn enter_page(&self, data: &NavigationData) {
        let phase = TransitionPhase::Enter;
        self.step(phase, "enter");
        let mount = self.spawn_mount(&data.next, data);
        overlay::wait_for_paint(self.session.frames()).await;
        self.reveal(phase, data, mount).await;
    }

    async fn finalize(&self, data: &NavigationData) {
        let phase = TransitionPhase::After;
        self.step(phase, "after");
        let session = &self.session;
        let document = session.document();

        if let Some(live) = document.query(&session.settings().selectors.container) {
            self.overlay.force_container_visible(live);
            if document.inline_style(live, StyleProperty::Display).is_empty() {
                document.set_inline_style(live, StyleProperty::Display, "block");
            }
        }

        overlay::wait_for_paint(session.frames()).await;
        self.overlay.hide(session.scheduler());
        overlay::wait_for_paint(session.frames()).await;
        overlay::wait_for_paint(session.frames()).await;

        let epoch = session.scroll().epoch();
        let unlock_session = Arc::clone(session);
        session.scheduler().schedule_after(
            "scroll-unlock",
            Duration::from_millis(session.settings().timing.scroll_unlock_delay_ms),
            async move {
                unlock_session
                    .scroll()
                    .unlock_from(unlock_session.document(), epoch);
            },
        );

        if let Some(triggers) = &session.host().triggers {
            if let Err(err) = triggers.refresh() {
                self.degraded(phase, "viewport trigger refresh", err);
            }
        }
        if let Some(global) = &session.host().global {
            if let Err(err) = global.after_enter(data) {
                self.degraded(phase, "global after-enter", err);
            }
        }

        session.freeze().release(document);
        self.step(phase, "transition complete");
    }
}

#[async_trait]
impl TransitionHooks for TransitionOrchestrator {
    async fn once(&self, data: &NavigationData) {
        self.first_load(data).await;
    }

    async fn leave(&self, data: &NavigationData) {
        self.leave_page(data).await;
    }

    async fn before_enter(&self, _data: &NavigationData) {
        self.prepare_enter().await;
    }

    async fn enter(&self, data: &NavigationData) {
        self.enter_page(data).await;
    }

    async fn after(&self, data: &NavigationData) {
        self.finalize(data).await;
    }
}
