use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use host_integration::{
    Animator, Document, Ease, FrameClock, StaggerFrom, StyleProperty, Timeline, Tween, TweenProp,
};
use shared::domain::ElementId;
use tokio::time::Instant;
use tracing::debug;

use crate::{config::Settings, scheduler::TaskScheduler};

pub const LOGO_ANIMATED_FLAG: &str = "logoAnimated";
pub const FIRST_LOAD_CLASS: &str = "first-load";

const COVER_DURATION: Duration = Duration::from_millis(800);
const COVER_STAGGER: Duration = Duration::from_millis(150);
const REVEAL_FADE_AT: Duration = Duration::from_millis(100);
const REVEAL_FADE_DURATION: Duration = Duration::from_millis(200);
const REVEAL_COLUMNS_DURATION: Duration = Duration::from_millis(1250);
const REVEAL_STAGGER: Duration = Duration::from_millis(200);

pub async fn wait_for_paint(frames: &dyn FrameClock) {
    frames.next_frame().await;
    frames.next_frame().await;
}

pub fn cover_timeline(columns: &[ElementId]) -> Timeline {
    Timeline::new("cover").with(
        Tween::from_to(
            columns.to_vec(),
            vec![TweenProp::TranslateYVh(100.0)],
            vec![TweenProp::TranslateYVh(0.0)],
            COVER_DURATION,
        )
        .ease(Ease::Power4InOut)
        .stagger(COVER_STAGGER, StaggerFrom::Random),
    )
}

pub fn reveal_timeline(container: ElementId, columns: &[ElementId]) -> Timeline {
    Timeline::new("reveal")
        .with(
            Tween::from_to(
                vec![container],
                vec![TweenProp::Opacity(0.0)],
                vec![TweenProp::Opacity(1.0)],
                REVEAL_FADE_DURATION,
            )
            .at(REVEAL_FADE_AT),
        )
        .with(
            Tween::to(
                columns.to_vec(),
                vec![TweenProp::TranslateYVh(-100.0)],
                REVEAL_COLUMNS_DURATION,
            )
            .ease(Ease::Power4InOut)
            .at(REVEAL_FADE_AT)
            .stagger(REVEAL_STAGGER, StaggerFrom::Random),
        )
}

pub struct Overlay {
    document: Arc<dyn Document>,
    frames: Arc<dyn FrameClock>,
    settings: Arc<Settings>,
    /// Bumped by every `ensure_visible`; a pending removal from an older `hide` is dropped.
    shown: Arc<AtomicU64>,
}

impl Overlay {
    pub fn new(document: Arc<dyn Document>, frames: Arc<dyn FrameClock>, settings: Arc<Settings>) -> Self {
        Self {
            document,
            frames,
            settings,
            shown: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn element(&self) -> Option<ElementId> {
        self.document.query(&self.settings.selectors.transition_wrap)
    }

    pub fn columns(&self) -> Vec<ElementId> {
        self.document
            .query_all(&self.settings.selectors.transition_column)
    }

    fn fade_transition(&self) -> String {
        format!("opacity {}ms linear", self.settings.timing.overlay_fade_ms)
    }

    pub fn ensure_visible(&self) -> bool {
        let Some(overlay) = self.element() else {
            return false;
        };
        self.shown.fetch_add(1, Ordering::SeqCst);
        let doc = self.document.as_ref();
        doc.set_inline_style(overlay, StyleProperty::Display, "flex");
        doc.set_inline_style(overlay, StyleProperty::Transition, &self.fade_transition());
        doc.set_inline_style(overlay, StyleProperty::Opacity, "1");
        true
    }

    pub fn force_opaque(&self) -> bool {
        if !self.ensure_visible() {
            return false;
        }
        if let Some(overlay) = self.element() {
            self.document
                .set_inline_style(overlay, StyleProperty::Visibility, "visible");
        }
        true
    }

    pub fn hide(&self, scheduler: &TaskScheduler) {
        let Some(overlay) = self.element() else {
            return;
        };
        self.document
            .set_inline_style(overlay, StyleProperty::Transition, &self.fade_transition());
        self.document
            .set_inline_style(overlay, StyleProperty::Opacity, "0");

        let document = Arc::clone(&self.document);
        let shown = Arc::clone(&self.shown);
        let hidden_at = shown.load(Ordering::SeqCst);
        scheduler.schedule_after(
            "overlay-remove",
            Duration::from_millis(self.settings.timing.overlay_remove_ms),
            async move {
                if shown.load(Ordering::SeqCst) != hidden_at {
                    debug!("overlay: shown again before removal, keeping it");
                    return;
                }
                document.set_inline_style(overlay, StyleProperty::Display, "none");
                document.set_inline_style(overlay, StyleProperty::Opacity, "1");
            },
        );
    }

    pub fn prepare_incoming(&self, container: ElementId) {
        let doc = self.document.as_ref();
        doc.set_inline_style(container, StyleProperty::Opacity, "0");
        doc.set_inline_style(container, StyleProperty::Visibility, "visible");
        if let Some(fade) = doc.query(&self.settings.selectors.fade_contain) {
            doc.set_inline_style(fade, StyleProperty::Opacity, "1");
        }
    }

    pub fn force_container_visible(&self, container: ElementId) {
        self.document
            .set_inline_style(container, StyleProperty::Opacity, "1");
        self.document
            .set_inline_style(container, StyleProperty::Visibility, "visible");
    }

    pub fn hide_container(&self, container: ElementId) {
        self.document
            .set_inline_style(container, StyleProperty::Opacity, "0");
        self.document
            .set_inline_style(container, StyleProperty::Visibility, "hidden");
    }

    pub fn is_measurably_visible(&self, container: ElementId) -> bool {
        let doc = self.document.as_ref();
        if doc.inline_style(container, StyleProperty::Display) == "none" {
            return false;
        }
        if doc.inline_style(container, StyleProperty::Visibility) == "hidden" {
            return false;
        }
        let opacity = doc
            .inline_style(container, StyleProperty::Opacity)
            .parse::<f32>()
            .unwrap_or(1.0);
        if opacity <= 0.01 {
            return false;
        }
        doc.rendered_height(container).unwrap_or(0.0) >= 2.0
    }

    pub async fn wait_until_visible(&self, container: ElementId) -> bool {
        let limit = Duration::from_millis(self.settings.timing.visibility_wait_ms);
        let started = Instant::now();
        loop {
            if self.is_measurably_visible(container) {
                return true;
            }
            if started.elapsed() > limit {
                debug!(?container, "overlay: container still not visible, giving up");
                return false;
            }
            self.frames.next_frame().await;
        }
    }

    pub async fn logo_intro(&self, animator: Option<&dyn Animator>) -> anyhow::Result<()> {
        let doc = self.document.as_ref();
        let (Some(logo), Some(animator)) = (doc.query(&self.settings.selectors.logo_wrap), animator)
        else {
            return Ok(());
        };

        doc.set_inline_style(logo, StyleProperty::Opacity, "1");
        doc.set_inline_style(logo, StyleProperty::Visibility, "visible");

        if doc.session_flag(LOGO_ANIMATED_FLAG) {
            doc.remove_body_class(FIRST_LOAD_CLASS);
            return Ok(());
        }

        let played = animator.play_intro(logo).await;
        doc.remove_body_class(FIRST_LOAD_CLASS);
        played?;
        doc.set_session_flag(LOGO_ANIMATED_FLAG);
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/overlay_tests.rs"]
mod tests;
