use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Mutex, MutexGuard, PoisonError,
};

use host_integration::{Document, StyleProperty};
use shared::domain::ElementId;
use tracing::debug;

pub const SCROLL_KEYS: [&str; 10] = [
    " ",
    "Spacebar",
    "PageDown",
    "PageUp",
    "Home",
    "End",
    "ArrowDown",
    "ArrowUp",
    "ArrowLeft",
    "ArrowRight",
];

const MIN_FREEZE_HEIGHT: f64 = 10.0;

struct Frozen {
    wrapper: ElementId,
    previous_min_height: String,
}

#[derive(Default)]
pub struct LayoutFreeze {
    state: Mutex<Option<Frozen>>,
}

impl LayoutFreeze {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Option<Frozen>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_active(&self) -> bool {
        self.state().is_some()
    }

    pub fn freeze(
        &self,
        document: &dyn Document,
        wrapper_selector: &str,
        container: Option<ElementId>,
    ) -> bool {
        let (Some(wrapper), Some(container)) = (document.query(wrapper_selector), container) else {
            return false;
        };
        let Some(height) = document.rendered_height(container) else {
            return false;
        };
        if !height.is_finite() || height < MIN_FREEZE_HEIGHT {
            return false;
        }

        let mut state = self.state();
        if state.is_some() {
            return false;
        }
        let previous_min_height = document.inline_style(wrapper, StyleProperty::MinHeight);
        let pinned = format!("{}px", height.ceil());
        document.set_inline_style(wrapper, StyleProperty::MinHeight, &pinned);
        debug!(%pinned, "layout freeze: wrapper pinned");
        *state = Some(Frozen {
            wrapper,
            previous_min_height,
        });
        true
    }

    pub fn release(&self, document: &dyn Document) {
        let Some(frozen) = self.state().take() else {
            return;
        };
        document.set_inline_style(
            frozen.wrapper,
            StyleProperty::MinHeight,
            &frozen.previous_min_height,
        );
        debug!("layout freeze: released");
    }
}

/// Every `lock` call starts a new epoch, so a delayed unlock scheduled by an earlier
/// navigation can tell it has been superseded.
#[derive(Default)]
pub struct ScrollLock {
    locked: AtomicBool,
    epoch: AtomicU64,
}

impl ScrollLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn lock(&self, document: &dyn Document) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if self.locked.swap(true, Ordering::SeqCst) {
            return;
        }
        document.block_scroll_input(&SCROLL_KEYS);
    }

    pub fn unlock(&self, document: &dyn Document) {
        if !self.locked.swap(false, Ordering::SeqCst) {
            return;
        }
        document.unblock_scroll_input();
    }

    pub fn unlock_from(&self, document: &dyn Document, epoch: u64) -> bool {
        if self.epoch() != epoch {
            debug!(epoch, current = self.epoch(), "scroll lock: stale unlock ignored");
            return false;
        }
        let was_locked = self.is_locked();
        self.unlock(document);
        was_locked
    }
}

#[cfg(test)]
mod tests {
    use host_integration::sim::{SimulatedSite, WRAPPER_SELECTOR};

    use super::*;

    #[test]
    fn freeze_pins_wrapper_and_release_restores_previous_value() {
        let site = SimulatedSite::build();
        let container = site.router.create_container("Home");
        site.document.set_height(container, 1234.2);
        site.document
            .set_inline_style(site.wrapper, StyleProperty::MinHeight, "50vh");

        let freeze = LayoutFreeze::new();
        assert!(freeze.freeze(site.document.as_ref(), WRAPPER_SELECTOR, Some(container)));
        assert_eq!(
            site.document.inline_style(site.wrapper, StyleProperty::MinHeight),
            "1235px"
        );

        site.document.set_height(container, 400.0);
        assert!(!freeze.freeze(site.document.as_ref(), WRAPPER_SELECTOR, Some(container)));
        assert_eq!(
            site.document.inline_style(site.wrapper, StyleProperty::MinHeight),
            "1235px"
        );

        freeze.release(site.document.as_ref());
        freeze.release(site.document.as_ref());
        assert!(!freeze.is_active());
        assert_eq!(
            site.document.inline_style(site.wrapper, StyleProperty::MinHeight),
            "50vh"
        );
    }

    #[test]
    fn collapsed_or_missing_container_is_not_frozen() {
        let site = SimulatedSite::build();
        let container = site.router.create_container("Team");
        site.document.set_height(container, 4.0);

        let freeze = LayoutFreeze::new();
        assert!(!freeze.freeze(site.document.as_ref(), WRAPPER_SELECTOR, Some(container)));
        assert!(!freeze.freeze(site.document.as_ref(), WRAPPER_SELECTOR, None));
        assert!(!freeze.freeze(site.document.as_ref(), ".missing-wrapper", Some(container)));
        assert!(!freeze.is_active());
    }

    #[test]
    fn scroll_lock_blocks_scrolling_keys_until_unlocked() {
        let site = SimulatedSite::build();
        let lock = ScrollLock::new();

        lock.lock(site.document.as_ref());
        lock.lock(site.document.as_ref());
        assert!(lock.is_locked());
        assert!(site.document.scroll_blocked());
        assert!(site.document.blocked_keys().iter().any(|k| k == "PageDown"));
        assert_eq!(site.document.blocked_keys().len(), SCROLL_KEYS.len());

        lock.unlock(site.document.as_ref());
        assert!(!lock.is_locked());
        assert!(!site.document.scroll_blocked());
    }

    #[test]
    fn delayed_unlock_from_an_older_epoch_is_ignored() {
        let site = SimulatedSite::build();
        let lock = ScrollLock::new();

        lock.lock(site.document.as_ref());
        let scheduled_at = lock.epoch();
        lock.lock(site.document.as_ref());

        assert!(!lock.unlock_from(site.document.as_ref(), scheduled_at));
        assert!(site.document.scroll_blocked());
        assert!(lock.unlock_from(site.document.as_ref(), lock.epoch()));
        assert!(!site.document.scroll_blocked());
    }
}
