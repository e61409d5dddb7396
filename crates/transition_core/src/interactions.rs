use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use host_integration::InteractionRuntime;
use tracing::debug;

#[derive(Debug)]
pub enum Reinit {
    Unavailable,
    Throttled,
    Ran,
    Failed(anyhow::Error),
}

pub struct InteractionThrottle {
    runtime: Option<Arc<dyn InteractionRuntime>>,
    locked: Arc<AtomicBool>,
}

impl InteractionThrottle {
    pub fn new(runtime: Option<Arc<dyn InteractionRuntime>>) -> Self {
        Self {
            runtime,
            locked: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn reinitialize(&self) -> Reinit {
        let Some(runtime) = &self.runtime else {
            return Reinit::Unavailable;
        };
        if self.locked.swap(true, Ordering::SeqCst) {
            debug!("interactions: reinit already ran this tick");
            return Reinit::Throttled;
        }
        let locked = Arc::clone(&self.locked);
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            locked.store(false, Ordering::SeqCst);
        });

        match runtime.reinitialize() {
            Ok(()) => Reinit::Ran,
            Err(err) => Reinit::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use host_integration::sim::SimInteractions;

    use crate::scheduler::TaskScheduler;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn second_request_in_the_same_tick_is_dropped() {
        let runtime = Arc::new(SimInteractions::default());
        let throttle = InteractionThrottle::new(Some(runtime.clone()));

        assert!(matches!(throttle.reinitialize(), Reinit::Ran));
        assert!(matches!(throttle.reinitialize(), Reinit::Throttled));
        assert_eq!(runtime.reinitializations(), 1);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(matches!(throttle.reinitialize(), Reinit::Ran));
        assert_eq!(runtime.reinitializations(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_reopens_after_the_session_scheduler_is_shut_down() {
        let runtime = Arc::new(SimInteractions::default());
        let throttle = InteractionThrottle::new(Some(runtime.clone()));
        let scheduler = TaskScheduler::new();
        scheduler.shutdown();

        assert!(matches!(throttle.reinitialize(), Reinit::Ran));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(matches!(throttle.reinitialize(), Reinit::Ran));
        assert_eq!(runtime.reinitializations(), 2);
    }

    #[tokio::test]
    async fn failure_is_reported_and_missing_runtime_is_skipped() {
        let runtime = Arc::new(SimInteractions::default());
        runtime.fail_next(true);

        let throttle = InteractionThrottle::new(Some(runtime.clone()));
        assert!(matches!(throttle.reinitialize(), Reinit::Failed(_)));

        let absent = InteractionThrottle::new(None);
        assert!(matches!(absent.reinitialize(), Reinit::Unavailable));
    }
}
