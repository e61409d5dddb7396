use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

#[derive(Default)]
pub struct TaskScheduler {
    tasks: Mutex<Vec<(&'static str, AbortHandle)>>,
    closed: AtomicBool,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<(&'static str, AbortHandle)>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn spawn<F>(&self, name: &'static str, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = tokio::spawn(task);
        if self.closed.load(Ordering::SeqCst) {
            debug!(task = name, "scheduler: closed, aborting new task");
            handle.abort();
            return handle;
        }
        let mut tasks = self.tasks();
        tasks.retain(|(_, task)| !task.is_finished());
        tasks.push((name, handle.abort_handle()));
        handle
    }

    pub fn schedule_after<F>(&self, name: &'static str, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn(name, async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
    }

    pub fn pending(&self) -> usize {
        self.tasks()
            .iter()
            .filter(|(_, task)| !task.is_finished())
            .count()
    }

    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let tasks = std::mem::take(&mut *self.tasks());
        for (name, task) in tasks {
            if !task.is_finished() {
                debug!(task = name, "scheduler: cancelling pending task");
                task.abort();
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
