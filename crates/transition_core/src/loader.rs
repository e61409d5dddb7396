use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use host_integration::{ResourceFetcher, ResourceKind};
use tracing::{debug, warn};

use crate::error::LoadError;

type SharedLoad = Shared<BoxFuture<'static, Result<(), LoadError>>>;

pub struct ResourceLoader {
    fetcher: Arc<dyn ResourceFetcher>,
    scripts: Mutex<HashMap<String, SharedLoad>>,
    stylesheets: Mutex<HashMap<String, SharedLoad>>,
}

impl ResourceLoader {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            fetcher,
            scripts: Mutex::new(HashMap::new()),
            stylesheets: Mutex::new(HashMap::new()),
        }
    }

    fn requested(&self, kind: ResourceKind) -> MutexGuard<'_, HashMap<String, SharedLoad>> {
        let set = match kind {
            ResourceKind::Script => &self.scripts,
            ResourceKind::Stylesheet => &self.stylesheets,
        };
        set.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn load_script_once(&self, url: &str) -> Result<(), LoadError> {
        self.load_once(ResourceKind::Script, url).await
    }

    pub async fn load_css_once(&self, url: &str) -> Result<(), LoadError> {
        self.load_once(ResourceKind::Stylesheet, url).await
    }

    pub fn is_requested(&self, kind: ResourceKind, url: &str) -> bool {
        self.requested(kind).contains_key(url)
    }

    pub fn requested_count(&self, kind: ResourceKind) -> usize {
        self.requested(kind).len()
    }

    async fn load_once(&self, kind: ResourceKind, url: &str) -> Result<(), LoadError> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(());
        }

        let load = {
            let mut requested = self.requested(kind);
            if let Some(existing) = requested.get(url) {
                // A settled failure was already reported to the callers that awaited it.
                if let Some(Err(err)) = existing.peek() {
                    debug!(%err, "loader: already requested, not fetching again");
                    return Ok(());
                }
                existing.clone()
            } else {
                debug!(?kind, url, "loader: fetching");
                let fetcher = Arc::clone(&self.fetcher);
                let owned = url.to_string();
                let load = async move {
                    fetcher.fetch(kind, &owned).await.map_err(|err| LoadError {
                        kind,
                        url: owned.clone(),
                        reason: err.to_string(),
                    })
                }
                .boxed()
                .shared();
                requested.insert(url.to_string(), load.clone());
                load
            }
        };

        let result = load.await;
        if let Err(err) = &result {
            warn!(%err, "loader: resource failed to load");
        }
        result
    }
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
