//! Наблюдатель запросов timed-text в контексте страницы
//!
//! Собственные запросы плеера к субтитрам несут POT токен. URL запоминается
//! по идентификатору видео, чтобы загрузчик мог переиспользовать токен.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use url::Url;

#[derive(Default)]
struct ObserverState {
    cache: HashMap<String, String>,
    waiters: HashMap<String, Vec<oneshot::Sender<String>>>,
}

/// Instance-scoped cache of observed timed-text URLs with pending waiters
#[derive(Clone, Default)]
pub struct TimedtextObserver {
    state: Arc<Mutex<ObserverState>>,
}

impl TimedtextObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed request URL; only timed-text URLs carrying both
    /// `v` and `pot` are kept
    pub fn observe(&self, raw_url: &str) {
        if !raw_url.contains("api/timedtext") {
            return;
        }
        let Ok(url) = Url::parse(raw_url) else {
            return;
        };

        let param = |key: &str| {
            url.query_pairs()
                .find(|(k, v)| k == key && !v.is_empty())
                .map(|(_, v)| v.into_owned())
        };
        let (Some(video_id), Some(_pot)) = (param("v"), param("pot")) else {
            return;
        };

        debug!("Observed timedtext url for {}", video_id);
        let waiters = {
            let mut state = self.state.lock();
            state.cache.insert(video_id.clone(), raw_url.to_string());
            state.waiters.remove(&video_id).unwrap_or_default()
        };
        for waiter in waiters {
            let _ = waiter.send(raw_url.to_string());
        }
    }

    pub fn cached_url(&self, video_id: &str) -> Option<String> {
        self.state.lock().cache.get(video_id).cloned()
    }

    /// Wait until a URL for `video_id` is observed; on timeout return
    /// whatever is cached
    pub async fn wait_for_url(&self, video_id: &str, timeout: Duration) -> Option<String> {
        let rx = {
            let mut state = self.state.lock();
            if let Some(url) = state.cache.get(video_id) {
                return Some(url.clone());
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.entry(video_id.to_string()).or_default().push(tx);
            rx
        };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(url)) => Some(url),
            _ => {
                let mut state = self.state.lock();
                if let Some(waiters) = state.waiters.get_mut(video_id) {
                    waiters.retain(|tx| !tx.is_closed());
                    if waiters.is_empty() {
                        state.waiters.remove(video_id);
                    }
                }
                state.cache.get(video_id).cloned()
            }
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.cache.clear();
        state.waiters.clear();
    }

    #[cfg(test)]
    fn waiter_count(&self, video_id: &str) -> usize {
        self.state.lock().waiters.get(video_id).map_or(0, Vec::len)
    }
}
