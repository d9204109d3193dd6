//! Build status poller.
//!
//! One polling task per open log viewer: an immediate fetch on open,
//! then one fetch every [`POLL_INTERVAL`]. Each response *replaces* the
//! held log text (the server is the source of truth for the full log),
//! guarded by a sequence number so a slow response can never clobber a
//! newer one. Closing the viewer cancels the task unconditionally; no
//! orphaned timer survives, however many times a viewer is opened and
//! closed. Polling deliberately does not stop when the theme reaches a
//! terminal status, so late log flushes still arrive.

use crate::registry::ThemeRegistry;
use crate::render::{render_log, LogLine};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Fixed poll cadence of the log viewer.
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Viewer lifecycle: `Idle` until the polling task is spawned, then
/// `Polling` until the viewer is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Idle,
    Polling,
    Closed,
}

#[derive(Debug, Default)]
struct ViewerInner {
    /// Sequence number of the last applied snapshot.
    last_seq: u64,
    text: String,
}

#[derive(Debug)]
struct ViewerShared {
    inner: Mutex<ViewerInner>,
    state: Mutex<ViewerState>,
}

impl Default for ViewerShared {
    fn default() -> Self {
        Self {
            inner: Mutex::new(ViewerInner::default()),
            state: Mutex::new(ViewerState::Idle),
        }
    }
}

impl ViewerShared {
    fn state(&self) -> ViewerState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: ViewerState) {
        *self.state.lock().unwrap() = state;
    }

    /// Apply a snapshot unless it is stale or the viewer is closed.
    fn apply(&self, seq: u64, text: String) {
        if self.state() == ViewerState::Closed {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        if seq >= inner.last_seq {
            inner.last_seq = seq;
            inner.text = text;
        }
    }
}

/// An open log viewer for one theme slug.
pub struct LogViewer {
    slug: String,
    shared: Arc<ViewerShared>,
    task: tokio::task::JoinHandle<()>,
}

impl LogViewer {
    /// Open a viewer: immediate fetch, then a fetch every 2 s.
    pub fn open(registry: ThemeRegistry, slug: impl Into<String>) -> Self {
        Self::open_with_interval(registry, slug, POLL_INTERVAL)
    }

    /// Same as [`open`](Self::open) with an injectable cadence (tests).
    pub fn open_with_interval(
        registry: ThemeRegistry,
        slug: impl Into<String>,
        period: Duration,
    ) -> Self {
        let slug = slug.into();
        let shared = Arc::new(ViewerShared::default());
        let task = tokio::spawn(poll_loop(registry, slug.clone(), shared.clone(), period));
        shared.set_state(ViewerState::Polling);
        Self { slug, shared, task }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn state(&self) -> ViewerState {
        self.shared.state()
    }

    /// The latest log snapshot, verbatim.
    pub fn snapshot(&self) -> String {
        self.shared.inner.lock().unwrap().text.clone()
    }

    /// The latest snapshot, split into classified lines for display.
    pub fn lines(&self) -> Vec<LogLine> {
        render_log(&self.snapshot())
    }

    /// Stop polling. Idempotent; also run on drop so component teardown
    /// can never leak the interval task.
    pub fn close(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if *state != ViewerState::Closed {
            *state = ViewerState::Closed;
            drop(state);
            self.task.abort();
            tracing::debug!(slug = %self.slug, "log viewer closed");
        }
    }
}

impl Drop for LogViewer {
    fn drop(&mut self) {
        self.close();
    }
}

async fn poll_loop(
    registry: ThemeRegistry,
    slug: String,
    shared: Arc<ViewerShared>,
    period: Duration,
) {
    let seq = AtomicU64::new(0);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick fires immediately.
        interval.tick().await;
        let seq_no = seq.fetch_add(1, Ordering::SeqCst) + 1;

        // Fetch off the timer task: a slow response must not delay the
        // next tick, and the sequence guard discards it if it loses the
        // race against a newer one.
        let registry = registry.clone();
        let slug = slug.clone();
        let shared = shared.clone();
        tokio::spawn(async move {
            match registry.fetch_logs(&slug).await {
                Ok(text) => shared.apply(seq_no, text),
                // A failed tick is absorbed; polling is self-healing.
                Err(e) => tracing::warn!(slug = %slug, "log poll tick failed: {e}"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::render::LineKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn log_server(logs: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/themes/my-theme/logs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "logs": logs })),
            )
            .mount(&server)
            .await;
        server
    }

    fn registry_for(server: &MockServer) -> ThemeRegistry {
        ThemeRegistry::new(ClientConfig::new(server.uri()))
    }

    #[test]
    fn stale_responses_are_discarded() {
        let shared = ViewerShared::default();
        shared.apply(2, "newer snapshot".to_string());
        shared.apply(1, "stale snapshot".to_string());
        assert_eq!(shared.inner.lock().unwrap().text, "newer snapshot");

        // Newer sequence still wins.
        shared.apply(3, "newest".to_string());
        assert_eq!(shared.inner.lock().unwrap().text, "newest");
    }

    #[test]
    fn closed_viewer_ignores_late_responses() {
        let shared = ViewerShared::default();
        shared.set_state(ViewerState::Polling);
        shared.apply(1, "before close".to_string());
        shared.set_state(ViewerState::Closed);
        shared.apply(2, "after close".to_string());
        assert_eq!(shared.inner.lock().unwrap().text, "before close");
    }

    #[tokio::test]
    async fn polls_immediately_and_replaces_snapshot() {
        let server = log_server("[12:00:00] --- Step 1/4: Unzipping files... ---").await;
        let viewer = LogViewer::open_with_interval(
            registry_for(&server),
            "my-theme",
            Duration::from_millis(25),
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(viewer.state(), ViewerState::Polling);
        assert!(viewer.snapshot().contains("Step 1/4"));
        assert_eq!(viewer.lines()[0].kind, LineKind::Step);
        assert!(server.received_requests().await.unwrap().len() >= 2);
        viewer.close();
    }

    #[tokio::test]
    async fn close_stops_the_timer() {
        let server = log_server("line").await;
        let viewer = LogViewer::open_with_interval(
            registry_for(&server),
            "my-theme",
            Duration::from_millis(25),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        viewer.close();
        assert_eq!(viewer.state(), ViewerState::Closed);

        // Let any in-flight fetch drain, then the count must freeze.
        tokio::time::sleep(Duration::from_millis(60)).await;
        let after_close = server.received_requests().await.unwrap().len();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(
            server.received_requests().await.unwrap().len(),
            after_close,
            "requests kept flowing after close"
        );
    }

    #[tokio::test]
    async fn open_close_open_leaks_nothing() {
        let server = log_server("line").await;
        let registry = registry_for(&server);

        let first = LogViewer::open_with_interval(registry.clone(), "my-theme", Duration::from_millis(25));
        tokio::time::sleep(Duration::from_millis(80)).await;
        first.close();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let second =
            LogViewer::open_with_interval(registry, "my-theme", Duration::from_millis(25));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(second.state(), ViewerState::Polling);
        assert!(second.snapshot().contains("line"));
        second.close();
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Both timers are gone: the request count no longer moves.
        let settled = server.received_requests().await.unwrap().len();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), settled);
    }

    #[tokio::test]
    async fn polling_survives_failed_ticks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/themes/my-theme/logs"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let viewer = LogViewer::open_with_interval(
            registry_for(&server),
            "my-theme",
            Duration::from_millis(25),
        );
        tokio::time::sleep(Duration::from_millis(120)).await;

        // Errors are absorbed, the timer keeps ticking.
        assert_eq!(viewer.state(), ViewerState::Polling);
        assert!(server.received_requests().await.unwrap().len() >= 3);
        viewer.close();
    }

    #[tokio::test]
    async fn drop_cancels_polling() {
        let server = log_server("line").await;
        {
            let _viewer = LogViewer::open_with_interval(
                registry_for(&server),
                "my-theme",
                Duration::from_millis(25),
            );
            tokio::time::sleep(Duration::from_millis(80)).await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        let settled = server.received_requests().await.unwrap().len();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), settled);
    }
}
