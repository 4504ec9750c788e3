//! Check queue fed by crawlers and drained by one batch task at a time
//!
//! Items are checked one after another. Failures are recorded on the item
//! and never retried. `stop` and `reset_check_items` cancel running crawls
//! as well as the batch, including a check still waiting on the server.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::check::{CheckItem, CheckItemId, CheckItemState, CheckOptions};
use crate::crawler::Crawler;
use crate::endpoint::{CheckRequest, CheckingEndpoint};
use crate::events::{CheckerEvent, EventBus, Subscription, SubscriptionId};

/// Everything the UI needs from a checker
pub trait Checker: Send + Sync {
    fn subscribe(&self) -> Subscription;

    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Run a crawler in the background and queue what it finds
    fn add_crawler(&self, crawler: Box<dyn Crawler>);

    fn set_check_options(&self, options: CheckOptions);

    /// Start checking pending items; no-op while a batch is running
    fn start(&self);

    /// Stop a running batch and any running crawls
    fn stop(&self);

    /// Forget every queued item and cancel running crawls
    fn reset_check_items(&self);

    fn remove_check_item(&self, id: CheckItemId) -> bool;

    fn select_all(&self);

    /// Snapshot of the queue in insertion order
    fn check_items(&self) -> Vec<CheckItem>;

    fn is_running(&self) -> bool;
}

#[derive(Debug, Default)]
struct Queue {
    items: Vec<CheckItem>,
    next_id: u64,
    options: Option<CheckOptions>,
    running_batch: Option<String>,
    /// Bumped by `start`, `stop` and `reset`; a batch task exits once it
    /// sees a generation other than its own.
    generation: u64,
    active_crawls: usize,
    /// Shared with every crawl started since the last cancel
    crawl_cancel: Arc<AtomicBool>,
}

impl Queue {
    fn contains_file(&self, path: &Path) -> bool {
        self.items.iter().any(|item| item.file == path)
    }

    fn item_mut(&mut self, id: CheckItemId) -> Option<&mut CheckItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    fn next_pending(&self) -> Option<(CheckItemId, PathBuf)> {
        self.items
            .iter()
            .find(|item| item.selected && item.is_pending())
            .map(|item| (item.id, item.file.clone()))
    }
}

struct Shared {
    queue: Mutex<Queue>,
    events: EventBus,
    /// Mirrors `Queue::generation` so a batch task can await a stop
    generation: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_generation(&self, queue: &mut Queue) -> u64 {
        queue.generation += 1;
        self.generation.send_replace(queue.generation);
        queue.generation
    }

    /// Invalidate the running batch and every running crawl
    fn cancel_all(&self, queue: &mut Queue) {
        self.next_generation(queue);
        queue.crawl_cancel.store(true, Ordering::Relaxed);
        queue.crawl_cancel = Arc::new(AtomicBool::new(false));
    }

    fn enqueue(&self, path: PathBuf, cancel: &AtomicBool) {
        let id = {
            let mut queue = self.lock();
            // Checked under the lock so nothing lands after a reset
            if cancel.load(Ordering::Relaxed) || queue.contains_file(&path) {
                return;
            }
            queue.next_id += 1;
            let id = CheckItemId(queue.next_id);
            queue.items.push(CheckItem::new(id, path));
            id
        };
        self.events.emit(CheckerEvent::AddedCheckItem(id));
    }

    fn finish_crawl(&self) {
        let last = {
            let mut queue = self.lock();
            queue.active_crawls = queue.active_crawls.saturating_sub(1);
            queue.active_crawls == 0
        };
        if last {
            self.events.emit(CheckerEvent::CrawlingDone);
        }
    }
}

/// Default [`Checker`]: crawls on blocking threads and checks on the tokio
/// runtime behind `runtime`.
pub struct BatchChecker {
    shared: Arc<Shared>,
    endpoint: Arc<dyn CheckingEndpoint>,
    access_token: String,
    runtime: Handle,
}

impl BatchChecker {
    pub fn new(
        endpoint: Arc<dyn CheckingEndpoint>,
        access_token: impl Into<String>,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue::default()),
                events: EventBus::new(),
                generation: watch::channel(0).0,
            }),
            endpoint,
            access_token: access_token.into(),
            runtime,
        }
    }
}

/// Resolves once `stop`, `reset_check_items` or a newer `start` replaced
/// `generation`
async fn superseded(mut generations: watch::Receiver<u64>, generation: u64) {
    // The sender lives in `Shared`, which the batch task keeps alive
    let _ = generations.wait_for(|current| *current != generation).await;
}

async fn run_batch(
    shared: Arc<Shared>,
    endpoint: Arc<dyn CheckingEndpoint>,
    access_token: String,
    options: CheckOptions,
    generation: u64,
) {
    let batch_id = options.batch_id.clone();
    let generations = shared.generation.subscribe();
    tracing::info!(%batch_id, "batch check started");

    loop {
        let next = {
            let queue = shared.lock();
            if queue.generation != generation {
                tracing::info!(%batch_id, "batch check stopped");
                return;
            }
            queue.next_pending()
        };
        let Some((item_id, file)) = next else { break };

        let state = match tokio::fs::read(&file).await {
            Err(err) => CheckItemState::Failed {
                error: format!("Cannot read {}: {}", file.display(), err),
            },
            Ok(bytes) => {
                let request = CheckRequest::from_bytes(
                    bytes,
                    file.to_string_lossy(),
                    options.clone(),
                );
                let checked = tokio::select! {
                    outcome = endpoint.check(&access_token, request) => outcome,
                    _ = superseded(generations.clone(), generation) => {
                        tracing::info!(%batch_id, file = %file.display(), "batch check stopped mid-check");
                        return;
                    }
                };
                match checked {
                    Ok(outcome) => CheckItemState::Checked {
                        score: outcome.score,
                        status: outcome.status,
                        reports: outcome.reports,
                    },
                    Err(err) => CheckItemState::Failed {
                        error: err.to_string(),
                    },
                }
            }
        };

        if let CheckItemState::Failed { error } = &state {
            tracing::warn!(file = %file.display(), %error, "check failed");
        }

        let recorded = {
            let mut queue = shared.lock();
            if queue.generation != generation {
                return;
            }
            match queue.item_mut(item_id) {
                Some(item) => {
                    item.state = state;
                    true
                }
                None => false,
            }
        };
        if recorded {
            shared.events.emit(CheckerEvent::CheckResult { item_id });
        }
    }

    let finished = {
        let mut queue = shared.lock();
        if queue.generation == generation {
            queue.running_batch = None;
            true
        } else {
            false
        }
    };
    if finished {
        tracing::info!(%batch_id, "batch check done");
        shared.events.emit(CheckerEvent::Done { batch_id });
    }
}

impl Checker for BatchChecker {
    fn subscribe(&self) -> Subscription {
        self.shared.events.subscribe()
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.events.unsubscribe(id)
    }

    fn add_crawler(&self, crawler: Box<dyn Crawler>) {
        let (first, cancel) = {
            let mut queue = self.shared.lock();
            queue.active_crawls += 1;
            (queue.active_crawls == 1, Arc::clone(&queue.crawl_cancel))
        };
        if first {
            self.shared.events.emit(CheckerEvent::CrawlingStarted);
        }

        let shared = Arc::clone(&self.shared);
        self.runtime.spawn_blocking(move || {
            let mut crawler = crawler;
            let root = crawler.root().to_path_buf();
            tracing::info!(root = %root.display(), "crawl started");
            let result = crawler.crawl(&cancel, &mut |path| shared.enqueue(path, &cancel));
            if cancel.load(Ordering::Relaxed) {
                tracing::info!(root = %root.display(), "crawl cancelled");
            } else if let Err(err) = result {
                tracing::warn!(root = %root.display(), error = %err, "crawl failed");
                shared.events.emit(CheckerEvent::CrawlFailed {
                    root,
                    error: err.to_string(),
                });
            }
            shared.finish_crawl();
        });
    }

    fn set_check_options(&self, options: CheckOptions) {
        self.shared.lock().options = Some(options);
    }

    fn start(&self) {
        let (options, generation) = {
            let mut queue = self.shared.lock();
            if queue.running_batch.is_some() {
                return;
            }
            let options = queue
                .options
                .clone()
                .unwrap_or_else(|| CheckOptions::batch(None));
            let generation = self.shared.next_generation(&mut queue);
            queue.running_batch = Some(options.batch_id.clone());
            (options, generation)
        };

        self.shared.events.emit(CheckerEvent::CheckingStarted {
            batch_id: options.batch_id.clone(),
        });
        self.runtime.spawn(run_batch(
            Arc::clone(&self.shared),
            Arc::clone(&self.endpoint),
            self.access_token.clone(),
            options,
            generation,
        ));
    }

    fn stop(&self) {
        let stopped = {
            let mut queue = self.shared.lock();
            self.shared.cancel_all(&mut queue);
            queue.running_batch.take()
        };
        if let Some(batch_id) = stopped {
            tracing::info!(%batch_id, "stop requested");
            self.shared.events.emit(CheckerEvent::Done { batch_id });
        }
    }

    fn reset_check_items(&self) {
        let (removed, stopped): (Vec<CheckItemId>, _) = {
            let mut queue = self.shared.lock();
            self.shared.cancel_all(&mut queue);
            let stopped = queue.running_batch.take();
            (queue.items.drain(..).map(|item| item.id).collect(), stopped)
        };
        if let Some(batch_id) = stopped {
            self.shared.events.emit(CheckerEvent::Done { batch_id });
        }
        for id in removed {
            self.shared.events.emit(CheckerEvent::RemovedCheckItem(id));
        }
    }

    fn remove_check_item(&self, id: CheckItemId) -> bool {
        let removed = {
            let mut queue = self.shared.lock();
            let before = queue.items.len();
            queue.items.retain(|item| item.id != id);
            queue.items.len() != before
        };
        if removed {
            self.shared.events.emit(CheckerEvent::RemovedCheckItem(id));
        }
        removed
    }

    fn select_all(&self) {
        for item in self.shared.lock().items.iter_mut() {
            item.selected = true;
        }
    }

    fn check_items(&self) -> Vec<CheckItem> {
        self.shared.lock().items.clone()
    }

    fn is_running(&self) -> bool {
        self.shared.lock().running_batch.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::QualityStatus;
    use crate::crawler::{DirectoryCrawler, FileCrawler};
    use crate::endpoint::{CheckOutcome, CheckingCapabilities, ContentEncoding};
    use crate::error::{CommanderError, Result};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::fs;
    use std::time::Duration;

    /// Scores by content length; files containing "fail" are rejected
    #[derive(Default)]
    struct FakeEndpoint {
        encodings: Mutex<Vec<ContentEncoding>>,
    }

    #[async_trait]
    impl CheckingEndpoint for FakeEndpoint {
        async fn checking_capabilities(&self, _access_token: &str) -> Result<CheckingCapabilities> {
            Ok(CheckingCapabilities {
                reference_pattern: ".*".to_string(),
                guidance_profiles: Vec::new(),
            })
        }

        async fn check(&self, access_token: &str, request: CheckRequest) -> Result<CheckOutcome> {
            assert_eq!(access_token, "token");
            self.encodings.lock().unwrap().push(request.content_encoding);
            if request.content.contains("fail") {
                return Err(CommanderError::api(400, "submit check", "bad document"));
            }
            Ok(CheckOutcome {
                score: request.content.len() as u32,
                status: QualityStatus::Green,
                reports: BTreeMap::new(),
            })
        }

        async fn aggregated_report_url(&self, _access_token: &str, batch_id: &str) -> Result<Option<String>> {
            Ok(Some(format!("https://report/{}", batch_id)))
        }
    }

    /// Never answers; records when the pending check is dropped
    #[derive(Default)]
    struct HangingEndpoint {
        abandoned: Arc<AtomicBool>,
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl CheckingEndpoint for HangingEndpoint {
        async fn checking_capabilities(&self, _access_token: &str) -> Result<CheckingCapabilities> {
            Err(CommanderError::api(503, "checking capabilities", "down"))
        }

        async fn check(&self, _access_token: &str, _request: CheckRequest) -> Result<CheckOutcome> {
            let _guard = SetOnDrop(Arc::clone(&self.abandoned));
            std::future::pending().await
        }

        async fn aggregated_report_url(&self, _access_token: &str, _batch_id: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    /// Yields `count` made-up files, sleeping `delay` before each one
    struct SlowCrawler {
        root: PathBuf,
        count: usize,
        delay: Duration,
        honor_cancel: bool,
    }

    impl SlowCrawler {
        fn new(honor_cancel: bool) -> Self {
            Self {
                root: PathBuf::from("/virtual"),
                count: 20,
                delay: Duration::from_millis(100),
                honor_cancel,
            }
        }
    }

    impl Crawler for SlowCrawler {
        fn root(&self) -> &Path {
            &self.root
        }

        fn crawl(&mut self, cancel: &AtomicBool, found: &mut dyn FnMut(PathBuf)) -> Result<()> {
            for n in 0..self.count {
                std::thread::sleep(self.delay);
                if self.honor_cancel && cancel.load(Ordering::Relaxed) {
                    return Ok(());
                }
                found(self.root.join(format!("{}.md", n)));
            }
            Ok(())
        }
    }

    fn checker() -> BatchChecker {
        checker_with(Arc::new(FakeEndpoint::default()))
    }

    fn checker_with(endpoint: Arc<dyn CheckingEndpoint>) -> BatchChecker {
        BatchChecker::new(endpoint, "token", Handle::current())
    }

    async fn wait_for(sub: &mut Subscription, wanted: impl Fn(&CheckerEvent) -> bool) -> Vec<CheckerEvent> {
        let mut seen = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), sub.next())
                .await
                .expect("timed out waiting for event")
                .expect("event bus closed");
            let done = wanted(&event);
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_crawl_queues_files_and_brackets_events() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "aaa").unwrap();
        fs::write(dir.path().join("b.md"), "bb").unwrap();

        let checker = checker();
        let mut sub = checker.subscribe();
        checker.add_crawler(Box::new(DirectoryCrawler::new(dir.path(), true)));

        let events = wait_for(&mut sub, |e| *e == CheckerEvent::CrawlingDone).await;
        assert_eq!(events.first(), Some(&CheckerEvent::CrawlingStarted));
        let added = events
            .iter()
            .filter(|e| matches!(e, CheckerEvent::AddedCheckItem(_)))
            .count();
        assert_eq!(added, 2);
        assert_eq!(checker.check_items().len(), 2);
        assert_eq!(checker.shared.lock().active_crawls, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_duplicate_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.md");
        fs::write(&file, "aaa").unwrap();

        let checker = checker();
        let mut sub = checker.subscribe();
        checker.add_crawler(Box::new(FileCrawler::new(&file)));
        wait_for(&mut sub, |e| *e == CheckerEvent::CrawlingDone).await;
        checker.add_crawler(Box::new(FileCrawler::new(&file)));
        wait_for(&mut sub, |e| *e == CheckerEvent::CrawlingDone).await;

        assert_eq!(checker.check_items().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_crawl_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let checker = checker();
        let mut sub = checker.subscribe();
        checker.add_crawler(Box::new(FileCrawler::new(dir.path().join("missing.md"))));

        let events = wait_for(&mut sub, |e| *e == CheckerEvent::CrawlingDone).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, CheckerEvent::CrawlFailed { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batch_checks_every_item() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "aaaa").unwrap();
        fs::write(dir.path().join("b.md"), "please fail").unwrap();

        let checker = checker();
        let mut sub = checker.subscribe();
        checker.add_crawler(Box::new(DirectoryCrawler::new(dir.path(), true)));
        wait_for(&mut sub, |e| *e == CheckerEvent::CrawlingDone).await;

        let mut options = CheckOptions::batch(None);
        options.batch_id = "ac-test".to_string();
        checker.set_check_options(options);
        checker.start();
        assert!(checker.is_running());

        let events = wait_for(&mut sub, |e| matches!(e, CheckerEvent::Done { .. })).await;
        assert_eq!(
            events.first(),
            Some(&CheckerEvent::CheckingStarted {
                batch_id: "ac-test".to_string()
            })
        );
        assert_eq!(
            events.last(),
            Some(&CheckerEvent::Done {
                batch_id: "ac-test".to_string()
            })
        );
        assert!(!checker.is_running());

        let items = checker.check_items();
        assert!(matches!(items[0].state, CheckItemState::Checked { score: 4, .. }));
        match &items[1].state {
            CheckItemState::Failed { error } => assert!(error.contains("bad document")),
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert!(items[0].scorecard().is_none());
        assert!(!items.iter().any(|i| i.is_pending()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_emits_done_once() {
        let checker = checker();
        let mut sub = checker.subscribe();

        checker.start();
        checker.stop();
        checker.stop();

        let events = wait_for(&mut sub, |e| matches!(e, CheckerEvent::Done { .. })).await;
        assert!(matches!(events[0], CheckerEvent::CheckingStarted { .. }));
        assert!(!checker.is_running());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sub.drain().iter().all(|e| !matches!(e, CheckerEvent::Done { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_remove_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("b.md"), "b").unwrap();

        let checker = checker();
        let mut sub = checker.subscribe();
        checker.add_crawler(Box::new(DirectoryCrawler::new(dir.path(), true)));
        wait_for(&mut sub, |e| *e == CheckerEvent::CrawlingDone).await;

        let first = checker.check_items()[0].id;
        assert!(checker.remove_check_item(first));
        assert!(!checker.remove_check_item(first));
        assert_eq!(
            sub.drain(),
            vec![CheckerEvent::RemovedCheckItem(first)]
        );

        checker.reset_check_items();
        assert!(checker.check_items().is_empty());
        assert_eq!(sub.drain().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unsubscribe_through_checker() {
        let checker = checker();
        let sub = checker.subscribe();
        assert!(checker.unsubscribe(sub.id()));
        assert_eq!(checker.shared.events.subscriber_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_clear_during_crawl_does_not_refill_list() {
        let checker = checker();
        let mut sub = checker.subscribe();
        checker.add_crawler(Box::new(SlowCrawler::new(false)));

        tokio::time::sleep(Duration::from_millis(250)).await;
        checker.stop();
        checker.reset_check_items();
        assert!(checker.check_items().is_empty());

        // This crawler ignores the flag, so everything it finds afterwards
        // must be dropped on the way in
        wait_for(&mut sub, |e| *e == CheckerEvent::CrawlingDone).await;
        assert!(checker.check_items().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_cancels_crawl_promptly() {
        let checker = checker();
        let mut sub = checker.subscribe();
        checker.add_crawler(Box::new(SlowCrawler::new(true)));

        tokio::time::sleep(Duration::from_millis(250)).await;
        checker.stop();
        let stopped_at = std::time::Instant::now();

        wait_for(&mut sub, |e| *e == CheckerEvent::CrawlingDone).await;
        assert!(stopped_at.elapsed() < Duration::from_secs(1));
        let queued = checker.check_items().len();
        assert!(queued < 20, "crawl ran to completion: {} items", queued);

        // Crawls started after the stop are not affected by it
        checker.add_crawler(Box::new(SlowCrawler {
            root: PathBuf::from("/later"),
            count: 2,
            delay: Duration::from_millis(1),
            ..SlowCrawler::new(true)
        }));
        wait_for(&mut sub, |e| *e == CheckerEvent::CrawlingDone).await;
        assert_eq!(checker.check_items().len(), queued + 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_abandons_check_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.md");
        fs::write(&file, "aaa").unwrap();

        let endpoint = Arc::new(HangingEndpoint::default());
        let abandoned = Arc::clone(&endpoint.abandoned);
        let checker = checker_with(endpoint);
        let mut sub = checker.subscribe();
        checker.add_crawler(Box::new(FileCrawler::new(&file)));
        wait_for(&mut sub, |e| *e == CheckerEvent::CrawlingDone).await;

        checker.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!abandoned.load(Ordering::SeqCst));
        checker.stop();

        tokio::time::timeout(Duration::from_secs(5), async {
            while !abandoned.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("check still pending after stop");
        assert!(checker.check_items()[0].is_pending());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_binary_document_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.docx");
        let mut bytes = b"PK\x03\x04".to_vec();
        bytes.extend_from_slice(&[0x14, 0x00, 0xff, 0xfe, 0x80]);
        fs::write(&file, &bytes).unwrap();

        let endpoint = Arc::new(FakeEndpoint::default());
        let checker = checker_with(endpoint.clone());
        let mut sub = checker.subscribe();
        checker.add_crawler(Box::new(FileCrawler::new(&file)));
        wait_for(&mut sub, |e| *e == CheckerEvent::CrawlingDone).await;

        checker.start();
        wait_for(&mut sub, |e| matches!(e, CheckerEvent::Done { .. })).await;

        let items = checker.check_items();
        assert!(
            matches!(items[0].state, CheckItemState::Checked { .. }),
            "got {:?}",
            items[0].state
        );
        assert_eq!(
            *endpoint.encodings.lock().unwrap(),
            vec![ContentEncoding::Base64]
        );
    }
}
