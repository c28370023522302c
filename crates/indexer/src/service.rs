use std::mem;
use std::path::PathBuf;
use std::sync::Arc;

use berth_registry::{ConnectionRegistry, PublishedRegistry};
use berth_worker::{AlwaysIdle, IdleScheduler};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, error, trace};

use crate::config::IndexConfig;
use crate::console;
use crate::dev::{DevWorkspace, InactiveWorkspace, dev_extension_file};
use crate::scan::PackageScanner;

/// Scheduler key for console-triggered rebuilds; one pending rebuild at a
/// time, later triggers supersede earlier ones.
const REBUILD_KEY: &str = "connections.rebuild";

/// Coordinates full index rebuilds and serves the published snapshot.
///
/// One rebuild runs at a time. Requests made while a rebuild is running
/// coalesce onto it: fire-and-forget requests become no-ops and reply
/// requests wait for the in-flight rebuild's completion. Hosts typically
/// call [`refresh`](Self::refresh) once at startup and then feed console
/// lines to [`observe_console_input`](Self::observe_console_input).
#[derive(Clone)]
pub struct ConnectionIndexer {
	inner: Arc<IndexerInner>,
}

struct IndexerInner {
	scanner: Arc<dyn PackageScanner>,
	dev: Arc<dyn DevWorkspace>,
	scheduler: IdleScheduler,
	config: IndexConfig,
	published: PublishedRegistry,
	job: Mutex<JobState>,
}

/// Rebuild state and its waiters, guarded together so a waiter lands in
/// exactly one dispatch.
#[derive(Default)]
struct JobState {
	running: bool,
	waiters: Vec<oneshot::Sender<Value>>,
}

/// Builder for [`ConnectionIndexer`].
pub struct IndexerBuilder {
	scanner: Arc<dyn PackageScanner>,
	scheduler: IdleScheduler,
	dev: Arc<dyn DevWorkspace>,
	config: IndexConfig,
}

impl IndexerBuilder {
	/// Scheduler used for console-triggered rebuilds. Defaults to one that
	/// treats the host as always idle.
	#[must_use]
	pub fn scheduler(mut self, scheduler: IdleScheduler) -> Self {
		self.scheduler = scheduler;
		self
	}

	/// Probe consulted for the development-mode merge at the end of every
	/// rebuild. Defaults to never active.
	#[must_use]
	pub fn dev_workspace(mut self, dev: Arc<dyn DevWorkspace>) -> Self {
		self.dev = dev;
		self
	}

	#[must_use]
	pub fn config(mut self, config: IndexConfig) -> Self {
		self.config = config;
		self
	}

	pub fn build(self) -> ConnectionIndexer {
		ConnectionIndexer {
			inner: Arc::new(IndexerInner {
				scanner: self.scanner,
				dev: self.dev,
				scheduler: self.scheduler,
				config: self.config,
				published: PublishedRegistry::new(),
				job: Mutex::new(JobState::default()),
			}),
		}
	}
}

impl ConnectionIndexer {
	/// Indexer with the default configuration, no development mode, and an
	/// always-idle trigger scheduler.
	pub fn new(scanner: Arc<dyn PackageScanner>) -> Self {
		Self::builder(scanner).build()
	}

	pub fn builder(scanner: Arc<dyn PackageScanner>) -> IndexerBuilder {
		IndexerBuilder {
			scanner,
			scheduler: IdleScheduler::new(Arc::new(AlwaysIdle)),
			dev: Arc::new(InactiveWorkspace),
			config: IndexConfig::default(),
		}
	}

	/// Requests a rebuild without waiting for it.
	pub fn refresh(&self) {
		IndexerInner::request(&self.inner, None);
	}

	/// Requests a rebuild and returns a receiver that resolves to the
	/// structured snapshot published by the next completed rebuild.
	pub fn refresh_with_reply(&self) -> oneshot::Receiver<Value> {
		let (tx, rx) = oneshot::channel();
		IndexerInner::request(&self.inner, Some(tx));
		rx
	}

	/// Current snapshot; never blocks on a rebuild in progress.
	pub fn snapshot(&self) -> Arc<ConnectionRegistry> {
		self.inner.published.load()
	}

	/// Structured form of the current snapshot.
	pub fn snapshot_json(&self) -> Value {
		self.inner.published.load().to_json()
	}

	/// Whether a rebuild is currently running.
	pub fn is_rebuilding(&self) -> bool {
		self.inner.job.lock().running
	}

	/// Feeds one observed console line to the trigger policy.
	///
	/// A line that starts (after trimming) with a library-mutating command
	/// schedules a debounced, idle-gated rebuild after the configured
	/// delay. With the packages feature disabled this is a no-op.
	pub fn observe_console_input(&self, input: &str) {
		if !self.inner.config.packages_enabled {
			return;
		}
		if !console::triggers_rebuild(input) {
			return;
		}
		trace!("index.trigger.matched");
		let inner = Arc::clone(&self.inner);
		self.inner.scheduler.schedule(
			REBUILD_KEY,
			self.inner.config.rebuild_delay(),
			true,
			move || IndexerInner::request(&inner, None),
		);
	}
}

impl IndexerInner {
	/// Registers an optional waiter and starts a rebuild if none is
	/// running.
	fn request(inner: &Arc<Self>, waiter: Option<oneshot::Sender<Value>>) {
		let mut job = inner.job.lock();
		if let Some(waiter) = waiter {
			job.waiters.push(waiter);
		}
		if job.running {
			trace!("index.rebuild.coalesced");
			return;
		}
		job.running = true;
		drop(job);

		let inner = Arc::clone(inner);
		berth_worker::spawn(async move {
			inner.rebuild().await;
		});
	}

	/// One full rebuild: scan, merge, publish, dispatch.
	async fn rebuild(self: Arc<Self>) {
		debug!("index.rebuild.start");
		let mut discovered: Vec<(String, PathBuf)> = Vec::new();
		self.scanner
			.scan(&mut |package, file| discovered.push((package, file)))
			.await;

		let files = discovered.len();
		let dev_package = self.dev.current();
		let merged = berth_worker::spawn_blocking(move || {
			let mut registry = ConnectionRegistry::new();
			for (package, file) in &discovered {
				registry.merge_extension_file(package, file);
			}
			if let Some(dev) = dev_package {
				let file = dev_extension_file(&dev.root);
				if file.is_file() {
					registry.merge_extension_file(&dev.name, &file);
				}
			}
			registry
		})
		.await;

		let snapshot = match merged {
			Ok(registry) => {
				debug!(files, entries = registry.len(), "index.rebuild.publish");
				self.published.publish(registry)
			}
			Err(error) => {
				// Keep the previous snapshot; waiters still get an answer.
				error!(%error, "index.rebuild.merge_lost");
				self.published.load()
			}
		};
		let payload = snapshot.to_json();

		let waiters = {
			let mut job = self.job.lock();
			job.running = false;
			mem::take(&mut job.waiters)
		};
		debug!(waiters = waiters.len(), "index.rebuild.dispatch");
		for waiter in waiters {
			// A closed receiver just means that caller stopped waiting.
			let _ = waiter.send(payload.clone());
		}
	}
}

#[cfg(test)]
mod tests {
	use std::fs;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::time::Duration;

	use async_trait::async_trait;
	use pretty_assertions::assert_eq;
	use tempfile::TempDir;
	use tokio::sync::Notify;
	use tokio::time::timeout;

	use super::*;
	use crate::dev::StaticWorkspace;
	use berth_worker::IdleProbe;

	/// Scanner yielding a fixed set of discovered files.
	struct FixedScanner {
		files: Vec<(String, PathBuf)>,
	}

	#[async_trait]
	impl PackageScanner for FixedScanner {
		async fn scan(&self, emit: &mut (dyn FnMut(String, PathBuf) + Send)) {
			for (package, file) in &self.files {
				emit(package.clone(), file.clone());
			}
		}
	}

	/// Scanner that emits its files, then waits for a release signal.
	struct GatedScanner {
		files: Vec<(String, PathBuf)>,
		gate: Notify,
		scans: AtomicUsize,
	}

	impl GatedScanner {
		fn new(files: Vec<(String, PathBuf)>) -> Arc<Self> {
			Arc::new(Self {
				files,
				gate: Notify::new(),
				scans: AtomicUsize::new(0),
			})
		}

		fn scans(&self) -> usize {
			self.scans.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl PackageScanner for GatedScanner {
		async fn scan(&self, emit: &mut (dyn FnMut(String, PathBuf) + Send)) {
			self.scans.fetch_add(1, Ordering::SeqCst);
			for (package, file) in &self.files {
				emit(package.clone(), file.clone());
			}
			self.gate.notified().await;
		}
	}

	/// Scanner that only counts how often it runs.
	struct CountingScanner {
		scans: AtomicUsize,
	}

	#[async_trait]
	impl PackageScanner for CountingScanner {
		async fn scan(&self, _emit: &mut (dyn FnMut(String, PathBuf) + Send)) {
			self.scans.fetch_add(1, Ordering::SeqCst);
		}
	}

	struct FlagProbe {
		idle: AtomicBool,
	}

	impl FlagProbe {
		fn new(idle: bool) -> Arc<Self> {
			Arc::new(Self {
				idle: AtomicBool::new(idle),
			})
		}
	}

	impl IdleProbe for FlagProbe {
		fn is_idle(&self) -> bool {
			self.idle.load(Ordering::SeqCst)
		}
	}

	fn write_extension(dir: &TempDir, file: &str, contents: &str) -> PathBuf {
		let path = dir.path().join(file);
		fs::write(&path, contents).unwrap();
		path
	}

	async fn wait_until(mut cond: impl FnMut() -> bool) {
		for _ in 0..400 {
			if cond() {
				return;
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
		panic!("condition never became true");
	}

	async fn reply(rx: oneshot::Receiver<Value>) -> Value {
		timeout(Duration::from_secs(5), rx)
			.await
			.expect("rebuild reply should not hang")
			.expect("indexer dropped the waiter")
	}

	#[tokio::test]
	async fn rebuild_publishes_scanned_entries() {
		let dir = TempDir::new().unwrap();
		let a = write_extension(&dir, "a.dcf", "Name: x\n\nName: y\n");
		let b = write_extension(&dir, "b.dcf", "Name: x\n");
		let indexer = ConnectionIndexer::new(Arc::new(FixedScanner {
			files: vec![("A".to_string(), a), ("B".to_string(), b)],
		}));

		let payload = reply(indexer.refresh_with_reply()).await;

		let object = payload.as_object().unwrap();
		assert_eq!(object.len(), 3);
		assert!(object.contains_key("A::x"));
		assert!(object.contains_key("A::y"));
		assert!(object.contains_key("B::x"));

		let snapshot = indexer.snapshot();
		let entry = snapshot.get("A", "x").unwrap();
		assert_eq!(entry.name, "x");
		assert_eq!(entry.package, "A");
	}

	#[tokio::test]
	async fn rapid_requests_share_one_scan() {
		let scanner = GatedScanner::new(Vec::new());
		let indexer = ConnectionIndexer::new(scanner.clone());

		let first = indexer.refresh_with_reply();
		let second = indexer.refresh_with_reply();
		assert!(indexer.is_rebuilding());

		scanner.gate.notify_one();
		let first = reply(first).await;
		let second = reply(second).await;

		assert_eq!(first, second);
		assert_eq!(scanner.scans(), 1);
		assert!(!indexer.is_rebuilding());
	}

	#[tokio::test]
	async fn request_while_running_joins_the_inflight_dispatch() {
		let scanner = GatedScanner::new(Vec::new());
		let indexer = ConnectionIndexer::new(scanner.clone());

		let first = indexer.refresh_with_reply();
		wait_until(|| scanner.scans() == 1).await;

		let mut late = indexer.refresh_with_reply();
		assert!(matches!(late.try_recv(), Err(oneshot::error::TryRecvError::Empty)));

		scanner.gate.notify_one();
		reply(first).await;
		reply(late).await;
		assert_eq!(scanner.scans(), 1);
	}

	#[tokio::test]
	async fn fire_and_forget_coalesces_onto_a_running_scan() {
		let scanner = GatedScanner::new(Vec::new());
		let indexer = ConnectionIndexer::new(scanner.clone());

		let first = indexer.refresh_with_reply();
		wait_until(|| scanner.scans() == 1).await;
		indexer.refresh();

		scanner.gate.notify_one();
		reply(first).await;
		wait_until(|| !indexer.is_rebuilding()).await;
		assert_eq!(scanner.scans(), 1);

		// Back to idle: the next request starts a fresh scan.
		let next = indexer.refresh_with_reply();
		scanner.gate.notify_one();
		reply(next).await;
		assert_eq!(scanner.scans(), 2);
	}

	#[tokio::test]
	async fn readers_keep_the_prior_snapshot_during_a_rebuild() {
		let dir = TempDir::new().unwrap();
		let file = write_extension(&dir, "pkg.dcf", "Name: stable\n");
		let scanner = GatedScanner::new(vec![("pkg".to_string(), file)]);
		let indexer = ConnectionIndexer::new(scanner.clone());

		scanner.gate.notify_one();
		reply(indexer.refresh_with_reply()).await;
		assert_eq!(indexer.snapshot().len(), 1);

		let inflight = indexer.refresh_with_reply();
		wait_until(|| scanner.scans() == 2).await;
		// Mid-rebuild readers still see the complete previous snapshot.
		assert_eq!(indexer.snapshot().len(), 1);
		assert!(indexer.snapshot().contains("pkg", "stable"));

		scanner.gate.notify_one();
		reply(inflight).await;
	}

	#[tokio::test]
	async fn dev_workspace_merges_its_extension_file() {
		let dir = TempDir::new().unwrap();
		let installed = write_extension(&dir, "installed.dcf", "Name: base\n");

		let workspace = TempDir::new().unwrap();
		let inst = workspace.path().join("inst").join("berth");
		fs::create_dir_all(&inst).unwrap();
		fs::write(inst.join("connections.dcf"), "Name: preview\n").unwrap();

		let indexer = ConnectionIndexer::builder(Arc::new(FixedScanner {
			files: vec![("pkg".to_string(), installed)],
		}))
		.dev_workspace(Arc::new(StaticWorkspace::new("devpkg", workspace.path())))
		.build();

		let payload = reply(indexer.refresh_with_reply()).await;
		let object = payload.as_object().unwrap();
		assert_eq!(object.len(), 2);
		assert!(object.contains_key("pkg::base"));
		assert_eq!(object["devpkg::preview"]["package"], "devpkg");
	}

	#[tokio::test]
	async fn dev_workspace_without_the_file_adds_nothing() {
		let workspace = TempDir::new().unwrap();
		let indexer = ConnectionIndexer::builder(Arc::new(FixedScanner { files: Vec::new() }))
			.dev_workspace(Arc::new(StaticWorkspace::new("devpkg", workspace.path())))
			.build();

		let payload = reply(indexer.refresh_with_reply()).await;
		assert_eq!(payload, serde_json::json!({}));
	}

	#[tokio::test]
	async fn console_trigger_rebuilds_after_delay_and_idleness() {
		let dir = TempDir::new().unwrap();
		let file = write_extension(&dir, "pkg.dcf", "Name: fresh\n");
		let probe = FlagProbe::new(false);
		let scheduler =
			IdleScheduler::with_poll_interval(probe.clone(), Duration::from_millis(10));

		let indexer = ConnectionIndexer::builder(Arc::new(FixedScanner {
			files: vec![("pkg".to_string(), file)],
		}))
		.scheduler(scheduler.clone())
		.config(IndexConfig {
			rebuild_delay_ms: 30,
			..IndexConfig::default()
		})
		.build();

		indexer.observe_console_input("install.packages(\"pkg\")");
		assert!(scheduler.is_scheduled(REBUILD_KEY));

		// Delay passes while the host is busy; nothing is published.
		tokio::time::sleep(Duration::from_millis(60)).await;
		assert!(indexer.snapshot().is_empty());

		probe.idle.store(true, Ordering::SeqCst);
		wait_until(|| !indexer.snapshot().is_empty()).await;
		assert!(indexer.snapshot().contains("pkg", "fresh"));
	}

	#[tokio::test]
	async fn trigger_bursts_debounce_into_one_rebuild() {
		let scanner = Arc::new(CountingScanner {
			scans: AtomicUsize::new(0),
		});
		let indexer = ConnectionIndexer::builder(scanner.clone())
			.config(IndexConfig {
				rebuild_delay_ms: 20,
				..IndexConfig::default()
			})
			.build();

		indexer.observe_console_input("install.packages(\"a\")");
		indexer.observe_console_input("remove.packages(\"b\")");

		wait_until(|| scanner.scans.load(Ordering::SeqCst) == 1).await;
		tokio::time::sleep(Duration::from_millis(60)).await;
		assert_eq!(scanner.scans.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn commented_command_does_not_trigger() {
		let indexer = ConnectionIndexer::new(Arc::new(FixedScanner { files: Vec::new() }));
		let scheduler = indexer.inner.scheduler.clone();

		indexer.observe_console_input("# install.packages is a comment");
		assert!(!scheduler.is_scheduled(REBUILD_KEY));
	}

	#[tokio::test]
	async fn disabled_packages_feature_ignores_triggers() {
		let indexer = ConnectionIndexer::builder(Arc::new(FixedScanner { files: Vec::new() }))
			.config(IndexConfig {
				packages_enabled: false,
				..IndexConfig::default()
			})
			.build();
		let scheduler = indexer.inner.scheduler.clone();

		indexer.observe_console_input("install.packages(\"pkg\")");
		assert!(!scheduler.is_scheduled(REBUILD_KEY));
	}
}
