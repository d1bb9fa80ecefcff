//! Local cape file watching.
//!
//! Mirrors a user-selected PNG into the cape texture slot without requiring
//! re-upload after each edit: a background task re-checks the file's
//! modification timestamp on a fixed interval and emits a fresh texture
//! only when it changes. The no-change path is a single `stat`.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::texture::TextureRef;

/// How often the watched file is re-checked.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

// =============================================================================
// Events
// =============================================================================

/// Events sent from the poller to the GUI.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// The watched file was (re)read; carries the fresh cape texture.
    CapeUpdated(TextureRef),
}

/// Sender for watch events.
pub type WatchSender = mpsc::UnboundedSender<WatchEvent>;

/// Receiver for watch events.
pub type WatchReceiver = mpsc::UnboundedReceiver<WatchEvent>;

/// Create an event channel for a watch session.
pub fn watch_channel() -> (WatchSender, WatchReceiver) {
    mpsc::unbounded_channel()
}

// =============================================================================
// Watch Session
// =============================================================================

/// An active polling loop mirroring one local file into the cape slot.
///
/// At most one session is meaningfully active at a time; the owner holds it
/// in an `Option` slot, so starting a new session or clearing the slot
/// drops the old one and aborts its task. Dropping on teardown gives the
/// same guarantee on every exit path.
pub struct WatchSession {
    path: PathBuf,
    handle: JoinHandle<()>,
}

impl WatchSession {
    /// Start polling `path` at [`POLL_INTERVAL`], emitting events on `tx`.
    ///
    /// Performs an immediate read so the cape shows without waiting a full
    /// tick. Must be called within a Tokio runtime context.
    pub fn start(path: PathBuf, tx: WatchSender) -> Self {
        Self::start_with_interval(path, tx, POLL_INTERVAL)
    }

    /// Same as [`WatchSession::start`] with a custom interval. Exposed for
    /// tests.
    pub fn start_with_interval(path: PathBuf, tx: WatchSender, interval: Duration) -> Self {
        debug!(path = %path.display(), "Starting watch session");
        let task_path = path.clone();
        let handle = tokio::spawn(async move {
            poll_loop(task_path, tx, interval).await;
        });
        Self { path, handle }
    }

    /// The watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Short name for status display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Whether the polling task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Stopping watch session");
        self.handle.abort();
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Reports whether `current` differs from the last observed timestamp.
fn has_changed(last: Option<SystemTime>, current: SystemTime) -> bool {
    last != Some(current)
}

async fn poll_loop(path: PathBuf, tx: WatchSender, interval: Duration) {
    let mut last_modified: Option<SystemTime> = None;

    // Immediate read on grant.
    if let Err(e) = check_file(&path, &mut last_modified, &tx).await {
        warn!(path = %path.display(), error = %e, "Initial cape read failed");
    }

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of a fresh interval completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if tx.is_closed() {
            break;
        }
        if let Err(e) = check_file(&path, &mut last_modified, &tx).await {
            warn!(path = %path.display(), error = %e, "Cape poll failed");
        }
    }
}

/// One poll step: stat, and only on a changed timestamp re-read and emit.
///
/// `last_modified` is updated only after a successful read, so a failed
/// read is retried on the next tick.
async fn check_file(
    path: &Path,
    last_modified: &mut Option<SystemTime>,
    tx: &WatchSender,
) -> anyhow::Result<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("stat {}", path.display()))?;
    let modified = metadata
        .modified()
        .context("modification time unavailable")?;

    if !has_changed(*last_modified, modified) {
        return Ok(());
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    *last_modified = Some(modified);

    debug!(path = %path.display(), len = bytes.len(), "Watched cape file changed");
    let _ = tx.send(WatchEvent::CapeUpdated(TextureRef::inline_png(bytes)));
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TEST_INTERVAL: Duration = Duration::from_millis(20);
    const RECV_TIMEOUT: Duration = Duration::from_secs(2);

    fn write_cape(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn touch(path: &Path, seconds_since_epoch: u64) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(seconds_since_epoch))
            .unwrap();
    }

    async fn recv_bytes(rx: &mut WatchReceiver) -> Vec<u8> {
        let event = tokio::time::timeout(RECV_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for watch event")
            .expect("watch channel closed");
        let WatchEvent::CapeUpdated(TextureRef::Inline(inline)) = event else {
            panic!("expected an inline cape texture");
        };
        inline.bytes.as_ref().clone()
    }

    // -------------------------------------------------------------------------
    // Change Detection Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_has_changed() {
        let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1000);
        let t2 = SystemTime::UNIX_EPOCH + Duration::from_secs(2000);

        assert!(has_changed(None, t1));
        assert!(!has_changed(Some(t1), t1));
        assert!(has_changed(Some(t1), t2));
    }

    // -------------------------------------------------------------------------
    // Session Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_initial_read_emits_once() {
        let dir = TempDir::new().unwrap();
        let path = write_cape(&dir, "cape.png", b"cape-v1");
        let (tx, mut rx) = watch_channel();

        let _session = WatchSession::start_with_interval(path, tx, TEST_INTERVAL);

        assert_eq!(recv_bytes(&mut rx).await, b"cape-v1");

        // Unchanged timestamp: several polls, no further events.
        tokio::time::sleep(TEST_INTERVAL * 5).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_change_emits_exactly_one_event() {
        let dir = TempDir::new().unwrap();
        let path = write_cape(&dir, "cape.png", b"cape-v1");
        let (tx, mut rx) = watch_channel();

        let _session = WatchSession::start_with_interval(path.clone(), tx, TEST_INTERVAL);
        assert_eq!(recv_bytes(&mut rx).await, b"cape-v1");

        fs::write(&path, b"cape-v2").unwrap();
        touch(&path, 2_000_000_000);

        assert_eq!(recv_bytes(&mut rx).await, b"cape-v2");

        tokio::time::sleep(TEST_INTERVAL * 5).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_new_session_supersedes_previous() {
        let dir = TempDir::new().unwrap();
        let path_a = write_cape(&dir, "a.png", b"aaa");
        let path_b = write_cape(&dir, "b.png", b"bbb");
        let (tx, mut rx) = watch_channel();

        let mut slot = Some(WatchSession::start_with_interval(
            path_a.clone(),
            tx.clone(),
            TEST_INTERVAL,
        ));
        assert_eq!(recv_bytes(&mut rx).await, b"aaa");
        assert!(slot.as_ref().is_some_and(|s| !s.is_finished()));

        // Starting B drops (aborts) A.
        slot = Some(WatchSession::start_with_interval(
            path_b,
            tx.clone(),
            TEST_INTERVAL,
        ));
        assert_eq!(recv_bytes(&mut rx).await, b"bbb");

        // A change to A's file must never be observed again.
        fs::write(&path_a, b"aaa-v2").unwrap();
        touch(&path_a, 2_000_000_000);
        tokio::time::sleep(TEST_INTERVAL * 5).await;
        assert!(rx.try_recv().is_err());

        slot.take();
        assert!(slot.is_none());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_cape(&dir, "cape.png", b"cape-v1");
        let (tx, mut rx) = watch_channel();

        let mut slot = Some(WatchSession::start_with_interval(path, tx, TEST_INTERVAL));
        assert_eq!(recv_bytes(&mut rx).await, b"cape-v1");

        // Stopping twice in a row is a no-op the second time.
        slot.take();
        slot.take();
        assert!(slot.is_none());

        tokio::time::sleep(TEST_INTERVAL * 3).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_retried_until_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.png");
        let (tx, mut rx) = watch_channel();

        let _session = WatchSession::start_with_interval(path.clone(), tx, TEST_INTERVAL);

        // Nothing to read yet; the session keeps polling instead of dying.
        tokio::time::sleep(TEST_INTERVAL * 3).await;
        assert!(rx.try_recv().is_err());

        fs::write(&path, b"late-cape").unwrap();
        assert_eq!(recv_bytes(&mut rx).await, b"late-cape");
    }

    #[tokio::test]
    async fn test_session_reports_watched_file() {
        let dir = TempDir::new().unwrap();
        let path = write_cape(&dir, "cape.png", b"cape-v1");
        let (tx, _rx) = watch_channel();

        let session = WatchSession::start_with_interval(path.clone(), tx, TEST_INTERVAL);
        assert_eq!(session.path(), path);
        assert_eq!(session.file_name(), "cape.png");
        assert!(!session.is_finished());
    }
}
