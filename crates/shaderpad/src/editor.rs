//! File-backed source buffer and the watcher that reloads it.
//!
//! The shader file on disk stands in for an editor: any external editor saves
//! the file and [`SourceWatcher`] forwards the new text to the preview.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use renderer::DEFAULT_FRAGMENT_SOURCE;
use tracing::{debug, info, warn};

/// Last known contents of a shader file.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    text: String,
}

impl FileSource {
    /// Opens `path`, seeding it with the default shader when it does not exist.
    pub fn open_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(dir).with_context(|| {
                    format!("failed to create directory for {}", path.display())
                })?;
            }
            fs::write(path, DEFAULT_FRAGMENT_SOURCE)
                .with_context(|| format!("failed to create shader file {}", path.display()))?;
            info!(path = %path.display(), "created shader file from the default source");
        }
        Self::open(path)
    }

    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read shader file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current buffer contents.
    pub fn get(&self) -> &str {
        &self.text
    }

    /// Re-reads the file and returns the new text if it differs from the
    /// buffer. Saves that leave the text identical are not reported.
    pub fn reload(&mut self) -> io::Result<Option<String>> {
        let text = fs::read_to_string(&self.path)?;
        if text == self.text {
            return Ok(None);
        }
        self.text = text.clone();
        Ok(Some(text))
    }
}

enum WatchMessage {
    Fs(notify::Result<Event>),
    Stop,
}

/// Filesystem watcher forwarding debounced changes of one shader file.
///
/// The parent directory is watched and events are filtered by file name, so
/// editors that save by writing a temporary file and renaming it over the
/// original are picked up. Dropping the watcher stops the thread and waits
/// for it to finish.
pub struct SourceWatcher {
    watcher: Option<RecommendedWatcher>,
    stop: Sender<WatchMessage>,
    handle: Option<JoinHandle<()>>,
}

impl SourceWatcher {
    /// Starts watching `source`. Changes are coalesced until no event arrived
    /// for `debounce`, then `sink` receives the new text; an error from `sink`
    /// means the receiver is gone and ends the thread.
    pub fn spawn<S>(mut source: FileSource, debounce: Duration, mut sink: S) -> Result<Self>
    where
        S: FnMut(String) -> Result<()> + Send + 'static,
    {
        let file_name = source
            .path()
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| anyhow!("shader path {} has no file name", source.path().display()))?;
        let dir = match source.path().parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = unbounded();
        let events = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = events.send(WatchMessage::Fs(res));
        })
        .context("failed to create filesystem watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;

        let handle = thread::Builder::new()
            .name("shaderpad-watch".to_string())
            .spawn(move || {
                debug!(path = %source.path().display(), ?debounce, "watching shader file");
                let mut deadline: Option<Instant> = None;
                loop {
                    let message = match deadline {
                        Some(at) => match rx.recv_deadline(at) {
                            Ok(message) => Some(message),
                            Err(RecvTimeoutError::Timeout) => None,
                            Err(RecvTimeoutError::Disconnected) => break,
                        },
                        None => match rx.recv() {
                            Ok(message) => Some(message),
                            Err(_) => break,
                        },
                    };

                    match message {
                        None => {
                            deadline = None;
                            if !forward_change(&mut source, &mut sink) {
                                break;
                            }
                        }
                        Some(WatchMessage::Stop) => break,
                        Some(WatchMessage::Fs(Ok(event))) => {
                            if touches_file(&event, &file_name) {
                                deadline = Some(Instant::now() + debounce);
                            }
                        }
                        Some(WatchMessage::Fs(Err(err))) => {
                            warn!(error = %err, "filesystem watcher error");
                        }
                    }
                }
                debug!("shader watcher stopped");
            })
            .context("failed to spawn shader watcher thread")?;

        Ok(Self {
            watcher: Some(watcher),
            stop: tx,
            handle: Some(handle),
        })
    }
}

/// Reloads the file and hands changed text to `sink`. Returns false once the
/// sink is closed.
fn forward_change<S>(source: &mut FileSource, sink: &mut S) -> bool
where
    S: FnMut(String) -> Result<()>,
{
    match source.reload() {
        Ok(Some(text)) => {
            debug!(bytes = text.len(), "shader file changed");
            if let Err(err) = sink(text) {
                debug!(error = %err, "source receiver closed; stopping watcher");
                return false;
            }
        }
        Ok(None) => {}
        // A rename-based save may still be in flight; the next event retries.
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %source.path().display(), "shader file missing after change");
        }
        Err(err) => {
            warn!(path = %source.path().display(), error = %err, "failed to read shader file");
        }
    }
    true
}

/// Whether `event` creates or modifies the watched file.
fn touches_file(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name.as_os_str()))
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        self.watcher.take();
        let _ = self.stop.send(WatchMessage::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("shader watcher thread panicked");
            }
        }
    }
}
