//! Filesystem watching with per-file debouncing.
//!
//! Raw notify events funnel through an internal channel into a named worker
//! thread. The worker filters paths through adapter-supplied [`WatchRules`],
//! then debounces per file: the latest logical event for a path is held
//! until the path has been quiet for the debounce window, and only then is
//! it sent to the bounded outbound channel. Sends never block; when the
//! receiver has not drained, the event is dropped and the next filesystem
//! change re-arms the timer.
//!
//! Shutdown invariant: the closer takes one lock that covers the closed
//! flag, the pending payloads, and the per-path timer generations. A timer
//! callback firing after close observes `closed` and does not send, and the
//! outbound sender is dropped exactly once.

use crate::error::Result;
use confab_types::ChangeEvent;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, channel, sync_channel};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Depth of the outbound event queue. Overflow drops the newest event;
/// events are hints, and the change that produced them will fire again.
pub const EVENT_QUEUE_DEPTH: usize = 32;

/// Filesystem operation, collapsed from notify's event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Create,
    Modify,
    Remove,
}

/// Per-adapter policy: which files matter and what a change to them means.
pub trait WatchRules: Send + Sync + 'static {
    /// Whether this path's basename is one the adapter expects.
    fn admits(&self, path: &Path) -> bool;

    /// Map an operation on an admitted path to a logical event. Returning
    /// `None` suppresses the event (e.g. a global watcher filtering out
    /// sessions that belong to other projects).
    fn classify(&self, path: &Path, op: FileOp) -> Option<ChangeEvent>;
}

struct PendingFile {
    generation: u64,
    event: ChangeEvent,
}

struct DebounceState {
    closed: bool,
    pending: HashMap<PathBuf, PendingFile>,
}

struct Shared {
    state: Mutex<DebounceState>,
    // Sole owner of the outbound sender; taking it closes the channel.
    tx: Mutex<Option<SyncSender<ChangeEvent>>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    window: Duration,
}

impl Shared {
    /// Record `event` as the latest for `path` and re-arm its timer.
    fn arm(self: &Arc<Self>, path: PathBuf, event: ChangeEvent) {
        let generation = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return;
            }
            let entry = state.pending.entry(path.clone()).or_insert(PendingFile {
                generation: 0,
                event: event.clone(),
            });
            entry.event = event;
            entry.generation += 1;
            entry.generation
        };

        let shared = Arc::clone(self);
        std::thread::spawn(move || {
            std::thread::sleep(shared.window);
            shared.fire(&path, generation);
        });
    }

    /// Timer expiry: emit the pending event unless re-armed or closed.
    fn fire(&self, path: &Path, generation: u64) {
        let event = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return;
            }
            match state.pending.get(path) {
                Some(pending) if pending.generation == generation => {
                    state.pending.remove(path).map(|p| p.event)
                }
                _ => None,
            }
        };

        let Some(event) = event else { return };
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            match tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(event)) => {
                    trace!(?event, "event queue full, dropping");
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
    }

    fn close(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.closed = true;
            state.pending.clear();
        }
        // Dropping the notify watcher stops the raw event source, which in
        // turn ends the worker thread.
        self.watcher.lock().unwrap().take();
        self.tx.lock().unwrap().take();
    }
}

/// Clonable shutdown handle for a running watch.
#[derive(Clone)]
pub struct WatchCloser {
    shared: Arc<Shared>,
}

impl WatchCloser {
    pub fn close(&self) {
        self.shared.close();
    }
}

/// A running watch: the outbound event channel plus its closer.
///
/// The channel closes (receivers observe disconnect after draining) once
/// [`WatchHandle::close`] or the closer has run.
pub struct WatchHandle {
    events: Receiver<ChangeEvent>,
    closer: WatchCloser,
}

impl WatchHandle {
    pub fn events(&self) -> &Receiver<ChangeEvent> {
        &self.events
    }

    pub fn closer(&self) -> WatchCloser {
        self.closer.clone()
    }

    pub fn close(&self) {
        self.closer.close();
    }

    /// Separate the channel from the closer, e.g. to move the receiver into
    /// a forwarding thread while shutdown stays with the caller.
    pub fn split(self) -> (Receiver<ChangeEvent>, WatchCloser) {
        (self.events, self.closer)
    }
}

/// Start watching `roots` (non-recursively) under the given rules.
///
/// Directories created inside a watched root are added to the watch set as
/// they appear, so per-session subdirectories are picked up live.
pub fn spawn(roots: Vec<PathBuf>, rules: Box<dyn WatchRules>, window: Duration) -> Result<WatchHandle> {
    let (raw_tx, raw_rx) = channel::<Event>();
    let (out_tx, out_rx) = sync_channel::<ChangeEvent>(EVENT_QUEUE_DEPTH);

    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<Event>| match result {
            Ok(event) => {
                let _ = raw_tx.send(event);
            }
            Err(err) => warn!(error = %err, "filesystem watch error"),
        },
        notify::Config::default(),
    )?;

    for root in &roots {
        watcher.watch(root, RecursiveMode::NonRecursive)?;

        // Pre-existing child directories hold live session state; watch them
        // now, and pick up later ones as their create events arrive.
        if let Ok(entries) = std::fs::read_dir(root) {
            for entry in entries.filter_map(|e| e.ok()) {
                let child = entry.path();
                if child.is_dir()
                    && let Err(err) = watcher.watch(&child, RecursiveMode::NonRecursive)
                {
                    warn!(path = %child.display(), error = %err, "failed to watch subdirectory");
                }
            }
        }
    }

    let shared = Arc::new(Shared {
        state: Mutex::new(DebounceState {
            closed: false,
            pending: HashMap::new(),
        }),
        tx: Mutex::new(Some(out_tx)),
        watcher: Mutex::new(Some(watcher)),
        window,
    });

    let worker_shared = Arc::clone(&shared);
    std::thread::Builder::new()
        .name("confab-watch".to_string())
        .spawn(move || {
            while let Ok(event) = raw_rx.recv() {
                handle_raw_event(&worker_shared, rules.as_ref(), event);
            }
            debug!("watch worker exiting");
        })?;

    Ok(WatchHandle {
        events: out_rx,
        closer: WatchCloser { shared },
    })
}

fn handle_raw_event(shared: &Arc<Shared>, rules: &dyn WatchRules, event: Event) {
    let op = match event.kind {
        EventKind::Create(_) => FileOp::Create,
        EventKind::Modify(_) => FileOp::Modify,
        EventKind::Remove(_) => FileOp::Remove,
        _ => return,
    };

    for path in &event.paths {
        // A directory appearing inside a watched parent joins the watch set;
        // nothing else is done with it.
        if op == FileOp::Create && path.is_dir() {
            if let Some(watcher) = shared.watcher.lock().unwrap().as_mut()
                && let Err(err) = watcher.watch(path, RecursiveMode::NonRecursive)
            {
                warn!(path = %path.display(), error = %err, "failed to extend watch");
            }
            continue;
        }

        if !rules.admits(path) {
            continue;
        }

        if let Some(change) = rules.classify(path, op) {
            shared.arm(path.clone(), change);
        }
    }
}
