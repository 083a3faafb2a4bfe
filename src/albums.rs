use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::platform::MediaMessage;

/// Where drained messages go. Implementations own their error handling;
/// a failed message must never take down the buffer.
#[async_trait]
pub trait MediaSink: Send + Sync {
    async fn handle(&self, msg: MediaMessage);
}

/// Reassembles albums. Messages sharing a media group id are buffered
/// until the group has been quiet for the configured interval, then the
/// whole batch is fed through the sink in arrival order. Messages without
/// a group id skip the buffer entirely.
pub struct AlbumBuffer<S> {
    inner: Arc<Shared<S>>,
}

struct Shared<S> {
    quiet: Duration,
    sink: S,
    state: Mutex<GroupState>,
}

#[derive(Default)]
struct GroupState {
    buffers: HashMap<String, Vec<MediaMessage>>,
    timers: HashMap<String, JoinHandle<()>>,
}

impl<S> Clone for AlbumBuffer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: MediaSink + 'static> AlbumBuffer<S> {
    pub fn new(quiet: Duration, sink: S) -> Self {
        Self {
            inner: Arc::new(Shared {
                quiet,
                sink,
                state: Mutex::new(GroupState::default()),
            }),
        }
    }

    /// Entry point for every inbound message. Solitary messages are
    /// handled before this returns; grouped messages are buffered and
    /// their group's quiet-period timer restarted.
    pub async fn dispatch(&self, msg: MediaMessage) {
        let Some(group_id) = msg.group_id.clone() else {
            self.inner.sink.handle(msg).await;
            return;
        };

        let mut state = self.inner.state.lock().await;
        state.buffers.entry(group_id.clone()).or_default().push(msg);

        // Restart the quiet-period timer. Aborting while the lock is held
        // means a timer that already fired is still parked on this lock
        // and dies there, never reaching its drain.
        if let Some(old) = state.timers.remove(&group_id) {
            old.abort();
        }

        let this = self.clone();
        let gid = group_id.clone();
        let quiet = self.inner.quiet;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            this.flush_group(&gid).await;
        });
        state.timers.insert(group_id, timer);
    }

    /// Detach the group's buffer and run every message through the sink
    /// in arrival order. Unknown or already-flushed groups are a no-op.
    async fn flush_group(&self, group_id: &str) {
        let batch = {
            // Detach in one step: a message arriving after this starts a
            // fresh buffer under the same id instead of joining a batch
            // that is already being processed.
            let mut state = self.inner.state.lock().await;
            state.timers.remove(group_id);
            state.buffers.remove(group_id)
        };
        let Some(batch) = batch else {
            debug!("Album {} already flushed", group_id);
            return;
        };

        info!("Processing album {} ({} message(s))", group_id, batch.len());
        for msg in batch {
            self.inner.sink.handle(msg).await;
        }
    }

    /// Abort pending timers and flush whatever is still buffered. Called
    /// once when the process is shutting down.
    pub async fn shutdown(&self) {
        let (timers, buffers) = {
            let mut state = self.inner.state.lock().await;
            (
                std::mem::take(&mut state.timers),
                std::mem::take(&mut state.buffers),
            )
        };
        for timer in timers.into_values() {
            timer.abort();
        }
        for (group_id, batch) in buffers {
            info!(
                "Flushing album {} on shutdown ({} message(s))",
                group_id,
                batch.len()
            );
            for msg in batch {
                self.inner.sink.handle(msg).await;
            }
        }
    }
}
