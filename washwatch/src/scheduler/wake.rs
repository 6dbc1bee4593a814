//! One-shot wake scheduling.
//!
//! The sweep needs exactly one thing from its environment: "run me again at
//! time T". The concrete timer — an OS alarm, cron, or an in-process task —
//! hides behind [`WakeScheduler`]; scheduling a wake for a token atomically
//! replaces any wake previously scheduled for that token.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// A capability to be woken once at a given time.
pub trait WakeScheduler: Send + Sync {
    /// Schedule a single wake at `at` for `token`, replacing any wake still
    /// outstanding for the same token. The wake fires once; whoever consumes
    /// it reschedules if more wakes are needed.
    fn schedule_wake_at(&self, token: &'static str, at: DateTime<Utc>);
}

/// In-process wake scheduler backed by tokio timers.
///
/// Fired tokens are delivered on the channel handed out by [`Self::new`];
/// the daemon loop consumes them and runs a sweep per fire.
pub struct TokioWakeScheduler {
    fired: mpsc::UnboundedSender<&'static str>,
    slots: Mutex<HashMap<&'static str, JoinHandle<()>>>,
}

impl TokioWakeScheduler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<&'static str>) {
        let (fired, receiver) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                fired,
                slots: Mutex::new(HashMap::new()),
            }),
            receiver,
        )
    }
}

impl WakeScheduler for TokioWakeScheduler {
    fn schedule_wake_at(&self, token: &'static str, at: DateTime<Utc>) {
        let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        debug!(token, %at, delay_secs = delay.as_secs(), "scheduling wake");

        let sender = self.fired.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(token);
        });

        if let Some(previous) = self.slots.lock().insert(token, handle) {
            previous.abort();
        }
    }
}

impl Drop for TokioWakeScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.slots.lock().drain() {
            handle.abort();
        }
    }
}
