//! The notification jobs.
//!
//! Every job follows the same shape: query a source, turn the records into a
//! [`WebhookMessage`], hand it to the [`Notifier`]. Collaborators come in
//! through a [`JobContext`] so tests can swap the webhook for a recorder.

pub mod current_streams;
pub mod library_stats;
pub mod popular;
pub mod sabnzbd_status;
pub mod top_stats;
pub mod top_users;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::discord::{colors, Embed, EmbedError, Notifier, WebhookMessage};
use crate::run_counter::{CounterError, Gate, RunCounter};
use crate::sanitize::Sanitize;
use crate::source::SourceError;

/// Embed title used when nothing of the source title survives sanitizing.
pub const UNTITLED: &str = "Unknown";

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Counter(#[from] CounterError),
    #[error("Failed to build notification: {0}")]
    Embed(#[from] EmbedError),
}

/// How many webhook posts went through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub sent: usize,
    pub failed: usize,
}

impl Delivery {
    pub fn merge(self, other: Delivery) -> Delivery {
        Delivery {
            sent: self.sent + other.sent,
            failed: self.failed + other.failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Notifications were built and handed to the notifier.
    Completed(Delivery),
    /// The run counter said nothing changed.
    Suppressed,
    /// The primary source failed; an error notification went out instead.
    Aborted { error: String, delivery: Delivery },
}

/// Collaborators shared by every job.
pub struct JobContext<'a> {
    pub notifier: &'a dyn Notifier,
    pub sanitizer: &'a dyn Sanitize,
    /// Timestamp stamped on every embed of this run.
    pub now: DateTime<Utc>,
    /// When false the run counter is consulted but never written.
    pub persist_state: bool,
}

impl<'a> JobContext<'a> {
    pub fn new(notifier: &'a dyn Notifier, sanitizer: &'a dyn Sanitize) -> Self {
        Self {
            notifier,
            sanitizer,
            now: Utc::now(),
            persist_state: true,
        }
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_persist_state(mut self, persist: bool) -> Self {
        self.persist_state = persist;
        self
    }

    pub fn sanitize(&self, text: &str) -> String {
        self.sanitizer.sanitize(text)
    }

    /// Sanitize a title for an embed. Titles written entirely outside the
    /// substitution table come out empty and fall back to [`UNTITLED`].
    pub fn sanitize_title(&self, title: &str) -> String {
        let sanitized = self.sanitize(title);
        if sanitized.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            sanitized
        }
    }

    /// Post a message, split to the webhook's embed limit. A failed post is
    /// logged by the notifier and counted here; it never stops the job.
    pub async fn deliver(&self, message: WebhookMessage) -> Delivery {
        let mut delivery = Delivery::default();
        for part in message.split() {
            match self.notifier.post(&part).await {
                Ok(()) => delivery.sent += 1,
                Err(_) => delivery.failed += 1,
            }
        }
        delivery
    }

    /// Tell the channel the primary source could not be read, and end the run.
    pub async fn abort(&self, username: &str, what: &str, error: &SourceError) -> Outcome {
        warn!(username, error = %error, "Primary source failed, sending error notification");
        let message = WebhookMessage::new()
            .with_username(username)
            .with_content(format!(
                "**Could not get {what}.**\nError message:\n{error}"
            ));
        let delivery = self.deliver(message).await;
        Outcome::Aborted {
            error: error.to_string(),
            delivery,
        }
    }

    /// Apply the run counter gate for `count` items.
    pub fn gate(&self, counter: &RunCounter, count: usize) -> Result<Gate, CounterError> {
        if self.persist_state {
            counter.record(count)
        } else {
            counter.peek(count)
        }
    }

    /// The single embed sent when there is nothing to list.
    pub fn nothing_embed(&self, title: &str) -> Result<Embed, EmbedError> {
        Embed::builder(title)
            .color(colors::NOTHING)
            .timestamp(self.now)
            .build()
    }
}

/// Shared tail of the gated jobs: consult the counter, then deliver.
async fn deliver_gated(
    ctx: &JobContext<'_>,
    counter: &RunCounter,
    count: usize,
    message: WebhookMessage,
) -> Result<Outcome, JobError> {
    if !ctx.gate(counter, count)?.should_notify() {
        info!(path = %counter.path().display(), "Nothing to update");
        return Ok(Outcome::Suppressed);
    }
    Ok(Outcome::Completed(ctx.deliver(message).await))
}
