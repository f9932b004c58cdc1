//! SABnzbd download queue summary.

use tracing::info;

use super::{deliver_gated, JobContext, JobError, Outcome};
use crate::discord::{colors, Embed, EmbedError, WebhookMessage};
use crate::run_counter::RunCounter;
use crate::source::{Queue, QueueSlot, SabnzbdClient};

pub const USERNAME: &str = "SABnzbdStatus";
pub const MAX_LISTED_SLOTS: usize = 10;

const PAUSED_DESCRIPTION: &str = "Downloads are currently paused. Either this was manually done by the server admin, or automatically if there is no free space remaining.";
const EMPTY_DESCRIPTION: &str = "There is nothing currently in the download queue.";
const EMPTY_CONTENT: &str = "Nothing currently in the download queue.";

/// What the queue looks like, which decides the message layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Paused,
    Active,
    Empty,
}

impl QueueState {
    pub fn of(queue: &Queue) -> Self {
        if queue.paused {
            Self::Paused
        } else if queue.slots.is_empty() {
            Self::Empty
        } else {
            Self::Active
        }
    }
}

pub async fn run(ctx: &JobContext<'_>, sabnzbd: &SabnzbdClient, counter: &RunCounter) -> Result<Outcome, JobError> {
    let queue = match sabnzbd.queue().await {
        Ok(queue) => queue,
        Err(e) if e.is_reportable() => {
            return Ok(ctx.abort(USERNAME, "SABnzbd queue information", &e).await)
        }
        Err(e) => return Err(e.into()),
    };
    info!(
        slots = queue.slots.len(),
        paused = queue.paused,
        speed = %queue.speed,
        "Fetched download queue"
    );

    let message = queue_message(ctx, &queue)?;
    deliver_gated(ctx, counter, queue.slots.len(), message).await
}

pub fn queue_message(ctx: &JobContext<'_>, queue: &Queue) -> Result<WebhookMessage, EmbedError> {
    let progress = format!(
        "Downloading **{}** item(s) at **{}**Bs/second. Time remaining: **{}**",
        queue.slots.len(),
        queue.speed,
        queue.timeleft
    );

    let message = match QueueState::of(queue) {
        QueueState::Paused => {
            let time_left = if queue.pause_int == "0" {
                "Unknown".to_string()
            } else {
                format!("{} (m:ss)", queue.pause_int)
            };
            let embed = space_embed(ctx, queue, "Downloads Paused", PAUSED_DESCRIPTION, &time_left)?;
            WebhookMessage::new()
                .with_username("Downloads Paused")
                .with_content(progress)
                .with_embeds(vec![embed])
        }
        QueueState::Active => {
            let embeds = queue
                .slots
                .iter()
                .take(MAX_LISTED_SLOTS)
                .map(|slot| slot_embed(ctx, slot))
                .collect::<Result<Vec<_>, _>>()?;
            WebhookMessage::new()
                .with_username("First 10 Downloads")
                .with_content(progress)
                .with_embeds(embeds)
        }
        QueueState::Empty => {
            let embed = space_embed(ctx, queue, "No downloads", EMPTY_DESCRIPTION, "NA")?;
            WebhookMessage::new()
                .with_username("No Downloads")
                .with_content(EMPTY_CONTENT)
                .with_embeds(vec![embed])
        }
    };
    Ok(message)
}

fn space_embed(
    ctx: &JobContext<'_>,
    queue: &Queue,
    title: &str,
    description: &str,
    time_left: &str,
) -> Result<Embed, EmbedError> {
    Embed::builder(title)
        .color(colors::DOWNLOADS)
        .description(description)
        .field("Time Left", time_left, false)
        .field("Free Space", format!("{}GB", queue.diskspace1), true)
        .field("Total Space", format!("{}GB", queue.diskspacetotal1), true)
        .footer("Updated")
        .timestamp(ctx.now)
        .build()
}

fn slot_embed(ctx: &JobContext<'_>, slot: &QueueSlot) -> Result<Embed, EmbedError> {
    Embed::builder("Filename")
        .color(colors::DOWNLOADS)
        .description(&slot.filename)
        .field("Completed", format!("{}%", slot.percentage), false)
        .field("Time Left", &slot.timeleft, true)
        .field("Category", &slot.cat, true)
        .field("File Size", &slot.size, true)
        .footer("Updated")
        .timestamp(ctx.now)
        .build()
}
