pub mod embed;
pub mod webhook;

pub use embed::{colors, Embed, EmbedBuilder, EmbedError, EmbedField, WebhookMessage};
pub use webhook::{DiscordWebhook, NotifyError, Notifier};
