#![forbid(unsafe_code)]

pub mod config;
pub mod discord;
pub mod format;
pub mod jobs;
pub mod run_counter;
pub mod sanitize;
pub mod source;

pub use config::{HttpConfig, LibraryStatsConfig, StatsWindow, TopUsersConfig};
pub use discord::{DiscordWebhook, Embed, EmbedBuilder, EmbedError, NotifyError, Notifier, WebhookMessage};
pub use jobs::{Delivery, JobContext, JobError, Outcome};
pub use run_counter::{CounterError, Gate, ObservedState, RunCounter};
pub use sanitize::{Sanitize, TableSanitizer};
pub use source::{build_client, SabnzbdClient, SourceError, TautulliClient, TmdbClient, TMDB_BASE_URL};
