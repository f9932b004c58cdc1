mod config;

use std::path::PathBuf;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{fmt, EnvFilter};

use t2d_core::jobs::{current_streams, library_stats, popular, sabnzbd_status, top_stats, top_users};
use t2d_core::{
    build_client, DiscordWebhook, JobContext, Notifier, NotifyError, Outcome, RunCounter, SabnzbdClient,
    TableSanitizer, TautulliClient, TmdbClient, WebhookMessage,
};

use config::{job_section, AppConfig};

fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("T2D_GIT_HASH");

    if GIT_HASH.is_empty() {
        VERSION
    } else {
        Box::leak(format!("{VERSION} ({GIT_HASH})").into_boxed_str())
    }
}

/// Post Plex, Tautulli and SABnzbd summaries to Discord webhooks.
#[derive(Parser)]
#[command(name = "tautulli2discord", version = version_string(), about)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Print payloads instead of posting them; run counters are left untouched.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// What is playing on Plex right now.
    CurrentStreams,
    /// Size and item counts of every library.
    LibraryStats,
    /// Most watched movies and TV shows.
    Popular,
    /// SABnzbd download queue.
    SabnzbdStatus,
    /// Top users, platforms and concurrent streams.
    TopStats,
    /// Top users per media type.
    TopUsers,
}

impl Commands {
    fn name(self) -> &'static str {
        match self {
            Self::CurrentStreams => "current_streams",
            Self::LibraryStats => "library_stats",
            Self::Popular => "popular",
            Self::SabnzbdStatus => "sabnzbd_status",
            Self::TopStats => "top_stats",
            Self::TopUsers => "top_users",
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let app_config = match AppConfig::load(&cli.config) {
        Ok(c) => {
            init_tracing(&c.logging.log_format);
            tracing::info!(path = %cli.config.display(), "Loaded config file");
            c
        }
        Err(e) => {
            init_tracing("pretty");
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let job = cli.command.name();
    match run_job(&cli, &app_config).await {
        Ok(Outcome::Completed(delivery)) => {
            tracing::info!(job, sent = delivery.sent, failed = delivery.failed, "Job finished");
        }
        Ok(Outcome::Suppressed) => {
            tracing::info!(job, "Job finished without changes");
        }
        Ok(Outcome::Aborted { error, delivery }) => {
            tracing::warn!(job, error = %error, sent = delivery.sent, "Job aborted");
        }
        Err(e) => {
            tracing::error!(job, error = %e, "Job failed");
            std::process::exit(1);
        }
    }
}

async fn run_job(cli: &Cli, config: &AppConfig) -> Result<Outcome, String> {
    let client = build_client(config.http.to_http_config().request_timeout).map_err(|e| e.to_string())?;
    let sanitizer = TableSanitizer::new();

    let tautulli = || {
        config
            .tautulli()
            .map(|t| TautulliClient::new(client.clone(), &t.url, &t.api_key))
    };
    let tmdb = || {
        config
            .tmdb()
            .map(|t| TmdbClient::new(client.clone(), &t.base_url, &t.api_key))
    };
    let notifier = |webhook: &str| -> Box<dyn Notifier> {
        if cli.dry_run {
            Box::new(DryRun)
        } else {
            Box::new(DiscordWebhook::new(client.clone(), webhook))
        }
    };
    let counter = |job: Commands| RunCounter::new(config.state.counter_path(job.name()));

    let jobs = &config.jobs;
    let outcome = match cli.command {
        Commands::CurrentStreams => {
            let section = job_section(&jobs.current_streams, "current_streams")?;
            let (tautulli, tmdb) = (tautulli()?, tmdb()?);
            let notifier = notifier(&section.webhook);
            let ctx = JobContext::new(notifier.as_ref(), &sanitizer).with_persist_state(!cli.dry_run);
            current_streams::run(&ctx, &tautulli, &tmdb, &counter(cli.command)).await
        }
        Commands::LibraryStats => {
            let section = job_section(&jobs.library_stats, "library_stats")?;
            let tautulli = tautulli()?;
            let notifier = notifier(&section.webhook);
            let ctx = JobContext::new(notifier.as_ref(), &sanitizer);
            library_stats::run(&ctx, &tautulli, &section.to_library_stats_config()).await
        }
        Commands::Popular => {
            let section = job_section(&jobs.popular, "popular")?;
            let (tautulli, tmdb) = (tautulli()?, tmdb()?);
            let notifier = notifier(&section.webhook);
            let ctx = JobContext::new(notifier.as_ref(), &sanitizer);
            popular::run(&ctx, &tautulli, &tmdb, section.to_window()).await
        }
        Commands::SabnzbdStatus => {
            let section = job_section(&jobs.sabnzbd_status, "sabnzbd_status")?;
            let sab = config.sabnzbd()?;
            let sabnzbd = SabnzbdClient::new(client.clone(), &sab.url, &sab.api_key);
            let notifier = notifier(&section.webhook);
            let ctx = JobContext::new(notifier.as_ref(), &sanitizer).with_persist_state(!cli.dry_run);
            sabnzbd_status::run(&ctx, &sabnzbd, &counter(cli.command)).await
        }
        Commands::TopStats => {
            let section = job_section(&jobs.top_stats, "top_stats")?;
            let tautulli = tautulli()?;
            let notifier = notifier(&section.webhook);
            let ctx = JobContext::new(notifier.as_ref(), &sanitizer);
            top_stats::run(&ctx, &tautulli, section.to_window()).await
        }
        Commands::TopUsers => {
            let section = job_section(&jobs.top_users, "top_users")?;
            let tautulli = tautulli()?;
            let notifier = notifier(&section.webhook);
            let ctx = JobContext::new(notifier.as_ref(), &sanitizer);
            top_users::run(&ctx, &tautulli, &section.to_top_users_config()).await
        }
    };
    outcome.map_err(|e| e.to_string())
}

/// Prints each payload to stdout instead of posting it.
struct DryRun;

#[async_trait]
impl Notifier for DryRun {
    async fn post(&self, message: &WebhookMessage) -> Result<(), NotifyError> {
        let json = serde_json::to_string_pretty(message)?;
        println!(
            "{} {}",
            style("dry-run").yellow().bold(),
            style(message.username.as_deref().unwrap_or("webhook")).dim()
        );
        println!("{json}");
        Ok(())
    }
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}
