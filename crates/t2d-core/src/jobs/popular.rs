//! Most watched movies and shows, one message per ranking.

use tracing::{debug, info, warn};

use super::{Delivery, JobContext, JobError, Outcome};
use crate::config::StatsWindow;
use crate::discord::{colors, Embed, EmbedError, WebhookMessage};
use crate::format::{
    plex_details_url, tmdb_id_from_guids, tmdb_page_url, tmdb_poster_url, PLEX_ICON_URL,
    TMDB_PLACEHOLDER_IMAGE,
};
use crate::source::{HomeStat, HomeStatRow, MediaKind, SourceError, TautulliClient, TmdbClient, TmdbDetails};

pub const USERNAME: &str = "Popular on Plex";
pub const MOVIES_CONTENT: &str = "**Popular Movies on Plex:**";
pub const TV_CONTENT: &str = "**Popular TV Shows on Plex:**";
pub const NOTHING_TITLE: &str = "Nothing has been watched recently.";

const UNKNOWN_RATING: &str = "??? :star:'s";

pub async fn run(
    ctx: &JobContext<'_>,
    tautulli: &TautulliClient,
    tmdb: &TmdbClient,
    window: StatsWindow,
) -> Result<Outcome, JobError> {
    let fetched = async {
        let server_id = tautulli.server_identifier().await?;
        let stats = tautulli.home_stats(window.days, window.count).await?;
        Ok::<_, SourceError>((server_id, stats))
    };
    let (server_id, stats) = match fetched.await {
        Ok(v) => v,
        Err(e) if e.is_reportable() => {
            return Ok(ctx.abort(USERNAME, "popular items from Tautulli", &e).await)
        }
        Err(e) => return Err(e.into()),
    };

    let movies = group_rows(&stats, "popular_movies");
    let shows = group_rows(&stats, "popular_tv");
    info!(movies = movies.len(), shows = shows.len(), "Fetched popular items");

    let mut movie_embeds = Vec::with_capacity(movies.len());
    for row in movies {
        let details = lookup(ctx, tautulli, tmdb, MediaKind::Movie, row).await;
        keep_rendered(&mut movie_embeds, row, movie_embed(ctx, row, &server_id, details.as_ref()));
    }
    let mut show_embeds = Vec::with_capacity(shows.len());
    for row in shows {
        let details = lookup(ctx, tautulli, tmdb, MediaKind::Tv, row).await;
        keep_rendered(&mut show_embeds, row, show_embed(ctx, row, &server_id, details.as_ref()));
    }

    let mut delivery = Delivery::default();
    delivery = delivery.merge(ctx.deliver(ranking_message(ctx, MOVIES_CONTENT, movie_embeds)?).await);
    delivery = delivery.merge(ctx.deliver(ranking_message(ctx, TV_CONTENT, show_embeds)?).await);
    Ok(Outcome::Completed(delivery))
}

/// One bad row never costs the rest of the ranking.
fn keep_rendered(embeds: &mut Vec<Embed>, row: &HomeStatRow, built: Result<Embed, EmbedError>) {
    match built {
        Ok(embed) => embeds.push(embed),
        Err(e) => warn!(title = %row.title, error = %e, "Skipping ranked item that cannot be rendered"),
    }
}

/// Rows of the group with `stat_id`, or nothing when the group is absent.
pub fn group_rows<'s>(stats: &'s [HomeStat], stat_id: &str) -> &'s [HomeStatRow] {
    stats
        .iter()
        .find(|s| s.stat_id == stat_id)
        .map(|s| s.rows.as_slice())
        .unwrap_or_default()
}

/// The TMDB id comes from the item's Plex GUIDs when Tautulli knows them,
/// otherwise the lookup falls back to a title search.
async fn lookup(
    ctx: &JobContext<'_>,
    tautulli: &TautulliClient,
    tmdb: &TmdbClient,
    kind: MediaKind,
    row: &HomeStatRow,
) -> Option<TmdbDetails> {
    let record = if row.rating_key.is_empty() {
        None
    } else {
        match tautulli.metadata(&row.rating_key).await {
            Ok(record) => record,
            Err(e) => {
                debug!(rating_key = %row.rating_key, error = %e, "No metadata record, searching by title");
                None
            }
        }
    };
    let tmdb_id = record.as_ref().and_then(|r| tmdb_id_from_guids(&r.guids));
    tmdb.lookup(kind, tmdb_id, &ctx.sanitize(&row.title), &row.year)
        .await
}

pub fn movie_embed(
    ctx: &JobContext<'_>,
    row: &HomeStatRow,
    server_id: &str,
    details: Option<&TmdbDetails>,
) -> Result<Embed, EmbedError> {
    let builder = Embed::builder(ctx.sanitize_title(&row.title))
        .color(colors::MOVIE)
        .author("Open on Plex", plex_details_url(server_id, &row.rating_key), PLEX_ICON_URL);

    let builder = match details {
        Some(d) => builder
            .url(tmdb_page_url(MediaKind::Movie.as_path(), d.id))
            .description(ctx.sanitize(&d.overview))
            .thumbnail(poster(d))
            .field("Rating", rating_text(d.vote_average), false),
        None => builder
            .url(format!("https://www.themoviedb.org/{}/", MediaKind::Movie.as_path()))
            .description("Unknown")
            .thumbnail(TMDB_PLACEHOLDER_IMAGE)
            .field("Rating", UNKNOWN_RATING, false),
    };

    builder
        .field("Users Watched", &row.users_watched, true)
        .field("Released", &row.year, true)
        .footer("Updated")
        .timestamp(ctx.now)
        .build()
}

pub fn show_embed(
    ctx: &JobContext<'_>,
    row: &HomeStatRow,
    server_id: &str,
    details: Option<&TmdbDetails>,
) -> Result<Embed, EmbedError> {
    let builder = Embed::builder(ctx.sanitize_title(&row.title))
        .color(colors::TV)
        .author("Open on Plex", plex_details_url(server_id, &row.rating_key), PLEX_ICON_URL);

    let builder = match details {
        Some(d) => {
            let seasons = d
                .number_of_seasons
                .map_or_else(|| "??? Seasons".to_string(), |n| format!("{n} Seasons"));
            let runtime = d
                .episode_run_time
                .first()
                .map_or_else(|| "Unknown".to_string(), |m| format!("{m} Minutes"));
            builder
                .url(tmdb_page_url(MediaKind::Tv.as_path(), d.id))
                .description(ctx.sanitize(&d.overview))
                .thumbnail(poster(d))
                .field("Rating", rating_text(d.vote_average), false)
                .field("Users Watched", &row.users_watched, true)
                .field("Seasons", seasons, true)
                .field("Runtime", runtime, true)
        }
        None => builder
            .description("Unknown")
            .thumbnail(TMDB_PLACEHOLDER_IMAGE)
            .field("Rating", UNKNOWN_RATING, false)
            .field("Users Watched", &row.users_watched, true)
            .field("Seasons", "??? Seasons", true)
            .field("Runtime", "??? Minutes", true),
    };

    builder.footer("Updated").timestamp(ctx.now).build()
}

pub fn ranking_message(
    ctx: &JobContext<'_>,
    content: &str,
    embeds: Vec<Embed>,
) -> Result<WebhookMessage, EmbedError> {
    let embeds = if embeds.is_empty() {
        vec![ctx.nothing_embed(NOTHING_TITLE)?]
    } else {
        embeds
    };
    Ok(WebhookMessage::new()
        .with_username(USERNAME)
        .with_content(content)
        .with_embeds(embeds))
}

fn poster(details: &TmdbDetails) -> String {
    details
        .poster_path
        .as_deref()
        .map_or_else(|| TMDB_PLACEHOLDER_IMAGE.to_string(), tmdb_poster_url)
}

/// `7.5 :star:'s`. Whole numbers keep one decimal, as TMDB shows them.
fn rating_text(vote_average: f64) -> String {
    if vote_average.fract() == 0.0 {
        format!("{vote_average:.1} :star:'s")
    } else {
        format!("{vote_average} :star:'s")
    }
}
