//! What is playing on Plex right now, one embed per session.

use tracing::{debug, info, warn};

use super::{deliver_gated, JobContext, JobError, Outcome};
use crate::discord::{colors, Embed, EmbedError, WebhookMessage};
use crate::format::{plex_details_url, tmdb_id_from_guids, tmdb_page_url, tmdb_poster_url, PLEX_ICON_URL};
use crate::run_counter::RunCounter;
use crate::source::{MediaKind, Session, SourceError, TautulliClient, TmdbClient, TmdbDetails};

pub const USERNAME: &str = "Current Streams";
pub const CONTENT: &str = "**Current Streams on Plex:**";
pub const NOTHING_TITLE: &str = "Nothing is currently streaming.";

pub async fn run(
    ctx: &JobContext<'_>,
    tautulli: &TautulliClient,
    tmdb: &TmdbClient,
    counter: &RunCounter,
) -> Result<Outcome, JobError> {
    let fetched = async {
        let server_id = tautulli.server_identifier().await?;
        let sessions = tautulli.activity().await?;
        Ok::<_, SourceError>((server_id, sessions))
    };
    let (server_id, sessions) = match fetched.await {
        Ok(v) => v,
        Err(e) if e.is_reportable() => {
            return Ok(ctx.abort(USERNAME, "current streams from Tautulli", &e).await)
        }
        Err(e) => return Err(e.into()),
    };
    info!(sessions = sessions.len(), "Fetched current activity");

    let mut embeds = Vec::with_capacity(sessions.len());
    for session in &sessions {
        let details = lookup(ctx, tmdb, session).await;
        match session_embed(ctx, session, &server_id, details.as_ref()) {
            Ok(embed) => embeds.push(embed),
            Err(e) => {
                warn!(title = %session.title, error = %e, "Skipping session that cannot be rendered")
            }
        }
    }

    let message = streams_message(ctx, embeds)?;
    deliver_gated(ctx, counter, sessions.len(), message).await
}

async fn lookup(ctx: &JobContext<'_>, tmdb: &TmdbClient, session: &Session) -> Option<TmdbDetails> {
    let details = match session.media_type.as_str() {
        "episode" => {
            let show = if session.grandparent_title.is_empty() {
                &session.title
            } else {
                &session.grandparent_title
            };
            // The session year is the episode's, not the show's, so the
            // search goes by title alone.
            tmdb.lookup(
                MediaKind::Tv,
                tmdb_id_from_guids(&session.grandparent_guids),
                &ctx.sanitize(show),
                "",
            )
            .await
        }
        "movie" => {
            tmdb.lookup(
                MediaKind::Movie,
                tmdb_id_from_guids(&session.guids),
                &ctx.sanitize(&session.title),
                &session.year,
            )
            .await
        }
        _ => return None,
    };
    debug!(title = %session.title, found = details.is_some(), "Stream metadata lookup");
    details
}

/// Build the embed for one session. `details` adds the TMDB link and poster.
pub fn session_embed(
    ctx: &JobContext<'_>,
    session: &Session,
    server_id: &str,
    details: Option<&TmdbDetails>,
) -> Result<Embed, EmbedError> {
    let (title, color, rating_key, tmdb_kind) = match session.media_type.as_str() {
        "episode" => (
            ctx.sanitize_title(&session.full_title),
            colors::TV,
            &session.grandparent_rating_key,
            Some(MediaKind::Tv),
        ),
        "movie" => (
            ctx.sanitize_title(&session.title),
            colors::MOVIE,
            &session.rating_key,
            Some(MediaKind::Movie),
        ),
        _ => (ctx.sanitize_title(&session.title), colors::MUSIC, &session.rating_key, None),
    };

    let mut builder = Embed::builder(title)
        .color(color)
        .author("Open on Plex", plex_details_url(server_id, rating_key), PLEX_ICON_URL)
        .description(ctx.sanitize(&session.summary))
        .field("User", &session.friendly_name, false);

    builder = match session.media_type.as_str() {
        "episode" => builder
            .field("Season", &session.parent_media_index, true)
            .field("Episode", &session.media_index, true),
        "movie" => builder
            .field("Resolution", &session.stream_video_full_resolution, true)
            .field("Direct Play/Transcode", &session.transcode_decision, true),
        "track" => builder
            .field("Album", ctx.sanitize(&session.parent_title), true)
            .field("Track", &session.media_index, true),
        _ => builder,
    };

    if let (Some(kind), Some(details)) = (tmdb_kind, details) {
        builder = builder.url(tmdb_page_url(kind.as_path(), details.id));
        if let Some(poster) = details.poster_path.as_deref() {
            builder = builder.thumbnail(tmdb_poster_url(poster));
        }
    }

    builder
        .footer(format!("{} - {}%", session.state, session.progress_percent))
        .timestamp(ctx.now)
        .build()
}

/// Wrap session embeds, or the "nothing streaming" embed when there are none.
pub fn streams_message(ctx: &JobContext<'_>, embeds: Vec<Embed>) -> Result<WebhookMessage, EmbedError> {
    if embeds.is_empty() {
        return Ok(WebhookMessage::new().with_embeds(vec![ctx.nothing_embed(NOTHING_TITLE)?]));
    }
    Ok(WebhookMessage::new()
        .with_username(USERNAME)
        .with_content(CONTENT)
        .with_embeds(embeds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::Recorder;
    use crate::sanitize::TableSanitizer;

    fn episode() -> Session {
        Session {
            media_type: "episode".into(),
            title: "Pilot".into(),
            full_title: "Breaking Bad - Pilot".into(),
            grandparent_title: "Breaking Bad".into(),
            summary: "Walter: a chemist.".into(),
            friendly_name: "alice".into(),
            state: "playing".into(),
            progress_percent: "42".into(),
            parent_media_index: "1".into(),
            media_index: "1".into(),
            rating_key: "101".into(),
            grandparent_rating_key: "100".into(),
            grandparent_guids: vec!["tmdb://1396".into()],
            ..Session::default()
        }
    }

    fn movie() -> Session {
        Session {
            media_type: "movie".into(),
            title: "Amélie".into(),
            year: "2001".into(),
            summary: "Paris.".into(),
            friendly_name: "bob".into(),
            state: "paused".into(),
            progress_percent: "10".into(),
            rating_key: "200".into(),
            stream_video_full_resolution: "1080p".into(),
            transcode_decision: "direct play".into(),
            ..Session::default()
        }
    }

    #[test]
    fn episode_embed_fields() {
        let recorder = Recorder::default();
        let sanitizer = TableSanitizer::new();
        let ctx = JobContext::new(&recorder, &sanitizer);
        let details = TmdbDetails {
            id: 1396,
            poster_path: Some("/bb.jpg".into()),
            ..TmdbDetails::default()
        };

        let embed = session_embed(&ctx, &episode(), "srv", Some(&details)).unwrap();

        assert_eq!(embed.title, "Breaking Bad - Pilot");
        assert_eq!(embed.color, colors::TV);
        assert_eq!(embed.description.as_deref(), Some("Walter a chemist."));
        let names: Vec<_> = embed.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["User", "Season", "Episode"]);
        assert!(!embed.fields[0].inline);
        assert_eq!(
            embed.author.unwrap().url.unwrap(),
            "https://app.plex.tv/desktop/#!/server/srv/details?key=%2Flibrary%2Fmetadata%2F100"
        );
        assert_eq!(embed.url.as_deref(), Some("https://www.themoviedb.org/tv/1396"));
        assert_eq!(embed.thumbnail.unwrap().url, "https://image.tmdb.org/t/p/w500/bb.jpg");
        assert_eq!(embed.footer.unwrap().text, "playing - 42%");
    }

    #[test]
    fn movie_embed_without_metadata_has_no_link() {
        let recorder = Recorder::default();
        let sanitizer = TableSanitizer::new();
        let ctx = JobContext::new(&recorder, &sanitizer);

        let embed = session_embed(&ctx, &movie(), "srv", None).unwrap();

        assert_eq!(embed.title, "Amelie");
        assert_eq!(embed.color, colors::MOVIE);
        assert_eq!(embed.field("Resolution").unwrap().value, "1080p");
        assert_eq!(embed.field("Direct Play/Transcode").unwrap().value, "direct play");
        assert!(embed.url.is_none());
        assert!(embed.thumbnail.is_none());
    }

    #[test]
    fn track_embed_shows_album() {
        let recorder = Recorder::default();
        let sanitizer = TableSanitizer::new();
        let ctx = JobContext::new(&recorder, &sanitizer);
        let track = Session {
            media_type: "track".into(),
            title: "Song".into(),
            parent_title: "Album: Deluxe".into(),
            media_index: "3".into(),
            friendly_name: "carol".into(),
            ..Session::default()
        };

        let embed = session_embed(&ctx, &track, "srv", None).unwrap();
        assert_eq!(embed.color, colors::MUSIC);
        assert_eq!(embed.field("Album").unwrap().value, "Album Deluxe");
        assert_eq!(embed.field("Track").unwrap().value, "3");
    }

    #[test]
    fn non_latin_title_still_renders() {
        let recorder = Recorder::default();
        let sanitizer = TableSanitizer::new();
        let ctx = JobContext::new(&recorder, &sanitizer);
        let session = Session {
            title: "千と千尋の神隠し".into(),
            ..movie()
        };

        let embed = session_embed(&ctx, &session, "srv", None).unwrap();
        assert_eq!(embed.title, crate::jobs::UNTITLED);
        assert_eq!(embed.field("User").unwrap().value, "bob");
    }

    #[test]
    fn no_sessions_gives_single_nothing_embed() {
        let recorder = Recorder::default();
        let sanitizer = TableSanitizer::new();
        let ctx = JobContext::new(&recorder, &sanitizer);

        let message = streams_message(&ctx, Vec::new()).unwrap();
        assert_eq!(message.embeds.len(), 1);
        assert_eq!(message.embeds[0].title, "Nothing is currently streaming.");
        assert_eq!(message.embeds[0].color, colors::NOTHING);
    }
}
