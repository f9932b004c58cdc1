//! Most active users per media type, from a raw query against Tautulli's
//! history database.

use tracing::info;

use super::{Delivery, JobContext, JobError, Outcome};
use crate::config::TopUsersConfig;
use crate::discord::{EmbedError, WebhookMessage};
use crate::format::{table_message, TableRow};
use crate::source::{TautulliClient, UserPlaysRow};

pub const USERNAME: &str = "Top Users";
pub const NOTHING_TITLE: &str = "No plays for this period.";

/// Plays per user and media type over the last `days` days. Media types are
/// folded to `TV`, `Movies` and `Music`.
pub fn plays_query(days: u32) -> String {
    format!(
        "SELECT \
COALESCE(\
MAX(CASE WHEN friendly_name IS NOT NULL AND TRIM(friendly_name) <> '' THEN friendly_name END), \
MAX(CASE WHEN username IS NOT NULL AND TRIM(username) <> '' THEN username ELSE 'Unknown' END)\
) AS FriendlyName, \
CASE \
WHEN media_type = 'episode' THEN 'TV' \
WHEN media_type = 'movie' THEN 'Movies' \
WHEN media_type = 'track' THEN 'Music' \
ELSE media_type \
END AS MediaType, \
count(user) AS Plays \
FROM (\
SELECT session_history.user, session_history.user_id, users.username, users.friendly_name, started, \
session_history_metadata.media_type \
FROM session_history \
JOIN session_history_metadata ON session_history_metadata.id = session_history.id \
LEFT OUTER JOIN users ON session_history.user_id = users.user_id \
WHERE datetime(session_history.stopped, 'unixepoch', 'localtime') >= datetime('now', '-{days} days', 'localtime') \
AND users.user_id <> 0 \
GROUP BY session_history.reference_id\
) AS Results \
GROUP BY user, media_type"
    )
}

/// Rows sharing a media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub media_type: String,
    pub rows: Vec<UserPlaysRow>,
}

pub async fn run(ctx: &JobContext<'_>, tautulli: &TautulliClient, config: &TopUsersConfig) -> Result<Outcome, JobError> {
    let window = config.window;
    let rows = match tautulli.sql(&plays_query(window.days)).await {
        Ok(rows) => rows,
        Err(e) if e.is_reportable() => {
            return Ok(ctx.abort(USERNAME, "top users from Tautulli", &e).await)
        }
        Err(e) => return Err(e.into()),
    };
    info!(rows = rows.len(), "Fetched plays per user");

    let buckets: Vec<Bucket> = bucket_by_media_type(rows)
        .into_iter()
        .filter(|b| config.includes(&b.media_type))
        .collect();

    let mut delivery = Delivery::default();
    for message in bucket_messages(ctx, &buckets, window.count, window.days)? {
        delivery = delivery.merge(ctx.deliver(message).await);
    }
    Ok(Outcome::Completed(delivery))
}

/// Group rows by `MediaType`, buckets in first-seen order.
pub fn bucket_by_media_type(rows: Vec<UserPlaysRow>) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();
    for row in rows {
        match buckets.iter_mut().find(|b| b.media_type == row.media_type) {
            Some(bucket) => bucket.rows.push(row),
            None => buckets.push(Bucket {
                media_type: row.media_type.clone(),
                rows: vec![row],
            }),
        }
    }
    buckets
}

/// Top `count` users of a bucket, most plays first (ties keep query order).
pub fn bucket_table(bucket: &Bucket, count: u32) -> Vec<TableRow> {
    let mut sorted: Vec<&UserPlaysRow> = bucket.rows.iter().collect();
    sorted.sort_by_key(|r| std::cmp::Reverse(r.plays));
    sorted
        .into_iter()
        .take(count as usize)
        .map(|r| TableRow::new(&r.friendly_name, r.plays.to_string()))
        .collect()
}

pub fn bucket_messages(
    ctx: &JobContext<'_>,
    buckets: &[Bucket],
    count: u32,
    days: u32,
) -> Result<Vec<WebhookMessage>, EmbedError> {
    if buckets.is_empty() {
        return Ok(vec![WebhookMessage::new().with_embeds(vec![ctx.nothing_embed(NOTHING_TITLE)?])]);
    }
    Ok(buckets
        .iter()
        .map(|b| {
            let heading = format!("Top {count} users in {}", b.media_type);
            WebhookMessage::new().with_content(table_message(&heading, days, &bucket_table(b, count)))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::Recorder;
    use crate::sanitize::TableSanitizer;

    fn row(name: &str, media_type: &str, plays: i64) -> UserPlaysRow {
        UserPlaysRow {
            friendly_name: name.into(),
            media_type: media_type.into(),
            plays,
        }
    }

    #[test]
    fn query_embeds_day_window() {
        let q = plays_query(14);
        assert!(q.contains("datetime('now', '-14 days', 'localtime')"));
        assert!(q.contains("AS FriendlyName"));
        assert!(q.contains("GROUP BY user, media_type"));
    }

    #[test]
    fn buckets_keep_first_seen_order() {
        let buckets = bucket_by_media_type(vec![
            row("a", "Movies", 1),
            row("b", "TV", 2),
            row("c", "Movies", 3),
            row("d", "Music", 4),
        ]);
        let types: Vec<_> = buckets.iter().map(|b| b.media_type.as_str()).collect();
        assert_eq!(types, ["Movies", "TV", "Music"]);
        assert_eq!(buckets[0].rows.len(), 2);
    }

    #[test]
    fn table_sorts_and_truncates() {
        let bucket = Bucket {
            media_type: "TV".into(),
            rows: vec![row("low", "TV", 1), row("high", "TV", 9), row("mid", "TV", 5), row("tie", "TV", 5)],
        };
        let table = bucket_table(&bucket, 3);
        assert_eq!(
            table,
            vec![
                TableRow::new("high", "9"),
                TableRow::new("mid", "5"),
                TableRow::new("tie", "5"),
            ]
        );
    }

    #[test]
    fn messages_per_bucket() {
        let recorder = Recorder::default();
        let sanitizer = TableSanitizer::new();
        let ctx = JobContext::new(&recorder, &sanitizer);
        let buckets = bucket_by_media_type(vec![row("alice", "TV", 12), row("bob", "TV", 3)]);

        let messages = bucket_messages(&ctx, &buckets, 5, 30).unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].content.as_deref(),
            Some("**Top 5 users in TV** for the last **30** Days!\n```\nalice\t12\nbob  \t3\n```")
        );
    }

    #[test]
    fn no_rows_gives_nothing_embed() {
        let recorder = Recorder::default();
        let sanitizer = TableSanitizer::new();
        let ctx = JobContext::new(&recorder, &sanitizer);
        let messages = bucket_messages(&ctx, &[], 5, 30).unwrap();
        assert_eq!(messages[0].embeds[0].title, NOTHING_TITLE);
    }
}
