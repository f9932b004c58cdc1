//! Top users, platforms and concurrent streams as plain-text tables.

use tracing::{debug, info};

use super::{Delivery, JobContext, JobError, Outcome};
use crate::config::StatsWindow;
use crate::discord::{EmbedError, WebhookMessage};
use crate::format::{table_message, TableRow};
use crate::sanitize::strip_appended_year;
use crate::source::{HomeStat, HomeStatRow, TautulliClient};

pub const USERNAME: &str = "Top Plex Stats";
pub const NOTHING_TITLE: &str = "No stats for this period.";

/// A rendered stat group: its heading and table rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatGroup {
    pub heading: String,
    pub rows: Vec<TableRow>,
}

pub async fn run(ctx: &JobContext<'_>, tautulli: &TautulliClient, window: StatsWindow) -> Result<Outcome, JobError> {
    let stats = match tautulli.home_stats(window.days, window.count).await {
        Ok(stats) => stats,
        Err(e) if e.is_reportable() => {
            return Ok(ctx.abort(USERNAME, "home stats from Tautulli", &e).await)
        }
        Err(e) => return Err(e.into()),
    };

    let groups = stat_groups(ctx, &stats, window.count);
    info!(groups = groups.len(), "Built stat groups");

    let mut delivery = Delivery::default();
    for message in group_messages(ctx, &groups, window.days)? {
        delivery = delivery.merge(ctx.deliver(message).await);
    }
    Ok(Outcome::Completed(delivery))
}

/// Turn the recognised home-stat groups into tables, in source order.
/// Unknown and empty groups are skipped.
pub fn stat_groups(ctx: &JobContext<'_>, stats: &[HomeStat], count: u32) -> Vec<StatGroup> {
    let limit = count as usize;
    let mut groups = Vec::new();
    for stat in stats {
        let group = match stat.stat_id.as_str() {
            "top_users" => StatGroup {
                heading: format!("Top {count} Users Overall"),
                rows: ranked(&stat.rows, |r| r.total_plays, Some(limit), |r| {
                    TableRow::new(&r.friendly_name, format!("{} plays", r.total_plays))
                }),
            },
            "top_platforms" => StatGroup {
                heading: format!("Top {count} Platforms"),
                rows: ranked(&stat.rows, |r| r.total_plays, Some(limit), |r| {
                    TableRow::new(&r.platform, format!("{} plays", r.total_plays))
                }),
            },
            "most_concurrent" => StatGroup {
                heading: "Top Concurrent Streams".to_string(),
                rows: ranked(&stat.rows, |r| r.count, None, |r| {
                    TableRow::new(ctx.sanitize(&strip_appended_year(&r.title)), r.count.to_string())
                }),
            },
            other => {
                debug!(stat_id = other, "Ignoring stat group");
                continue;
            }
        };
        if !group.rows.is_empty() {
            groups.push(group);
        }
    }
    groups
}

/// Sort descending by `key` (ties keep source order), cut to `limit`, render.
fn ranked(
    rows: &[HomeStatRow],
    key: impl Fn(&HomeStatRow) -> i64,
    limit: Option<usize>,
    render: impl Fn(&HomeStatRow) -> TableRow,
) -> Vec<TableRow> {
    let mut sorted: Vec<&HomeStatRow> = rows.iter().collect();
    sorted.sort_by_key(|r| std::cmp::Reverse(key(r)));
    if let Some(limit) = limit {
        sorted.truncate(limit);
    }
    sorted.into_iter().map(render).collect()
}

/// One content-only message per group, or a single "nothing" embed.
pub fn group_messages(ctx: &JobContext<'_>, groups: &[StatGroup], days: u32) -> Result<Vec<WebhookMessage>, EmbedError> {
    if groups.is_empty() {
        return Ok(vec![WebhookMessage::new().with_embeds(vec![ctx.nothing_embed(NOTHING_TITLE)?])]);
    }
    Ok(groups
        .iter()
        .map(|g| WebhookMessage::new().with_content(table_message(&g.heading, days, &g.rows)))
        .collect())
}
