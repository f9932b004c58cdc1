//! Small formatting helpers shared by the jobs.

use std::fmt;

pub const PLEX_ICON_URL: &str = "https://i.imgur.com/FNoiYXP.png";
pub const TMDB_POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const TMDB_PLACEHOLDER_IMAGE: &str = "https://www.programmableweb.com/sites/default/files/TMDb.jpg";
pub const TMDB_GUID_SCHEME: &str = "tmdb://";

const TERABYTE: u64 = 1_000_000_000_000;
const GIGABYTE: f64 = 1e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Gb,
    Tb,
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gb => write!(f, "Gb"),
            Self::Tb => write!(f, "Tb"),
        }
    }
}

/// A byte count scaled to GB or TB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LibrarySize {
    pub value: f64,
    pub unit: SizeUnit,
}

impl LibrarySize {
    /// `10^12` bytes and above are shown in TB, anything smaller in GB.
    pub fn from_bytes(bytes: u64) -> Self {
        if bytes >= TERABYTE {
            Self {
                value: round2(bytes as f64 / TERABYTE as f64),
                unit: SizeUnit::Tb,
            }
        } else {
            Self {
                value: round2(bytes as f64 / GIGABYTE),
                unit: SizeUnit::Gb,
            }
        }
    }
}

impl fmt::Display for LibrarySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.value, self.unit)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Deep link that opens an item in the Plex web app.
pub fn plex_details_url(server_id: &str, rating_key: &str) -> String {
    format!(
        "https://app.plex.tv/desktop/#!/server/{server_id}/details?key=%2Flibrary%2Fmetadata%2F{rating_key}"
    )
}

pub fn tmdb_page_url(kind: &str, id: u64) -> String {
    format!("https://www.themoviedb.org/{kind}/{id}")
}

pub fn tmdb_poster_url(poster_path: &str) -> String {
    format!("{TMDB_POSTER_BASE}{poster_path}")
}

/// The TMDB id from the first `tmdb://` GUID, if any.
pub fn tmdb_id_from_guids(guids: &[String]) -> Option<&str> {
    guids
        .iter()
        .find_map(|g| g.strip_prefix(TMDB_GUID_SCHEME))
        .filter(|id| !id.is_empty())
}

/// One line of a fixed-width table: a label and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub metric: String,
    pub value: String,
}

impl TableRow {
    pub fn new(metric: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            value: value.into(),
        }
    }
}

/// Render rows as `metric<pad>\tvalue` lines, padding every metric to the
/// longest one.
pub fn aligned_table(rows: &[TableRow]) -> String {
    let width = rows
        .iter()
        .map(|r| r.metric.chars().count())
        .max()
        .unwrap_or(0);
    rows.iter()
        .map(|r| format!("{:<width$}\t{}", r.metric, r.value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bold heading plus the table in a code block, as posted to the channel.
pub fn table_message(heading: &str, days: u32, rows: &[TableRow]) -> String {
    format!(
        "**{heading}** for the last **{days}** Days!\n```\n{}\n```",
        aligned_table(rows)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_boundary_at_one_terabyte() {
        let below = LibrarySize::from_bytes(999_999_999_999);
        assert_eq!(below.unit, SizeUnit::Gb);
        assert_eq!(below.value, 1000.0);

        let at = LibrarySize::from_bytes(1_000_000_000_000);
        assert_eq!(at.unit, SizeUnit::Tb);
        assert_eq!(at.value, 1.0);
    }

    #[test]
    fn size_rounds_to_two_decimals() {
        let size = LibrarySize::from_bytes(2_345_678_901_234);
        assert_eq!(size.value, 2.35);
        assert_eq!(size.to_string(), "2.35 Tb");
        assert_eq!(LibrarySize::from_bytes(123_456_789).to_string(), "0.12 Gb");
        assert_eq!(LibrarySize::from_bytes(0).to_string(), "0.00 Gb");
    }

    #[test]
    fn tmdb_id_comes_from_tmdb_guid() {
        let guids = vec![
            "imdb://tt0137523".to_string(),
            "tmdb://550".to_string(),
            "tvdb://1".to_string(),
        ];
        assert_eq!(tmdb_id_from_guids(&guids), Some("550"));
        assert_eq!(tmdb_id_from_guids(&["imdb://tt1".to_string()]), None);
        assert_eq!(tmdb_id_from_guids(&["tmdb://".to_string()]), None);
        assert_eq!(tmdb_id_from_guids(&[]), None);
    }

    #[test]
    fn plex_link_encodes_metadata_key() {
        assert_eq!(
            plex_details_url("srv", "42"),
            "https://app.plex.tv/desktop/#!/server/srv/details?key=%2Flibrary%2Fmetadata%2F42"
        );
    }

    #[test]
    fn table_pads_to_longest_metric() {
        let rows = vec![
            TableRow::new("alice", "12 plays"),
            TableRow::new("bob", "3 plays"),
            TableRow::new("charlotte", "1 plays"),
        ];
        assert_eq!(
            aligned_table(&rows),
            "alice    \t12 plays\nbob      \t3 plays\ncharlotte\t1 plays"
        );
    }

    #[test]
    fn table_message_wraps_code_block() {
        let rows = vec![TableRow::new("a", "1")];
        assert_eq!(
            table_message("Top 5 Users Overall", 30, &rows),
            "**Top 5 Users Overall** for the last **30** Days!\n```\na\t1\n```"
        );
    }
}
