use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP settings shared by every client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout (default: 30s).
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl HttpConfig {
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs.max(1));
        self
    }
}

/// How many ranked entries to show and over how many days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsWindow {
    pub count: u32,
    pub days: u32,
}

impl Default for StatsWindow {
    fn default() -> Self {
        Self { count: 5, days: 30 }
    }
}

impl StatsWindow {
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count.max(1);
        self
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryStatsConfig {
    /// Library names (`section_name`) left out of the report.
    pub excluded_libraries: Vec<String>,
}

impl LibraryStatsConfig {
    pub fn is_excluded(&self, section_name: &str) -> bool {
        self.excluded_libraries.iter().any(|l| l == section_name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopUsersConfig {
    pub window: StatsWindow,
    /// Media type buckets to post (`TV`, `Movies`, `Music`). Empty means all.
    pub media_types: Vec<String>,
}

impl TopUsersConfig {
    pub fn includes(&self, media_type: &str) -> bool {
        self.media_types.is_empty() || self.media_types.iter().any(|m| m == media_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_count_is_at_least_one() {
        let w = StatsWindow::default().with_count(0).with_days(7);
        assert_eq!(w.count, 1);
        assert_eq!(w.days, 7);
    }

    #[test]
    fn empty_media_types_include_everything() {
        let all = TopUsersConfig::default();
        assert!(all.includes("TV"));
        let some = TopUsersConfig {
            media_types: vec!["Movies".into()],
            ..TopUsersConfig::default()
        };
        assert!(some.includes("Movies"));
        assert!(!some.includes("TV"));
    }

    #[test]
    fn exclusion_matches_exact_names() {
        let c = LibraryStatsConfig {
            excluded_libraries: vec!["Home Videos".into()],
        };
        assert!(c.is_excluded("Home Videos"));
        assert!(!c.is_excluded("Home"));
    }
}
