//! TMDB metadata lookups.
//!
//! A lookup resolves in at most two requests: a direct fetch when the TMDB id
//! is already known, otherwise a title/year search whose first hit is then
//! fetched in full. Every miss or failure collapses to `None`; callers render
//! placeholder content instead of failing the run.

use std::fmt;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{decode, get_json, send, SourceError};

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    pub fn as_path(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// The subset of a TMDB movie or TV record the jobs render.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TmdbDetails {
    pub id: u64,
    pub overview: String,
    pub poster_path: Option<String>,
    pub vote_average: f64,
    pub number_of_seasons: Option<u32>,
    pub episode_run_time: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: u64,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(client: Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Resolve an item to its TMDB record.
    ///
    /// `tmdb_id` short-circuits the search. Errors are logged and reported as
    /// `None`, same as a miss.
    pub async fn lookup(
        &self,
        kind: MediaKind,
        tmdb_id: Option<&str>,
        title: &str,
        year: &str,
    ) -> Option<TmdbDetails> {
        let result = match tmdb_id {
            Some(id) => self.details(kind, id).await,
            None => self.search_then_fetch(kind, title, year).await,
        };
        match result {
            Ok(Some(details)) => {
                debug!(%kind, title, id = details.id, "TMDB lookup hit");
                Some(details)
            }
            Ok(None) => {
                debug!(%kind, title, tmdb_id, "TMDB lookup found nothing");
                None
            }
            Err(e) => {
                warn!(%kind, title, error = %e, "TMDB lookup failed");
                None
            }
        }
    }

    /// Fetch a record by id. A body with `"success": false` is a miss,
    /// whatever the status code.
    pub async fn details(&self, kind: MediaKind, id: &str) -> Result<Option<TmdbDetails>, SourceError> {
        let url = format!("{}/{}/{}", self.base_url, kind, id);
        let request = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", "en-US")]);

        let (status, body) = send(request, &url).await?;
        let value: Value = decode(&body, &url)?;
        if value.get("success") == Some(&Value::Bool(false)) {
            return Ok(None);
        }
        if !(200..300).contains(&status) {
            return Err(SourceError::Status { url, status, body });
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| SourceError::Decode {
                url,
                message: e.to_string(),
            })
    }

    /// Search by title (and year when known), take the first hit.
    pub async fn search(&self, kind: MediaKind, title: &str, year: &str) -> Result<Option<u64>, SourceError> {
        let url = format!("{}/search/{}", self.base_url, kind);
        let mut params = vec![
            ("api_key", self.api_key.as_str()),
            ("language", "en-US"),
            ("page", "1"),
            ("include_adult", "false"),
            ("query", title),
        ];
        if !year.trim().is_empty() {
            params.push(("year", year.trim()));
        }
        let request = self.client.get(&url).query(&params);

        let results: SearchResults = get_json(request, &url).await?;
        Ok(results.results.first().map(|hit| hit.id))
    }

    async fn search_then_fetch(
        &self,
        kind: MediaKind,
        title: &str,
        year: &str,
    ) -> Result<Option<TmdbDetails>, SourceError> {
        match self.search(kind, title, year).await? {
            Some(id) => self.details(kind, &id.to_string()).await,
            None => Ok(None),
        }
    }
}
