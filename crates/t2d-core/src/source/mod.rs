//! HTTP clients for the upstream APIs.

mod sabnzbd;
mod tautulli;
mod tmdb;

pub use sabnzbd::{Queue, QueueSlot, SabnzbdClient};
pub use tautulli::{
    HomeStat, HomeStatRow, LibraryRow, MetadataRecord, Session, TautulliClient, UserPlaysRow,
};
pub use tmdb::{MediaKind, TmdbClient, TmdbDetails, TMDB_BASE_URL};

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("tautulli2discord/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },
    #[error("HTTP error {status} fetching {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("API error from {url}: {message}")]
    Api { url: String, message: String },
    #[error("Unexpected response shape from {url}: {message}")]
    Decode { url: String, message: String },
}

impl SourceError {
    /// Transport and status failures are reported to the webhook; a response
    /// of the wrong shape is not.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Decode { .. })
    }
}

/// Build the HTTP client shared by every source and the webhook notifier.
pub fn build_client(timeout: Duration) -> Result<Client, SourceError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .user_agent(USER_AGENT)
        .gzip(true)
        .build()
        .map_err(|e| SourceError::Network {
            url: String::new(),
            reason: format!("failed to build HTTP client: {e}"),
        })
}

/// Send a GET and decode the JSON body. Non-2xx responses are errors.
async fn get_json<T: DeserializeOwned>(request: RequestBuilder, url: &str) -> Result<T, SourceError> {
    let (status, body) = send(request, url).await?;
    if !(200..300).contains(&status) {
        warn!(url, status, "Source returned error status");
        return Err(SourceError::Status {
            url: url.to_string(),
            status,
            body,
        });
    }
    decode(&body, url)
}

/// Send a GET and return the status code and body text, whatever the status.
async fn send(request: RequestBuilder, url: &str) -> Result<(u16, String), SourceError> {
    debug!(url, "GET");
    let response = request.send().await.map_err(|e| {
        warn!(url, error = %e, "Source request failed");
        SourceError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        }
    })?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| SourceError::Network {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok((status, body))
}

fn decode<T: DeserializeOwned>(body: &str, url: &str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Accept a string, a number, a bool or null and keep it as text.
///
/// Tautulli and SABnzbd report counters as strings in some versions and as
/// numbers in others.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// A list of strings where upstream may send `null` instead of `[]`.
pub(crate) fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Like [`lenient_string`] but parsed as an integer; blanks become 0.
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(0),
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| D::Error::custom(format!("number out of range: {n}"))),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(0),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected an integer, got {s:?}"))),
        other => Err(D::Error::custom(format!("expected an integer, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "lenient_string")]
        year: String,
        #[serde(default, deserialize_with = "lenient_i64")]
        count: i64,
    }

    #[test]
    fn lenient_fields_accept_strings_and_numbers() {
        let a: Row = serde_json::from_str(r#"{"year": 2018, "count": "12"}"#).unwrap();
        assert_eq!(a.year, "2018");
        assert_eq!(a.count, 12);

        let b: Row = serde_json::from_str(r#"{"year": "2018", "count": 7}"#).unwrap();
        assert_eq!(b.year, "2018");
        assert_eq!(b.count, 7);

        let c: Row = serde_json::from_str(r#"{"year": null, "count": ""}"#).unwrap();
        assert_eq!(c.year, "");
        assert_eq!(c.count, 0);

        let d: Row = serde_json::from_str("{}").unwrap();
        assert_eq!(d.year, "");
        assert_eq!(d.count, 0);
    }

    #[test]
    fn lenient_i64_rejects_words() {
        let err = serde_json::from_str::<Row>(r#"{"count": "many"}"#).unwrap_err();
        assert!(err.to_string().contains("expected an integer"));
    }

    #[test]
    fn decode_errors_are_not_reportable() {
        let err = decode::<Row>("not json", "http://x").unwrap_err();
        assert!(!err.is_reportable());
        let err = SourceError::Status {
            url: "http://x".into(),
            status: 502,
            body: String::new(),
        };
        assert!(err.is_reportable());
    }
}
