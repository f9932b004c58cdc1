use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{get_json, lenient_i64, lenient_string, lenient_strings, SourceError};

/// Client for the Tautulli `api/v2` command endpoint.
#[derive(Debug, Clone)]
pub struct TautulliClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: ResponseBody,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

/// One active stream from `get_activity`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Session {
    pub media_type: String,
    pub title: String,
    pub full_title: String,
    pub grandparent_title: String,
    pub parent_title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub year: String,
    pub summary: String,
    pub friendly_name: String,
    pub state: String,
    #[serde(deserialize_with = "lenient_string")]
    pub progress_percent: String,
    #[serde(deserialize_with = "lenient_string")]
    pub parent_media_index: String,
    #[serde(deserialize_with = "lenient_string")]
    pub media_index: String,
    #[serde(deserialize_with = "lenient_string")]
    pub rating_key: String,
    #[serde(deserialize_with = "lenient_string")]
    pub grandparent_rating_key: String,
    pub stream_video_full_resolution: String,
    pub transcode_decision: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub guids: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub grandparent_guids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Activity {
    sessions: Vec<Session>,
}

#[derive(Debug, Deserialize)]
struct ServerInfo {
    pms_identifier: String,
}

/// One row of `get_libraries_table`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LibraryRow {
    #[serde(deserialize_with = "lenient_string")]
    pub section_id: String,
    pub section_name: String,
    pub section_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub count: String,
    #[serde(deserialize_with = "lenient_string")]
    pub parent_count: String,
    #[serde(deserialize_with = "lenient_string")]
    pub child_count: String,
}

#[derive(Debug, Deserialize)]
struct LibrariesTable {
    data: Vec<LibraryRow>,
}

#[derive(Debug, Deserialize)]
struct LibraryMediaInfo {
    #[serde(deserialize_with = "lenient_i64")]
    total_file_size: i64,
}

/// One stat group from `get_home_stats`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HomeStat {
    pub stat_id: String,
    pub rows: Vec<HomeStatRow>,
}

/// A row inside a [`HomeStat`]. Which fields are set depends on the group.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HomeStatRow {
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub year: String,
    #[serde(deserialize_with = "lenient_string")]
    pub rating_key: String,
    #[serde(deserialize_with = "lenient_string")]
    pub users_watched: String,
    pub friendly_name: String,
    pub platform: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub total_plays: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataRecord {
    #[serde(deserialize_with = "lenient_strings")]
    pub guids: Vec<String>,
}

/// A row of the plays-per-user query run through the `sql` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserPlaysRow {
    #[serde(rename = "FriendlyName", deserialize_with = "lenient_string")]
    pub friendly_name: String,
    #[serde(rename = "MediaType", deserialize_with = "lenient_string")]
    pub media_type: String,
    #[serde(rename = "Plays", deserialize_with = "lenient_i64")]
    pub plays: i64,
}

impl TautulliClient {
    pub fn new(client: Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/v2", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    /// Run `cmd` and decode `response.data` as `T`.
    async fn command<T: DeserializeOwned>(
        &self,
        cmd: &str,
        params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let data = self.command_data(cmd, params).await?;
        let url = self.display_url(cmd);
        serde_json::from_value(data).map_err(|e| SourceError::Decode {
            url,
            message: e.to_string(),
        })
    }

    async fn command_data(&self, cmd: &str, params: &[(&str, String)]) -> Result<Value, SourceError> {
        let url = self.display_url(cmd);
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("apikey", self.api_key.as_str()), ("cmd", cmd)])
            .query(params);

        let envelope: Envelope = get_json(request, &url).await?;
        let body = envelope.response;
        match body.result.as_deref() {
            None | Some("success") => Ok(body.data),
            Some(_) => Err(SourceError::Api {
                url,
                message: body.message.unwrap_or_else(|| "unknown error".to_string()),
            }),
        }
    }

    // The API key stays out of logs and error messages.
    fn display_url(&self, cmd: &str) -> String {
        format!("{}?cmd={}", self.endpoint, cmd)
    }

    /// `get_server_info` → the Plex server identifier used in deep links.
    pub async fn server_identifier(&self) -> Result<String, SourceError> {
        let info: ServerInfo = self.command("get_server_info", &[]).await?;
        Ok(info.pms_identifier)
    }

    /// `get_activity` → the current sessions.
    pub async fn activity(&self) -> Result<Vec<Session>, SourceError> {
        let activity: Activity = self.command("get_activity", &[]).await?;
        Ok(activity.sessions)
    }

    pub async fn libraries_table(&self) -> Result<Vec<LibraryRow>, SourceError> {
        let table: LibrariesTable = self.command("get_libraries_table", &[]).await?;
        Ok(table.data)
    }

    /// `get_library_media_info` → total size of a library in bytes.
    pub async fn library_total_size(&self, section_id: &str) -> Result<u64, SourceError> {
        let info: LibraryMediaInfo = self
            .command(
                "get_library_media_info",
                &[("section_id", section_id.to_string())],
            )
            .await?;
        Ok(info.total_file_size.max(0) as u64)
    }

    pub async fn home_stats(&self, days: u32, count: u32) -> Result<Vec<HomeStat>, SourceError> {
        self.command(
            "get_home_stats",
            &[
                ("grouping", "1".to_string()),
                ("time_range", days.to_string()),
                ("stats_count", count.to_string()),
            ],
        )
        .await
    }

    /// `get_metadata` for one item. Tautulli answers `{}` for unknown keys,
    /// which maps to `None`.
    pub async fn metadata(&self, rating_key: &str) -> Result<Option<MetadataRecord>, SourceError> {
        let data = self
            .command_data("get_metadata", &[("rating_key", rating_key.to_string())])
            .await?;
        match &data {
            Value::Null => return Ok(None),
            Value::Object(map) if map.is_empty() => return Ok(None),
            _ => {}
        }
        serde_json::from_value(data)
            .map(Some)
            .map_err(|e| SourceError::Decode {
                url: self.display_url("get_metadata"),
                message: e.to_string(),
            })
    }

    pub async fn sql(&self, query: &str) -> Result<Vec<UserPlaysRow>, SourceError> {
        self.command("sql", &[("query", query.to_string())]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok(data: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "response": { "result": "success", "message": null, "data": data }
        }))
    }

    async fn mount(server: &MockServer, cmd: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/api/v2"))
            .and(query_param("apikey", "key"))
            .and(query_param("cmd", cmd))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> TautulliClient {
        TautulliClient::new(Client::new(), &format!("{}/", server.uri()), "key")
    }

    #[tokio::test]
    async fn server_identifier_reads_pms_identifier() {
        let server = MockServer::start().await;
        mount(&server, "get_server_info", ok(json!({ "pms_identifier": "abc123" }))).await;

        assert_eq!(client(&server).server_identifier().await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn activity_decodes_loose_session_fields() {
        let server = MockServer::start().await;
        mount(
            &server,
            "get_activity",
            ok(json!({
                "stream_count": "1",
                "sessions": [{
                    "media_type": "episode",
                    "title": "Pilot",
                    "year": 2008,
                    "parent_media_index": "1",
                    "media_index": 1,
                    "progress_percent": "42",
                    "grandparent_guids": ["imdb://tt0903747", "tmdb://1396"],
                    "guids": null
                }]
            })),
        )
        .await;

        let sessions = client(&server).activity().await.unwrap();
        assert_eq!(sessions.len(), 1);
        let s = &sessions[0];
        assert_eq!(s.year, "2008");
        assert_eq!(s.media_index, "1");
        assert_eq!(s.progress_percent, "42");
        assert_eq!(s.grandparent_guids.len(), 2);
        assert!(s.guids.is_empty());
    }

    #[tokio::test]
    async fn activity_without_sessions_is_a_decode_error() {
        let server = MockServer::start().await;
        mount(&server, "get_activity", ok(json!({ "stream_count": "0" }))).await;

        let err = client(&server).activity().await.unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }), "{err}");
        assert!(!err.is_reportable());
    }

    #[tokio::test]
    async fn error_result_becomes_api_error() {
        let server = MockServer::start().await;
        mount(
            &server,
            "get_activity",
            ResponseTemplate::new(200).set_body_json(json!({
                "response": { "result": "error", "message": "Invalid apikey", "data": {} }
            })),
        )
        .await;

        let err = client(&server).activity().await.unwrap_err();
        match err {
            SourceError::Api { message, url } => {
                assert_eq!(message, "Invalid apikey");
                assert!(!url.contains("key="), "api key leaked into {url}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn status_error_is_reportable() {
        let server = MockServer::start().await;
        mount(&server, "get_activity", ResponseTemplate::new(503).set_body_string("down")).await;

        let err = client(&server).activity().await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 503, .. }));
        assert!(err.is_reportable());
    }

    #[tokio::test]
    async fn library_calls_pass_parameters() {
        let server = MockServer::start().await;
        mount(
            &server,
            "get_libraries_table",
            ok(json!({ "recordsFiltered": 1, "data": [{
                "section_id": 1, "section_name": "Movies", "section_type": "movie",
                "count": 120, "parent_count": null, "child_count": null
            }]})),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/v2"))
            .and(query_param("cmd", "get_library_media_info"))
            .and(query_param("section_id", "1"))
            .respond_with(ok(json!({ "total_file_size": 1_500_000_000_000u64 })))
            .mount(&server)
            .await;

        let c = client(&server);
        let rows = c.libraries_table().await.unwrap();
        assert_eq!(rows[0].section_id, "1");
        assert_eq!(rows[0].count, "120");
        assert_eq!(rows[0].parent_count, "");
        assert_eq!(c.library_total_size("1").await.unwrap(), 1_500_000_000_000);
    }

    #[tokio::test]
    async fn home_stats_sends_range_and_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2"))
            .and(query_param("cmd", "get_home_stats"))
            .and(query_param("grouping", "1"))
            .and(query_param("time_range", "30"))
            .and(query_param("stats_count", "5"))
            .respond_with(ok(json!([
                { "stat_id": "top_users", "rows": [{ "friendly_name": "alice", "total_plays": 12 }] },
                { "stat_id": "most_concurrent", "rows": [] }
            ])))
            .mount(&server)
            .await;

        let stats = client(&server).home_stats(30, 5).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].rows[0].total_plays, 12);
    }

    #[tokio::test]
    async fn metadata_empty_object_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("cmd", "get_metadata"))
            .and(query_param("rating_key", "1"))
            .respond_with(ok(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("cmd", "get_metadata"))
            .and(query_param("rating_key", "2"))
            .respond_with(ok(json!({ "guids": ["tmdb://550"] })))
            .mount(&server)
            .await;

        let c = client(&server);
        assert!(c.metadata("1").await.unwrap().is_none());
        let record = c.metadata("2").await.unwrap().unwrap();
        assert_eq!(record.guids, vec!["tmdb://550"]);
    }

    #[tokio::test]
    async fn sql_decodes_rows() {
        let server = MockServer::start().await;
        mount(
            &server,
            "sql",
            ok(json!([
                { "FriendlyName": "alice", "MediaType": "TV", "Plays": 9 },
                { "FriendlyName": "bob", "MediaType": "Movies", "Plays": "3" }
            ])),
        )
        .await;

        let rows = client(&server).sql("SELECT 1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].plays, 3);
        assert_eq!(rows[0].media_type, "TV");
    }
}
