use reqwest::Client;
use serde::Deserialize;

use super::{get_json, lenient_string, SourceError};

/// Download queue state from SABnzbd `mode=queue`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Queue {
    pub paused: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub pause_int: String,
    #[serde(deserialize_with = "lenient_string")]
    pub diskspace1: String,
    #[serde(deserialize_with = "lenient_string")]
    pub diskspacetotal1: String,
    #[serde(deserialize_with = "lenient_string")]
    pub speed: String,
    #[serde(deserialize_with = "lenient_string")]
    pub timeleft: String,
    pub slots: Vec<QueueSlot>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueueSlot {
    pub filename: String,
    #[serde(deserialize_with = "lenient_string")]
    pub percentage: String,
    #[serde(deserialize_with = "lenient_string")]
    pub timeleft: String,
    pub cat: String,
    #[serde(deserialize_with = "lenient_string")]
    pub size: String,
}

#[derive(Debug, Deserialize)]
struct QueueResponse {
    queue: Queue,
}

#[derive(Debug, Clone)]
pub struct SabnzbdClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl SabnzbdClient {
    pub fn new(client: Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/api", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    pub async fn queue(&self) -> Result<Queue, SourceError> {
        let url = format!("{}?mode=queue", self.endpoint);
        let request = self.client.get(&self.endpoint).query(&[
            ("apikey", self.api_key.as_str()),
            ("output", "json"),
            ("mode", "queue"),
        ]);
        let response: QueueResponse = get_json(request, &url).await?;
        Ok(response.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn queue_decodes_slots() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sabnzbd/api"))
            .and(query_param("apikey", "sab"))
            .and(query_param("output", "json"))
            .and(query_param("mode", "queue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "queue": {
                    "paused": false,
                    "pause_int": "0",
                    "diskspace1": "120.5",
                    "diskspacetotal1": "931.5",
                    "speed": "1.2 M",
                    "timeleft": "0:10:00",
                    "slots": [{
                        "filename": "Some.Show.S01E01",
                        "percentage": "45",
                        "timeleft": "0:05:00",
                        "cat": "tv",
                        "size": "1.1 GB"
                    }]
                }
            })))
            .mount(&server)
            .await;

        let client = SabnzbdClient::new(Client::new(), &format!("{}/sabnzbd", server.uri()), "sab");
        let queue = client.queue().await.unwrap();
        assert!(!queue.paused);
        assert_eq!(queue.slots.len(), 1);
        assert_eq!(queue.slots[0].cat, "tv");
        assert_eq!(queue.diskspace1, "120.5");
    }

    #[tokio::test]
    async fn missing_queue_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": false })))
            .mount(&server)
            .await;

        let client = SabnzbdClient::new(Client::new(), &server.uri(), "sab");
        let err = client.queue().await.unwrap_err();
        assert!(!err.is_reportable());
    }
}
