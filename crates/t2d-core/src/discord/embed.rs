use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;
pub const MAX_FIELDS: usize = 25;

const MAX_TITLE: usize = 256;
const MAX_DESCRIPTION: usize = 4096;
const MAX_FIELD_NAME: usize = 256;
const MAX_FIELD_VALUE: usize = 1024;
const MAX_FOOTER: usize = 2048;

/// Embed colors used across jobs.
pub mod colors {
    pub const TV: u32 = 40635;
    pub const MOVIE: u32 = 13400320;
    pub const MUSIC: u32 = 3066993;
    pub const ARTIST_LIBRARY: u32 = 39270;
    pub const NOTHING: u32 = 15158332;
    pub const DOWNLOADS: u32 = 15197440;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmbedError {
    #[error("embed title must not be empty")]
    MissingTitle,
    #[error("embed field name must not be empty (field {index})")]
    EmptyFieldName { index: usize },
    #[error("embed '{title}' has {count} fields, limit is 25")]
    TooManyFields { title: String, count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// A rich content block inside a webhook message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    pub fn builder(title: impl Into<String>) -> EmbedBuilder {
        EmbedBuilder::new(title)
    }

    pub fn field(&self, name: &str) -> Option<&EmbedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Builds an [`Embed`], checking the webhook limits on [`build`](Self::build).
///
/// Overlong text is truncated and empty field values become `-`; a missing
/// title, an empty field name or too many fields are errors.
#[derive(Debug, Clone)]
pub struct EmbedBuilder {
    embed: Embed,
}

impl EmbedBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            embed: Embed {
                title: title.into(),
                color: 0,
                url: None,
                description: None,
                author: None,
                thumbnail: None,
                fields: Vec::new(),
                footer: None,
                timestamp: None,
            },
        }
    }

    pub fn color(mut self, color: u32) -> Self {
        self.embed.color = color;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.embed.url = Some(url.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.embed.description = Some(description.into());
        self
    }

    pub fn author(mut self, name: impl Into<String>, url: impl Into<String>, icon_url: impl Into<String>) -> Self {
        self.embed.author = Some(EmbedAuthor {
            name: name.into(),
            url: Some(url.into()),
            icon_url: Some(icon_url.into()),
        });
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.embed.thumbnail = Some(EmbedImage { url: url.into() });
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.embed.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.embed.footer = Some(EmbedFooter { text: text.into() });
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.embed.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> Result<Embed, EmbedError> {
        let mut embed = self.embed;

        if embed.title.trim().is_empty() {
            return Err(EmbedError::MissingTitle);
        }
        if embed.fields.len() > MAX_FIELDS {
            return Err(EmbedError::TooManyFields {
                title: embed.title,
                count: embed.fields.len(),
            });
        }

        truncate(&mut embed.title, MAX_TITLE);
        if embed.description.as_deref().is_some_and(|d| d.trim().is_empty()) {
            embed.description = None;
        }
        if let Some(description) = embed.description.as_mut() {
            truncate(description, MAX_DESCRIPTION);
        }
        if let Some(footer) = embed.footer.as_mut() {
            truncate(&mut footer.text, MAX_FOOTER);
        }
        for (index, field) in embed.fields.iter_mut().enumerate() {
            if field.name.trim().is_empty() {
                return Err(EmbedError::EmptyFieldName { index });
            }
            truncate(&mut field.name, MAX_FIELD_NAME);
            if field.value.trim().is_empty() {
                field.value = "-".to_string();
            }
            truncate(&mut field.value, MAX_FIELD_VALUE);
        }

        Ok(embed)
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `...`.
fn truncate(text: &mut String, max: usize) {
    if text.chars().count() <= max {
        return;
    }
    let keep = max.saturating_sub(3);
    let cut = text
        .char_indices()
        .nth(keep)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text.truncate(cut);
    text.push_str("...");
}

/// The JSON document POSTed to a webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl WebhookMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_embeds(mut self, embeds: Vec<Embed>) -> Self {
        self.embeds = embeds;
        self
    }

    /// Split into messages carrying at most [`MAX_EMBEDS_PER_MESSAGE`] embeds.
    /// Only the first message keeps the content.
    pub fn split(self) -> Vec<WebhookMessage> {
        if self.embeds.len() <= MAX_EMBEDS_PER_MESSAGE {
            return vec![self];
        }

        let WebhookMessage {
            username,
            content,
            embeds,
        } = self;

        let mut out = Vec::with_capacity(embeds.len().div_ceil(MAX_EMBEDS_PER_MESSAGE));
        let mut content = content;
        let mut rest = embeds.into_iter().peekable();
        while rest.peek().is_some() {
            let chunk: Vec<Embed> = rest.by_ref().take(MAX_EMBEDS_PER_MESSAGE).collect();
            out.push(WebhookMessage {
                username: username.clone(),
                content: content.take(),
                embeds: chunk,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_title() {
        let err = Embed::builder("  ").build().unwrap_err();
        assert_eq!(err, EmbedError::MissingTitle);
    }

    #[test]
    fn build_rejects_too_many_fields() {
        let mut b = Embed::builder("many");
        for i in 0..26 {
            b = b.field(format!("f{i}"), "v", true);
        }
        let err = b.build().unwrap_err();
        assert!(matches!(err, EmbedError::TooManyFields { count: 26, .. }));
    }

    #[test]
    fn build_rejects_empty_field_name() {
        let err = Embed::builder("t").field("", "v", false).build().unwrap_err();
        assert_eq!(err, EmbedError::EmptyFieldName { index: 0 });
    }

    #[test]
    fn empty_field_value_becomes_dash() {
        let embed = Embed::builder("t").field("Album", "", true).build().unwrap();
        assert_eq!(embed.field("Album").unwrap().value, "-");
    }

    #[test]
    fn long_description_is_truncated() {
        let embed = Embed::builder("t")
            .description("x".repeat(5000))
            .build()
            .unwrap();
        let description = embed.description.unwrap();
        assert_eq!(description.chars().count(), MAX_DESCRIPTION);
        assert!(description.ends_with("..."));
    }

    #[test]
    fn fields_keep_insertion_order() {
        let embed = Embed::builder("t")
            .field("User", "alice", false)
            .field("Season", "1", true)
            .field("Episode", "2", true)
            .build()
            .unwrap();
        let names: Vec<_> = embed.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["User", "Season", "Episode"]);
    }

    #[test]
    fn serializes_without_empty_parts() {
        let embed = Embed::builder("Nothing is currently streaming.")
            .color(colors::NOTHING)
            .build()
            .unwrap();
        let json = serde_json::to_value(&embed).unwrap();
        assert_eq!(json["title"], "Nothing is currently streaming.");
        assert_eq!(json["color"], 15158332);
        assert!(json.get("fields").is_none());
        assert!(json.get("thumbnail").is_none());
    }

    #[test]
    fn split_keeps_content_on_first_message() {
        let embeds: Vec<Embed> = (0..23)
            .map(|i| Embed::builder(format!("e{i}")).build().unwrap())
            .collect();
        let parts = WebhookMessage::new()
            .with_username("Current Streams")
            .with_content("**Current Streams on Plex:**")
            .with_embeds(embeds)
            .split();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].embeds.len(), 10);
        assert_eq!(parts[2].embeds.len(), 3);
        assert!(parts[0].content.is_some());
        assert!(parts[1].content.is_none());
        assert_eq!(parts[2].username.as_deref(), Some("Current Streams"));
        assert_eq!(parts[1].embeds[0].title, "e10");
    }
}
