//! Library sizes and item counts, one embed per library category.

use tracing::info;

use super::{JobContext, JobError, Outcome};
use crate::config::LibraryStatsConfig;
use crate::discord::{colors, Embed, EmbedError, EmbedField, WebhookMessage};
use crate::discord::embed::MAX_FIELDS;
use crate::format::LibrarySize;
use crate::source::{LibraryRow, TautulliClient};

pub const USERNAME: &str = "Library Stats";
pub const NOTHING_TITLE: &str = "No libraries to report.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    Movie,
    Show,
    Artist,
}

impl LibraryKind {
    /// Report order.
    pub const ALL: [LibraryKind; 3] = [Self::Movie, Self::Show, Self::Artist];

    pub fn from_section_type(section_type: &str) -> Option<Self> {
        match section_type {
            "movie" => Some(Self::Movie),
            "show" => Some(Self::Show),
            "artist" => Some(Self::Artist),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Movie => "Movie Libraries",
            Self::Show => "Show Libraries",
            Self::Artist => "Artist Libraries",
        }
    }

    pub fn color(self) -> u32 {
        match self {
            Self::Movie => colors::MOVIE,
            Self::Show => colors::TV,
            Self::Artist => colors::ARTIST_LIBRARY,
        }
    }
}

/// A library row with its fetched size.
#[derive(Debug, Clone)]
pub struct LibraryStats {
    pub kind: LibraryKind,
    pub row: LibraryRow,
    pub size: LibrarySize,
}

impl LibraryStats {
    fn fields(&self) -> Vec<EmbedField> {
        let field = |name: &str, value: &str, inline: bool| EmbedField {
            name: name.to_string(),
            value: value.to_string(),
            inline,
        };
        let mut fields = vec![
            field("Library", &self.row.section_name, false),
            field("Count", &self.row.count, true),
            field("Size", &self.size.to_string(), true),
        ];
        match self.kind {
            LibraryKind::Show => {
                fields.push(field("Seasons", &self.row.parent_count, true));
                fields.push(field("Episodes", &self.row.child_count, true));
            }
            LibraryKind::Artist => {
                fields.push(field("Albums", &self.row.parent_count, true));
                fields.push(field("Tracks", &self.row.child_count, true));
            }
            LibraryKind::Movie => {}
        }
        fields
    }
}

pub async fn run(
    ctx: &JobContext<'_>,
    tautulli: &TautulliClient,
    config: &LibraryStatsConfig,
) -> Result<Outcome, JobError> {
    let rows = match tautulli.libraries_table().await {
        Ok(rows) => rows,
        Err(e) if e.is_reportable() => {
            return Ok(ctx.abort(USERNAME, "library stats from Tautulli", &e).await)
        }
        Err(e) => return Err(e.into()),
    };

    let mut libraries = Vec::new();
    for row in rows {
        if config.is_excluded(&row.section_name) {
            info!(library = %row.section_name, "Skipping excluded library");
            continue;
        }
        let Some(kind) = LibraryKind::from_section_type(&row.section_type) else {
            continue;
        };
        let bytes = tautulli.library_total_size(&row.section_id).await?;
        libraries.push(LibraryStats {
            kind,
            row,
            size: LibrarySize::from_bytes(bytes),
        });
    }
    info!(libraries = libraries.len(), "Collected library stats");

    let message = library_message(ctx, &libraries)?;
    Ok(Outcome::Completed(ctx.deliver(message).await))
}

/// One embed per category in [`LibraryKind::ALL`] order. A category that
/// outgrows the field limit continues in another embed with the same title.
pub fn library_embeds(ctx: &JobContext<'_>, libraries: &[LibraryStats]) -> Result<Vec<Embed>, EmbedError> {
    let mut embeds = Vec::new();
    for kind in LibraryKind::ALL {
        let mut pages: Vec<Vec<EmbedField>> = Vec::new();
        for lib in libraries.iter().filter(|l| l.kind == kind) {
            let fields = lib.fields();
            match pages.last_mut() {
                Some(page) if page.len() + fields.len() <= MAX_FIELDS => page.extend(fields),
                _ => pages.push(fields),
            }
        }
        for page in pages {
            let builder = page.into_iter().fold(
                Embed::builder(kind.title()).color(kind.color()).timestamp(ctx.now),
                |b, f| b.field(f.name, f.value, f.inline),
            );
            embeds.push(builder.build()?);
        }
    }
    Ok(embeds)
}

pub fn library_message(ctx: &JobContext<'_>, libraries: &[LibraryStats]) -> Result<WebhookMessage, EmbedError> {
    let embeds = library_embeds(ctx, libraries)?;
    if embeds.is_empty() {
        return Ok(WebhookMessage::new().with_embeds(vec![ctx.nothing_embed(NOTHING_TITLE)?]));
    }
    Ok(WebhookMessage::new().with_embeds(embeds))
}
