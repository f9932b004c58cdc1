//! Text sanitization for chat rendering.
//!
//! Titles and summaries coming from Plex or TMDB can hold characters that the
//! webhook renders badly. [`TableSanitizer`] folds them to ASCII through a
//! fixed substitution table and drops whatever the table does not cover, so
//! the same input always yields the same output.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Capability to turn free text into ASCII-safe text.
pub trait Sanitize: Send + Sync {
    fn sanitize(&self, input: &str) -> String;
}

static APPENDED_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \(([0-9]{4})\)").expect("static regex"));

/// Explicit-table sanitizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableSanitizer;

impl TableSanitizer {
    pub fn new() -> Self {
        Self
    }
}

/// Remove every ` (NNNN)` year suffix, e.g. `"Yellowstone (2018)"`. Run it
/// before [`Sanitize::sanitize`] where titles carry the year.
pub fn strip_appended_year(input: &str) -> Cow<'_, str> {
    APPENDED_YEAR.replace_all(input, "")
}

impl Sanitize for TableSanitizer {
    fn sanitize(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            match c {
                ':' => {}
                c if c.is_ascii() => out.push(c),
                c => {
                    if let Some(replacement) = substitute(c) {
                        out.push_str(replacement);
                    }
                }
            }
        }
        out
    }
}

fn substitute(c: char) -> Option<&'static str> {
    let s = match c {
        'ß' => "ss",
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
        'æ' => "ae",
        'Æ' => "AE",
        'ç' => "c",
        'Ç' => "C",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'È' | 'É' | 'Ê' | 'Ë' => "E",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' => "I",
        'ð' => "d",
        'Ð' => "D",
        'ñ' => "n",
        'Ñ' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "O",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        'þ' => "p",
        'Þ' => "P",
        '“' | '”' => "\"",
        '‘' | '’' => "'",
        '·' => "-",
        _ => return None,
    };
    Some(s)
}
