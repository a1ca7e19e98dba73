//! Recover descriptive text from flyer file names.

use std::sync::LazyLock;

use regex::Regex;

/// Trailing tokens that carry no content: versions, years, collision counters.
static TRAILING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:v\d+|20\d{2}|\(\d+\)|\d+)$").unwrap());

/// Trailing version and collision markers, leaving years in place.
static VERSION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:v\d+|\(\d+\))$").unwrap());

/// Turn a file name into searchable text.
///
/// The extension is dropped, a ` - ` separator joins both halves, underscores
/// become spaces and trailing version or date markers (`_2025_v3`, `_v2`)
/// are removed.
pub fn text_from_filename(name: &str) -> String {
    strip_trailing(name, &TRAILING_MARKER)
}

/// Like [`text_from_filename`], but trailing years survive so metadata
/// detection can still read them (`brasileirao_2025.png`).
pub fn words_from_filename(name: &str) -> String {
    strip_trailing(name, &VERSION_MARKER)
}

fn strip_trailing(name: &str, marker: &Regex) -> String {
    let stem = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains(' ') => stem,
        _ => name,
    };

    let joined = match stem.split_once(" - ") {
        Some((head, tail)) => format!("{} {}", head, tail),
        None => stem.to_string(),
    };

    let mut tokens: Vec<&str> = joined
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();

    while tokens.len() > 1 && tokens.last().is_some_and(|t| marker.is_match(t)) {
        tokens.pop();
    }

    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_extension_and_underscores() {
        assert_eq!(text_from_filename("futebol_ao_vivo.png"), "futebol ao vivo");
    }

    #[test]
    fn test_strips_trailing_markers() {
        assert_eq!(text_from_filename("promo_natal_2025_v3.jpg"), "promo natal");
        assert_eq!(text_from_filename("IMG_4821_v2.png"), "IMG");
        assert_eq!(text_from_filename("basquete_final (2).png"), "basquete final");
    }

    #[test]
    fn test_keeps_inner_years() {
        assert_eq!(
            text_from_filename("copa_2026_chamada.png"),
            "copa 2026 chamada"
        );
    }

    #[test]
    fn test_dash_separator_joins_halves() {
        assert_eq!(
            text_from_filename("futebol_brasileirao - ASSISTA AO VIVO.png"),
            "futebol brasileirao ASSISTA AO VIVO"
        );
    }

    #[test]
    fn test_words_keep_trailing_year() {
        assert_eq!(words_from_filename("brasileirao_2025.png"), "brasileirao 2025");
        assert_eq!(words_from_filename("promo_natal_2025_v3.jpg"), "promo natal 2025");
        assert_eq!(words_from_filename("ufc_luta (1).png"), "ufc luta");
    }

    #[test]
    fn test_no_extension() {
        assert_eq!(text_from_filename("flyer_v2"), "flyer");
        assert_eq!(text_from_filename(""), "");
    }
}
