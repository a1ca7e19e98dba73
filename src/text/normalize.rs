//! Unicode folding helpers shared by the cleaner, classifier and namer.

use unicode_normalization::char::{decompose_canonical, is_combining_mark};

/// Remove diacritics from `text`.
///
/// Each character is canonically decomposed and its combining marks dropped.
/// Characters whose decomposition does not reduce to exactly one base
/// character (Hangul syllables, for instance) are kept as they are, so the
/// result always has the same number of characters as the input.
pub fn strip_accents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut parts: Vec<char> = Vec::with_capacity(4);

    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }

        parts.clear();
        decompose_canonical(c, |d| {
            if !is_combining_mark(d) {
                parts.push(d);
            }
        });

        match parts.as_slice() {
            [base] => out.push(*base),
            _ => out.push(c),
        }
    }

    out
}

/// Fold text into the form used for keyword matching.
///
/// Accents are stripped, everything is lowercased, characters other than
/// letters, digits, whitespace, `-` and `+` become spaces, and runs of
/// whitespace collapse to one space.
pub fn normalize_for_match(text: &str) -> String {
    let folded: String = strip_accents(text)
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '+' {
                c
            } else {
                ' '
            }
        })
        .collect();

    collapse_whitespace(&folded)
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number of characters (not bytes) in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_accents_portuguese() {
        assert_eq!(strip_accents("Promoção de Natal"), "Promocao de Natal");
        assert_eq!(strip_accents("VÔLEI ÁGUA ÇÃO"), "VOLEI AGUA CAO");
    }

    #[test]
    fn test_strip_accents_preserves_char_count() {
        for sample in ["Ação", "한국어", "Ångström", "ﬁlm", "plain"] {
            assert_eq!(char_len(&strip_accents(sample)), char_len(sample));
        }
    }

    #[test]
    fn test_normalize_for_match() {
        assert_eq!(
            normalize_for_match("  ACOMPANHE o Basquete: AO-VIVO!! "),
            "acompanhe o basquete ao-vivo"
        );
        assert_eq!(normalize_for_match("dia_das_mães"), "dia das maes");
        assert_eq!(normalize_for_match("Conteúdo +18"), "conteudo +18");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a \t b\n\nc  "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
