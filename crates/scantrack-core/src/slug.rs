//! Title slugs.
//!
//! A slug is the title lowercased, trimmed, with every run of whitespace
//! replaced by a single `-`. Punctuation is kept as-is; reader sites that
//! consume slugs do their own escaping.

/// Derive the slug for a title.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_title() {
        assert_eq!(slugify("Solo Leveling"), "solo-leveling");
    }

    #[test]
    fn trims_and_collapses_whitespace() {
        assert_eq!(slugify("  The   Beginning\tAfter \n the End "), "the-beginning-after-the-end");
    }

    #[test]
    fn keeps_punctuation() {
        assert_eq!(slugify("Kaguya-sama: Love Is War"), "kaguya-sama:-love-is-war");
    }

    #[test]
    fn non_ascii_lowercased() {
        assert_eq!(slugify("ÉCLAIR Noir"), "éclair-noir");
    }

    #[test]
    fn idempotent() {
        for title in ["Solo Leveling", "  One   Piece ", "Blame!", "", "Ｘ  Ｙ"] {
            let once = slugify(title);
            assert_eq!(slugify(&once), once, "slugify not idempotent for {title:?}");
        }
    }

    #[test]
    fn empty_title() {
        assert_eq!(slugify("   "), "");
    }
}
