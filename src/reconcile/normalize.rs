//! Title normalization for record matching.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Punctuation that drifts between editions: subtitle separators,
    // apostrophe styles (ASCII and U+2019), emphasis marks.
    static ref PUNCTUATION: Regex = Regex::new(r"[*?.,!'\-\u{2019}]").unwrap();
    static ref WHITESPACE_RUNS: Regex = Regex::new(r"\s+").unwrap();
}

/// Normalize a title into its matching key: lower-cased, punctuation
/// stripped, whitespace runs collapsed, trimmed. Idempotent.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = PUNCTUATION.replace_all(lowered.trim(), "");
    WHITESPACE_RUNS
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_punctuation_insensitive() {
        assert_eq!(
            normalize_title("The Left Hand of Darkness"),
            normalize_title("the left hand of darkness!")
        );
    }

    #[test]
    fn test_apostrophe_styles_match() {
        assert_eq!(
            normalize_title("The Hitchhiker's Guide to the Galaxy"),
            normalize_title("The Hitchhiker\u{2019}s Guide to the Galaxy")
        );
    }

    #[test]
    fn test_hyphens_and_dots_stripped() {
        assert_eq!(normalize_title("Babel-17"), "babel17");
        assert_eq!(normalize_title("Dr. Bloodmoney"), "dr bloodmoney");
        assert_eq!(
            normalize_title("Do Androids Dream of Electric Sheep?"),
            "do androids dream of electric sheep"
        );
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(normalize_title("  The   Forever\tWar "), "the forever war");
    }

    #[test]
    fn test_idempotent() {
        for title in [
            "The Left Hand of Darkness",
            "R.U.R. and War with the Newts",
            "Flow My Tears, the Policeman Said",
            "trailing punctuation !",
            "",
        ] {
            let once = normalize_title(title);
            assert_eq!(normalize_title(&once), once);
        }
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert_eq!(normalize_title(""), "");
        assert_eq!(normalize_title("?!.,"), "");
    }
}
