//! Word-level matching of food names against recipe text.

use std::sync::LazyLock;

use regex::Regex;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid regex"));

/// Lowercased words with a simple plural suffix removed.
fn tokens(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| singular(&m.as_str().to_lowercase()))
        .collect()
}

fn singular(word: &str) -> String {
    if word.chars().count() > 4 {
        if let Some(stem) = word.strip_suffix("oes") {
            return format!("{stem}o");
        }
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{stem}y");
        }
    }
    if word.chars().count() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Whether any phrase occurs in `text` as a whole run of words.
///
/// "egg" matches "2 Eggs, beaten" but not "Eggplant"; "peanut butter"
/// matches "crunchy peanut butter" but not "peanut oil and butter".
pub fn matches<S: AsRef<str>>(text: &str, phrases: &[S]) -> bool {
    let haystack = tokens(text);

    phrases.iter().any(|phrase| {
        let needle = tokens(phrase.as_ref());
        !needle.is_empty()
            && haystack
                .windows(needle.len())
                .any(|window| window == needle.as_slice())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_words_only() {
        assert!(matches("2 eggs, beaten", &["egg"]));
        assert!(matches("Fried Egg", &["egg"]));
        assert!(!matches("Roasted eggplant", &["egg"]));
        assert!(!matches("Peanut satay", &["nut"]));
        assert!(matches("Mixed nuts", &["nut"]));
    }

    #[test]
    fn plurals_normalize() {
        assert!(matches("Cherry tomatoes", &["tomato"]));
        assert!(matches("Fresh berries", &["berry"]));
        assert!(matches("Lemons", &["lemon"]));
        assert!(!matches("Bass fillet", &["ba"]));
    }

    #[test]
    fn phrases_match_as_runs() {
        assert!(matches("crunchy peanut butter", &["peanut butter"]));
        assert!(!matches("peanut oil and butter", &["peanut butter"]));
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        assert!(matches("CHEESE-stuffed peppers", &["cheese"]));
        assert!(matches("Грибной суп", &["грибной"]));
    }

    #[test]
    fn empty_phrases_never_match() {
        assert!(!matches("anything", &["", "  "]));
        assert!(!matches("anything", &[] as &[&str]));
    }
}
