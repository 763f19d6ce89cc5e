use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9, ]").expect("static pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static pattern is valid"));

/// Normalize free-form symptom text before it reaches a model.
///
/// Lowercases, drops everything outside `[a-z0-9, ]` and collapses whitespace.
pub fn clean_symptoms(text: &str) -> String {
    let lowered = text.to_lowercase();
    let spaced = WHITESPACE.replace_all(&lowered, " ");
    let stripped = DISALLOWED.replace_all(&spaced, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Canonical lookup key for a condition name.
pub fn canonicalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest.
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for ch in name.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_symptoms_strips_punctuation_and_collapses_spaces() {
        assert_eq!(
            clean_symptoms("  High FEVER!!,   chills\tand  aches. "),
            "high fever, chills and aches"
        );
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("flu"), "Flu");
        assert_eq!(title_case("common cold"), "Common Cold");
        assert_eq!(title_case("covid-19"), "Covid-19");
        assert_eq!(title_case("type 2 DIABETES"), "Type 2 Diabetes");
    }

    #[test]
    fn tokenize_drops_separators() {
        assert_eq!(tokenize("Fever, chills & a cough!"), vec!["fever", "chills", "a", "cough"]);
        assert!(tokenize("  ,, ").is_empty());
    }
}
