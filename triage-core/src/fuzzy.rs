//! Deterministic fuzzy string scoring on a 0-100 scale.
//!
//! The score of a query against a candidate is the better of the whole-string
//! Levenshtein ratio and the best ratio of the shorter string against any
//! word-aligned span of the longer one, so a condition name mentioned inside
//! a sentence still scores 100.

/// A scored candidate from [`best_match`].
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub index: usize,
    pub score: f64,
}

/// Levenshtein distance over chars.
pub fn levenshtein(a: &[char], b: &[char]) -> usize {
    let (m, n) = (a.len(), b.len());
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];
    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 0.0;
    }
    let dist = levenshtein(a, b);
    100.0 * (1.0 - dist as f64 / max_len as f64)
}

/// Whole-string similarity.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best similarity of the shorter string against word-aligned spans of the longer one.
///
/// Spans start and end on word boundaries, so a name never scores against a
/// fragment of an unrelated word.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0.0;
    }

    let words = word_bounds(&long);
    let mut best = 0.0;
    for (i, &(start, _)) in words.iter().enumerate() {
        for &(_, end) in &words[i..] {
            let span = &long[start..end];
            best = f64::max(best, ratio_chars(&short, span));
            if span.len() >= short.len() * 2 {
                break;
            }
        }
    }
    best
}

/// `[start, end)` char offsets of the alphanumeric runs in `chars`.
fn word_bounds(chars: &[char]) -> Vec<(usize, usize)> {
    let mut bounds = Vec::new();
    let mut start = None;
    for (i, c) in chars.iter().enumerate() {
        match (c.is_alphanumeric(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                bounds.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        bounds.push((s, chars.len()));
    }
    bounds
}

/// Combined score used for lookups.
pub fn score(query: &str, candidate: &str) -> f64 {
    ratio(query, candidate).max(partial_ratio(query, candidate))
}

/// Pick the best candidate for `query`.
///
/// Highest [`score`] wins; ties go to the higher whole-string ratio, then to the
/// earliest candidate. Returns `None` only when `candidates` is empty.
pub fn best_match<S: AsRef<str>>(query: &str, candidates: &[S]) -> Option<FuzzyMatch> {
    let mut best: Option<(FuzzyMatch, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let candidate = candidate.as_ref();
        let full = ratio(query, candidate);
        let combined = full.max(partial_ratio(query, candidate));
        let better = match &best {
            None => true,
            Some((current, current_full)) => {
                combined > current.score || (combined == current.score && full > *current_full)
            }
        };
        if better {
            best = Some((FuzzyMatch { index, score: combined }, full));
        }
    }
    best.map(|(m, _)| m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(score("malaria", "malaria"), 100.0);
    }

    #[test]
    fn name_inside_sentence_scores_100() {
        assert_eq!(score("tell me about flu", "flu"), 100.0);
    }

    #[test]
    fn misspelling_scores_high_but_not_perfect() {
        let s = score("diabetis", "diabetes");
        assert!(s > 80.0 && s < 100.0, "score was {s}");
    }

    #[test]
    fn empty_query_scores_zero() {
        assert_eq!(score("", "flu"), 0.0);
    }

    #[test]
    fn exact_name_beats_containing_name() {
        let names = ["influenza", "flu"];
        let best = best_match("flu", &names).unwrap();
        assert_eq!(best.index, 1);
        assert_eq!(best.score, 100.0);
    }

    #[test]
    fn ties_resolve_to_first_candidate() {
        let names = ["abc", "abd"];
        let best = best_match("xyz", &names).unwrap();
        assert_eq!(best.index, 0);
    }

    #[test]
    fn no_candidates_yields_none() {
        let names: [&str; 0] = [];
        assert!(best_match("flu", &names).is_none());
    }

    #[test]
    fn name_inside_another_word_does_not_match() {
        assert!(score("how does influence spread", "flu") <= 60.0);
        assert!(score("i speak fluently", "flu") < 60.0);
    }

    #[test]
    fn multi_word_names_match_inside_punctuated_sentences() {
        assert_eq!(score("what is common cold?", "common cold"), 100.0);
        assert_eq!(score("symptoms of covid-19, please", "covid-19"), 100.0);
    }

    #[test]
    fn levenshtein_counts_edits() {
        let a: Vec<char> = "kitten".chars().collect();
        let b: Vec<char> = "sitting".chars().collect();
        assert_eq!(levenshtein(&a, &b), 3);
    }
}
