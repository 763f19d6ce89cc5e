use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{Result, TriageError},
    fuzzy,
    text::{canonicalize, title_case},
};

/// Symptom list returned when no condition matches well enough.
pub const NO_INFORMATION: &str = "no information available";

/// Default similarity a match has to exceed.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 60.0;

/// Longest query prefix, in chars, scored against the names.
pub const MAX_QUERY_CHARS: usize = 200;

/// A known condition and its symptoms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub canonical_name: String,
    pub symptoms: Vec<String>,
}

/// Result of [`SymptomIndex::lookup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomList {
    pub matched_disease: Option<String>,
    pub symptoms: Vec<String>,
    pub match_score: f64,
}

/// Read-only map from canonical condition name to its symptom list.
#[derive(Debug, Clone)]
pub struct SymptomIndex {
    records: HashMap<String, ConditionRecord>,
    names: Vec<String>,
    match_threshold: f64,
}

impl SymptomIndex {
    /// Build the index from `(condition_name, symptoms)` pairs.
    ///
    /// Names are trimmed and lowercased. An empty table, a blank name, a row
    /// without symptoms or two rows with the same canonical name are data
    /// integrity errors.
    pub fn build<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut records = HashMap::new();
        let mut names = Vec::new();

        for (row, (name, symptoms)) in rows.into_iter().enumerate() {
            let canonical_name = canonicalize(&name);
            if canonical_name.is_empty() {
                return Err(TriageError::DataIntegrity(format!(
                    "row {row}: condition name is blank"
                )));
            }
            let symptoms: Vec<String> = symptoms
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if symptoms.is_empty() {
                return Err(TriageError::DataIntegrity(format!(
                    "row {row}: condition '{canonical_name}' has no symptoms"
                )));
            }
            if records.contains_key(&canonical_name) {
                return Err(TriageError::DataIntegrity(format!(
                    "row {row}: duplicate condition '{canonical_name}'"
                )));
            }
            names.push(canonical_name.clone());
            records.insert(
                canonical_name.clone(),
                ConditionRecord {
                    canonical_name,
                    symptoms,
                },
            );
        }

        if names.is_empty() {
            return Err(TriageError::DataIntegrity(
                "condition table is empty".to_string(),
            ));
        }

        info!(conditions = names.len(), "Symptom index built");
        Ok(Self {
            records,
            names,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        })
    }

    /// Override the similarity a match has to exceed.
    pub fn with_match_threshold(mut self, match_threshold: f64) -> Self {
        self.match_threshold = match_threshold;
        self
    }

    /// Fuzzy-match `query` against the known condition names.
    ///
    /// Only the first [`MAX_QUERY_CHARS`] chars of `query` are considered.
    pub fn lookup(&self, query: &str) -> SymptomList {
        let query: String = query.to_lowercase().chars().take(MAX_QUERY_CHARS).collect();
        let Some(best) = fuzzy::best_match(&query, &self.names) else {
            return Self::no_information(0.0);
        };
        let score = round2(best.score);
        let name = &self.names[best.index];

        debug!(query = %query, best = %name, score, "Symptom lookup");

        if score > self.match_threshold {
            if let Some(record) = self.records.get(name) {
                return SymptomList {
                    matched_disease: Some(title_case(name)),
                    symptoms: record.symptoms.clone(),
                    match_score: score,
                };
            }
        }
        Self::no_information(score)
    }

    pub fn get(&self, canonical_name: &str) -> Option<&ConditionRecord> {
        self.records.get(canonical_name)
    }

    /// Canonical names in table order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn no_information(score: f64) -> SymptomList {
        SymptomList {
            matched_disease: None,
            symptoms: vec![NO_INFORMATION.to_string()],
            match_score: score,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, symptoms: &[&str]) -> (String, Vec<String>) {
        (
            name.to_string(),
            symptoms.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn index() -> SymptomIndex {
        SymptomIndex::build(vec![
            row("Flu", &["fever", "chills", "body aches"]),
            row("  Common Cold ", &["runny nose", "sneezing"]),
            row("Malaria", &["fever", "sweating", "headache"]),
            row("Migraine", &["throbbing headache", "nausea"]),
        ])
        .unwrap()
    }

    #[test]
    fn every_canonical_name_matches_itself_exactly() {
        let index = index();
        for name in index.names() {
            let result = index.lookup(name);
            assert_eq!(result.matched_disease, Some(title_case(name)));
            assert_eq!(result.match_score, 100.0);
        }
    }

    #[test]
    fn names_are_canonicalized() {
        let index = index();
        assert!(index.get("common cold").is_some());
        assert_eq!(
            index.lookup("COMMON COLD").matched_disease.as_deref(),
            Some("Common Cold")
        );
    }

    #[test]
    fn sentence_mentioning_condition_matches() {
        let result = index().lookup("tell me about flu");
        assert_eq!(result.matched_disease.as_deref(), Some("Flu"));
        assert_eq!(result.symptoms, vec!["fever", "chills", "body aches"]);
        assert_eq!(result.match_score, 100.0);
    }

    #[test]
    fn unrelated_query_returns_sentinel() {
        let result = index().lookup("zzzzzzzzzzzz");
        assert_eq!(result.matched_disease, None);
        assert_eq!(result.symptoms, vec![NO_INFORMATION.to_string()]);
        assert!(result.match_score <= DEFAULT_MATCH_THRESHOLD);
    }

    #[test]
    fn empty_query_does_not_panic() {
        let result = index().lookup("");
        assert_eq!(result.matched_disease, None);
        assert_eq!(result.match_score, 0.0);
    }

    #[test]
    fn name_hidden_in_another_word_is_not_a_match() {
        let result = index().lookup("how does influence spread");
        assert_eq!(result.matched_disease, None);
    }

    #[test]
    fn overlong_query_is_truncated() {
        let query = format!("flu {}", "tell me about something ".repeat(2_000));
        let result = index().lookup(&query);
        assert_eq!(result.matched_disease.as_deref(), Some("Flu"));

        let query = format!("{}flu", "x ".repeat(MAX_QUERY_CHARS));
        assert_eq!(index().lookup(&query).matched_disease, None);
    }

    #[test]
    fn threshold_is_strict() {
        let index = index().with_match_threshold(100.0);
        assert_eq!(index.lookup("flu").matched_disease, None);
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = SymptomIndex::build(Vec::new()).unwrap_err();
        assert!(matches!(err, TriageError::DataIntegrity(_)));
    }

    #[test]
    fn duplicate_canonical_names_are_rejected() {
        let err = SymptomIndex::build(vec![row("Flu", &["fever"]), row(" FLU", &["chills"])])
            .unwrap_err();
        assert!(matches!(err, TriageError::DataIntegrity(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn rows_without_symptoms_are_rejected() {
        let err = SymptomIndex::build(vec![row("Flu", &[" ", ""])]).unwrap_err();
        assert!(matches!(err, TriageError::DataIntegrity(_)));
    }
}
