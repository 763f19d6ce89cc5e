//! Multinomial naive Bayes text classifier.
//!
//! This is the bundled model behind [`TrainedIntentClassifier`] and
//! [`TrainedConditionPredictor`]. It is fitted once from labeled examples and
//! is immutable afterwards, so predictions are a pure function of the input.
//!
//! [`TrainedIntentClassifier`]: crate::TrainedIntentClassifier
//! [`TrainedConditionPredictor`]: crate::TrainedConditionPredictor

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    error::{Result, TriageError},
    text::tokenize,
};

const SMOOTHING: f64 = 1.0;

#[derive(Debug, Clone, Default)]
struct ClassStats {
    documents: usize,
    token_total: usize,
    token_counts: HashMap<String, usize>,
}

/// A fitted classifier. Labels are kept sorted so ties resolve the same way
/// on every run.
#[derive(Debug, Clone)]
pub struct NaiveBayes {
    classes: BTreeMap<String, ClassStats>,
    vocabulary: HashSet<String>,
    total_documents: usize,
}

impl NaiveBayes {
    /// Fit a model from `(text, label)` examples.
    pub fn fit<I, T, L>(examples: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, L)>,
        T: AsRef<str>,
        L: Into<String>,
    {
        let mut classes: BTreeMap<String, ClassStats> = BTreeMap::new();
        let mut vocabulary = HashSet::new();
        let mut total_documents = 0;

        for (text, label) in examples {
            let stats = classes.entry(label.into()).or_default();
            stats.documents += 1;
            for token in tokenize(text.as_ref()) {
                stats.token_total += 1;
                *stats.token_counts.entry(token.clone()).or_insert(0) += 1;
                vocabulary.insert(token);
            }
            total_documents += 1;
        }

        if total_documents == 0 {
            return Err(TriageError::ModelUnavailable(
                "cannot fit a classifier without training examples".to_string(),
            ));
        }

        Ok(Self {
            classes,
            vocabulary,
            total_documents,
        })
    }

    /// Posterior distribution over all labels, in label order.
    pub fn predict_proba(&self, text: &str) -> Vec<(String, f64)> {
        let tokens = tokenize(text);
        let vocab_size = self.vocabulary.len() as f64;

        let log_scores: Vec<(String, f64)> = self
            .classes
            .iter()
            .map(|(label, stats)| {
                let prior = (stats.documents as f64 / self.total_documents as f64).ln();
                let denominator = stats.token_total as f64 + SMOOTHING * vocab_size;
                let likelihood: f64 = tokens
                    .iter()
                    .filter(|t| self.vocabulary.contains(*t))
                    .map(|t| {
                        let count = stats.token_counts.get(t).copied().unwrap_or(0) as f64;
                        ((count + SMOOTHING) / denominator).ln()
                    })
                    .sum();
                (label.clone(), prior + likelihood)
            })
            .collect();

        let max = log_scores
            .iter()
            .map(|(_, s)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = log_scores.iter().map(|(_, s)| (s - max).exp()).collect();
        let total: f64 = exps.iter().sum();

        log_scores
            .into_iter()
            .zip(exps)
            .map(|((label, _), e)| (label, e / total))
            .collect()
    }

    /// Most probable label and its probability. Ties go to the first label.
    pub fn predict(&self, text: &str) -> (String, f64) {
        let mut best: Option<(String, f64)> = None;
        for (label, p) in self.predict_proba(text) {
            if best.as_ref().is_none_or(|(_, bp)| p > *bp) {
                best = Some((label, p));
            }
        }
        // fit() guarantees at least one class
        best.unwrap_or_default()
    }

    /// Whether any token of `text` was seen during fitting.
    pub fn recognizes(&self, text: &str) -> bool {
        tokenize(text).iter().any(|t| self.vocabulary.contains(t))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}
