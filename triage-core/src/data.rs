//! Loading of the reference condition table and the intent examples, and
//! assembly of a ready-to-use [`Dispatcher`] from them.

use std::{path::Path, sync::Arc};

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{
    config::TriageConfig,
    dispatcher::Dispatcher,
    error::{Result, TriageError},
    intent::Intent,
    prediction::{IntentClassifier, TrainedConditionPredictor, TrainedIntentClassifier},
    symptom_index::SymptomIndex,
};

/// One row of the reference condition table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConditionRow {
    pub disease_name: String,
    /// Comma-separated symptom list.
    pub symptoms: String,
}

impl ConditionRow {
    pub fn symptom_list(&self) -> Vec<String> {
        self.symptoms
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// A labeled intent training example.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentExample {
    pub text: String,
    pub intent: Intent,
}

#[derive(Deserialize)]
struct RawIntentExample {
    text: String,
    intent: String,
}

/// Decode a condition table from a JSON array of rows.
pub fn parse_condition_table(raw: &str) -> Result<Vec<ConditionRow>> {
    decode_rows(raw, "condition table", TriageError::DataIntegrity)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            serde_json::from_value::<ConditionRow>(value).map_err(|e| {
                TriageError::DataIntegrity(format!("condition table row {row}: {e}"))
            })
        })
        .collect()
}

/// Decode intent examples from a JSON array of `{text, intent}` objects.
pub fn parse_intent_examples(raw: &str) -> Result<Vec<IntentExample>> {
    decode_rows(raw, "intent examples", TriageError::ModelUnavailable)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let example: RawIntentExample = serde_json::from_value(value).map_err(|e| {
                TriageError::DataIntegrity(format!("intent example {row}: {e}"))
            })?;
            let intent = Intent::parse(&example.intent).ok_or_else(|| {
                TriageError::DataIntegrity(format!(
                    "intent example {row}: unknown intent '{}'",
                    example.intent
                ))
            })?;
            Ok(IntentExample {
                text: example.text,
                intent,
            })
        })
        .collect()
}

pub fn load_condition_table(path: &Path) -> Result<Vec<ConditionRow>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        TriageError::DataIntegrity(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_condition_table(&raw)
}

pub fn load_intent_examples(path: &Path) -> Result<Vec<IntentExample>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        TriageError::ModelUnavailable(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_intent_examples(&raw)
}

/// Build the symptom index from table rows.
pub fn build_index(rows: &[ConditionRow], match_threshold: f64) -> Result<SymptomIndex> {
    let index = SymptomIndex::build(
        rows.iter()
            .map(|row| (row.disease_name.clone(), row.symptom_list())),
    )?;
    Ok(index.with_match_threshold(match_threshold))
}

/// Load both data sets, fit the bundled models and wire up a [`Dispatcher`].
pub fn build_dispatcher(config: &TriageConfig) -> Result<Dispatcher> {
    let examples = load_intent_examples(&config.intents_path)?;
    let classifier =
        TrainedIntentClassifier::fit(examples.iter().map(|e| (e.text.as_str(), e.intent)))?;
    info!(intent_examples = examples.len(), "Intent classifier fitted");

    build_dispatcher_with(config, Arc::new(classifier))
}

/// Like [`build_dispatcher`], but with a caller-supplied intent classifier.
pub fn build_dispatcher_with(
    config: &TriageConfig,
    classifier: Arc<dyn IntentClassifier>,
) -> Result<Dispatcher> {
    let rows = load_condition_table(&config.conditions_path)?;
    let index = build_index(&rows, config.match_threshold)?;

    let predictor = TrainedConditionPredictor::fit(
        rows.iter()
            .map(|row| (row.symptoms.as_str(), row.disease_name.trim().to_string())),
    )?;
    info!(conditions = index.len(), "Condition predictor fitted");

    Ok(Dispatcher::new(
        classifier,
        Arc::new(predictor),
        Arc::new(index),
        config,
    ))
}

fn decode_rows(raw: &str, what: &str, err: fn(String) -> TriageError) -> Result<Vec<Value>> {
    let rows: Vec<Value> = serde_json::from_str(raw)
        .map_err(|e| err(format!("{what} is not a JSON array: {e}")))?;
    if rows.is_empty() {
        return Err(err(format!("{what} is empty")));
    }
    Ok(rows)
}
