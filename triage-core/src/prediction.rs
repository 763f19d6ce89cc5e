use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Result, TriageError},
    intent::Intent,
    model::NaiveBayes,
    text::clean_symptoms,
};

/// Top label of a classifier call with its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    pub confidence: f64,
}

/// Output of an [`IntentClassifier`]. `confidence` is optional because not
/// every backend reports one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentPrediction {
    pub intent: Intent,
    pub confidence: Option<f64>,
}

impl IntentPrediction {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            confidence: None,
        }
    }

    pub fn with_confidence(intent: Intent, confidence: f64) -> Self {
        Self {
            intent,
            confidence: Some(confidence),
        }
    }
}

/// Maps free text to one member of the fixed intent vocabulary.
///
/// Implementations never answer "don't know": unrecognized input resolves to
/// [`Intent::Gibberish`]. An `Err` means the call itself failed.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<IntentPrediction>;
}

/// Maps symptom text to the most likely condition.
#[async_trait]
pub trait ConditionPredictor: Send + Sync {
    async fn predict(&self, symptom_text: &str) -> Result<PredictionResult>;
}

/// Run an inference call, turning an expired deadline into an inference error.
pub(crate) async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| TriageError::Inference(format!("timed out after {timeout:?}")))?
}

/// Run CPU-bound inference on the blocking pool.
///
/// The caller's future stays pending while `f` runs, so [`bounded`] can give up
/// on it; the detached work still runs to completion.
pub async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TriageError::Inference(format!("inference task failed: {e}")))
}

/// Intent classifier backed by the bundled naive Bayes model.
#[derive(Clone)]
pub struct TrainedIntentClassifier {
    model: Arc<NaiveBayes>,
}

impl TrainedIntentClassifier {
    pub fn new(model: NaiveBayes) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    /// Fit from `(text, intent)` examples.
    pub fn fit<I, T>(examples: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, Intent)>,
        T: AsRef<str>,
    {
        let model = NaiveBayes::fit(
            examples
                .into_iter()
                .map(|(text, intent)| (text, intent.as_str())),
        )?;
        Ok(Self::new(model))
    }
}

#[async_trait]
impl IntentClassifier for TrainedIntentClassifier {
    async fn classify(&self, text: &str) -> Result<IntentPrediction> {
        let model = self.model.clone();
        let text = text.to_string();
        let prediction = run_blocking(move || {
            model
                .recognizes(&text)
                .then(|| model.predict(&text))
        })
        .await?;

        match prediction {
            Some((label, confidence)) => Ok(IntentPrediction::with_confidence(
                Intent::from_label(&label),
                confidence,
            )),
            None => {
                debug!("No known tokens in input, classifying as gibberish");
                Ok(IntentPrediction::new(Intent::Gibberish))
            }
        }
    }
}

/// Condition predictor backed by the bundled naive Bayes model.
#[derive(Clone)]
pub struct TrainedConditionPredictor {
    model: Arc<NaiveBayes>,
}

impl TrainedConditionPredictor {
    pub fn new(model: NaiveBayes) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    /// Fit from `(symptoms, condition)` examples.
    pub fn fit<I, T, L>(examples: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, L)>,
        T: AsRef<str>,
        L: Into<String>,
    {
        let cleaned: Vec<(String, String)> = examples
            .into_iter()
            .map(|(text, label)| (clean_symptoms(text.as_ref()), label.into()))
            .collect();
        Ok(Self::new(NaiveBayes::fit(cleaned)?))
    }
}

#[async_trait]
impl ConditionPredictor for TrainedConditionPredictor {
    async fn predict(&self, symptom_text: &str) -> Result<PredictionResult> {
        let model = self.model.clone();
        let cleaned = clean_symptoms(symptom_text);
        let (label, confidence) = run_blocking(move || model.predict(&cleaned)).await?;
        Ok(PredictionResult { label, confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predictor() -> TrainedConditionPredictor {
        TrainedConditionPredictor::fit(vec![
            ("fever, chills, body aches", "Flu"),
            ("runny nose, sneezing, sore throat", "Common Cold"),
            ("fever, sweating, headache", "Malaria"),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn blocking_inference_is_cut_off_by_the_deadline() {
        let started = std::time::Instant::now();

        let result = bounded(
            Duration::from_millis(10),
            run_blocking(|| std::thread::sleep(Duration::from_millis(300))),
        )
        .await;

        assert!(matches!(result, Err(TriageError::Inference(msg)) if msg.contains("timed out")));
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn predict_is_idempotent() {
        let predictor = predictor();
        let first = predictor.predict("I have a FEVER and chills!").await.unwrap();
        let second = predictor.predict("I have a FEVER and chills!").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.label, "Flu");
        assert!((0.0..=1.0).contains(&first.confidence));
    }

    #[tokio::test]
    async fn out_of_vocabulary_input_is_gibberish() {
        let classifier = TrainedIntentClassifier::fit(vec![
            ("hello there", Intent::Greet),
            ("thank you so much", Intent::Thanks),
        ])
        .unwrap();
        let prediction = classifier.classify("xqzv blorp").await.unwrap();
        assert_eq!(prediction.intent, Intent::Gibberish);
        assert_eq!(prediction.confidence, None);

        let prediction = classifier.classify("hello").await.unwrap();
        assert_eq!(prediction.intent, Intent::Greet);
        assert!(prediction.confidence.is_some());
    }
}
