use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    config::TriageConfig,
    disambiguation::{ClarificationPrompter, DisambiguationLoop, LoopStep, Resolution},
    error::Result,
    intent::Intent,
    prediction::{ConditionPredictor, IntentClassifier, IntentPrediction, PredictionResult, bounded},
    response::{CLARIFICATION_REQUEST, DispatchResponse, EMERGENCY, EXHAUSTED, FAREWELL, GREETING},
    session::ConversationSession,
    symptom_index::SymptomIndex,
};

/// Where a classified message goes next.
enum Route {
    Reply(DispatchResponse),
    Disambiguate,
}

/// Result of one conversational turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    /// `None` when classification itself failed.
    pub intent: Option<Intent>,
    pub intent_confidence: Option<f64>,
    pub response: DispatchResponse,
}

/// Central router from raw user text to a [`DispatchResponse`].
///
/// Holds the process-wide, read-only collaborators; share it behind an `Arc`.
pub struct Dispatcher {
    classifier: Arc<dyn IntentClassifier>,
    predictor: Arc<dyn ConditionPredictor>,
    index: Arc<SymptomIndex>,
    disambiguation: DisambiguationLoop,
    inference_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        predictor: Arc<dyn ConditionPredictor>,
        index: Arc<SymptomIndex>,
        config: &TriageConfig,
    ) -> Self {
        Self {
            disambiguation: DisambiguationLoop::new(predictor.clone(), config),
            classifier,
            predictor,
            index,
            inference_timeout: config.inference_timeout(),
        }
    }

    pub fn index(&self) -> &SymptomIndex {
        &self.index
    }

    pub fn disambiguation(&self) -> &DisambiguationLoop {
        &self.disambiguation
    }

    pub async fn classify(&self, text: &str) -> Result<IntentPrediction> {
        bounded(self.inference_timeout, self.classifier.classify(text)).await
    }

    /// One-shot condition prediction, without the clarification loop.
    pub async fn predict(&self, symptom_text: &str) -> Result<PredictionResult> {
        bounded(self.inference_timeout, self.predictor.predict(symptom_text)).await
    }

    /// Fixed reply for intents that do not need the index or the predictor.
    pub fn canned_reply(intent: Intent) -> Option<&'static str> {
        match intent {
            Intent::Greet => Some(GREETING),
            Intent::Emergency => Some(EMERGENCY),
            Intent::Thanks => Some(FAREWELL),
            Intent::Gibberish => Some(CLARIFICATION_REQUEST),
            Intent::AskSymptom | Intent::GiveSymptom => None,
        }
    }

    /// Handle a message to completion, asking `prompter` whenever the
    /// disambiguation needs more detail.
    pub async fn handle(
        &self,
        raw_text: &str,
        prompter: &dyn ClarificationPrompter,
    ) -> DispatchResponse {
        let prediction = match self.classify(raw_text).await {
            Ok(prediction) => prediction,
            Err(e) => {
                warn!(error = %e, "Intent classification failed");
                return DispatchResponse::failure();
            }
        };
        info!(intent = %prediction.intent, confidence = ?prediction.confidence, "Intent classified");

        match self.route(prediction.intent, raw_text).await {
            Route::Reply(response) => response,
            Route::Disambiguate => {
                match self.disambiguation.resolve(raw_text, prompter).await {
                    Ok(resolution) => Self::resolution_response(resolution),
                    Err(e) => {
                        warn!(error = %e, "Disambiguation failed");
                        DispatchResponse::failure()
                    }
                }
            }
        }
    }

    /// Handle one turn of a multi-turn conversation.
    ///
    /// When the session has a pending disambiguation, `raw_text` is the reply to
    /// its last prompt and is not classified. A disambiguation that still needs
    /// input is parked in `session.pending` and surfaces as
    /// [`DispatchResponse::NeedsClarification`].
    pub async fn handle_turn(&self, session: &mut ConversationSession, raw_text: &str) -> TurnResult {
        if let Some(state) = session.pending.take() {
            info!(
                session_id = %session.id,
                attempt_count = state.attempt_count,
                "Resuming disambiguation"
            );
            let step = self.disambiguation.resume(state, raw_text).await;
            return TurnResult {
                intent: Some(Intent::GiveSymptom),
                intent_confidence: None,
                response: Self::park(session, step),
            };
        }

        let prediction = match self.classify(raw_text).await {
            Ok(prediction) => prediction,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Intent classification failed");
                return TurnResult {
                    intent: None,
                    intent_confidence: None,
                    response: DispatchResponse::failure(),
                };
            }
        };
        info!(
            session_id = %session.id,
            intent = %prediction.intent,
            confidence = ?prediction.confidence,
            "Intent classified"
        );
        session.last_intent = Some(prediction.intent);

        let response = match self.route(prediction.intent, raw_text).await {
            Route::Reply(response) => response,
            Route::Disambiguate => {
                let step = self.disambiguation.start(raw_text).await;
                Self::park(session, step)
            }
        };

        TurnResult {
            intent: Some(prediction.intent),
            intent_confidence: prediction.confidence,
            response,
        }
    }

    async fn route(&self, intent: Intent, raw_text: &str) -> Route {
        if let Some(reply) = Self::canned_reply(intent) {
            return Route::Reply(DispatchResponse::text(reply));
        }
        match intent {
            Intent::AskSymptom => Route::Reply(self.lookup(raw_text).await),
            _ => Route::Disambiguate,
        }
    }

    /// Symptom lookup off the async workers.
    async fn lookup(&self, raw_text: &str) -> DispatchResponse {
        let index = self.index.clone();
        let query = raw_text.to_string();
        match tokio::task::spawn_blocking(move || index.lookup(&query)).await {
            Ok(list) => list.into(),
            Err(e) => {
                warn!(error = %e, "Symptom lookup failed");
                DispatchResponse::failure()
            }
        }
    }

    fn park(session: &mut ConversationSession, step: Result<LoopStep>) -> DispatchResponse {
        match step {
            Ok(LoopStep::Gathering { state, prompt }) => {
                let attempt_count = state.attempt_count;
                session.pending = Some(state);
                DispatchResponse::NeedsClarification {
                    prompt,
                    attempt_count,
                }
            }
            Ok(LoopStep::Done(resolution)) => Self::resolution_response(resolution),
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Disambiguation failed");
                DispatchResponse::failure()
            }
        }
    }

    fn resolution_response(resolution: Resolution) -> DispatchResponse {
        match resolution {
            Resolution::Resolved { prediction, .. } => DispatchResponse::DiseaseResult {
                label: prediction.label,
                confidence: prediction.confidence,
            },
            Resolution::Declined { .. } => DispatchResponse::declined(),
            Resolution::Exhausted { .. } => DispatchResponse::text(EXHAUSTED),
        }
    }
}
