//! Confidence-gated clarification loop.
//!
//! A disambiguation starts in `Gathering`: the accumulated symptom text is fed to
//! the [`ConditionPredictor`]. A confident prediction resolves the loop;
//! otherwise the user is asked for more detail and their reply is appended to
//! the accumulated text. A decline word ends the loop, and so does reaching
//! `max_attempts` follow-up questions.
//!
//! The loop is exposed both as explicit steps ([`DisambiguationLoop::start`] /
//! [`DisambiguationLoop::resume`]) for multi-turn services that persist the
//! [`ClarificationState`] between requests, and as
//! [`DisambiguationLoop::resolve`] which drives it to completion through a
//! [`ClarificationPrompter`].

use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::TriageConfig,
    error::Result,
    prediction::{ConditionPredictor, PredictionResult, bounded},
};

pub const SYMPTOMS_PROMPT: &str =
    "Could you describe the symptoms you are experiencing?";

pub const CLARIFY_PROMPT: &str = "I'm not confident about that yet. Could you tell me about any other symptoms you have? (reply \"no\" to stop)";

/// Request-scoped progress of one disambiguation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClarificationState {
    pub accumulated_text: String,
    pub attempt_count: u32,
}

impl ClarificationState {
    pub fn new(text: &str) -> Self {
        Self {
            accumulated_text: text.trim().to_string(),
            attempt_count: 0,
        }
    }

    /// Append a reply as a comma-joined clause.
    fn absorb(&mut self, reply: &str) {
        if self.accumulated_text.is_empty() {
            self.accumulated_text = reply.to_string();
        } else {
            self.accumulated_text = format!("{}, {}", self.accumulated_text, reply);
        }
    }
}

/// Terminal state of a disambiguation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Resolution {
    Resolved {
        prediction: PredictionResult,
        attempt_count: u32,
    },
    Declined {
        attempt_count: u32,
    },
    Exhausted {
        attempt_count: u32,
    },
}

impl Resolution {
    pub fn attempt_count(&self) -> u32 {
        match self {
            Resolution::Resolved { attempt_count, .. }
            | Resolution::Declined { attempt_count }
            | Resolution::Exhausted { attempt_count } => *attempt_count,
        }
    }
}

/// Outcome of one transition.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopStep {
    /// More input is needed; `prompt` is the question for the user.
    Gathering {
        state: ClarificationState,
        prompt: String,
    },
    Done(Resolution),
}

/// Source of the user's answers to clarification prompts.
#[async_trait]
pub trait ClarificationPrompter: Send + Sync {
    /// Ask `prompt` and wait for the reply. `None` means no reply will come.
    async fn ask(&self, prompt: &str) -> Option<String>;
}

pub struct DisambiguationLoop {
    predictor: Arc<dyn ConditionPredictor>,
    confidence_threshold: f64,
    max_attempts: u32,
    decline_words: HashSet<String>,
    inference_timeout: Duration,
}

impl DisambiguationLoop {
    pub fn new(predictor: Arc<dyn ConditionPredictor>, config: &TriageConfig) -> Self {
        Self {
            predictor,
            confidence_threshold: config.confidence_threshold,
            max_attempts: config.max_attempts,
            decline_words: config
                .decline_words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .collect(),
            inference_timeout: config.inference_timeout(),
        }
    }

    /// Whether `reply` is a member of the decline vocabulary.
    pub fn is_decline(&self, reply: &str) -> bool {
        let normalized = reply
            .trim()
            .trim_matches(|c: char| c.is_ascii_punctuation())
            .trim()
            .to_lowercase();
        self.decline_words.contains(&normalized)
    }

    /// Begin a disambiguation for `text`.
    pub async fn start(&self, text: &str) -> Result<LoopStep> {
        self.evaluate(ClarificationState::new(text)).await
    }

    /// Feed the user's reply to a pending prompt.
    pub async fn resume(&self, mut state: ClarificationState, reply: &str) -> Result<LoopStep> {
        if self.is_decline(reply) {
            info!(attempt_count = state.attempt_count, "User declined to add symptoms");
            return Ok(LoopStep::Done(Resolution::Declined {
                attempt_count: state.attempt_count,
            }));
        }

        state.attempt_count += 1;
        let reply = reply.trim();
        if reply.is_empty() {
            debug!(attempt_count = state.attempt_count, "Empty reply, asking again");
            return Ok(self.ask_again(state));
        }

        state.absorb(reply);
        self.evaluate(state).await
    }

    /// Drive the loop to a terminal state, asking `prompter` for replies.
    pub async fn resolve(
        &self,
        text: &str,
        prompter: &dyn ClarificationPrompter,
    ) -> Result<Resolution> {
        let mut step = self.start(text).await?;
        loop {
            match step {
                LoopStep::Done(resolution) => return Ok(resolution),
                LoopStep::Gathering { state, prompt } => {
                    let Some(reply) = prompter.ask(&prompt).await else {
                        info!("Prompter closed, treating as decline");
                        return Ok(Resolution::Declined {
                            attempt_count: state.attempt_count,
                        });
                    };
                    step = self.resume(state, &reply).await?;
                }
            }
        }
    }

    async fn evaluate(&self, state: ClarificationState) -> Result<LoopStep> {
        if state.accumulated_text.is_empty() {
            return Ok(self.ask_for(state, SYMPTOMS_PROMPT));
        }

        let prediction = bounded(
            self.inference_timeout,
            self.predictor.predict(&state.accumulated_text),
        )
        .await?;

        info!(
            label = %prediction.label,
            confidence = prediction.confidence,
            attempt_count = state.attempt_count,
            "Condition prediction"
        );

        if prediction.confidence >= self.confidence_threshold {
            return Ok(LoopStep::Done(Resolution::Resolved {
                prediction,
                attempt_count: state.attempt_count,
            }));
        }
        Ok(self.ask_again(state))
    }

    fn ask_again(&self, state: ClarificationState) -> LoopStep {
        self.ask_for(state, CLARIFY_PROMPT)
    }

    fn ask_for(&self, state: ClarificationState, prompt: &str) -> LoopStep {
        if state.attempt_count >= self.max_attempts {
            info!(
                attempt_count = state.attempt_count,
                max_attempts = self.max_attempts,
                "Disambiguation exhausted"
            );
            return LoopStep::Done(Resolution::Exhausted {
                attempt_count: state.attempt_count,
            });
        }
        LoopStep::Gathering {
            state,
            prompt: prompt.to_string(),
        }
    }
}
