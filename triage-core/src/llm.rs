use async_trait::async_trait;
use rig::{
    agent::Agent,
    client::CompletionClient,
    completion::Chat,
    providers::openrouter,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::{Result, TriageError},
    intent::Intent,
    prediction::{IntentClassifier, IntentPrediction},
};

const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

const INTENT_PROMPT: &str = r#"You are the intake step of a health assistant. Classify the user's message into exactly one intent:
- greet: greetings and small talk openers
- ask_symptom: asking what the symptoms of a named condition are
- give_symptom: describing symptoms they are experiencing
- emergency: a situation that needs urgent medical help
- thanks: thanking or saying goodbye
- gibberish: anything unclear or unrelated

Respond with ONLY this JSON (no explanation, no additional text):
{
  "intent": "give_symptom",
  "confidence": 0.87
}
"#;

#[derive(Deserialize)]
struct IntentResponse {
    intent: String,
    confidence: Option<f64>,
}

/// Attempts to parse the intent JSON from the LLM response
fn parse_intent_from_response(response: &str) -> Option<IntentPrediction> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_end_matches("```")
        .trim();
    let parsed = serde_json::from_str::<IntentResponse>(cleaned).ok()?;
    let intent = Intent::parse(&parsed.intent)?;
    Some(IntentPrediction {
        intent,
        confidence: parsed.confidence.map(|c| c.clamp(0.0, 1.0)),
    })
}

/// Intent classifier that asks a hosted LLM through OpenRouter.
pub struct LlmIntentClassifier {
    agent: Agent<openrouter::CompletionModel>,
}

impl LlmIntentClassifier {
    /// Build from `OPENROUTER_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| TriageError::ModelUnavailable("OPENROUTER_API_KEY not set".to_string()))?;
        Ok(Self::new(&api_key, DEFAULT_MODEL))
    }

    pub fn new(api_key: &str, model: &str) -> Self {
        let client = openrouter::Client::new(api_key);
        let agent = client.agent(model).preamble(INTENT_PROMPT).build();
        Self { agent }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, text: &str) -> Result<IntentPrediction> {
        let user_input = text.to_string();
        let response = self
            .agent
            .chat(&user_input, vec![])
            .await
            .map_err(|e| TriageError::Inference(e.to_string()))?;

        match parse_intent_from_response(&response) {
            Some(prediction) => {
                info!(intent = %prediction.intent, "LLM intent classified");
                Ok(prediction)
            }
            None => {
                warn!(response = %response, "Unparseable LLM intent response, using gibberish");
                Ok(IntentPrediction::new(Intent::Gibberish))
            }
        }
    }
}
