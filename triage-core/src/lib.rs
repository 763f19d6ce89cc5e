pub mod config;
pub mod data;
pub mod disambiguation;
pub mod dispatcher;
pub mod error;
pub mod fuzzy;
pub mod intent;
#[cfg(feature = "llm")]
pub mod llm;
pub mod model;
pub mod prediction;
pub mod response;
pub mod runner;
pub mod session;
pub mod symptom_index;
pub mod text;

// Re-export commonly used types
pub use config::TriageConfig;
pub use data::{build_dispatcher, build_dispatcher_with, load_condition_table, load_intent_examples};
pub use disambiguation::{
    ClarificationPrompter, ClarificationState, DisambiguationLoop, LoopStep, Resolution,
};
pub use dispatcher::{Dispatcher, TurnResult};
pub use error::{Result, TriageError};
pub use intent::Intent;
#[cfg(feature = "llm")]
pub use llm::LlmIntentClassifier;
pub use prediction::{
    ConditionPredictor, IntentClassifier, IntentPrediction, PredictionResult,
    TrainedConditionPredictor, TrainedIntentClassifier, run_blocking,
};
pub use response::DispatchResponse;
pub use runner::{TurnOutcome, TurnRunner};
pub use session::{ConversationSession, InMemorySessionStorage, MessageRole, SessionStorage};
pub use symptom_index::{ConditionRecord, SymptomIndex, SymptomList};
