use serde::{Deserialize, Serialize};
use triage_core::{DispatchResponse, Intent};

#[derive(Debug, Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssistantRequest {
    pub session_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntentInfo {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntentsResponse {
    pub intents: Vec<IntentInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntentResponse {
    pub intent: Intent,
    pub response: String,
    pub confidence: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiseaseResponse {
    pub disease: String,
    pub confidence: f64,
    /// Known symptoms of the predicted condition, empty when it is not in the table.
    pub symptoms: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Completed,
    WaitingForInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub session_id: String,
    pub intent: Option<Intent>,
    pub response: DispatchResponse,
    pub message: String,
    pub disease: Option<String>,
    pub confidence: Option<f64>,
    pub status: TurnStatus,
}
