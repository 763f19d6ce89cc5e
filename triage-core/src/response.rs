use serde::{Deserialize, Serialize};

use crate::symptom_index::SymptomList;

pub const GREETING: &str = "Hello! 👋 I'm your Health Assistant. Tell me how you are feeling, or ask me about a condition.";

pub const EMERGENCY: &str = "This sounds serious 🚨. Please call emergency services (e.g., 108 in India or 911 in the US) immediately or rush to the nearest hospital!";

pub const FAREWELL: &str = "Goodbye! Take care of your health. 💙";

pub const CLARIFICATION_REQUEST: &str =
    "Sorry, I didn't quite understand that. Could you rephrase it or ask me about your symptoms?";

pub const DECLINED: &str = "Sorry I couldn't narrow that down. If your symptoms persist or get worse, please consult a doctor. You can also ask me about a specific condition.";

pub const EXHAUSTED: &str = "I still can't identify a likely condition from these symptoms. Please consult a healthcare professional for a proper diagnosis.";

pub const FAILURE: &str = "Something went wrong while processing your message. Please try again.";

/// Everything the dispatcher can answer with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchResponse {
    TextMessage {
        text: String,
    },
    SymptomList {
        matched_disease: Option<String>,
        symptoms: Vec<String>,
        match_score: f64,
    },
    DiseaseResult {
        label: String,
        confidence: f64,
    },
    Declined {
        message: String,
    },
    /// A disambiguation is waiting for the user's next reply.
    NeedsClarification {
        prompt: String,
        attempt_count: u32,
    },
    Failure {
        message: String,
    },
}

impl DispatchResponse {
    pub fn text(text: impl Into<String>) -> Self {
        DispatchResponse::TextMessage { text: text.into() }
    }

    pub fn declined() -> Self {
        DispatchResponse::Declined {
            message: DECLINED.to_string(),
        }
    }

    pub fn failure() -> Self {
        DispatchResponse::Failure {
            message: FAILURE.to_string(),
        }
    }

    /// User-facing rendering of the response.
    pub fn message(&self) -> String {
        match self {
            DispatchResponse::TextMessage { text } => text.clone(),
            DispatchResponse::SymptomList {
                matched_disease: Some(name),
                symptoms,
                ..
            } => format!("Common symptoms of {}: {}.", name, symptoms.join(", ")),
            DispatchResponse::SymptomList { symptoms, .. } => symptoms.join(", "),
            DispatchResponse::DiseaseResult { label, confidence } => format!(
                "Based on your symptoms, the most likely condition is {} ({:.0}% confidence). This is not a diagnosis; please consult a doctor.",
                label,
                confidence * 100.0
            ),
            DispatchResponse::Declined { message } | DispatchResponse::Failure { message } => {
                message.clone()
            }
            DispatchResponse::NeedsClarification { prompt, .. } => prompt.clone(),
        }
    }

    /// Predicted condition, if this response carries one.
    pub fn disease(&self) -> Option<&str> {
        match self {
            DispatchResponse::DiseaseResult { label, .. } => Some(label),
            DispatchResponse::SymptomList {
                matched_disease, ..
            } => matched_disease.as_deref(),
            _ => None,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            DispatchResponse::DiseaseResult { confidence, .. } => Some(*confidence),
            _ => None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, DispatchResponse::NeedsClarification { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DispatchResponse::Failure { .. })
    }
}

impl From<SymptomList> for DispatchResponse {
    fn from(list: SymptomList) -> Self {
        DispatchResponse::SymptomList {
            matched_disease: list.matched_disease,
            symptoms: list.symptoms,
            match_score: list.match_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let value = serde_json::to_value(DispatchResponse::DiseaseResult {
            label: "Flu".to_string(),
            confidence: 0.4,
        })
        .unwrap();
        assert_eq!(value["type"], "disease_result");
        assert_eq!(value["label"], "Flu");
    }

    #[test]
    fn renders_matched_symptom_list() {
        let response = DispatchResponse::SymptomList {
            matched_disease: Some("Flu".to_string()),
            symptoms: vec!["fever".to_string(), "chills".to_string()],
            match_score: 100.0,
        };
        assert_eq!(response.message(), "Common symptoms of Flu: fever, chills.");
        assert_eq!(response.disease(), Some("Flu"));
        assert_eq!(response.confidence(), None);
    }

    #[test]
    fn renders_disease_result_with_percentage() {
        let response = DispatchResponse::DiseaseResult {
            label: "Malaria".to_string(),
            confidence: 0.4,
        };
        assert!(response.message().contains("Malaria (40% confidence)"));
        assert_eq!(response.confidence(), Some(0.4));
    }
}
