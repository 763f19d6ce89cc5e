use std::fmt;

use serde::{Deserialize, Serialize};

/// Conversational purpose behind a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greet,
    AskSymptom,
    GiveSymptom,
    Emergency,
    Thanks,
    Gibberish,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::Greet,
        Intent::AskSymptom,
        Intent::GiveSymptom,
        Intent::Emergency,
        Intent::Thanks,
        Intent::Gibberish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greet => "greet",
            Intent::AskSymptom => "ask_symptom",
            Intent::GiveSymptom => "give_symptom",
            Intent::Emergency => "emergency",
            Intent::Thanks => "thanks",
            Intent::Gibberish => "gibberish",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Intent::Greet => "Greeting messages",
            Intent::AskSymptom => "Asking about symptoms",
            Intent::GiveSymptom => "Providing symptoms for diagnosis",
            Intent::Emergency => "Emergency situations",
            Intent::Thanks => "Thank you messages",
            Intent::Gibberish => "Unclear or unrelated messages",
        }
    }

    /// Strict parse of a vocabulary label.
    pub fn parse(label: &str) -> Option<Intent> {
        let label = label.trim().to_lowercase();
        Intent::ALL.into_iter().find(|i| i.as_str() == label)
    }

    /// Lenient parse: anything outside the vocabulary is gibberish.
    pub fn from_label(label: &str) -> Intent {
        Intent::parse(label).unwrap_or(Intent::Gibberish)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_parse() {
        for intent in Intent::ALL {
            assert_eq!(Intent::parse(intent.as_str()), Some(intent));
        }
    }

    #[test]
    fn unknown_labels_become_gibberish() {
        assert_eq!(Intent::parse("order_pizza"), None);
        assert_eq!(Intent::from_label("order_pizza"), Intent::Gibberish);
        assert_eq!(Intent::from_label(" GREET "), Intent::Greet);
    }

    #[test]
    fn serde_uses_snake_case_labels() {
        let json = serde_json::to_string(&Intent::GiveSymptom).unwrap();
        assert_eq!(json, "\"give_symptom\"");
    }
}
