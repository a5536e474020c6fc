//! Question records: parsed from a model response, and as stored

use serde::{Deserialize, Serialize};

/// Reserved separator between response fields and between stored choices
pub const FIELD_DELIMITER: &str = "|||";

/// Number of choice slots in a question
pub const CHOICE_COUNT: usize = 4;

/// A multiple-choice question decoded from one generation response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuestion {
    /// Question stem
    pub question: String,
    /// Choice slots in order; blanks are kept
    pub choices: Vec<String>,
    /// Choice number/label or literal answer text
    pub answer: String,
    /// Explanation, may be empty
    pub explanation: String,
    /// Subject label
    pub subject: String,
    /// Originating file name
    pub source: String,
}

impl ParsedQuestion {
    /// A question is admissible only with a question stem and an answer
    pub fn is_valid(&self) -> bool {
        !self.question.trim().is_empty() && !self.answer.trim().is_empty()
    }

    /// Stored representation of the choices
    pub fn choices_text(&self) -> String {
        self.choices.join(FIELD_DELIMITER)
    }
}

/// A persisted question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProblem {
    /// Auto-assigned row id
    pub id: i64,
    pub subject: String,
    pub question: String,
    pub choices: Vec<String>,
    pub answer: String,
    pub explanation: String,
    /// Times answered wrong in review; owned by the notebook
    pub wrong_count: i64,
    pub source: String,
}

/// Split a stored choices column back into its slots
pub fn split_choices(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }
    stored.split(FIELD_DELIMITER).map(str::to_string).collect()
}
