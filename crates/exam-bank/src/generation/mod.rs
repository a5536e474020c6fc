//! Question generation: prompt template and response decoding

pub mod parser;
pub mod prompt;

pub use parser::{decode_response, Decoded, QuestionParser};
pub use prompt::PromptBuilder;
