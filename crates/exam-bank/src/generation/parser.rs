//! Structured-response parser: one chunk in, at most one question out

use std::sync::Arc;

use crate::config::ParserConfig;
use crate::providers::LlmProvider;
use crate::types::question::CHOICE_COUNT;
use crate::types::{ParsedQuestion, TextChunk, FIELD_DELIMITER};

use super::prompt::{truncate_chars, PromptBuilder};

/// question + 4 choices + answer + explanation
const FIELD_COUNT: usize = 2 + CHOICE_COUNT + 1;

const PREVIEW_CHARS: usize = 80;

const CODE_FENCE: &str = "```";

/// Outcome of decoding one raw response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Fields mapped positionally (may still fail admission)
    Question(ParsedQuestion),
    /// The response never used the delimiter
    MissingDelimiter,
    /// A choice is too long to be a choice; the model ignored the one-line format
    ImplausibleChoices { longest: usize },
}

/// Decode a delimited response into a question.
///
/// Missing trailing fields are padded with empty strings; fields past the
/// seventh are ignored; every field is trimmed.
pub fn decode_response(raw: &str, subject: &str, source: &str, max_choice_chars: usize) -> Decoded {
    let body = strip_code_fences(raw);
    if !body.contains(FIELD_DELIMITER) {
        return Decoded::MissingDelimiter;
    }

    let mut fields: Vec<String> = body
        .split(FIELD_DELIMITER)
        .take(FIELD_COUNT)
        .map(|field| field.trim().to_string())
        .collect();
    fields.resize(FIELD_COUNT, String::new());

    let mut fields = fields.into_iter();
    let question = fields.next().unwrap_or_default();
    let choices: Vec<String> = fields.by_ref().take(CHOICE_COUNT).collect();
    let answer = fields.next().unwrap_or_default();
    let explanation = fields.next().unwrap_or_default();

    let longest = choices.iter().map(|c| c.chars().count()).max().unwrap_or(0);
    if longest > max_choice_chars {
        return Decoded::ImplausibleChoices { longest };
    }

    Decoded::Question(ParsedQuestion {
        question,
        choices,
        answer,
        explanation,
        subject: subject.to_string(),
        source: source.to_string(),
    })
}

/// Remove the Markdown fence markers the model sometimes wraps answers in.
///
/// Only the markers go: a leading "```" with an optional language tag on its
/// own line, and a trailing "```". Text on the fence line is kept.
fn strip_code_fences(raw: &str) -> &str {
    let mut body = raw.trim();

    if let Some(rest) = body.strip_prefix(CODE_FENCE) {
        body = match rest.split_once('\n') {
            Some((tag, after)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => after,
            _ => rest,
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix(CODE_FENCE) {
        body = rest;
    }

    body.trim()
}

/// Turns chunks into questions through a generation service
pub struct QuestionParser {
    llm: Arc<dyn LlmProvider>,
    config: ParserConfig,
}

impl QuestionParser {
    /// Create a parser around an explicit service handle
    pub fn new(llm: Arc<dyn LlmProvider>, config: ParserConfig) -> Self {
        Self { llm, config }
    }

    /// Parse one passage. Never fails: service errors and contract violations
    /// are logged and become `None`.
    pub async fn parse(&self, chunk: &str, subject_hint: &str, source_name: &str) -> Option<ParsedQuestion> {
        self.parse_with_context(chunk, subject_hint, source_name, None).await
    }

    /// Parse a tagged chunk, logging its position on failure
    pub async fn parse_chunk(&self, chunk: &TextChunk) -> Option<ParsedQuestion> {
        self.parse_with_context(&chunk.content, &chunk.subject, &chunk.source, Some(chunk.index))
            .await
    }

    async fn parse_with_context(
        &self,
        chunk: &str,
        subject_hint: &str,
        source_name: &str,
        index: Option<usize>,
    ) -> Option<ParsedQuestion> {
        let location = match index {
            Some(i) => format!("{} chunk #{}", source_name, i + 1),
            None => source_name.to_string(),
        };

        let prompt = PromptBuilder::build_question_prompt(chunk, subject_hint, self.config.max_prompt_chars);

        let raw = match self.llm.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Generation failed for {} via {}: {}", location, self.llm.name(), e);
                return None;
            }
        };

        match decode_response(&raw, subject_hint, source_name, self.config.max_choice_chars) {
            Decoded::Question(question) => Some(question),
            Decoded::MissingDelimiter => {
                tracing::warn!(
                    "Malformed response for {} (no '{}'): {:?}",
                    location,
                    FIELD_DELIMITER,
                    truncate_chars(raw.trim(), PREVIEW_CHARS)
                );
                None
            }
            Decoded::ImplausibleChoices { longest } => {
                tracing::warn!(
                    "Rejected response for {}: choice of {} chars exceeds {}",
                    location,
                    longest,
                    self.config.max_choice_chars
                );
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned responses in order; `None` entries fail the call
    pub(crate) struct ScriptedLlm {
        responses: Mutex<Vec<Option<String>>>,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        pub(crate) fn new(responses: Vec<Option<&str>>) -> Self {
            let mut responses: Vec<Option<String>> =
                responses.into_iter().map(|r| r.map(str::to_string)).collect();
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.responses.lock().unwrap().pop() {
                Some(Some(response)) => Ok(response),
                Some(None) => Err(Error::llm("service unavailable")),
                None => Err(Error::llm("script exhausted")),
            }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test"
        }
    }

    fn decode(raw: &str) -> Decoded {
        decode_response(raw, "정보처리기사", "exam.pdf", 300)
    }

    #[test]
    fn test_decode_full_line() {
        let raw = " 다음 중 DDL이 아닌 것은? ||| CREATE ||| ALTER ||| DROP ||| SELECT ||| 4 ||| SELECT는 DML이다.\n";
        let Decoded::Question(q) = decode(raw) else {
            panic!("expected question");
        };

        assert_eq!(q.question, "다음 중 DDL이 아닌 것은?");
        assert_eq!(q.choices, vec!["CREATE", "ALTER", "DROP", "SELECT"]);
        assert_eq!(q.answer, "4");
        assert_eq!(q.explanation, "SELECT는 DML이다.");
        assert_eq!(q.subject, "정보처리기사");
        assert_eq!(q.source, "exam.pdf");
        assert_eq!(q.choices_text(), "CREATE|||ALTER|||DROP|||SELECT");
        assert!(q.is_valid());
    }

    #[test]
    fn test_decode_missing_delimiter() {
        assert_eq!(decode("2번\n"), Decoded::MissingDelimiter);
        assert_eq!(decode(""), Decoded::MissingDelimiter);
    }

    #[test]
    fn test_decode_pads_short_response() {
        let Decoded::Question(q) = decode("질문만 있음|||보기1") else {
            panic!("expected question");
        };

        assert_eq!(q.question, "질문만 있음");
        assert_eq!(q.choices, vec!["보기1", "", "", ""]);
        assert_eq!(q.answer, "");
        assert_eq!(q.explanation, "");
        assert!(!q.is_valid());
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let Decoded::Question(q) = decode("Q|||1|||2|||3|||4|||2|||해설|||잡음|||더 잡음") else {
            panic!("expected question");
        };
        assert_eq!(q.explanation, "해설");
    }

    #[test]
    fn test_decode_strips_code_fence() {
        let Decoded::Question(q) = decode("```\nQ|||a|||b|||c|||d|||1|||e\n```") else {
            panic!("expected question");
        };
        assert_eq!(q.question, "Q");
        assert_eq!(q.explanation, "e");
    }

    #[test]
    fn test_decode_inline_fence_keeps_answer() {
        let Decoded::Question(q) = decode("```Q|||a|||b|||c|||d|||1|||e```") else {
            panic!("expected question");
        };
        assert_eq!(q.question, "Q");
        assert_eq!(q.choices, vec!["a", "b", "c", "d"]);
        assert_eq!(q.explanation, "e");

        let Decoded::Question(q) = decode("```text\nQ|||a|||b|||c|||d|||1|||e\n```\n") else {
            panic!("expected question");
        };
        assert_eq!(q.question, "Q");
        assert_eq!(q.explanation, "e");

        assert_eq!(decode("```\n2번\n```"), Decoded::MissingDelimiter);
    }

    #[test]
    fn test_decode_rejects_implausible_choice() {
        let long_choice = "가".repeat(301);
        let raw = format!("Q|||{}|||b|||c|||d|||1|||e", long_choice);
        assert_eq!(decode(&raw), Decoded::ImplausibleChoices { longest: 301 });
    }

    #[tokio::test]
    async fn test_parse_success_and_prompt() {
        let llm = Arc::new(ScriptedLlm::new(vec![Some("Q|||a|||b|||c|||d|||1|||e")]));
        let parser = QuestionParser::new(llm.clone(), ParserConfig::default());

        let q = parser.parse("본문", "운영체제", "os.pptx").await.unwrap();
        assert_eq!(q.subject, "운영체제");
        assert_eq!(q.source, "os.pptx");

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("본문"));
        assert!(prompts[0].contains("운영체제"));
    }

    #[tokio::test]
    async fn test_parse_no_delimiter_is_none() {
        let llm = Arc::new(ScriptedLlm::new(vec![Some("2번\n")]));
        let parser = QuestionParser::new(llm, ParserConfig::default());
        assert!(parser.parse("본문", "과목", "a.pdf").await.is_none());
    }

    #[tokio::test]
    async fn test_parse_service_error_is_none() {
        let llm = Arc::new(ScriptedLlm::new(vec![None]));
        let parser = QuestionParser::new(llm.clone(), ParserConfig::default());

        let chunk = TextChunk {
            content: "본문".to_string(),
            subject: "과목".to_string(),
            source: "a.pdf".to_string(),
            index: 2,
        };
        assert!(parser.parse_chunk(&chunk).await.is_none());
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_parse_short_response_still_returns_question() {
        let llm = Arc::new(ScriptedLlm::new(vec![Some("질문|||보기")]));
        let parser = QuestionParser::new(llm, ParserConfig::default());

        let q = parser.parse("본문", "과목", "a.pdf").await.unwrap();
        assert_eq!(q.answer, "");
        assert!(!q.is_valid());
    }
}
