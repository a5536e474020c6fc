//! Prompt template for question extraction
//!
//! The template and `parser::decode_response` are one contract: the model is asked
//! for a single line of seven `|||`-separated fields, and the decoder reads them
//! back positionally. Change both together.

use crate::types::FIELD_DELIMITER;

/// Prompt builder for question extraction
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the extraction prompt for one chunk.
    ///
    /// `chunk` is cut to `max_chars` characters before it is embedded.
    pub fn build_question_prompt(chunk: &str, subject_hint: &str, max_chars: usize) -> String {
        let passage = truncate_chars(chunk, max_chars);

        format!(
            r#"너는 {subject} 자격증 시험 문제 출제 위원이야.
아래 [본문]에서 객관식 문제 1개를 골라 정리해줘. 본문에 기출 문제가 있으면 그 문제를 그대로 옮기고, 없으면 본문 내용으로 새 문제를 만들어.

[출력 규칙]
- 반드시 한 줄로만 답해. 줄바꿈, 마크다운, 번호 매기기, 설명 문장을 덧붙이지 마.
- 필드는 정확히 7개이고 구분자 "{delim}" 로 이어 붙여.
- 순서: 문제{delim}보기1{delim}보기2{delim}보기3{delim}보기4{delim}정답{delim}해설
- 정답은 보기 번호(1~4)로 적어.
- 필드 안에는 "{delim}" 를 쓰지 마.

[예시]
OSI 7계층 중 종단 간 신뢰성 있는 전송을 담당하는 계층은?{delim}물리 계층{delim}네트워크 계층{delim}전송 계층{delim}응용 계층{delim}3{delim}전송 계층은 흐름 제어와 오류 제어로 종단 간 신뢰성을 보장한다.

[본문]
{passage}
"#,
            subject = subject_hint,
            delim = FIELD_DELIMITER,
            passage = passage,
        )
    }
}

/// First `max_chars` characters of `text`
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
