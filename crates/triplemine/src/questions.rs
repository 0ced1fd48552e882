use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use triplemine_llm::LlmResponse;

use crate::logging;

pub const QUESTION_SYSTEM_PROMPT: &str =
    "Your goal is to generate 5 questions based on the given content and return a JSON object";

/// The instructional template sent once per chunk. The model is asked for
/// exactly 5 questions, but the parser tolerates any count it actually
/// returns.
pub fn question_prompt(content: &str) -> String {
    format!(
        "You are an AI assistant designed to generate insightful questions from a given text.\n\n\
         Based only on the content provided below, generate exactly 5 distinct questions that \
         cover the key concepts, methodologies, and outcomes described in the text.\n\n\
         Content:\n\n```\n{content}\n```\n\n\
         Constraints:\n\
         1. Generate exactly 5 questions.\n\
         2. The questions must be based directly on the information within the provided content.\n\
         3. Do NOT provide answers or any text other than the final JSON object.\n\n\
         Your entire response must be a single, valid JSON object with a single key \
         \"questions\" whose value is the list of generated question strings."
    )
}

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*\n(.*?)\n```").expect("fence regex"));

/// Outcome of decoding one model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedQuestions {
    Questions(Vec<String>),
    Malformed,
}

/// Extracts the response's JSON object and validates its shape. A fenced
/// code block wins over the raw text; anything that is not a top-level
/// object with a list of question strings is malformed.
pub fn parse_questions(raw: &str) -> ParsedQuestions {
    let body = match FENCED_BLOCK.captures(raw) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw).trim(),
        None => raw.trim(),
    };
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return ParsedQuestions::Malformed,
    };
    if !value.is_object() {
        return ParsedQuestions::Malformed;
    }
    match serde_json::from_value::<QuestionsPayload>(value) {
        Ok(payload) => ParsedQuestions::Questions(payload.questions),
        Err(_) => ParsedQuestions::Malformed,
    }
}

#[derive(Debug, Deserialize)]
struct QuestionsPayload {
    #[serde(default)]
    questions: Vec<String>,
}

/// One generation round for one chunk. A malformed or empty response is
/// converted to `None` here so batch processing never stops on it; only
/// transport-level failures propagate.
pub fn generate_for_chunk(
    invoke: &impl Fn(Option<&str>, &str) -> Result<LlmResponse>,
    chunk_text: &str,
) -> Result<Option<Vec<String>>> {
    let prompt = question_prompt(chunk_text);
    let response = invoke(Some(QUESTION_SYSTEM_PROMPT), &prompt)?;
    match parse_questions(&response.content) {
        ParsedQuestions::Questions(questions) if !questions.is_empty() => Ok(Some(questions)),
        ParsedQuestions::Questions(_) => {
            logging::verbose("response parsed but carried no questions");
            Ok(None)
        }
        ParsedQuestions::Malformed => {
            logging::stage("questions", "malformed response; zero questions this round");
            Ok(None)
        }
    }
}
