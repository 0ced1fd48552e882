use std::collections::VecDeque;

use anyhow::Result;
use triplemine_core::Chunk;
use triplemine_llm::LlmResponse;

use crate::logging;
use crate::model::ChunkQuestions;
use crate::questions;

pub const MAX_RETRY_ROUNDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChunkState {
    Pending,
    Satisfied(Vec<String>),
}

/// Drives question generation to convergence. One full pass seeds the
/// per-chunk states; afterwards only a worklist of pending positions is
/// revisited, for at most [`MAX_RETRY_ROUNDS`] rounds. Satisfied chunks
/// keep the questions from the round that satisfied them. Chunks still
/// pending when the cap is reached come back with an empty question list.
pub fn orchestrate(
    chunks: Vec<Chunk>,
    invoke: &impl Fn(Option<&str>, &str) -> Result<LlmResponse>,
) -> Result<Vec<ChunkQuestions>> {
    logging::stage(
        "questions",
        format!("generating questions for {} chunk(s)", chunks.len()),
    );
    let mut states: Vec<ChunkState> = Vec::with_capacity(chunks.len());
    let mut pending: VecDeque<usize> = VecDeque::new();
    for (position, chunk) in chunks.iter().enumerate() {
        match questions::generate_for_chunk(invoke, &chunk.text)? {
            Some(generated) => states.push(ChunkState::Satisfied(generated)),
            None => {
                states.push(ChunkState::Pending);
                pending.push_back(position);
            }
        }
    }
    let mut round = 0usize;
    while !pending.is_empty() && round < MAX_RETRY_ROUNDS {
        round += 1;
        logging::stage(
            "questions",
            format!(
                "retry round {round}/{MAX_RETRY_ROUNDS}: {} chunk(s) pending",
                pending.len()
            ),
        );
        let mut still_pending = VecDeque::new();
        while let Some(position) = pending.pop_front() {
            match questions::generate_for_chunk(invoke, &chunks[position].text)? {
                Some(generated) => states[position] = ChunkState::Satisfied(generated),
                None => still_pending.push_back(position),
            }
        }
        pending = still_pending;
    }
    if !pending.is_empty() {
        logging::stage(
            "questions",
            format!(
                "{} chunk(s) have no questions after {MAX_RETRY_ROUNDS} retry round(s)",
                pending.len()
            ),
        );
    }
    Ok(chunks
        .into_iter()
        .zip(states)
        .map(|(chunk, state)| ChunkQuestions {
            chunk,
            questions: match state {
                ChunkState::Satisfied(generated) => generated,
                ChunkState::Pending => Vec::new(),
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const GOOD: &str = r#"{"questions": ["q1", "q2", "q3", "q4", "q5"]}"#;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            section_title: "Intro".to_string(),
            section_index: 0,
            chunk_index: index,
            text: text.to_string(),
            token_count: 4,
        }
    }

    fn response(content: &str) -> LlmResponse {
        LlmResponse {
            content: content.to_string(),
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }

    #[test]
    fn every_chunk_satisfied_in_one_pass() {
        let calls = RefCell::new(0usize);
        let invoke = |_: Option<&str>, _: &str| {
            *calls.borrow_mut() += 1;
            Ok(response(GOOD))
        };
        let result = orchestrate(vec![chunk(0, "alpha"), chunk(1, "beta")], &invoke).unwrap();
        assert_eq!(*calls.borrow(), 2);
        assert!(result.iter().all(|entry| entry.questions.len() == 5));
    }

    #[test]
    fn retry_cap_bounds_the_number_of_rounds() {
        let calls = RefCell::new(0usize);
        let invoke = |_: Option<&str>, _: &str| {
            *calls.borrow_mut() += 1;
            Ok(response("no json here"))
        };
        let result = orchestrate(vec![chunk(0, "alpha"), chunk(1, "beta")], &invoke).unwrap();
        // one initial pass plus three retry rounds, per chunk
        assert_eq!(*calls.borrow(), 2 * (1 + MAX_RETRY_ROUNDS));
        assert!(result.iter().all(|entry| entry.questions.is_empty()));
    }

    #[test]
    fn satisfied_chunks_are_never_revisited() {
        let prompts = RefCell::new(Vec::<String>::new());
        let invoke = |_: Option<&str>, user: &str| {
            prompts.borrow_mut().push(user.to_string());
            if user.contains("alpha") {
                Ok(response(r#"{"questions": ["keep me"]}"#))
            } else {
                Ok(response("garbage"))
            }
        };
        let result = orchestrate(vec![chunk(0, "alpha"), chunk(1, "beta")], &invoke).unwrap();
        let alpha_calls = prompts
            .borrow()
            .iter()
            .filter(|p| p.contains("alpha"))
            .count();
        assert_eq!(alpha_calls, 1);
        assert_eq!(result[0].questions, vec!["keep me".to_string()]);
        assert!(result[1].questions.is_empty());
    }

    #[test]
    fn a_chunk_repaired_mid_retry_keeps_its_position() {
        let beta_attempts = RefCell::new(0usize);
        let invoke = |_: Option<&str>, user: &str| {
            if user.contains("beta") {
                let mut attempts = beta_attempts.borrow_mut();
                *attempts += 1;
                if *attempts < 3 {
                    return Ok(response("garbage"));
                }
                return Ok(response(r#"{"questions": ["late arrival"]}"#));
            }
            Ok(response(GOOD))
        };
        let result = orchestrate(
            vec![chunk(0, "alpha"), chunk(1, "beta"), chunk(2, "gamma")],
            &invoke,
        )
        .unwrap();
        assert_eq!(result[1].chunk.text, "beta");
        assert_eq!(result[1].questions, vec!["late arrival".to_string()]);
        assert_eq!(result[0].questions.len(), 5);
        assert_eq!(result[2].questions.len(), 5);
    }

    #[test]
    fn transport_errors_unwind_out_of_the_orchestrator() {
        let invoke =
            |_: Option<&str>, _: &str| -> Result<LlmResponse> { Err(anyhow::anyhow!("down")) };
        assert!(orchestrate(vec![chunk(0, "alpha")], &invoke).is_err());
    }
}
