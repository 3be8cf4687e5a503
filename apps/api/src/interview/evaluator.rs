//! Answer evaluator: scores a single answer along four independent
//! dimensions via the text-generation capability.
//!
//! Missing answers short-circuit to the all-zero sentinel score without an
//! LLM call. Call or parse failures degrade to a neutral all-5 score; an
//! evaluation can never block interview progression.

use tracing::warn;

use crate::interview::prompts::{
    EVALUATION_JD_INSTRUCTION, EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM_TEMPLATE,
};
use crate::llm_client::TextGenerator;
use crate::models::interview::{QuestionScore, RoundType};

/// Fixed client-side marker for a skipped question.
pub const NO_ANSWER_SENTINEL: &str = "[No answer provided]";

const JD_PROMPT_CHARS: usize = 1000;
/// Neutral value for any dimension the reply does not mention.
const NEUTRAL_SCORE: u8 = 5;

/// Evaluates one answer. Infallible by design: every failure mode maps to a
/// defined fallback score.
pub async fn evaluate_answer(
    gen: &dyn TextGenerator,
    question: &str,
    answer: &str,
    role: &str,
    company: &str,
    round_type: RoundType,
    job_description: Option<&str>,
) -> QuestionScore {
    if answer.trim().is_empty() || answer == NO_ANSWER_SENTINEL {
        return QuestionScore::unanswered();
    }

    let jd = job_description.filter(|jd| !jd.trim().is_empty());

    let system = EVALUATION_SYSTEM_TEMPLATE
        .replace("{round_type}", round_type.as_str())
        .replace(
            "{jd_instruction}",
            if jd.is_some() {
                EVALUATION_JD_INSTRUCTION
            } else {
                ""
            },
        );

    let jd_context = jd
        .map(|jd| {
            format!(
                "\nJob Description:\n{}\n",
                jd.chars().take(JD_PROMPT_CHARS).collect::<String>()
            )
        })
        .unwrap_or_default();

    let prompt = EVALUATION_PROMPT_TEMPLATE
        .replace("{role}", role)
        .replace("{company}", company)
        .replace("{round_type}", round_type.as_str())
        .replace("{jd_context}", &jd_context)
        .replace("{question}", question)
        .replace("{answer}", answer);

    match gen.generate(&system, &prompt).await {
        Ok(content) => parse_evaluation(&content),
        Err(e) => {
            warn!("Answer evaluation failed, falling back to neutral score: {e}");
            QuestionScore {
                correctness: NEUTRAL_SCORE,
                clarity: NEUTRAL_SCORE,
                structure: NEUTRAL_SCORE,
                depth: NEUTRAL_SCORE,
                feedback: "An error occurred during evaluation.".to_string(),
            }
        }
    }
}

/// Parses the rubric reply. Each dimension line is located by a
/// case-insensitive prefix; the first integer token is clamped to [0, 10].
/// Dimensions the reply omits stay at the neutral 5.
fn parse_evaluation(content: &str) -> QuestionScore {
    let mut score = QuestionScore {
        correctness: NEUTRAL_SCORE,
        clarity: NEUTRAL_SCORE,
        structure: NEUTRAL_SCORE,
        depth: NEUTRAL_SCORE,
        feedback: "Evaluation generated.".to_string(),
    };

    for line in content.lines() {
        if let Some(rest) = value_after_prefix(line, "CORRECTNESS:") {
            if let Some(v) = first_int_token(rest) {
                score.correctness = clamp_dimension(v);
            }
        } else if let Some(rest) = value_after_prefix(line, "CLARITY:") {
            if let Some(v) = first_int_token(rest) {
                score.clarity = clamp_dimension(v);
            }
        } else if let Some(rest) = value_after_prefix(line, "STRUCTURE:") {
            if let Some(v) = first_int_token(rest) {
                score.structure = clamp_dimension(v);
            }
        } else if let Some(rest) = value_after_prefix(line, "DEPTH:") {
            if let Some(v) = first_int_token(rest) {
                score.depth = clamp_dimension(v);
            }
        } else if let Some(rest) = value_after_prefix(line, "FEEDBACK:") {
            let feedback = rest.trim();
            if !feedback.is_empty() {
                score.feedback = feedback.to_string();
            }
        }
    }

    score
}

/// Case-insensitive prefix match returning the remainder of the line.
fn value_after_prefix<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let trimmed = line.trim();
    if trimmed.len() >= prefix.len()
        && trimmed.is_char_boundary(prefix.len())
        && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&trimmed[prefix.len()..])
    } else {
        None
    }
}

/// First parseable integer among the whitespace tokens, tolerating wrappers
/// like "[8]" or "(7)".
fn first_int_token(s: &str) -> Option<i64> {
    s.split_whitespace().find_map(|token| {
        token
            .trim_matches(|c: char| !c.is_ascii_digit() && c != '-')
            .parse::<i64>()
            .ok()
    })
}

fn clamp_dimension(value: i64) -> u8 {
    value.clamp(0, 10) as u8
}
