//! Question generator: produces role/company/round/difficulty-tailored
//! questions via the text-generation capability, with parsing and fallback.
//!
//! The interview must always be able to proceed: a failed or unparsable LLM
//! call degrades to generic fallback questions instead of propagating.

use tracing::warn;

use crate::errors::AppError;
use crate::interview::prompts::{
    difficulty_instruction, round_patterns, QUESTION_PROMPT_TEMPLATE, QUESTION_SYSTEM_TEMPLATE,
};
use crate::interview::rounds::{round_spec, RoundSpec};
use crate::llm_client::TextGenerator;
use crate::models::interview::DifficultyLevel;

/// Lines shorter than this after prefix stripping are treated as noise.
const MIN_QUESTION_LEN: usize = 10;
/// Only the most recent prior Q&A pairs are replayed into the prompt.
const PREVIOUS_QA_WINDOW: usize = 6;
/// Prior answers are truncated to keep the prompt bounded.
const ANSWER_SNIPPET_CHARS: usize = 200;
const RESUME_PROMPT_CHARS: usize = 3000;
const JD_PROMPT_CHARS: usize = 1000;

/// A prior question/answer pair carried into the next round's prompt.
#[derive(Debug, Clone)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Generates the questions for one round. Always returns exactly the round's
/// configured question count. Fails only on an invalid round number; LLM
/// failures degrade to generic fallback questions.
pub async fn generate_round_questions(
    gen: &dyn TextGenerator,
    role: &str,
    company: &str,
    resume_text: &str,
    round_number: u8,
    difficulty: DifficultyLevel,
    job_description: Option<&str>,
    previous_qa: &[QaPair],
) -> Result<Vec<String>, AppError> {
    let spec = round_spec(round_number)
        .ok_or_else(|| AppError::Validation(format!("Invalid round number: {round_number}")))?;

    let system = QUESTION_SYSTEM_TEMPLATE
        .replace("{round_number}", &round_number.to_string())
        .replace("{round_name}", spec.name)
        .replace("{round_patterns}", round_patterns(spec.round_type))
        .replace("{difficulty_instruction}", difficulty_instruction(difficulty))
        .replace("{question_count}", &spec.question_count.to_string())
        .replace("{role}", role)
        .replace("{company}", company);

    let jd_context = job_description
        .filter(|jd| !jd.trim().is_empty())
        .map(|jd| {
            format!(
                "\nJob Description:\n{}\n",
                truncate_chars(jd, JD_PROMPT_CHARS)
            )
        })
        .unwrap_or_default();

    let prompt = QUESTION_PROMPT_TEMPLATE
        .replace("{role}", role)
        .replace("{company}", company)
        .replace("{round_number}", &round_number.to_string())
        .replace("{round_name}", spec.name)
        .replace("{difficulty}", difficulty.as_str())
        .replace("{resume}", &truncate_chars(resume_text, RESUME_PROMPT_CHARS))
        .replace("{jd_context}", &jd_context)
        .replace("{previous_context}", &build_previous_context(previous_qa))
        .replace("{question_count}", &spec.question_count.to_string());

    match gen.generate(&system, &prompt).await {
        Ok(content) => Ok(parse_questions(&content, spec, role, company)),
        Err(e) => {
            warn!("Question generation failed for round {round_number}, using fallbacks: {e}");
            Ok(fallback_questions(spec, role, company))
        }
    }
}

/// Renders the bounded window of prior Q&A pairs for the prompt.
fn build_previous_context(previous_qa: &[QaPair]) -> String {
    if previous_qa.is_empty() {
        return String::new();
    }
    let start = previous_qa.len().saturating_sub(PREVIOUS_QA_WINDOW);
    let mut out = String::from("\nPrevious questions and answers in this interview:\n");
    for (i, qa) in previous_qa[start..].iter().enumerate() {
        out.push_str(&format!("Q{}: {}\n", i + 1, qa.question));
        out.push_str(&format!(
            "A{}: {}...\n\n",
            i + 1,
            truncate_chars(&qa.answer, ANSWER_SNIPPET_CHARS)
        ));
    }
    out
}

/// Parses LLM output line-by-line: strips ordinal numbering, discards noise
/// lines, pads with a generic question when short, truncates to the round's
/// configured count.
fn parse_questions(content: &str, spec: &RoundSpec, role: &str, company: &str) -> Vec<String> {
    let mut questions: Vec<String> = content
        .lines()
        .filter_map(|line| {
            let stripped = strip_ordinal_prefix(line.trim());
            (stripped.len() >= MIN_QUESTION_LEN).then(|| stripped.to_string())
        })
        .collect();

    while questions.len() < spec.question_count {
        questions.push(format!(
            "Tell me more about your experience relevant to {role} at {company}."
        ));
    }
    questions.truncate(spec.question_count);
    questions
}

/// Strips leading numbering like "1.", "12)", "3:" from a question line.
fn strip_ordinal_prefix(line: &str) -> &str {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return line;
    }
    let rest = &line[digits..];
    match rest.chars().next() {
        Some('.') | Some(')') | Some(':') => rest[1..].trim_start(),
        _ => line,
    }
}

/// Generic questions used when the external call itself fails.
/// Sized to the round's configured count so callers can rely on the length.
fn fallback_questions(spec: &RoundSpec, role: &str, company: &str) -> Vec<String> {
    let pool = [
        format!("Tell me about your experience with the core skills required for {role}."),
        format!("Describe a challenging project you worked on that's relevant to {company}."),
        format!("How would you approach a typical problem in this {role} position?"),
        "Walk me through a recent technical decision you made and how you validated it."
            .to_string(),
        format!("What would you focus on in your first month as a {role} at {company}?"),
    ];
    pool.into_iter().cycle().take(spec.question_count).collect()
}

/// Truncates to a bounded number of characters on a char boundary.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::FakeGenerator;

    fn screening() -> &'static RoundSpec {
        round_spec(1).unwrap()
    }

    #[test]
    fn test_strip_ordinal_prefix_variants() {
        assert_eq!(
            strip_ordinal_prefix("1. What is the CAP theorem?"),
            "What is the CAP theorem?"
        );
        assert_eq!(strip_ordinal_prefix("2) Explain SQL JOINs."), "Explain SQL JOINs.");
        assert_eq!(strip_ordinal_prefix("3: Describe TCP."), "Describe TCP.");
        assert_eq!(
            strip_ordinal_prefix("12. Two-digit numbering works too."),
            "Two-digit numbering works too."
        );
        // No separator after the digit, leave untouched.
        assert_eq!(
            strip_ordinal_prefix("3 ways to improve latency"),
            "3 ways to improve latency"
        );
    }

    #[test]
    fn test_parse_discards_noise_lines() {
        let content = "Here:\n\n1. What is the difference between TCP and UDP in practice?\nok\n2. Explain how a hash map handles collisions internally.\n";
        let questions = parse_questions(content, screening(), "Backend Engineer", "Acme");
        assert_eq!(questions.len(), screening().question_count);
        assert_eq!(
            questions[0],
            "What is the difference between TCP and UDP in practice?"
        );
        // "ok" and "Here:" are under the noise threshold
        assert!(questions.iter().all(|q| q.len() >= MIN_QUESTION_LEN));
    }

    #[test]
    fn test_parse_pads_when_short() {
        let content = "1. Explain what an index does in a relational database.";
        let questions = parse_questions(content, screening(), "Backend Engineer", "Acme");
        assert_eq!(questions.len(), 5);
        assert!(questions[4].contains("Backend Engineer"));
        assert!(questions[4].contains("Acme"));
    }

    #[test]
    fn test_parse_truncates_when_long() {
        let content = (1..=9)
            .map(|i| format!("{i}. This is generated question number {i} with detail."))
            .collect::<Vec<_>>()
            .join("\n");
        let questions = parse_questions(&content, screening(), "SRE", "Acme");
        assert_eq!(questions.len(), 5);
    }

    #[test]
    fn test_previous_context_window_is_bounded() {
        let pairs: Vec<QaPair> = (0..10)
            .map(|i| QaPair {
                question: format!("question {i}"),
                answer: "a".repeat(500),
            })
            .collect();
        let context = build_previous_context(&pairs);
        // Only the most recent 6 pairs appear.
        assert!(!context.contains("question 3"));
        assert!(context.contains("question 4"));
        assert!(context.contains("question 9"));
        // Answers are truncated to the snippet length.
        assert!(!context.contains(&"a".repeat(201)));
    }

    #[test]
    fn test_previous_context_empty_for_first_round() {
        assert_eq!(build_previous_context(&[]), "");
    }

    #[tokio::test]
    async fn test_invalid_round_number_is_a_client_error() {
        let gen = FakeGenerator::always("unused");
        let result =
            generate_round_questions(&gen, "SWE", "Acme", "resume", 9, DifficultyLevel::Medium, None, &[])
                .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(gen.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generation_returns_exact_count() {
        let gen = FakeGenerator::always(
            "1. Explain the difference between optimistic and pessimistic locking.\n\
             2. What is a write-ahead log and why do databases use one?\n\
             3. How does consistent hashing distribute keys across nodes?",
        );
        let questions =
            generate_round_questions(&gen, "SWE", "Acme", "resume", 4, DifficultyLevel::Hard, None, &[])
                .await
                .unwrap();
        assert_eq!(questions.len(), round_spec(4).unwrap().question_count);
        assert_eq!(gen.call_count(), 1);
    }

    #[tokio::test]
    async fn test_llm_failure_degrades_to_fallbacks() {
        let gen = FakeGenerator::failing();
        let questions = generate_round_questions(
            &gen,
            "Data Engineer",
            "Initech",
            "resume",
            1,
            DifficultyLevel::Medium,
            None,
            &[],
        )
        .await
        .unwrap();
        assert_eq!(questions.len(), 5);
        assert!(questions[0].contains("Data Engineer"));
        assert!(questions[1].contains("Initech"));
    }

    #[test]
    fn test_fallbacks_sized_to_round() {
        for n in 1..=4 {
            let spec = round_spec(n).unwrap();
            assert_eq!(
                fallback_questions(spec, "SWE", "Acme").len(),
                spec.question_count
            );
        }
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
