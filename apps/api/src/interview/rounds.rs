//! Round configuration, the round gate, and the difficulty adapter.
//!
//! The round table is static and read-only at runtime. Pass thresholds are
//! non-decreasing across rounds so the bar rises with each stage.

use crate::models::interview::{DifficultyLevel, QuestionScore, RoundType};

pub const TOTAL_ROUNDS: u8 = 4;

/// Static definition of one interview round.
#[derive(Debug, Clone, Copy)]
pub struct RoundSpec {
    pub number: u8,
    pub name: &'static str,
    pub round_type: RoundType,
    pub pass_threshold: f64,
    pub question_count: usize,
    pub description: &'static str,
}

const ROUNDS: [RoundSpec; TOTAL_ROUNDS as usize] = [
    RoundSpec {
        number: 1,
        name: "Screening Round",
        round_type: RoundType::Screening,
        pass_threshold: 5.5,
        question_count: 5,
        description: "Fundamentals & communication check",
    },
    RoundSpec {
        number: 2,
        name: "Core Skills Round",
        round_type: RoundType::CoreSkills,
        pass_threshold: 6.0,
        question_count: 4,
        description: "Applied understanding & reasoning",
    },
    RoundSpec {
        number: 3,
        name: "Advanced/Problem-Solving Round",
        round_type: RoundType::Advanced,
        pass_threshold: 6.5,
        question_count: 3,
        description: "Scenario-based thinking & trade-offs",
    },
    RoundSpec {
        number: 4,
        name: "Bar Raiser Round",
        round_type: RoundType::BarRaiser,
        pass_threshold: 7.0,
        question_count: 3,
        description: "Senior-level thinking & ownership",
    },
];

/// Looks up the configuration for a round number (1–4).
pub fn round_spec(round_number: u8) -> Option<&'static RoundSpec> {
    ROUNDS.get(round_number.checked_sub(1)? as usize)
}

/// Mean of each score's own 4-dimension average across the round.
pub fn round_average(scores: &[QuestionScore]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(QuestionScore::average).sum::<f64>() / scores.len() as f64
}

/// Round gate: pass iff the round average meets the configured threshold
/// (inclusive). Empty score lists and unknown rounds fail. Pure.
pub fn should_pass_round(scores: &[QuestionScore], round_number: u8) -> bool {
    if scores.is_empty() {
        return false;
    }
    let Some(spec) = round_spec(round_number) else {
        return false;
    };
    round_average(scores) >= spec.pass_threshold
}

/// Difficulty adapter: step function over the 3-level ordinal.
/// ≥8.0 escalates one level (capped at HARD); <5.0 de-escalates one level
/// (floored at EASY); the dead band in between leaves difficulty unchanged
/// so it cannot oscillate. Pure.
pub fn adapt_difficulty(current_score: f64, current: DifficultyLevel) -> DifficultyLevel {
    if current_score >= 8.0 {
        match current {
            DifficultyLevel::Easy => DifficultyLevel::Medium,
            DifficultyLevel::Medium | DifficultyLevel::Hard => DifficultyLevel::Hard,
        }
    } else if current_score < 5.0 {
        match current {
            DifficultyLevel::Hard => DifficultyLevel::Medium,
            DifficultyLevel::Medium | DifficultyLevel::Easy => DifficultyLevel::Easy,
        }
    } else {
        current
    }
}
