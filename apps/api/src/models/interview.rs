//! Persisted interview data shapes.
//!
//! Round type, difficulty, and status are closed enums validated at the
//! persistence boundary. The DB stores their snake_case string form, and
//! unknown values are rejected on read rather than silently carried along.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Feedback attached to every unanswered question in place of an evaluation.
pub const NO_ANSWER_FEEDBACK: &str = "No answer was provided for this question.";

/// Overall status of an interview session. Terminal states are final:
/// `in_progress → {completed, terminated}` and nothing transitions out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Terminated,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Terminated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Terminated => "terminated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(SessionStatus::InProgress),
            "completed" => Some(SessionStatus::Completed),
            "terminated" => Some(SessionStatus::Terminated),
            _ => None,
        }
    }
}

/// Question difficulty. A 3-level ordinal: adaptation moves at most one step
/// per question and never leaves the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "easy",
            DifficultyLevel::Medium => "medium",
            DifficultyLevel::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(DifficultyLevel::Easy),
            "medium" => Some(DifficultyLevel::Medium),
            "hard" => Some(DifficultyLevel::Hard),
            _ => None,
        }
    }
}

/// The four interview stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    Screening,
    CoreSkills,
    Advanced,
    BarRaiser,
}

impl RoundType {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundType::Screening => "screening",
            RoundType::CoreSkills => "core_skills",
            RoundType::Advanced => "advanced",
            RoundType::BarRaiser => "bar_raiser",
        }
    }
}

/// Multi-dimensional score for a single answer. Each dimension is clamped to
/// [0, 10] by the evaluator before this type is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionScore {
    pub correctness: u8,
    pub clarity: u8,
    pub structure: u8,
    pub depth: u8,
    pub feedback: String,
}

impl QuestionScore {
    /// Arithmetic mean of the four dimensions.
    pub fn average(&self) -> f64 {
        f64::from(
            u16::from(self.correctness)
                + u16::from(self.clarity)
                + u16::from(self.structure)
                + u16::from(self.depth),
        ) / 4.0
    }

    /// The fixed all-zero score for an unanswered question.
    /// Never produced by the external evaluator.
    pub fn unanswered() -> Self {
        QuestionScore {
            correctness: 0,
            clarity: 0,
            structure: 0,
            depth: 0,
            feedback: NO_ANSWER_FEEDBACK.to_string(),
        }
    }

    /// Whether this is the unanswered-question sentinel score.
    pub fn is_unanswered(&self) -> bool {
        self.feedback == NO_ANSWER_FEEDBACK
    }
}

/// Durable record of one completed round.
/// Invariant: `questions`, `answers`, and `scores` are parallel arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResult {
    pub round_number: u8,
    pub round_type: RoundType,
    pub questions: Vec<String>,
    pub answers: Vec<String>,
    pub scores: Vec<QuestionScore>,
    pub average_score: f64,
    pub passed: bool,
    pub difficulty_used: DifficultyLevel,
}

/// Persisted session row. `id` doubles as the opaque session token handed to
/// the client; `round_results` is the serialized list of `RoundResult`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewSessionRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub role: String,
    pub company: String,
    pub resume_text: String,
    pub job_description: Option<String>,
    pub status: String,
    pub current_round: i16,
    pub rounds_attempted: i16,
    pub round_results: serde_json::Value,
    pub termination_reason: Option<String>,
    pub current_difficulty: String,
    pub total_score: f64,
    pub average_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl InterviewSessionRow {
    /// Validates the stored status string into the closed enum.
    pub fn session_status(&self) -> anyhow::Result<SessionStatus> {
        SessionStatus::parse(&self.status)
            .ok_or_else(|| anyhow::anyhow!("Invalid session status in DB: {:?}", self.status))
    }

    /// Validates the stored difficulty string into the closed enum.
    pub fn difficulty(&self) -> anyhow::Result<DifficultyLevel> {
        DifficultyLevel::parse(&self.current_difficulty).ok_or_else(|| {
            anyhow::anyhow!("Invalid difficulty in DB: {:?}", self.current_difficulty)
        })
    }
}
