//! Axum route handlers for the interview API.
//!
//! Handlers own validation and persistence; the round state machine itself
//! lives in `orchestrator` and never touches the DB. All mutations for one
//! round submission land in a single UPDATE, so a DB failure leaves no
//! partial round behind and the working state survives for a retry.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::orchestrator::{
    begin_session, run_round, RoundOutcome, SessionContext, STARTING_DIFFICULTY,
};
use crate::interview::report::{round_summary, FinalReport};
use crate::interview::rounds::{round_spec, TOTAL_ROUNDS};
use crate::models::interview::{InterviewSessionRow, QuestionScore, SessionStatus};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartInterviewRequest {
    pub role: String,
    pub company: String,
    pub resume_text: String,
    pub job_description: Option<String>,
    /// Anonymous interviews are allowed; authenticated callers pass their id.
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StartInterviewResponse {
    pub message: String,
    pub session_id: Uuid,
    pub questions: Vec<String>,
    pub role: String,
    pub company: String,
    pub current_round: u8,
    pub round_name: String,
    pub round_description: String,
    pub total_rounds: u8,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRoundRequest {
    pub round_number: u8,
    pub answers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitRoundResponse {
    pub session_id: Uuid,
    pub round_number: u8,
    pub round_name: String,
    pub passed: bool,
    pub average_score: f64,
    pub scores: Vec<QuestionScore>,
    pub round_summary: String,
    pub fit_percentage: u8,
    pub interview_continues: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_round: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_round_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_round_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_questions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvement_needed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_report: Option<FinalReport>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub role: String,
    pub company: String,
    pub status: String,
    pub current_round: i16,
    pub rounds_attempted: i16,
    pub current_difficulty: String,
    pub termination_reason: Option<String>,
    pub total_score: f64,
    pub average_score: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interviews
///
/// Starts a detailed interview: stages round-1 questions at the opening
/// difficulty, persists the session row, and returns the session token.
pub async fn handle_start_interview(
    State(state): State<AppState>,
    Json(request): Json<StartInterviewRequest>,
) -> Result<Json<StartInterviewResponse>, AppError> {
    if request.role.trim().is_empty() || request.company.trim().is_empty() {
        return Err(AppError::Validation(
            "Missing required fields: role, company".to_string(),
        ));
    }
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation("Resume text is required".to_string()));
    }

    let ctx = SessionContext {
        role: request.role.clone(),
        company: request.company.clone(),
        resume_text: request.resume_text.clone(),
        job_description: request.job_description.clone(),
    };

    let working = begin_session(state.llm.as_ref(), &ctx).await?;
    let spec = round_spec(1).expect("round 1 is always configured");

    let session_id = Uuid::new_v4();
    let round_results = serde_json::to_value(&working.round_results)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize results: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO interview_sessions
            (id, user_id, role, company, resume_text, job_description, status,
             current_round, rounds_attempted, round_results, termination_reason,
             current_difficulty, total_score, average_score)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 1, 0, $8, NULL, $9, 0.0, 0.0)
        "#,
    )
    .bind(session_id)
    .bind(request.user_id)
    .bind(&request.role)
    .bind(&request.company)
    .bind(&request.resume_text)
    .bind(&request.job_description)
    .bind(SessionStatus::InProgress.as_str())
    .bind(&round_results)
    .bind(STARTING_DIFFICULTY.as_str())
    .execute(&state.db)
    .await?;

    let questions = working.questions.clone();
    state.sessions.insert(session_id, working).await;

    info!(
        "Started interview {session_id} for role {:?} at {:?}",
        request.role, request.company
    );

    Ok(Json(StartInterviewResponse {
        message: "Interview started successfully".to_string(),
        session_id,
        questions,
        role: request.role,
        company: request.company,
        current_round: 1,
        round_name: spec.name.to_string(),
        round_description: spec.description.to_string(),
        total_rounds: TOTAL_ROUNDS,
    }))
}

/// POST /api/v1/interviews/:token/rounds
///
/// Submits one round's answers: evaluates, gates, and either advances to the
/// next round or finishes the interview with a final report.
pub async fn handle_submit_round(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
    Json(request): Json<SubmitRoundRequest>,
) -> Result<Json<SubmitRoundResponse>, AppError> {
    let row = fetch_session(&state, token).await?;

    let status = row.session_status()?;
    if status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Session {token} is already {}; no further submissions are accepted",
            status.as_str()
        )));
    }

    let Some(mut working) = state.sessions.get(token).await else {
        // The row says in_progress but the working state is gone (TTL expiry
        // or a process restart). Close the stranded row so it stops accepting
        // submissions, then tell the caller to start over.
        sqlx::query(
            r#"
            UPDATE interview_sessions
            SET status = $2, termination_reason = $3,
                completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(token)
        .bind(SessionStatus::Terminated.as_str())
        .bind("Session expired before completion")
        .execute(&state.db)
        .await?;

        info!("Terminated stranded session {token}: working state missing");
        return Err(AppError::Conflict(format!(
            "Session {token} has expired; start a new interview"
        )));
    };

    if request.round_number != working.current_round {
        return Err(AppError::Validation(format!(
            "Expected submission for round {}, got round {}",
            working.current_round, request.round_number
        )));
    }

    let ctx = SessionContext {
        role: row.role.clone(),
        company: row.company.clone(),
        resume_text: row.resume_text.clone(),
        job_description: row.job_description.clone(),
    };

    let submission = run_round(state.llm.as_ref(), &ctx, &mut working, request.answers).await?;

    let summary = working
        .round_results
        .last()
        .map(round_summary)
        .unwrap_or_default();
    let round_results = serde_json::to_value(&working.round_results)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize results: {e}")))?;

    let mut response = SubmitRoundResponse {
        session_id: token,
        round_number: submission.round_number,
        round_name: submission.round_name.to_string(),
        passed: submission.passed,
        average_score: round_hundredths(submission.average_score),
        scores: submission.scores,
        round_summary: summary,
        fit_percentage: submission.fit_percentage,
        interview_continues: false,
        message: String::new(),
        next_round: None,
        next_round_name: None,
        next_round_description: None,
        next_questions: None,
        improvement_needed: None,
        final_report: None,
    };

    match submission.outcome {
        RoundOutcome::Advance {
            next_round,
            next_questions,
        } => {
            sqlx::query(
                r#"
                UPDATE interview_sessions
                SET current_round = $2, rounds_attempted = $3, round_results = $4,
                    current_difficulty = $5, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(token)
            .bind(i16::from(next_round))
            .bind(i16::from(submission.round_number))
            .bind(&round_results)
            .bind(working.current_difficulty.as_str())
            .execute(&state.db)
            .await?;

            // Only stage the next round once the round result is durable.
            state.sessions.insert(token, working).await;

            let next_spec = round_spec(next_round)
                .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Round {next_round} missing")))?;
            response.interview_continues = true;
            response.message = format!(
                "Great work! You've passed {}. Moving to {}!",
                submission.round_name, next_spec.name
            );
            response.next_round = Some(next_round);
            response.next_round_name = Some(next_spec.name.to_string());
            response.next_round_description = Some(next_spec.description.to_string());
            response.next_questions = Some(next_questions);
        }
        RoundOutcome::Finished {
            status,
            termination_reason,
            report,
            improvement_needed,
            overall_average,
            total_score,
        } => {
            sqlx::query(
                r#"
                UPDATE interview_sessions
                SET status = $2, termination_reason = $3, rounds_attempted = $4,
                    round_results = $5, current_difficulty = $6, total_score = $7,
                    average_score = $8, completed_at = NOW(), updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(token)
            .bind(status.as_str())
            .bind(&termination_reason)
            .bind(i16::from(submission.round_number))
            .bind(&round_results)
            .bind(working.current_difficulty.as_str())
            .bind(total_score)
            .bind(overall_average)
            .execute(&state.db)
            .await?;

            // Terminal: the persisted row is now the sole survivor.
            state.sessions.remove(token).await;

            response.message = match status {
                SessionStatus::Completed => {
                    "Congratulations! You completed all 4 rounds successfully!".to_string()
                }
                _ => {
                    let threshold = round_spec(submission.round_number)
                        .map(|s| s.pass_threshold)
                        .unwrap_or_default();
                    format!(
                        "Thank you for participating in the interview. Your performance in {} \
                         scored {:.1}/10, which is below the required threshold of {threshold}/10.",
                        submission.round_name, submission.average_score
                    )
                }
            };
            response.improvement_needed = improvement_needed;
            response.final_report = Some(report);

            info!(
                "Interview {token} finished as {} after round {}",
                status.as_str(),
                submission.round_number
            );
        }
    }

    Ok(Json(response))
}

/// GET /api/v1/interviews/:token
///
/// Returns the durable session record (without the resume body).
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let row = fetch_session(&state, token).await?;
    let difficulty = row.difficulty()?;

    Ok(Json(SessionResponse {
        session_id: row.id,
        role: row.role,
        company: row.company,
        status: row.status,
        current_round: row.current_round,
        rounds_attempted: row.rounds_attempted,
        current_difficulty: difficulty.as_str().to_string(),
        termination_reason: row.termination_reason,
        total_score: row.total_score,
        average_score: row.average_score,
        created_at: row.created_at,
        updated_at: row.updated_at,
        completed_at: row.completed_at,
    }))
}

async fn fetch_session(state: &AppState, token: Uuid) -> Result<InterviewSessionRow, AppError> {
    sqlx::query_as::<_, InterviewSessionRow>("SELECT * FROM interview_sessions WHERE id = $1")
        .bind(token)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {token} not found")))
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_round_request_deserializes() {
        let json = serde_json::json!({
            "round_number": 2,
            "answers": ["first answer", "second answer"]
        });
        let request: SubmitRoundRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.round_number, 2);
        assert_eq!(request.answers.len(), 2);
    }

    #[test]
    fn test_start_request_allows_anonymous_users() {
        let json = serde_json::json!({
            "role": "SWE",
            "company": "Acme",
            "resume_text": "Ten years of experience."
        });
        let request: StartInterviewRequest = serde_json::from_value(json).unwrap();
        assert!(request.user_id.is_none());
        assert!(request.job_description.is_none());
    }

    #[test]
    fn test_response_omits_branch_fields_when_absent() {
        let response = SubmitRoundResponse {
            session_id: Uuid::new_v4(),
            round_number: 1,
            round_name: "Screening Round".to_string(),
            passed: false,
            average_score: 3.25,
            scores: vec![],
            round_summary: String::new(),
            fit_percentage: 32,
            interview_continues: false,
            message: "msg".to_string(),
            next_round: None,
            next_round_name: None,
            next_round_description: None,
            next_questions: None,
            improvement_needed: None,
            final_report: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("next_questions").is_none());
        assert!(value.get("final_report").is_none());
        assert_eq!(value["fit_percentage"], 32);
    }

    #[test]
    fn test_round_hundredths() {
        assert_eq!(round_hundredths(3.14159), 3.14);
        assert_eq!(round_hundredths(6.666666), 6.67);
    }
}
