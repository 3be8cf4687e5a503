//! Round/interview orchestrator: sequences question generation, answer
//! evaluation, the round gate, and report synthesis across up to four rounds.
//!
//! The state machine here is deliberately DB-free: handlers own persistence
//! and wrap `begin_session`/`run_round`, so the whole progression logic is
//! exercised in tests with a fake text generator.
//!
//! States: NOT_STARTED → ROUND_IN_PROGRESS(n) → {ROUND_IN_PROGRESS(n+1) |
//! COMPLETED | TERMINATED}. COMPLETED is reachable only by passing round 4;
//! TERMINATED by failing any round. Terminal states are absorbing.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::evaluator::evaluate_answer;
use crate::interview::questions::{generate_round_questions, QaPair};
use crate::interview::report::{synthesize_final_report, FinalReport};
use crate::interview::rounds::{
    adapt_difficulty, round_average, round_spec, should_pass_round, TOTAL_ROUNDS,
};
use crate::llm_client::TextGenerator;
use crate::models::interview::{
    DifficultyLevel, QuestionScore, RoundResult, SessionStatus,
};

/// Opening difficulty for every interview.
pub const STARTING_DIFFICULTY: DifficultyLevel = DifficultyLevel::Medium;

/// Immutable per-session context threaded through round transitions.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub role: String,
    pub company: String,
    pub resume_text: String,
    pub job_description: Option<String>,
}

/// Transient working state for one in-progress interview. Created at start,
/// mutated by each round submission, discarded at a terminal status. The
/// persisted session row is the durable record.
#[derive(Debug, Clone)]
pub struct WorkingSession {
    pub questions: Vec<String>,
    pub round_results: Vec<RoundResult>,
    pub current_round: u8,
    pub current_difficulty: DifficultyLevel,
}

/// How long a staged session may sit idle before it is evicted. Each round
/// submission refreshes the deadline.
pub const SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

struct StoredSession {
    session: WorkingSession,
    expires_at: Instant,
}

/// Process-local store of working sessions keyed by session token, with a
/// per-entry idle TTL. Expired entries are dropped on access and by the
/// periodic sweep; the persisted session row is the source of truth for
/// anything that must survive eviction or a restart.
/// Single-session mutations are invoked sequentially by one client, so no
/// per-key locking protocol is needed beyond the map lock.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, StoredSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a working session, resetting its TTL.
    pub async fn insert(&self, token: Uuid, session: WorkingSession) {
        self.inner.write().await.insert(
            token,
            StoredSession {
                session,
                expires_at: Instant::now() + SESSION_TTL,
            },
        );
    }

    /// Returns a live working session. An expired entry is removed and
    /// reported as absent.
    pub async fn get(&self, token: Uuid) -> Option<WorkingSession> {
        let mut map = self.inner.write().await;
        match map.get(&token) {
            Some(stored) if stored.expires_at > Instant::now() => Some(stored.session.clone()),
            Some(_) => {
                map.remove(&token);
                None
            }
            None => None,
        }
    }

    pub async fn remove(&self, token: Uuid) {
        self.inner.write().await.remove(&token);
    }

    /// Drops every expired entry. Returns the number evicted.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, stored| stored.expires_at > now);
        before - map.len()
    }
}

/// What happened after the round gate.
#[derive(Debug)]
pub enum RoundOutcome {
    /// Passed a round before the last: the interview continues.
    Advance {
        next_round: u8,
        next_questions: Vec<String>,
    },
    /// Terminal: passed round 4 (completed) or failed any round (terminated).
    Finished {
        status: SessionStatus,
        termination_reason: String,
        report: FinalReport,
        /// `pass_threshold - round_avg`, present only on a failed round.
        improvement_needed: Option<f64>,
        overall_average: f64,
        total_score: f64,
    },
}

/// Full result of one round submission.
#[derive(Debug)]
pub struct RoundSubmission {
    pub round_number: u8,
    pub round_name: &'static str,
    pub passed: bool,
    pub average_score: f64,
    pub scores: Vec<QuestionScore>,
    pub fit_percentage: u8,
    pub outcome: RoundOutcome,
}

/// Starts a new interview: round-1 questions at the opening difficulty and a
/// fresh working session. The caller persists the session row.
pub async fn begin_session(
    gen: &dyn TextGenerator,
    ctx: &SessionContext,
) -> Result<WorkingSession, AppError> {
    let questions = generate_round_questions(
        gen,
        &ctx.role,
        &ctx.company,
        &ctx.resume_text,
        1,
        STARTING_DIFFICULTY,
        ctx.job_description.as_deref(),
        &[],
    )
    .await?;

    Ok(WorkingSession {
        questions,
        round_results: Vec::new(),
        current_round: 1,
        current_difficulty: STARTING_DIFFICULTY,
    })
}

/// Runs one round transition against the working state.
///
/// Evaluates every answer in order, adapting difficulty between questions
/// (never after the last; the resulting difficulty seeds the next round's
/// generation only), applies the round gate, records the `RoundResult`, and
/// branches to advance or finish. External-capability failures inside never
/// abort the transition; component fallbacks guarantee a branch is reached.
pub async fn run_round(
    gen: &dyn TextGenerator,
    ctx: &SessionContext,
    working: &mut WorkingSession,
    answers: Vec<String>,
) -> Result<RoundSubmission, AppError> {
    let round_number = working.current_round;
    let spec = round_spec(round_number)
        .ok_or_else(|| AppError::Validation(format!("Invalid round number: {round_number}")))?;

    if answers.len() != working.questions.len() {
        return Err(AppError::Validation(format!(
            "Expected {} answers, got {}",
            working.questions.len(),
            answers.len()
        )));
    }

    let (scores, difficulty_after) = evaluate_round(
        gen,
        ctx,
        &working.questions,
        &answers,
        spec.round_type,
        working.current_difficulty,
    )
    .await;

    let round_avg = round_average(&scores);
    let passed = should_pass_round(&scores, round_number);
    let fit_percentage = fit_percentage(round_avg);

    let result = RoundResult {
        round_number,
        round_type: spec.round_type,
        questions: working.questions.clone(),
        answers: answers.clone(),
        scores: scores.clone(),
        average_score: round_avg,
        passed,
        difficulty_used: difficulty_after,
    };
    working.round_results.push(result);
    working.current_difficulty = difficulty_after;

    let outcome = if passed && round_number < TOTAL_ROUNDS {
        let next_round = round_number + 1;
        let previous_qa: Vec<QaPair> = working
            .questions
            .iter()
            .zip(answers.iter())
            .map(|(q, a)| QaPair {
                question: q.clone(),
                answer: a.clone(),
            })
            .collect();

        let next_questions = generate_round_questions(
            gen,
            &ctx.role,
            &ctx.company,
            &ctx.resume_text,
            next_round,
            difficulty_after,
            ctx.job_description.as_deref(),
            &previous_qa,
        )
        .await?;

        working.current_round = next_round;
        working.questions = next_questions.clone();

        RoundOutcome::Advance {
            next_round,
            next_questions,
        }
    } else {
        let (status, termination_reason, improvement_needed) = if passed {
            (
                SessionStatus::Completed,
                "Completed all rounds successfully".to_string(),
                None,
            )
        } else {
            (
                SessionStatus::Terminated,
                format!("Did not pass Round {round_number}: {}", spec.name),
                Some(round_tenths(spec.pass_threshold - round_avg)),
            )
        };

        let report = synthesize_final_report(
            gen,
            &ctx.role,
            &ctx.company,
            &working.round_results,
            Some(&termination_reason),
        )
        .await;

        let overall_average = working
            .round_results
            .iter()
            .map(|r| r.average_score)
            .sum::<f64>()
            / working.round_results.len() as f64;
        let total_score = working
            .round_results
            .iter()
            .flat_map(|r| r.scores.iter())
            .map(QuestionScore::average)
            .sum::<f64>();

        RoundOutcome::Finished {
            status,
            termination_reason,
            report,
            improvement_needed,
            overall_average,
            total_score,
        }
    };

    Ok(RoundSubmission {
        round_number,
        round_name: spec.name,
        passed,
        average_score: round_avg,
        scores,
        fit_percentage,
        outcome,
    })
}

/// Evaluates every (question, answer) pair in order, adapting difficulty
/// after each pair except the last. Returns the scores and the difficulty to
/// carry into the next round.
async fn evaluate_round(
    gen: &dyn TextGenerator,
    ctx: &SessionContext,
    questions: &[String],
    answers: &[String],
    round_type: crate::models::interview::RoundType,
    starting_difficulty: DifficultyLevel,
) -> (Vec<QuestionScore>, DifficultyLevel) {
    let mut scores = Vec::with_capacity(questions.len());
    let mut difficulty = starting_difficulty;

    for (i, (question, answer)) in questions.iter().zip(answers.iter()).enumerate() {
        let score = evaluate_answer(
            gen,
            question,
            answer,
            &ctx.role,
            &ctx.company,
            round_type,
            ctx.job_description.as_deref(),
        )
        .await;

        if i + 1 < questions.len() {
            difficulty = adapt_difficulty(score.average(), difficulty);
        }
        scores.push(score);
    }

    (scores, difficulty)
}

/// UI-facing normalized performance indicator: `min(100, avg/10 * 100)`.
fn fit_percentage(round_avg: f64) -> u8 {
    ((round_avg / 10.0) * 100.0).round().clamp(0.0, 100.0) as u8
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::FakeGenerator;
    use crate::models::interview::RoundType;

    const EVAL_ALL_8: &str =
        "CORRECTNESS: 8\nCLARITY: 8\nSTRUCTURE: 8\nDEPTH: 8\nFEEDBACK: Strong answer overall.";
    const EVAL_ALL_3: &str =
        "CORRECTNESS: 3\nCLARITY: 3\nSTRUCTURE: 3\nDEPTH: 3\nFEEDBACK: Needs significant work.";

    fn ctx() -> SessionContext {
        SessionContext {
            role: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            resume_text: "Five years of backend work.".to_string(),
            job_description: None,
        }
    }

    fn staged(questions: usize, round: u8, difficulty: DifficultyLevel) -> WorkingSession {
        WorkingSession {
            questions: (0..questions)
                .map(|i| format!("Staged question number {i}?"))
                .collect(),
            round_results: Vec::new(),
            current_round: round,
            current_difficulty: difficulty,
        }
    }

    fn answers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("A considered answer {i}")).collect()
    }

    #[tokio::test]
    async fn test_begin_session_stages_round_one() {
        let gen = FakeGenerator::failing(); // fallback questions are fine here
        let working = begin_session(&gen, &ctx()).await.unwrap();
        assert_eq!(working.current_round, 1);
        assert_eq!(working.current_difficulty, DifficultyLevel::Medium);
        assert_eq!(working.questions.len(), 5);
        assert!(working.round_results.is_empty());
    }

    #[tokio::test]
    async fn test_answer_count_mismatch_is_rejected_before_evaluation() {
        let gen = FakeGenerator::always(EVAL_ALL_8);
        let mut working = staged(5, 1, DifficultyLevel::Medium);
        let err = run_round(&gen, &ctx(), &mut working, answers(3))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(gen.call_count(), 0);
        assert!(working.round_results.is_empty());
    }

    #[tokio::test]
    async fn test_full_pass_at_exact_thresholds_completes_with_roadmap() {
        // Every round scores exactly at its own pass threshold: 5.5, 6.0,
        // 6.5, 7.0. The inclusive gate must pass all four and the machine
        // must end Completed.
        const EVAL_55: &str =
            "CORRECTNESS: 6\nCLARITY: 6\nSTRUCTURE: 5\nDEPTH: 5\nFEEDBACK: Just clears the bar.";
        const EVAL_60: &str =
            "CORRECTNESS: 6\nCLARITY: 6\nSTRUCTURE: 6\nDEPTH: 6\nFEEDBACK: Exactly on threshold.";
        const EVAL_65: &str =
            "CORRECTNESS: 7\nCLARITY: 7\nSTRUCTURE: 6\nDEPTH: 6\nFEEDBACK: On the line again.";
        const EVAL_70: &str =
            "CORRECTNESS: 7\nCLARITY: 7\nSTRUCTURE: 7\nDEPTH: 7\nFEEDBACK: Meets the final bar.";
        const GEN_REPLY: &str = "1. How would you shard a write-heavy Postgres table?\n\
             2. Walk me through debugging a sudden spike in p99 latency.\n\
             3. When would you pick a message queue over direct RPC calls?\n\
             4. Design a rate limiter for 100k requests per second.\n\
             5. How do you roll back a bad schema migration under load?";

        let mut script = vec![EVAL_55; 5];
        script.push(GEN_REPLY);
        script.extend(vec![EVAL_60; 4]);
        script.push(GEN_REPLY);
        script.extend(vec![EVAL_65; 3]);
        script.push(GEN_REPLY);
        script.extend(vec![EVAL_70; 3]);
        script.push("Roadmap: keep practicing weekly system design drills.");
        let gen = FakeGenerator::scripted(script);

        let working_ctx = ctx();
        let mut working = staged(5, 1, DifficultyLevel::Medium);

        for round in 1..=3u8 {
            let threshold = round_spec(round).unwrap().pass_threshold;
            let round_answers = answers(working.questions.len());
            let submission = run_round(&gen, &working_ctx, &mut working, round_answers)
                .await
                .unwrap();
            assert!(
                submission.passed,
                "round {round} must pass at exactly {threshold}"
            );
            assert!((submission.average_score - threshold).abs() < 1e-9);
            assert!(matches!(
                submission.outcome,
                RoundOutcome::Advance { next_round, .. } if next_round == round + 1
            ));
            assert_eq!(
                working.questions.len(),
                round_spec(round + 1).unwrap().question_count
            );
        }

        let final_answers = answers(working.questions.len());
        let submission = run_round(&gen, &working_ctx, &mut working, final_answers)
            .await
            .unwrap();

        assert_eq!(working.current_round, 4);
        assert!((submission.average_score - 7.0).abs() < 1e-9);
        match submission.outcome {
            RoundOutcome::Finished {
                status,
                termination_reason,
                report,
                improvement_needed,
                overall_average,
                ..
            } => {
                assert_eq!(status, SessionStatus::Completed);
                assert_eq!(termination_reason, "Completed all rounds successfully");
                assert!(!report.roadmap.is_empty());
                assert_eq!(report.final_round_reached, 4);
                assert!(improvement_needed.is_none());
                // Mean of the four round averages.
                assert!((overall_average - 6.25).abs() < 1e-9);
            }
            other => panic!("expected Finished, got {other:?}"),
        }
        // 15 evaluations, 3 question generations, 1 roadmap.
        assert_eq!(gen.call_count(), 19);
    }

    #[tokio::test]
    async fn test_round_two_failure_terminates_without_round_three_generation() {
        // Script: 5 round-1 evals, 1 round-2 question generation,
        // 4 round-2 evals, 1 roadmap. Nothing else may be called.
        let mut script = vec![EVAL_ALL_8; 5];
        script.push("1. Generated core skills question about debugging a failing API?\n2. Second generated question about data modeling?\n3. Third generated question about caching strategy?\n4. Fourth generated question about queue backpressure?");
        script.extend(vec![EVAL_ALL_3; 4]);
        script.push("Roadmap: focus on fundamentals for four weeks.");
        let gen = FakeGenerator::scripted(script);

        let working_ctx = ctx();
        let mut working = staged(5, 1, DifficultyLevel::Medium);

        let first = run_round(&gen, &working_ctx, &mut working, answers(5))
            .await
            .unwrap();
        assert!(first.passed);
        assert_eq!(working.current_round, 2);
        assert_eq!(working.questions.len(), 4);

        let second = run_round(&gen, &working_ctx, &mut working, answers(4))
            .await
            .unwrap();
        assert!(!second.passed);
        match second.outcome {
            RoundOutcome::Finished {
                status,
                termination_reason,
                improvement_needed,
                ..
            } => {
                assert_eq!(status, SessionStatus::Terminated);
                assert!(termination_reason.contains("Core Skills Round"));
                // threshold 6.0 - average 3.0
                assert_eq!(improvement_needed, Some(3.0));
            }
            other => panic!("expected Finished, got {other:?}"),
        }
        // 5 + 1 + 4 + 1: a round-3 generation call would exceed this.
        assert_eq!(gen.call_count(), 11);
    }

    #[tokio::test]
    async fn test_difficulty_escalates_and_holds_at_hard() {
        // Three questions all scoring 8.0 from MEDIUM: after question 1 the
        // difficulty escalates to HARD, after question 2 it stays HARD, and
        // the last question never adapts.
        let gen = FakeGenerator::always(EVAL_ALL_8);
        let (scores, difficulty) = evaluate_round(
            &gen,
            &ctx(),
            &staged(3, 1, DifficultyLevel::Medium).questions,
            &answers(3),
            RoundType::Screening,
            DifficultyLevel::Medium,
        )
        .await;
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|s| (s.average() - 8.0).abs() < 1e-9));
        assert_eq!(difficulty, DifficultyLevel::Hard);
    }

    #[tokio::test]
    async fn test_last_question_score_does_not_adapt_difficulty() {
        // First answer escalates MEDIUM → HARD; the weak last answer would
        // de-escalate if it were counted, but the last pair never adapts.
        let gen = FakeGenerator::scripted(vec![EVAL_ALL_8, EVAL_ALL_3]);
        let (_, difficulty) = evaluate_round(
            &gen,
            &ctx(),
            &staged(2, 1, DifficultyLevel::Medium).questions,
            &answers(2),
            RoundType::Screening,
            DifficultyLevel::Medium,
        )
        .await;
        assert_eq!(difficulty, DifficultyLevel::Hard);
    }

    #[tokio::test]
    async fn test_all_sentinel_answers_fail_round_without_llm_evaluation() {
        // Evaluation makes no LLM calls for sentinel answers; the only calls
        // are the roadmap (question generation is skipped on termination).
        let gen = FakeGenerator::always("Roadmap prose.");
        let mut working = staged(5, 1, DifficultyLevel::Medium);
        let submission = run_round(
            &gen,
            &ctx(),
            &mut working,
            vec!["[No answer provided]".to_string(); 5],
        )
        .await
        .unwrap();
        assert!(!submission.passed);
        assert_eq!(submission.average_score, 0.0);
        assert_eq!(submission.fit_percentage, 0);
        assert!(matches!(
            submission.outcome,
            RoundOutcome::Finished {
                status: SessionStatus::Terminated,
                ..
            }
        ));
        assert_eq!(gen.call_count(), 1, "only the roadmap call is expected");
    }

    #[tokio::test]
    async fn test_session_store_insert_get_remove() {
        let store = SessionStore::new();
        let token = Uuid::new_v4();
        store
            .insert(token, staged(5, 1, DifficultyLevel::Medium))
            .await;
        assert!(store.get(token).await.is_some());
        store.remove(token).await;
        assert!(store.get(token).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_store_expires_idle_entries_on_access() {
        let store = SessionStore::new();
        let token = Uuid::new_v4();
        store
            .insert(token, staged(5, 1, DifficultyLevel::Medium))
            .await;

        tokio::time::advance(SESSION_TTL - Duration::from_secs(1)).await;
        assert!(store.get(token).await.is_some(), "still within the TTL");

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get(token).await.is_none(), "expired entry is evicted");
        assert_eq!(store.purge_expired().await, 0, "access already removed it");
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_store_sweep_keeps_fresh_entries() {
        let store = SessionStore::new();
        let stale = Uuid::new_v4();
        let fresh = Uuid::new_v4();

        store.insert(stale, staged(5, 1, DifficultyLevel::Medium)).await;
        tokio::time::advance(SESSION_TTL + Duration::from_secs(1)).await;
        store.insert(fresh, staged(4, 2, DifficultyLevel::Hard)).await;

        assert_eq!(store.purge_expired().await, 1);
        assert!(store.get(stale).await.is_none());
        assert!(store.get(fresh).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_store_insert_refreshes_ttl() {
        let store = SessionStore::new();
        let token = Uuid::new_v4();
        store
            .insert(token, staged(5, 1, DifficultyLevel::Medium))
            .await;

        tokio::time::advance(SESSION_TTL - Duration::from_secs(1)).await;
        // A round submission re-inserts the working state and restarts the clock.
        store
            .insert(token, staged(4, 2, DifficultyLevel::Medium))
            .await;
        tokio::time::advance(SESSION_TTL - Duration::from_secs(1)).await;
        assert!(store.get(token).await.is_some());
    }

    #[test]
    fn test_fit_percentage_is_clamped() {
        assert_eq!(fit_percentage(8.0), 80);
        assert_eq!(fit_percentage(10.0), 100);
        assert_eq!(fit_percentage(11.0), 100);
        assert_eq!(fit_percentage(0.0), 0);
    }
}
