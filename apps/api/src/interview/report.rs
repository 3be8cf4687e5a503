//! Final report synthesizer: aggregates all round results into a
//! strengths/weaknesses/roadmap report at the end of an interview.
//!
//! Dimension averages cover every answered question across all rounds;
//! unanswered sentinel scores are excluded so a skipped question reads as a
//! gap in coverage, not as evidence of weakness on every axis. The prose
//! roadmap is delegated to the LLM with a deterministic templated fallback.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::interview::prompts::{ROADMAP_PROMPT_TEMPLATE, ROADMAP_SYSTEM};
use crate::interview::rounds::round_spec;
use crate::llm_client::TextGenerator;
use crate::models::interview::RoundResult;

/// Minimum average for a dimension to count as a strength.
const STRENGTH_BAR: f64 = 6.0;
/// A dimension below this average counts as a weak area.
const WEAKNESS_BAR: f64 = 7.0;

const DIMENSION_LABELS: [&str; 4] = [
    "Technical Correctness",
    "Communication Clarity",
    "Answer Structure",
    "Technical Depth",
];

/// Per-dimension averages across the whole interview.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DimensionAverages {
    pub correctness: f64,
    pub clarity: f64,
    pub structure: f64,
    pub depth: f64,
}

/// The final comprehensive report returned when an interview ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalReport {
    pub strengths: Vec<String>,
    pub weak_areas: Vec<String>,
    pub roadmap: String,
    pub final_round_reached: u8,
    pub total_questions_answered: usize,
    pub overall_average: f64,
    pub dimension_averages: DimensionAverages,
}

/// Builds the final report for a completed or terminated interview.
pub async fn synthesize_final_report(
    gen: &dyn TextGenerator,
    role: &str,
    company: &str,
    all_round_results: &[RoundResult],
    termination_reason: Option<&str>,
) -> FinalReport {
    if all_round_results.is_empty() {
        return FinalReport {
            strengths: vec!["Unable to assess - no rounds completed".to_string()],
            weak_areas: vec!["Complete at least one round for assessment".to_string()],
            roadmap: "No roadmap available without completed rounds.".to_string(),
            final_round_reached: 0,
            total_questions_answered: 0,
            overall_average: 0.0,
            dimension_averages: DimensionAverages::default(),
        };
    }

    let final_round = all_round_results
        .iter()
        .map(|r| r.round_number)
        .max()
        .unwrap_or(0);

    let answered: Vec<_> = all_round_results
        .iter()
        .flat_map(|r| r.scores.iter())
        .filter(|s| !s.is_unanswered())
        .collect();
    let total_questions_answered = answered.len();

    let averages = if answered.is_empty() {
        DimensionAverages::default()
    } else {
        let n = answered.len() as f64;
        DimensionAverages {
            correctness: answered.iter().map(|s| f64::from(s.correctness)).sum::<f64>() / n,
            clarity: answered.iter().map(|s| f64::from(s.clarity)).sum::<f64>() / n,
            structure: answered.iter().map(|s| f64::from(s.structure)).sum::<f64>() / n,
            depth: answered.iter().map(|s| f64::from(s.depth)).sum::<f64>() / n,
        }
    };

    let overall_average = all_round_results
        .iter()
        .map(|r| r.average_score)
        .sum::<f64>()
        / all_round_results.len() as f64;

    let (strengths, weak_areas) = rank_dimensions(&averages);

    let roadmap = generate_roadmap(
        gen,
        role,
        company,
        all_round_results,
        final_round,
        termination_reason,
        &strengths,
        &weak_areas,
    )
    .await;

    FinalReport {
        strengths,
        weak_areas,
        roadmap,
        final_round_reached: final_round,
        total_questions_answered,
        overall_average,
        dimension_averages: averages,
    }
}

/// Ranks the four dimensions by average. The top two at or above the strength
/// bar become strengths, the bottom two under the weakness bar become weak
/// areas. Fallback strings guarantee both lists are non-empty.
fn rank_dimensions(averages: &DimensionAverages) -> (Vec<String>, Vec<String>) {
    let mut ranked: Vec<(&str, f64)> = DIMENSION_LABELS
        .iter()
        .copied()
        .zip([
            averages.correctness,
            averages.clarity,
            averages.structure,
            averages.depth,
        ])
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut strengths: Vec<String> = ranked
        .iter()
        .take(2)
        .filter(|(_, avg)| *avg >= STRENGTH_BAR)
        .map(|(label, _)| label.to_string())
        .collect();
    let mut weak_areas: Vec<String> = ranked
        .iter()
        .rev()
        .take(2)
        .filter(|(_, avg)| *avg < WEAKNESS_BAR)
        .map(|(label, _)| label.to_string())
        .collect();

    if strengths.is_empty() {
        strengths.push("Shows potential - continue practicing".to_string());
    }
    if weak_areas.is_empty() {
        weak_areas.push("Overall strong performance - focus on advanced topics".to_string());
    }

    (strengths, weak_areas)
}

#[allow(clippy::too_many_arguments)]
async fn generate_roadmap(
    gen: &dyn TextGenerator,
    role: &str,
    company: &str,
    all_round_results: &[RoundResult],
    final_round: u8,
    termination_reason: Option<&str>,
    strengths: &[String],
    weak_areas: &[String],
) -> String {
    let round_summary: String = all_round_results
        .iter()
        .map(|r| {
            let name = round_spec(r.round_number).map(|s| s.name).unwrap_or("Unknown");
            let outcome = if r.passed { "Passed" } else { "Did not pass" };
            format!(
                "- Round {} ({}): {}, Score: {:.1}/10\n",
                r.round_number, name, outcome, r.average_score
            )
        })
        .collect();

    let prompt = ROADMAP_PROMPT_TEMPLATE
        .replace("{role}", role)
        .replace("{company}", company)
        .replace("{final_round}", &final_round.to_string())
        .replace(
            "{termination_reason}",
            termination_reason.unwrap_or("Completed all rounds"),
        )
        .replace("{round_summary}", &round_summary)
        .replace("{strengths}", &strengths.join(", "))
        .replace("{weak_areas}", &weak_areas.join(", "));

    match gen.generate(ROADMAP_SYSTEM, &prompt).await {
        Ok(roadmap) => roadmap,
        Err(e) => {
            warn!("Roadmap generation failed, using templated fallback: {e}");
            fallback_roadmap(role, final_round, weak_areas)
        }
    }
}

/// Renders a markdown summary of one completed round for the submit response.
pub fn round_summary(result: &RoundResult) -> String {
    let name = round_spec(result.round_number)
        .map(|s| s.name)
        .unwrap_or("Unknown Round");
    let verdict = if result.passed { "PASSED" } else { "NOT PASSED" };

    let mut summary = format!(
        "## Round {}: {name}\n\n\
         **Result**: {verdict}\n\
         **Average Score**: {:.1}/10\n\
         **Difficulty Level**: {}\n\n\
         ### Performance Breakdown:\n",
        result.round_number,
        result.average_score,
        result.difficulty_used.as_str(),
    );

    for (i, (question, score)) in result.questions.iter().zip(result.scores.iter()).enumerate() {
        let snippet: String = question.chars().take(100).collect();
        summary.push_str(&format!(
            "\n**Question {}**: {snippet}...\n\
             - Correctness: {}/10\n\
             - Clarity: {}/10\n\
             - Structure: {}/10\n\
             - Depth: {}/10\n\
             - **Overall**: {:.1}/10\n\n\
             Feedback: {}\n",
            i + 1,
            score.correctness,
            score.clarity,
            score.structure,
            score.depth,
            score.average(),
            score.feedback,
        ));
    }
    summary
}

/// Deterministic roadmap used when the external call fails.
fn fallback_roadmap(role: &str, final_round: u8, weak_areas: &[String]) -> String {
    let focus_list: String = weak_areas
        .iter()
        .map(|area| format!("- {area}\n"))
        .collect();

    format!(
        "# Improvement Roadmap for {role}\n\n\
         ## Based on Your Performance\n\
         You completed {final_round} round(s) of the interview.\n\n\
         ## Recommended Focus Areas\n\
         {focus_list}\n\
         ## Action Items\n\
         1. Review fundamentals in your weak areas\n\
         2. Practice mock interviews\n\
         3. Study system design patterns\n\
         4. Improve communication skills\n\n\
         Continue practicing and you'll improve!\n"
    )
}
