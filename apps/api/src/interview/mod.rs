//! The interview core: round configuration, question generation, answer
//! evaluation, adaptive difficulty, round gating, and report synthesis.

pub mod evaluator;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod questions;
pub mod report;
pub mod rounds;
