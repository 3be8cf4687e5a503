// All LLM prompt constants for the interview core.
// Templates use `{placeholder}` slots filled with `.replace()` before sending.

use crate::models::interview::{DifficultyLevel, RoundType};

/// Per-round question pattern block, spliced into the question system prompt.
/// Each encodes the intent of its stage with concrete good/bad examples so the
/// model produces specific, problem-based questions instead of generic ones.
pub fn round_patterns(round_type: RoundType) -> &'static str {
    match round_type {
        RoundType::Screening => SCREENING_PATTERNS,
        RoundType::CoreSkills => CORE_SKILLS_PATTERNS,
        RoundType::Advanced => ADVANCED_PATTERNS,
        RoundType::BarRaiser => BAR_RAISER_PATTERNS,
    }
}

/// Difficulty-specific instruction appended to the question system prompt.
pub fn difficulty_instruction(difficulty: DifficultyLevel) -> &'static str {
    match difficulty {
        DifficultyLevel::Easy => "Generate EASY questions that can be answered in 1-2 sentences.",
        DifficultyLevel::Medium => {
            "Generate MEDIUM difficulty questions requiring explanation."
        }
        DifficultyLevel::Hard => {
            "Generate HARD questions requiring deep analysis and examples."
        }
    }
}

const SCREENING_PATTERNS: &str = r#"Generate SCREENING round questions that are QUICK (1-2 minute answers) and test FUNDAMENTALS.

Proven question patterns:
- "What's the time complexity of [algorithm]? When would you use it over [alternative]?"
- "Explain the difference between [concept A] and [concept B]. Give a real-world example"
- "What happens when you type a URL in a browser and hit Enter? (Focus on [specific layer])"
- "Explain precision vs recall. When would you optimize for one over the other?"

CRITICAL RULES:
1. Each question must have a clear right answer or well-defined good answer
2. Questions must be answerable in 1-2 minutes
3. DO NOT ask about resume or past projects in screening
4. Test fundamental concepts specific to the role — no generic questions

GOOD: "What's the difference between HTTP and HTTPS? How does encryption work?"
GOOD: "What is the CAP theorem? Give an example of choosing AP vs CP"
BAD: "Tell me about your background in technology"
BAD: "How do you stay updated with new technologies?""#;

const CORE_SKILLS_PATTERNS: &str = r#"Generate CORE SKILLS questions that test PRACTICAL problem-solving and hands-on technical ability.

Proven question patterns:
- Debugging (MUST include at least 1): "Your API suddenly returns 500 errors for 10% of requests after deployment. Walk me through your debugging process"
- Implementation: "Walk me through how you would implement [specific feature]. What data structures would you use and why?"
- Real-world scenarios: "Your cache hit rate dropped from 95% to 60%. What could cause this and how would you fix it?"

CRITICAL RULES:
1. At least ONE question must be debugging/troubleshooting
2. Questions should require explaining APPROACH, not just theory
3. Include specific scenarios with concrete constraints

GOOD: "Walk me through implementing a rate limiter that allows 100 requests per minute per user"
BAD: "What is your experience with distributed systems?""#;

const ADVANCED_PATTERNS: &str = r#"Generate ADVANCED/PROBLEM-SOLVING questions that test SYSTEM DESIGN, TRADE-OFFS, and PRODUCTION thinking.

Proven question patterns:
- System design (MUST include at least 1 with specific scale): "Design a URL shortener like bit.ly that handles 100M new URLs per day. Focus on data storage and retrieval"
- Trade-offs: "Would you use SQL or NoSQL for [specific use case]? Explain your reasoning with pros/cons of each"
- Production: "Your service latency jumped from 100ms to 2 seconds. Walk me through diagnosis and resolution"

CRITICAL RULES:
1. At least ONE system design question with SPECIFIC scale requirements (users, requests/sec, data size)
2. Questions must require explaining TRADE-OFFS and justifying decisions
3. Include numbers/metrics (latency, throughput, data size)

GOOD: "Design Instagram Stories. 500M users, stories expire in 24h, uploads up to 100MB"
BAD: "How would you design a scalable system?""#;

const BAR_RAISER_PATTERNS: &str = r#"Generate BAR RAISER questions that test LEADERSHIP, AMBIGUITY HANDLING, and SENIOR JUDGMENT.

Proven question patterns:
- Incident response: "At 2 AM, your payment service goes down affecting 100K transactions/hour. Walk me through your incident response from first alert to resolution"
- Cross-team leadership: "Two senior engineers propose completely different technical solutions to the same problem. How do you drive consensus?"
- Ambiguous problems: "You're told to 'improve system reliability'. Where do you start? How do you measure success?"
- High stakes: "You're 2 weeks from a critical launch. QA finds a blocking bug, backend needs 3 more days, and product wants a new requirement. What do you do?"

CRITICAL RULES:
1. Questions must test LEADERSHIP and DECISION-MAKING under uncertainty
2. Include at least ONE production crisis scenario
3. Should NOT be answerable with pure technical knowledge — requires judgment

GOOD: "Two key engineers quit 3 weeks before your biggest product launch. What's your plan?"
BAD: "Tell me about a time you showed leadership""#;

/// System prompt for round question generation.
/// Replace: {round_number}, {round_name}, {round_patterns},
///          {difficulty_instruction}, {question_count}, {role}, {company}
pub const QUESTION_SYSTEM_TEMPLATE: &str = r#"You are an expert technical interviewer from a top tech company (Google/Amazon/Meta/Microsoft).
You are conducting Round {round_number}: {round_name}.

{round_patterns}

{difficulty_instruction}

STRICT REQUIREMENTS:
1. Follow the question patterns and examples provided above EXACTLY
2. Ask SPECIFIC, problem-based questions — NO generic questions
3. Use real-world scenarios with concrete constraints and numbers
4. Match the role ({role}) and company ({company}) requirements
5. Be different from previous questions asked

Generate EXACTLY {question_count} questions following these patterns.
Return ONLY the questions, numbered 1-{question_count}."#;

/// User prompt for round question generation.
/// Replace: {role}, {company}, {round_number}, {round_name}, {difficulty},
///          {resume}, {jd_context}, {previous_context}, {question_count}
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Role: {role}
Company: {company}
Round: {round_number} - {round_name}
Difficulty: {difficulty}

Resume:
{resume}
{jd_context}{previous_context}
Generate {question_count} questions following the patterns above:"#;

/// System prompt for answer evaluation. Enforces the parseable rubric layout.
/// Replace: {round_type}, {jd_instruction}
pub const EVALUATION_SYSTEM_TEMPLATE: &str = r#"You are an expert interviewer evaluating a candidate's answer.
Evaluate the answer based on these 4 dimensions (score each 0-10):

1. CORRECTNESS: Technical accuracy and factual correctness
2. CLARITY: How clearly the answer communicates the idea
3. STRUCTURE: Organization and logical flow of the answer
4. DEPTH: Level of technical depth and insight shown

This is a {round_type} round question.
{jd_instruction}
Provide your evaluation in this EXACT format:
CORRECTNESS: [0-10]
CLARITY: [0-10]
STRUCTURE: [0-10]
DEPTH: [0-10]
FEEDBACK: [One paragraph of constructive feedback]"#;

/// Extra evaluation instruction used only when a job description is present.
pub const EVALUATION_JD_INSTRUCTION: &str =
    "\nIMPORTANT: Consider how well the answer aligns with the job description requirements. \
     Award higher scores if the candidate demonstrates skills/experience mentioned in the JD.\n";

/// User prompt for answer evaluation.
/// Replace: {role}, {company}, {round_type}, {jd_context}, {question}, {answer}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Interview for: {role} at {company}
Round Type: {round_type}
{jd_context}
Question: {question}

Answer: {answer}

Please evaluate this answer:"#;

/// System prompt for the final improvement roadmap.
pub const ROADMAP_SYSTEM: &str = r#"You are a career coach creating a personalized learning roadmap.
Based on the interview performance, create a detailed improvement plan that:
1. Acknowledges specific strengths
2. Addresses identified weak areas
3. Provides actionable steps with resources
4. Includes both free and paid learning resources
5. Sets realistic timelines based on the round reached

Format in markdown with clear sections."#;

/// User prompt for the roadmap.
/// Replace: {role}, {company}, {final_round}, {termination_reason},
///          {round_summary}, {strengths}, {weak_areas}
pub const ROADMAP_PROMPT_TEMPLATE: &str = r#"Role Applied: {role}
Company: {company}
Rounds Completed: {final_round}
Termination Reason: {termination_reason}

Round Performance:
{round_summary}

Identified Strengths: {strengths}
Areas for Improvement: {weak_areas}

Create a personalized 4-8 week learning roadmap to help this candidate improve for future interviews.
Focus more heavily on the areas where they struggled.
If they didn't pass early rounds, focus on fundamentals.
If they reached later rounds, focus on advanced topics."#;
