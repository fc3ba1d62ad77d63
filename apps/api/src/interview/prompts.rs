//! Prompt constants for the LLM evaluator. All three calls demand JSON-only
//! output; the evaluator validates shape and falls back locally on any
//! deviation.

/// System prompt enforcing JSON-only output across all evaluator calls.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise technical interview assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Asks for the fixed six-question full-stack sequence. The difficulty
/// ladder and time limits are enforced server-side after parsing.
pub const GENERATE_QUESTIONS_PROMPT: &str = "\
Generate exactly 6 interview questions for a full-stack developer role \
(React and Node.js). Difficulty order is fixed: the first two questions are \
Easy, the next two Medium, the last two Hard. Easy questions test definitions \
and basics, Medium questions test applied understanding, Hard questions test \
system design and debugging depth.

Return a JSON array of exactly 6 objects, in order:
[{\"text\": \"...\", \"difficulty\": \"Easy\"}, ...]
The difficulty field must be exactly \"Easy\", \"Medium\", or \"Hard\".";

/// Scores one answer. Placeholders: {question}, {difficulty}, {answer}.
pub const SCORE_ANSWER_PROMPT: &str = "\
You are grading one answer from a timed full-stack developer interview.

Question ({difficulty}): {question}

Candidate answer:
{answer}

Score the answer on a 1-10 scale for each dimension. An empty or irrelevant \
answer scores 1. Return a JSON object:
{\"technical\": n, \"clarity\": n, \"problem_solving\": n, \"overall\": n, \
\"feedback\": \"one or two sentences\"}";

/// Summarizes a full transcript. Placeholders: {name}, {transcript}.
pub const SUMMARIZE_PROMPT: &str = "\
Write a 2-3 sentence hiring summary for the candidate {name} based on this \
technical interview transcript. Mention strengths and weaknesses concretely.

Transcript:
{transcript}

Return a JSON object: {\"summary\": \"...\"}";
