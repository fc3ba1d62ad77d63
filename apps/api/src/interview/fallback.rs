//! Deterministic local fallbacks used whenever the AI evaluation service is
//! unreachable or returns unusable output. Pure functions, no hidden state.

use super::models::{AiScore, Difficulty};

/// Domain vocabulary checked by the fallback scorer. An answer mentioning any
/// of these earns the keyword bonus at the 50- and 100-character tiers.
const KEYWORDS: [&str; 12] = [
    "react",
    "node",
    "component",
    "state",
    "props",
    "hook",
    "async",
    "promise",
    "api",
    "middleware",
    "database",
    "event loop",
];

/// Scores an answer from its length and keyword presence, then adjusts for
/// difficulty. Base tiers:
///   <20 chars -> 2, <50 -> 3 (4 w/ keyword),
///   <100 -> 4 (6 w/ keyword), >=100 -> 5 (7 w/ keyword).
/// Easy adds 1 (capped at 10), Hard subtracts 1 (floored at 1).
/// An empty answer is an absolute floor: every field is 1 and no difficulty
/// adjustment applies.
pub fn fallback_score(answer: &str, difficulty: Difficulty) -> AiScore {
    let len = answer.trim().len();
    if len == 0 {
        return AiScore {
            technical: 1,
            clarity: 1,
            problem_solving: 1,
            overall: 1,
            feedback: format!(
                "Automated evaluation (AI scoring unavailable): empty response for a {} question.",
                difficulty.as_str()
            ),
        };
    }

    let lower = answer.to_lowercase();
    let has_keyword = KEYWORDS.iter().any(|kw| lower.contains(kw));

    let base: i8 = match len {
        1..=19 => 2,
        20..=49 => {
            if has_keyword {
                4
            } else {
                3
            }
        }
        50..=99 => {
            if has_keyword {
                6
            } else {
                4
            }
        }
        _ => {
            if has_keyword {
                7
            } else {
                5
            }
        }
    };

    let adjusted = match difficulty {
        Difficulty::Easy => (base + 1).min(10),
        Difficulty::Medium => base,
        Difficulty::Hard => (base - 1).max(1),
    } as u8;

    AiScore {
        technical: adjusted,
        clarity: adjusted.saturating_sub(1).max(1),
        problem_solving: adjusted,
        overall: adjusted,
        feedback: format!(
            "Automated evaluation (AI scoring unavailable): {} response for a {} question.",
            length_label(len),
            difficulty.as_str()
        ),
    }
}

fn length_label(len: usize) -> &'static str {
    match len {
        0 => "empty",
        1..=49 => "brief",
        50..=99 => "moderate",
        _ => "detailed",
    }
}

/// Canned summary used when the AI summary call fails. The threshold bands
/// (>=7 strong, >=5 moderate, else weak) are a contract; wording is not.
pub fn fallback_summary(candidate_name: &str, final_score: f64) -> String {
    if final_score >= 7.0 {
        format!(
            "{candidate_name} scored {final_score:.1}/10, showing strong full-stack fundamentals \
             with consistent, well-structured answers across difficulty levels."
        )
    } else if final_score >= 5.0 {
        format!(
            "{candidate_name} scored {final_score:.1}/10, a moderate performance with solid basics \
             but uneven depth on the harder questions."
        )
    } else {
        format!(
            "{candidate_name} scored {final_score:.1}/10, a weak performance indicating significant \
             gaps in core full-stack concepts."
        )
    }
}
