//! crates/intake_core/src/policy.rs
//!
//! Decides whether a model-proposed question may be shown to the respondent.

use crate::domain::{Role, Turn};

/// Phrases a question must never contain, matched case-insensitively.
pub const FORBIDDEN_PHRASES: &[&str] = &[
    "expected demand",
    "future demand",
    "market forecast",
    "how much future demand",
    "how much demand",
    "estimate future sales",
    "foresee any increase in demand",
    "market size",
    "current market size",
    "future market size",
];

/// Similarity (0-100) at or above which a candidate repeats a prior question.
pub const DUPLICATE_THRESHOLD: u8 = 80;

/// Why a candidate question was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    ForbiddenTopic(&'static str),
    Duplicate { prior: String, score: u8 },
}

#[derive(Debug, Clone)]
pub struct QuestionPolicy {
    forbidden: Vec<&'static str>,
    duplicate_threshold: u8,
}

impl Default for QuestionPolicy {
    fn default() -> Self {
        Self {
            forbidden: FORBIDDEN_PHRASES.to_vec(),
            duplicate_threshold: DUPLICATE_THRESHOLD,
        }
    }
}

impl QuestionPolicy {
    pub fn is_admissible(&self, candidate: &str, prior_turns: &[Turn]) -> bool {
        self.check(candidate, prior_turns).is_ok()
    }

    /// Like [`is_admissible`](Self::is_admissible) but reports the reason for a rejection.
    pub fn check(&self, candidate: &str, prior_turns: &[Turn]) -> Result<(), Rejection> {
        if let Some(phrase) = self.forbidden_phrase(candidate) {
            return Err(Rejection::ForbiddenTopic(phrase));
        }

        for turn in prior_turns.iter().filter(|t| t.role == Role::Assistant) {
            let score = similarity(&turn.question, candidate);
            if score >= self.duplicate_threshold {
                return Err(Rejection::Duplicate {
                    prior: turn.question.clone(),
                    score,
                });
            }
        }
        Ok(())
    }

    pub fn forbidden_phrase(&self, candidate: &str) -> Option<&'static str> {
        let lowered = candidate.to_lowercase();
        self.forbidden
            .iter()
            .copied()
            .find(|phrase| lowered.contains(phrase))
    }
}

/// Case-insensitive similarity on a 0-100 scale, 100 meaning identical.
///
/// Computed as `2 * LCS / (len(a) + len(b))` over characters, i.e. the
/// insertion/deletion edit ratio. Two empty strings score 0.
pub fn similarity(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let common = longest_common_subsequence(&a, &b);
    (200.0 * common as f64 / total as f64).round() as u8
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diagonal = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}
