//! Intent, decision and category classification.
//!
//! The [`Classifier`] trait is the seam for an external NLP model. The
//! default [`KeywordClassifier`] is a fast phrase-table scan over normalized
//! text, good enough to drive the dialogue graph without a model.

use crate::error::Result;
use crate::text::{contains_phrase, normalize_phrase};
use async_trait::async_trait;

/// Category assigned to text that fits no other label confidently.
pub const GENERAL_CHAT: &str = "general chat";

/// Memory category labels.
pub const CATEGORY_LABELS: &[&str] = &[
    "likes",
    "dislikes",
    "preference",
    "personal",
    "question",
    "hobby",
    "dates",
    "goals",
];

/// What the user wants from a `start`-state transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// The user asked the agent to remember something.
    RememberThat,
    /// Anything else.
    Chat,
}

/// Answer to a yes/no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Yes,
    No,
    Unsure,
}

/// Category label with classifier confidence in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGuess {
    pub label: String,
    pub confidence: f32,
}

impl CategoryGuess {
    /// The label, or [`GENERAL_CHAT`] when confidence is below `min_confidence`.
    pub fn resolve(&self, min_confidence: f32) -> &str {
        if self.confidence < min_confidence {
            GENERAL_CHAT
        } else {
            &self.label
        }
    }
}

/// Text classification collaborator.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn intent(&self, text: &str) -> Result<Intent>;

    async fn decision(&self, text: &str) -> Result<Decision>;

    async fn category(&self, text: &str) -> Result<CategoryGuess>;
}

// ── Phrase tables ───────────────────────────────────────────────────────

// Tables hold normalized phrases: lowercase, no punctuation.

const REMEMBER_PHRASES: &[&str] = &[
    "remember that",
    "remember this",
    "dont forget",
    "do not forget",
    "keep in mind",
    "make a note",
    "note that",
];

const YES_PHRASES: &[&str] = &[
    "yes",
    "yeah",
    "yep",
    "yup",
    "sure",
    "ok",
    "okay",
    "please do",
    "of course",
    "go ahead",
    "definitely",
    "absolutely",
    "correct",
];

const NO_PHRASES: &[&str] = &[
    "no",
    "nope",
    "nah",
    "dont",
    "do not",
    "never mind",
    "not really",
    "forget it",
];

/// (category, phrases)
const CATEGORY_TABLE: &[(&str, &[&str])] = &[
    (
        "likes",
        &[
            "like",
            "likes",
            "love",
            "loves",
            "favourite",
            "favorite",
            "enjoy",
            "enjoys",
            "adore",
        ],
    ),
    (
        "dislikes",
        &[
            "dislike",
            "dislikes",
            "hate",
            "hates",
            "cant stand",
            "despise",
            "gross",
            "disgusting",
        ],
    ),
    (
        "preference",
        &["prefer", "prefers", "rather", "instead", "better than"],
    ),
    (
        "personal",
        &[
            "my name", "i am", "im", "family", "sister", "brother", "mom", "dad", "live in",
            "pet",
        ],
    ),
    (
        "question",
        &["what", "why", "how", "who", "where", "when", "do you", "can you"],
    ),
    (
        "hobby",
        &[
            "hobby", "hobbies", "play", "plays", "draw", "drawing", "paint", "game", "games",
            "gaming", "coding", "stream", "streaming",
        ],
    ),
    (
        "dates",
        &[
            "birthday",
            "anniversary",
            "tomorrow",
            "today",
            "next week",
            "weekend",
            "date",
            "christmas",
        ],
    ),
    (
        "goals",
        &[
            "goal",
            "goals",
            "learn",
            "learning",
            "want to",
            "plan to",
            "dream",
            "someday",
            "working on",
            "passionate",
        ],
    ),
];

// ── Keyword classifier ──────────────────────────────────────────────────

/// Phrase-table classifier over normalized text.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn classify_intent(text: &str) -> Intent {
        let normalized = normalize_phrase(text);
        if REMEMBER_PHRASES
            .iter()
            .any(|p| contains_phrase(&normalized, p))
        {
            Intent::RememberThat
        } else {
            Intent::Chat
        }
    }

    /// Yes when only affirmative phrases match, no when only negative ones
    /// do, unsure otherwise.
    pub fn classify_decision(text: &str) -> Decision {
        let normalized = normalize_phrase(text);
        let yes = YES_PHRASES.iter().any(|p| contains_phrase(&normalized, p));
        let no = NO_PHRASES.iter().any(|p| contains_phrase(&normalized, p));
        match (yes, no) {
            (true, false) => Decision::Yes,
            (false, true) => Decision::No,
            _ => Decision::Unsure,
        }
    }

    /// Highest-scoring category by phrase hit count.
    ///
    /// Confidence: 1 hit → 0.70, 2 → 0.80, 3+ → 0.90. A tie for first place
    /// halves the confidence; no hits at all yields [`GENERAL_CHAT`] at 0.0.
    pub fn classify_category(text: &str) -> CategoryGuess {
        let normalized = normalize_phrase(text);

        let mut best_label = GENERAL_CHAT;
        let mut best_score = 0usize;
        let mut tied = false;

        for &(label, phrases) in CATEGORY_TABLE {
            let score = phrases
                .iter()
                .filter(|p| contains_phrase(&normalized, p))
                .count();
            if score > best_score {
                best_score = score;
                best_label = label;
                tied = false;
            } else if score > 0 && score == best_score {
                tied = true;
            }
        }

        if best_score == 0 {
            return CategoryGuess {
                label: GENERAL_CHAT.to_owned(),
                confidence: 0.0,
            };
        }

        let confidence = match best_score {
            1 => 0.70,
            2 => 0.80,
            _ => 0.90,
        };
        CategoryGuess {
            label: best_label.to_owned(),
            confidence: if tied { confidence / 2.0 } else { confidence },
        }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn intent(&self, text: &str) -> Result<Intent> {
        Ok(Self::classify_intent(text))
    }

    async fn decision(&self, text: &str) -> Result<Decision> {
        Ok(Self::classify_decision(text))
    }

    async fn category(&self, text: &str) -> Result<CategoryGuess> {
        Ok(Self::classify_category(text))
    }
}
