//! Deterministic keyword classifier.
//!
//! The default [`Classifier`] implementation: keyword-driven intent
//! detection, regex order-id extraction, and a lexicon sentiment score in
//! [-1, 1]. Deterministic by construction, which makes it the reference
//! backend for the evaluation harness: replaying a query set through it
//! always yields the same classifications.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Classifier, ClassifierError};
use crate::conversation::{
    Classification, Entity, HistoryTurn, Intent, Sentiment, Urgency,
};

static ORDER_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"#(\d{4,})").unwrap(),
        Regex::new(r"[Oo]rder\s*#?(\d{4,})").unwrap(),
        Regex::new(r"ID\s*#?(\d{4,})").unwrap(),
    ]
});

static AMOUNT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d+(?:\.\d{1,2})?)").unwrap());

const ACTION_KEYWORDS: &[&str] = &[
    "cancel", "refund", "return", "change", "modify", "update", "reset", "track",
];

const COMPLAINT_KEYWORDS: &[&str] = &[
    "angry", "terrible", "worst", "complaint", "unacceptable", "ridiculous",
];

const URGENT_KEYWORDS: &[&str] = &["urgent", "immediately", "right now", "asap", "emergency"];

const NEGATIVE_WORDS: &[&str] = &[
    "angry",
    "frustrated",
    "terrible",
    "awful",
    "horrible",
    "bad",
    "disappointed",
    "upset",
    "hate",
    "worst",
    "useless",
    "broken",
    "damaged",
    "never",
    "unacceptable",
    "ridiculous",
];

const POSITIVE_WORDS: &[&str] = &[
    "great",
    "excellent",
    "love",
    "perfect",
    "amazing",
    "wonderful",
    "fantastic",
    "good",
    "thank",
    "appreciate",
    "satisfied",
    "happy",
];

/// Keyword sentiment score in [-1, 1]; 0 is neutral.
fn sentiment_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;

    let total = negative + positive;
    if total == 0.0 {
        return 0.0;
    }
    (positive - negative) / total
}

fn negative_hits(text: &str) -> usize {
    let lower = text.to_lowercase();
    NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count()
}

fn extract_order_id(text: &str) -> Option<String> {
    ORDER_ID_PATTERNS
        .iter()
        .find_map(|p| p.captures(text).map(|c| c[1].to_string()))
}

fn extract_amount(text: &str) -> Option<String> {
    AMOUNT_PATTERN.captures(text).map(|c| c[1].to_string())
}

/// Rule-based classifier over keyword lists and extraction patterns.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    fn detect_intent(lower: &str) -> Intent {
        if COMPLAINT_KEYWORDS.iter().any(|w| lower.contains(w)) {
            Intent::Complaint
        } else if ACTION_KEYWORDS.iter().any(|w| lower.contains(w)) {
            Intent::ActionRequest
        } else if lower.trim().is_empty() {
            Intent::Unknown
        } else {
            Intent::InformationRequest
        }
    }

    /// One stray negative word reads as negative; very-negative requires a
    /// strongly negative score with at least two distinct hits.
    fn detect_sentiment(score: f64, negative_hits: usize) -> Sentiment {
        if score <= -0.8 && negative_hits >= 2 {
            Sentiment::VeryNegative
        } else if score < -0.3 {
            Sentiment::Negative
        } else if score > 0.3 {
            Sentiment::Positive
        } else {
            Sentiment::Neutral
        }
    }

    fn detect_urgency(lower: &str, sentiment: Sentiment) -> Urgency {
        let urgent_phrasing = URGENT_KEYWORDS.iter().any(|w| lower.contains(w));
        match (urgent_phrasing, sentiment) {
            (true, Sentiment::VeryNegative) => Urgency::Critical,
            (true, _) => Urgency::High,
            (false, Sentiment::VeryNegative) => Urgency::High,
            (false, Sentiment::Negative) => Urgency::Medium,
            _ => Urgency::Medium,
        }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(
        &self,
        query: &str,
        _history: &[HistoryTurn],
    ) -> Result<Classification, ClassifierError> {
        let lower = query.to_lowercase();

        let intent = Self::detect_intent(&lower);
        let score = sentiment_score(query);
        let sentiment = Self::detect_sentiment(score, negative_hits(query));
        let urgency = Self::detect_urgency(&lower, sentiment);

        let mut entities = Vec::new();
        if let Some(order_id) = extract_order_id(query) {
            // Pattern extraction is high-confidence but not certain.
            entities.push(Entity::new("order_id", order_id, 0.9));
        }
        if let Some(amount) = extract_amount(query) {
            entities.push(Entity::new("amount", amount, 0.8));
        }

        Ok(Classification {
            intent,
            entities,
            sentiment,
            urgency,
        })
    }
}
