//! In-memory keyword retriever.
//!
//! Scores knowledge-base entries by keyword overlap with the query. This is
//! the fallback ranking the production system uses when no vector index is
//! populated, promoted here to the default backend: deterministic, ordered,
//! and good enough to ground answers for evaluation runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Retriever, RetrieverError, ScoredDocument};

/// One question/answer entry in the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub question: String,
    pub answer: String,
}

/// Keyword-overlap retriever over an in-memory knowledge base.
#[derive(Debug, Clone)]
pub struct KeywordRetriever {
    entries: Vec<KnowledgeEntry>,
}

impl KeywordRetriever {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    /// A small builtin knowledge base covering the common support topics.
    pub fn with_default_knowledge_base() -> Self {
        let entries = [
            (
                "What is your shipping policy?",
                "Standard shipping takes 3-5 business days. Orders over $50 ship free; express and overnight options are available at checkout.",
            ),
            (
                "What is your return policy?",
                "Items can be returned within 30 days of delivery for a full refund. Start a return from your order history page.",
            ),
            (
                "How do I contact customer support?",
                "Our support team is available Monday through Friday, 9 AM to 6 PM, by phone or email from the help page. Most issues are resolved within 24-48 hours.",
            ),
            (
                "How long do refunds take?",
                "Approved refunds are returned to your original payment method within 5-7 business days.",
            ),
            (
                "How do I track my order?",
                "Use the tracking link in your shipping confirmation email, or look up the order in your account order history.",
            ),
            (
                "What payment methods do you accept?",
                "We accept all major credit cards, debit cards, and store credit. Payment is charged when your order ships.",
            ),
            (
                "How do I reset my password?",
                "Use the password reset link on the sign-in page. A reset email arrives within a few minutes.",
            ),
            (
                "Do products come with a warranty?",
                "All products include a one-year limited warranty against manufacturing defects.",
            ),
        ];

        Self::new(
            entries
                .into_iter()
                .map(|(question, answer)| KnowledgeEntry {
                    question: question.to_string(),
                    answer: answer.to_string(),
                })
                .collect(),
        )
    }

    /// Fraction of query words appearing in the entry text.
    fn overlap_score(query_words: &[String], entry: &KnowledgeEntry) -> f64 {
        if query_words.is_empty() {
            return 0.0;
        }
        let haystack = format!("{} {}", entry.question, entry.answer).to_lowercase();
        let hits = query_words.iter().filter(|w| haystack.contains(*w)).count();
        hits as f64 / query_words.len() as f64
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, RetrieverError> {
        let query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 2)
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();

        let mut scored: Vec<ScoredDocument> = self
            .entries
            .iter()
            .map(|entry| ScoredDocument {
                text: entry.answer.clone(),
                score: Self::overlap_score(&query_words, entry),
            })
            .filter(|doc| doc.score > 0.0)
            .collect();

        // Stable ordering: ties keep knowledge-base order, so results are
        // reproducible across runs.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_retrieves_relevant_entry_first() {
        let retriever = KeywordRetriever::with_default_knowledge_base();
        let docs = retriever.retrieve("what is your shipping policy", 3).await.unwrap();

        assert!(!docs.is_empty());
        assert!(docs[0].text.contains("shipping"));
        assert!(docs.len() <= 3);
    }

    #[tokio::test]
    async fn test_no_match_returns_empty_not_error() {
        let retriever = KeywordRetriever::new(vec![]);
        let docs = retriever.retrieve("anything at all", 5).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_scores_are_descending() {
        let retriever = KeywordRetriever::with_default_knowledge_base();
        let docs = retriever.retrieve("how long do refunds take", 5).await.unwrap();

        for pair in docs.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_top_k_truncation() {
        let retriever = KeywordRetriever::with_default_knowledge_base();
        let docs = retriever.retrieve("order shipping refund return", 2).await.unwrap();
        assert!(docs.len() <= 2);
    }
}
