//! Query-set loading for the evaluation harness.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::conversation::Intent;

/// One evaluation query with its ground-truth intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalQuery {
    pub query_id: String,
    pub text: String,
    pub ground_truth_intent: Intent,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("dataset is empty")]
    Empty,
}

/// Load an ordered query set from a JSON array file.
pub fn load_queries<P: AsRef<Path>>(path: P) -> Result<Vec<EvalQuery>, DatasetError> {
    let contents = std::fs::read_to_string(path)?;
    let queries: Vec<EvalQuery> = serde_json::from_str(&contents)?;
    if queries.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(queries)
}

/// A small builtin query set, used when no dataset file is configured.
pub fn builtin_queries() -> Vec<EvalQuery> {
    let cases = [
        ("q001", "What is your return policy?", Intent::InformationRequest),
        ("q002", "How long does shipping usually take?", Intent::InformationRequest),
        ("q003", "Please cancel order 9001", Intent::ActionRequest),
        ("q004", "I want a refund for order 67890", Intent::ActionRequest),
        ("q005", "Where is order #12345? Give me a status update", Intent::ActionRequest),
        (
            "q006",
            "This is the worst, terrible service ever, I am furious",
            Intent::Complaint,
        ),
        ("q007", "What payment methods do you accept?", Intent::InformationRequest),
        ("q008", "Cancel order 40404 immediately", Intent::ActionRequest),
        ("q009", "Do your products come with a warranty?", Intent::InformationRequest),
        ("q010", "Track order 55555 for me", Intent::ActionRequest),
    ];

    cases
        .into_iter()
        .map(|(id, text, intent)| EvalQuery {
            query_id: id.to_string(),
            text: text.to_string(),
            ground_truth_intent: intent,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_queries_are_ordered_and_unique() {
        let queries = builtin_queries();
        assert!(!queries.is_empty());

        let mut ids: Vec<&str> = queries.iter().map(|q| q.query_id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids.len(), queries.len());
    }

    #[test]
    fn test_load_queries_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"query_id": "x1", "text": "cancel order 9001", "ground_truth_intent": "action_request"}}]"#
        )
        .unwrap();

        let queries = load_queries(file.path()).unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].ground_truth_intent, Intent::ActionRequest);
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        assert!(matches!(load_queries(file.path()), Err(DatasetError::Empty)));
    }
}
