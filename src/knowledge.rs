//! # Knowledge ingestion
//!
//! Batch-loads FAQ source records, shapes them into [`Document`]s, and hands
//! them to the retriever for embedding and indexing.
//!
//! A FAQ record embeds as `"Question: …\nAnswer: …"` so a query matches
//! either phrasing of the question or content of the answer; the original
//! question/answer/category are carried along as document metadata.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::{fs, path::Path};

use crate::error::{Result, SupportRagError};
use crate::models::Document;
use crate::retriever::Retriever;

/// One FAQ entry as stored in the source JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct FaqRecord {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Load FAQ records from a JSON file (an array of objects).
pub fn load_faqs(path: &Path) -> Result<Vec<FaqRecord>> {
    tracing::info!("Loading FAQs from {}", path.display());
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| SupportRagError::Config(format!("invalid FAQ file {}: {e}", path.display())))
}

/// Shape FAQ records into embeddable documents.
pub fn documents_from_faqs(faqs: Vec<FaqRecord>) -> Vec<Document> {
    faqs.into_iter()
        .map(|faq| {
            let text = format!("Question: {}\nAnswer: {}", faq.question, faq.answer);
            let mut metadata = Map::new();
            metadata.insert("question".to_string(), Value::String(faq.question));
            metadata.insert("answer".to_string(), Value::String(faq.answer));
            if let Some(category) = faq.category {
                metadata.insert("category".to_string(), Value::String(category));
            }
            Document::new(faq.id, text).with_metadata(metadata)
        })
        .collect()
}

/// Load, shape, and index a FAQ file. Returns how many documents were added.
pub async fn ingest_faq_file(retriever: &Retriever, path: &Path) -> Result<usize> {
    let faqs = load_faqs(path)?;
    let documents = documents_from_faqs(faqs);
    let count = documents.len();
    retriever.ingest(documents).await?;
    tracing::info!("Indexed {} FAQ documents", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn faq_documents_embed_question_and_answer() {
        let faqs = vec![FaqRecord {
            id: "faq_password_reset".into(),
            question: "How do I reset my password?".into(),
            answer: "Click 'Forgot Password' on the login page.".into(),
            category: Some("account".into()),
        }];
        let docs = documents_from_faqs(faqs);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "faq_password_reset");
        assert_eq!(
            docs[0].text,
            "Question: How do I reset my password?\nAnswer: Click 'Forgot Password' on the login page."
        );
        assert_eq!(
            docs[0].metadata.get("category"),
            Some(&serde_json::Value::String("account".into()))
        );
    }

    #[test]
    fn load_faqs_parses_a_json_array() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"faq_refund","question":"What is your refund policy?","answer":"Full refund within 30 days.","category":"billing"}}]"#
        )
        .unwrap();
        let faqs = load_faqs(file.path()).unwrap();
        assert_eq!(faqs.len(), 1);
        assert_eq!(faqs[0].id, "faq_refund");
    }

    #[test]
    fn load_faqs_rejects_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_faqs(file.path()).is_err());
    }
}
