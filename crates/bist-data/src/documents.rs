use std::collections::HashSet;
use std::path::Path;

use bist_models::{ContextSnippet, Ticker};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DataError;
use crate::text::{stem, tokenize};

/// Added to a document's score when the query names the document's ticker.
const TICKER_BOOST: f64 = 0.5;

/// Tokens too common in Turkish finance questions to carry signal.
const STOPWORDS: &[&str] = &[
    "ve", "ile", "icin", "bir", "bu", "da", "de", "mi", "mu", "ne", "nasil", "yap", "hakkinda",
    "analiz", "hisse", "hissesi", "the", "and", "for",
];

/// A text document generated from market data or filings, ready for retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub ticker: Option<Ticker>,
    pub doc_type: String,
    #[serde(default)]
    pub section: String,
    pub text: String,
}

struct IndexedDocument {
    document: Document,
    stems: HashSet<String>,
}

/// In-memory document index scored by stemmed token overlap.
pub struct DocumentStore {
    documents: Vec<IndexedDocument>,
}

impl DocumentStore {
    pub fn new(documents: Vec<Document>) -> Self {
        let documents = documents
            .into_iter()
            .map(|document| {
                let stems = significant_stems(&format!("{} {}", document.section, document.text));
                IndexedDocument { document, stems }
            })
            .collect();
        Self { documents }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let documents: Vec<Document> = serde_json::from_str(&raw)?;
        debug!(path = %path.as_ref().display(), documents = documents.len(), "Loaded document store");
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Top `top_k` snippets for `query`, best first. Documents sharing no
    /// stem with the query are never returned.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<ContextSnippet> {
        let query_stems = significant_stems(query);
        if query_stems.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let named: HashSet<String> = tokenize(query).into_iter().collect();

        let mut scored: Vec<(f64, &Document)> = self
            .documents
            .iter()
            .filter_map(|indexed| {
                let overlap = query_stems.intersection(&indexed.stems).count();
                if overlap == 0 {
                    return None;
                }
                let mut score = overlap as f64 / query_stems.len() as f64;
                if let Some(ticker) = indexed.document.ticker {
                    if named.contains(&ticker.symbol().to_ascii_lowercase()) {
                        score += TICKER_BOOST;
                    }
                }
                Some((score, &indexed.document))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        scored
            .into_iter()
            .take(top_k)
            .map(|(score, doc)| ContextSnippet {
                text: doc.text.clone(),
                score,
                source_id: source_id(doc),
            })
            .collect()
    }
}

fn source_id(doc: &Document) -> String {
    match doc.ticker {
        Some(ticker) => format!("{ticker} - {} ({})", doc.doc_type, doc.id),
        None => format!("{} ({})", doc.doc_type, doc.id),
    }
}

fn significant_stems(text: &str) -> HashSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() >= 3 && !STOPWORDS.contains(&t.as_str()))
        .map(|t| stem(&t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, ticker: Option<Ticker>, text: &str) -> Document {
        Document {
            id: id.to_string(),
            ticker,
            doc_type: "sirket_profili".to_string(),
            section: String::new(),
            text: text.to_string(),
        }
    }

    fn store() -> DocumentStore {
        DocumentStore::new(vec![
            doc("d1", Some(Ticker::Thyao), "Turk Hava Yollari yolcu sayisi ve gelir buyumesi"),
            doc("d2", Some(Ticker::Akbnk), "Akbank net faiz marji ve aktif kalitesi"),
            doc("d3", None, "Bankacilik sektorunde faiz ortami ve kredi buyumesi"),
            doc("d4", None, "Perakende sektorunde enflasyon etkisi"),
        ])
    }

    #[test]
    fn ranks_by_overlap_and_ticker_boost() {
        let results = store().search("AKBNK faiz marji nasil?", 3);
        assert_eq!(results[0].source_id, "AKBNK - sirket_profili (d2)");
        assert!(results[0].score > 1.0);
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn stems_match_inflected_forms() {
        let results = store().search("bankalar icin kredi", 5);
        assert_eq!(results[0].source_id, "sirket_profili (d3)");
    }

    #[test]
    fn unrelated_or_empty_query_returns_nothing() {
        assert!(store().search("xyz qqq", 5).is_empty());
        assert!(store().search("", 5).is_empty());
        assert!(store().search("faiz", 0).is_empty());
    }

    #[test]
    fn top_k_limits_results() {
        let results = store().search("sektorunde faiz buyumesi enflasyon", 2);
        assert_eq!(results.len(), 2);
    }
}
