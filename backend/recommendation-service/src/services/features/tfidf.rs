//! Term-frequency / inverse-document-frequency vectorizer
//!
//! Tokens are lowercase runs of at least two word characters with English
//! stop words removed. The vocabulary keeps the `max_features` terms with the
//! highest corpus count (ties by term) and is laid out alphabetically. Each
//! row is `count * idf` scaled to unit L2 norm, with the smoothed
//! `idf = ln((1 + n) / (1 + df)) + 1`.

use ndarray::Array2;
use std::collections::{BTreeMap, HashMap};

use super::stopwords::is_stop_word;

pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .filter(|token| !is_stop_word(token))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: usize,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.vocabulary.keys().map(String::as_str)
    }

    /// Fit vocabulary and idf weights, returning the document-term matrix
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Array2<f64> {
        let tokenized: Vec<Vec<String>> =
            documents.iter().map(|d| tokenize(d.as_ref())).collect();

        let mut corpus_counts: HashMap<&str, usize> = HashMap::new();
        let mut document_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let mut seen: Vec<&str> = Vec::new();
            for token in tokens {
                *corpus_counts.entry(token.as_str()).or_insert(0) += 1;
                if !seen.contains(&token.as_str()) {
                    seen.push(token.as_str());
                }
            }
            for token in seen {
                *document_freq.entry(token).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.max_features);

        let mut terms: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort_unstable();

        let n_docs = documents.len() as f64;
        self.idf = terms
            .iter()
            .map(|term| {
                let df = document_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.vocabulary = terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.to_string(), i))
            .collect();

        let mut matrix = Array2::<f64>::zeros((documents.len(), self.vocabulary.len()));
        for (row, tokens) in tokenized.iter().enumerate() {
            for token in tokens {
                if let Some(&col) = self.vocabulary.get(token) {
                    matrix[[row, col]] += 1.0;
                }
            }
            let mut norm = 0.0;
            for col in 0..self.idf.len() {
                let value = matrix[[row, col]] * self.idf[col];
                matrix[[row, col]] = value;
                norm += value * value;
            }
            if norm > 0.0 {
                let norm = norm.sqrt();
                matrix.row_mut(row).mapv_inplace(|v| v / norm);
            }
        }

        matrix
    }
}
