use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::warn;

use crate::normalize::{normalize, tokenize};

/// Default memory guard applied during bulk indexing: postings for a single
/// document are skipped when their estimated size exceeds this many bytes.
pub const DEFAULT_BYTES_LIMIT: usize = 500_000;

const DEFAULT_K1: f64 = 1.5;
const DEFAULT_B: f64 = 0.75;

/// In-memory inverted index with BM25 scoring, one instance per indexed text
/// field. Documents are keyed by their stable url.
#[derive(Debug)]
pub struct SearchEngine {
    /// token -> (url -> term frequency)
    index: HashMap<String, HashMap<String, u32>>,
    /// url -> token count at index time. A url gains an entry here even when
    /// its postings were skipped, so the document stays known to the engine.
    documents_length: HashMap<String, usize>,
    /// Lazily computed average document length, dropped on every mutation.
    avdl: Mutex<Option<f64>>,
    k1: f64,
    b: f64,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_K1, DEFAULT_B)
    }

    pub fn with_params(k1: f64, b: f64) -> Self {
        Self {
            index: HashMap::new(),
            documents_length: HashMap::new(),
            avdl: Mutex::new(None),
            k1,
            b,
        }
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents_length.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents_length.is_empty()
    }

    pub fn indexed_urls(&self) -> impl Iterator<Item = &str> {
        self.documents_length.keys().map(String::as_str)
    }

    /// Index `content` under `url`. Missing content records the document with
    /// length 0 and no postings. When `bytes_limit` is set and the estimated
    /// size of the new term map exceeds it, the postings merge is skipped
    /// (the document still counts towards the corpus) so a single pathological
    /// text cannot blow up index memory. Re-indexing a url overwrites its
    /// per-term counts.
    pub fn index_document(&mut self, url: &str, content: Option<&str>, bytes_limit: Option<usize>) {
        let Some(content) = content else {
            warn!(url, "indexing document without text content");
            self.documents_length.insert(url.to_owned(), 0);
            self.invalidate_avdl();
            return;
        };

        let words = tokenize(content);
        self.documents_length.insert(url.to_owned(), words.len());

        let mut counts: HashMap<String, u32> = HashMap::new();
        for word in words {
            *counts.entry(word).or_insert(0) += 1;
        }

        if let Some(limit) = bytes_limit {
            let estimate = estimated_postings_size(&counts);
            if estimate > limit {
                warn!(
                    url,
                    bytes = estimate,
                    limit,
                    "skipping postings for oversized document"
                );
                self.invalidate_avdl();
                return;
            }
        }

        for (term, count) in counts {
            self.index.entry(term).or_default().insert(url.to_owned(), count);
        }
        self.invalidate_avdl();
    }

    /// Index a batch of (url, content) pairs with the default memory guard.
    pub fn bulk_index<'a, I>(&mut self, documents: I)
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        for (url, content) in documents {
            self.index_document(url, content, Some(DEFAULT_BYTES_LIMIT));
        }
    }

    /// Postings for a term: url -> term frequency. Unknown terms yield an
    /// empty map, never an error.
    pub fn get_urls(&self, keyword: &str) -> HashMap<String, u32> {
        self.postings(&normalize(keyword)).cloned().unwrap_or_default()
    }

    fn postings(&self, term: &str) -> Option<&HashMap<String, u32>> {
        self.index.get(term)
    }

    /// Inverse document frequency: `ln((N - n_t + 0.5) / (n_t + 0.5) + 1)`.
    ///
    /// The `+ 1` smoothing keeps the value positive even for terms occurring
    /// in every document; callers must still not assume non-negative scores.
    pub fn idf(&self, term: &str) -> f64 {
        let term = normalize(term);
        let n = self.documents_length.len() as f64;
        let n_term = self.postings(&term).map_or(0, HashMap::len) as f64;
        ((n - n_term + 0.5) / (n_term + 0.5) + 1.0).ln()
    }

    /// BM25 score of `term` for every document containing it. Empty map for
    /// unknown terms or an empty index.
    pub fn bm25(&self, term: &str) -> HashMap<String, f64> {
        let term = normalize(term);
        let Some(postings) = self.postings(&term) else {
            return HashMap::new();
        };
        if postings.is_empty() {
            return HashMap::new();
        }

        let idf = self.idf(&term);
        let avdl = self.avdl();
        let mut result = HashMap::with_capacity(postings.len());
        for (url, freq) in postings {
            let freq = f64::from(*freq);
            let doclen = self.documents_length.get(url).copied().unwrap_or(0) as f64;
            let numerator = freq * (self.k1 + 1.0);
            let denominator = freq + self.k1 * (1.0 - self.b + self.b * doclen / avdl);
            result.insert(url.clone(), idf * numerator / denominator);
        }
        result
    }

    /// Score a free-text query: per-term BM25 maps summed per url. Terms
    /// absent from the index contribute nothing.
    pub fn search(&self, query: &str) -> HashMap<String, f64> {
        let mut url_scores: HashMap<String, f64> = HashMap::new();
        for keyword in tokenize(query) {
            for (url, score) in self.bm25(&keyword) {
                *url_scores.entry(url).or_insert(0.0) += score;
            }
        }
        url_scores
    }

    /// Average document length, recomputed after invalidation. Only reached
    /// from `bm25` when postings exist, hence with at least one document.
    fn avdl(&self) -> f64 {
        let mut cache = self.avdl.lock();
        if let Some(value) = *cache {
            return value;
        }
        let count = self.documents_length.len();
        let value = self.documents_length.values().sum::<usize>() as f64 / count as f64;
        *cache = Some(value);
        value
    }

    fn invalidate_avdl(&mut self) {
        *self.avdl.get_mut() = None;
    }
}

/// Explicit size estimate for a new term map: term bytes plus a fixed
/// per-entry overhead, computed before any merge happens.
fn estimated_postings_size(counts: &HashMap<String, u32>) -> usize {
    let entry_overhead = std::mem::size_of::<u32>() + std::mem::size_of::<usize>();
    counts.keys().map(|term| term.len() + entry_overhead).sum()
}
