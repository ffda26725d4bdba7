use parking_lot::Mutex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use time::{Date, Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::document::{Document, DocumentSummary};
use crate::engine::{SearchEngine, DEFAULT_BYTES_LIMIT};
use crate::error::SearchError;
use crate::licenses::LicenseCategory;
use crate::normalize::tokenize;
use crate::store::DocumentStore;

const QUERY_CACHE_CAPACITY: usize = 16;
const INACTIVE_WINDOW_DAYS: i64 = 365;

/// Optional NLP collaborator that reduces text to lemmas before scoring.
/// When absent the pipeline falls back to raw normalized tokens.
pub trait Lemmatizer: Send + Sync {
    fn reduce_to_lemmas(&self, text: &str) -> Vec<String>;
}

/// Relative weights of the fused ranking signals. The defaults reproduce the
/// reference weighting (description x10 vs readme, x10 per exact keyword
/// match in name/organisation); they are an empirical heuristic, not a law.
#[derive(Debug, Clone)]
pub struct FusionWeights {
    pub description: f64,
    pub readme: f64,
    pub keyword_bonus: f64,
    /// Query keywords must be strictly longer than this to earn the bonus.
    pub min_keyword_len: usize,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            description: 10.0,
            readme: 1.0,
            keyword_bonus: 10.0,
            min_keyword_len: 3,
        }
    }
}

/// Boolean predicates applied over store fields after scoring.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub language: Option<String>,
    pub license_category: Option<LicenseCategory>,
    pub exclude_forks: bool,
    /// Drop documents not updated within the past year.
    pub exclude_inactive: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredDocument {
    pub document: DocumentSummary,
    /// Ranking signal only; stripped before external exposure.
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct SearchPage {
    pub results: Vec<ScoredDocument>,
    pub total_count: usize,
}

/// Owns the document store and one inverted index per text field, and fuses
/// their signals into a single ordered result list.
///
/// A context is immutable once built; a corpus refresh builds a fresh context
/// off to the side and swaps it in, so readers never observe a half-built
/// index.
pub struct SearchContext {
    store: DocumentStore,
    descriptions: SearchEngine,
    readmes: SearchEngine,
    weights: FusionWeights,
    lemmatizer: Option<Box<dyn Lemmatizer>>,
    cache: QueryCache,
}

impl SearchContext {
    /// Index every document's description and readme (preferring the
    /// optimised variants) under the default memory guard.
    pub fn build(
        store: DocumentStore,
        weights: FusionWeights,
        lemmatizer: Option<Box<dyn Lemmatizer>>,
    ) -> Result<Self, SearchError> {
        let mut descriptions = SearchEngine::new();
        let mut readmes = SearchEngine::new();
        for doc in store.documents()? {
            descriptions.index_document(
                &doc.url,
                doc.search_description(),
                Some(DEFAULT_BYTES_LIMIT),
            );
            readmes.index_document(&doc.url, doc.search_readme(), Some(DEFAULT_BYTES_LIMIT));
        }
        info!(documents = store.n_documents(), "search context built");
        Ok(Self {
            store,
            descriptions,
            readmes,
            weights,
            lemmatizer,
            cache: QueryCache::new(QUERY_CACHE_CAPACITY),
        })
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Execute a query: blank queries return the whole corpus ordered by
    /// name with score 1; otherwise per-field BM25 scores are fused with the
    /// name/organisation keyword bonus, non-positive scores dropped,
    /// duplicates removed, filters applied and the page sliced.
    ///
    /// Page boundaries are stable for a fixed query + filters: ties are
    /// broken by url, and the ranked list is cached per normalized query.
    pub fn search_for_results(
        &self,
        query: &str,
        filters: &SearchFilters,
        offset: usize,
        limit: usize,
    ) -> Result<SearchPage, SearchError> {
        let docs = self.store.documents()?;
        let query = query.trim().to_lowercase();

        let ranked = match self.cache.get(&query) {
            Some(hit) => hit,
            None => {
                let ranked = if query.is_empty() {
                    Arc::new(all_by_name(docs))
                } else {
                    Arc::new(self.rank(&query, docs))
                };
                self.cache.put(query.clone(), Arc::clone(&ranked));
                ranked
            }
        };

        let cutoff = recency_cutoff(filters);
        let filtered: Vec<(usize, f64)> = ranked
            .iter()
            .copied()
            .filter(|(i, _)| matches_filters(&docs[*i], filters, cutoff))
            .collect();
        let total_count = filtered.len();
        let results = filtered
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(i, score)| ScoredDocument {
                document: DocumentSummary::from(&docs[i]),
                score,
            })
            .collect();
        Ok(SearchPage {
            results,
            total_count,
        })
    }

    fn rank(&self, query: &str, docs: &[Document]) -> Vec<(usize, f64)> {
        let scoring_query = match &self.lemmatizer {
            Some(lemmatizer) => lemmatizer.reduce_to_lemmas(query).join(" "),
            None => query.to_owned(),
        };
        debug!(query, scoring_query = %scoring_query, "running query");

        let res_desc = self.descriptions.search(&scoring_query);
        let res_readme = self.readmes.search(&scoring_query);

        // Outer join on url, missing entries contribute 0.
        let mut text_scores: HashMap<&str, f64> = HashMap::new();
        for (url, score) in &res_desc {
            *text_scores.entry(url.as_str()).or_insert(0.0) += score * self.weights.description;
        }
        for (url, score) in &res_readme {
            *text_scores.entry(url.as_str()).or_insert(0.0) += score * self.weights.readme;
        }

        // Exact-identifier matches that BM25 under-weights: raw (unlemmatized)
        // keywords longer than the noise threshold, matched as substrings.
        let keywords: Vec<String> = tokenize(query)
            .into_iter()
            .filter(|kw| kw.len() > self.weights.min_keyword_len)
            .collect();

        let mut scored: Vec<(usize, f64)> = Vec::new();
        for (idx, doc) in docs.iter().enumerate() {
            let text_score = text_scores.get(doc.url.as_str()).copied().unwrap_or(0.0);
            let matches = keyword_matches(&doc.name, &keywords)
                + keyword_matches(&doc.organisation, &keywords);
            let score = text_score + matches as f64 * self.weights.keyword_bonus;
            if score > 0.0 {
                scored.push((idx, score));
            }
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| docs[a.0].url.cmp(&docs[b.0].url))
        });

        // Keep the first (highest-scored) occurrence per url.
        let mut seen: HashSet<&str> = HashSet::with_capacity(scored.len());
        scored.retain(|(i, _)| seen.insert(docs[*i].url.as_str()));
        scored
    }
}

/// Blank-query ordering: every document once, score 1, sorted by name.
fn all_by_name(docs: &[Document]) -> Vec<(usize, f64)> {
    let mut all: Vec<(usize, f64)> = (0..docs.len()).map(|i| (i, 1.0)).collect();
    all.sort_by(|a, b| {
        docs[a.0]
            .name
            .cmp(&docs[b.0].name)
            .then_with(|| docs[a.0].url.cmp(&docs[b.0].url))
    });
    all
}

fn keyword_matches(field: &str, keywords: &[String]) -> usize {
    let field = field.to_lowercase();
    keywords.iter().filter(|kw| field.contains(kw.as_str())).count()
}

/// Recency cutoff for `exclude_inactive`, evaluated once per request rather
/// than once per candidate document.
pub fn recency_cutoff(filters: &SearchFilters) -> Option<Date> {
    filters
        .exclude_inactive
        .then(|| OffsetDateTime::now_utc().date() - Duration::days(INACTIVE_WINDOW_DAYS))
}

pub fn matches_filters(doc: &Document, filters: &SearchFilters, recency_cutoff: Option<Date>) -> bool {
    if let Some(language) = &filters.language {
        if doc.language.as_deref() != Some(language.as_str()) {
            return false;
        }
    }
    if let Some(category) = filters.license_category {
        if doc.license_category != category {
            return false;
        }
    }
    if filters.exclude_forks && doc.is_fork {
        return false;
    }
    if let Some(cutoff) = recency_cutoff {
        if !doc.latest_update.is_some_and(|date| date > cutoff) {
            return false;
        }
    }
    true
}

type RankedList = Arc<Vec<(usize, f64)>>;

/// Bounded per-context cache of ranked lists keyed by normalized query.
/// Replaced wholesale on reload since the whole context is rebuilt.
struct QueryCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, RankedList>,
    order: VecDeque<String>,
}

impl QueryCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn get(&self, key: &str) -> Option<RankedList> {
        let mut inner = self.inner.lock();
        let hit = inner.entries.get(key).cloned()?;
        inner.order.retain(|k| k.as_str() != key);
        inner.order.push_back(key.to_owned());
        Some(hit)
    }

    fn put(&self, key: String, value: RankedList) {
        let mut inner = self.inner.lock();
        if inner.entries.insert(key.clone(), value).is_none() {
            inner.order.push_back(key);
            if inner.order.len() > self.capacity {
                if let Some(evicted) = inner.order.pop_front() {
                    inner.entries.remove(&evicted);
                }
            }
        }
    }
}
