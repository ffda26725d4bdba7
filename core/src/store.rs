use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::document::Document;
use crate::error::SearchError;
use crate::licenses::LicenseCategory;

/// The materialized in-memory corpus: one [`Document`] per repository,
/// unique by url, with composable refinement operations over the view.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
    loaded: bool,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and materialize a corpus. Every record must carry a non-empty
    /// url and urls must be unique; a missing `license_category` is derived
    /// from the license name. Fails before any state is published.
    pub fn load(mut documents: Vec<Document>) -> Result<Self, SearchError> {
        let mut seen: HashSet<String> = HashSet::with_capacity(documents.len());
        for doc in &mut documents {
            if doc.url.is_empty() {
                return Err(SearchError::Validation(format!(
                    "document '{}' has an empty url",
                    doc.name
                )));
            }
            if !seen.insert(doc.url.clone()) {
                return Err(SearchError::Validation(format!(
                    "duplicate document url: {}",
                    doc.url
                )));
            }
            if doc.license_category == LicenseCategory::Unknown && doc.license.is_some() {
                doc.license_category = LicenseCategory::from_license_name(doc.license.as_deref());
            }
        }
        info!(documents = documents.len(), "corpus loaded");
        Ok(Self {
            documents,
            loaded: true,
        })
    }

    pub fn documents(&self) -> Result<&[Document], SearchError> {
        if !self.loaded {
            return Err(SearchError::NotLoaded);
        }
        Ok(&self.documents)
    }

    pub fn n_documents(&self) -> usize {
        self.documents.len()
    }

    /// Narrow the view to documents in any of the given languages.
    pub fn refine_by_languages(&mut self, languages: &[String]) {
        self.documents.retain(|d| {
            d.language
                .as_deref()
                .is_some_and(|l| languages.iter().any(|wanted| wanted.as_str() == l))
        });
    }

    pub fn refine_by_license_category(&mut self, category: LicenseCategory) {
        self.documents.retain(|d| d.license_category == category);
    }

    /// Keep documents updated within `window` of now.
    pub fn refine_by_active_since(&mut self, window: Duration) {
        let cutoff = OffsetDateTime::now_utc().date() - window;
        self.documents
            .retain(|d| d.latest_update.is_some_and(|date| date > cutoff));
    }

    pub fn exclude_forks(&mut self) {
        self.documents.retain(|d| !d.is_fork);
    }

    /// Keep documents whose description or readme contains `keyword`
    /// (case-insensitive substring).
    pub fn refine_by_keyword(&mut self, keyword: &str) {
        let keyword = keyword.to_lowercase();
        self.documents.retain(|d| {
            let in_field = |field: Option<&str>| {
                field.is_some_and(|text| text.to_lowercase().contains(&keyword))
            };
            in_field(d.description.as_deref()) || in_field(d.readme.as_deref())
        });
    }

    /// Facet summary for UI population: unique counts and value-count
    /// breakdowns over language, license and organisation.
    pub fn statistics(&self) -> Result<CorpusStatistics, SearchError> {
        if !self.loaded {
            return Err(SearchError::NotLoaded);
        }
        let mut languages: BTreeMap<String, usize> = BTreeMap::new();
        let mut licenses: BTreeMap<String, usize> = BTreeMap::new();
        let mut organisations: BTreeMap<String, usize> = BTreeMap::new();
        let mut forks = 0usize;
        for doc in &self.documents {
            let language = doc.language.clone().unwrap_or_else(|| "(unknown)".into());
            let license = doc.license.clone().unwrap_or_else(|| "(unknown)".into());
            *languages.entry(language).or_insert(0) += 1;
            *licenses.entry(license).or_insert(0) += 1;
            *organisations.entry(doc.organisation.clone()).or_insert(0) += 1;
            if doc.is_fork {
                forks += 1;
            }
        }
        Ok(CorpusStatistics {
            repositories: self.documents.len(),
            n_languages: languages.len(),
            n_licenses: licenses.len(),
            n_organisations: organisations.len(),
            forks,
            languages,
            licenses,
            organisations,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CorpusStatistics {
    pub repositories: usize,
    pub n_languages: usize,
    pub n_licenses: usize,
    pub n_organisations: usize,
    pub forks: usize,
    pub languages: BTreeMap<String, usize>,
    pub licenses: BTreeMap<String, usize>,
    pub organisations: BTreeMap<String, usize>,
}
