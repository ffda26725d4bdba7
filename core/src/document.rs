use serde::{Deserialize, Serialize};
use time::Date;

use crate::licenses::LicenseCategory;

/// One repository's searchable record, keyed by its canonical url.
///
/// Created in bulk at corpus load and immutable during a serving session;
/// a refresh replaces the whole corpus rather than mutating records in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub organisation: String,
    pub language: Option<String>,
    pub license: Option<String>,
    #[serde(default)]
    pub license_category: LicenseCategory,
    pub description: Option<String>,
    pub readme: Option<String>,
    /// Pre-lemmatized variants produced by the external NLP collaborator.
    #[serde(default)]
    pub optimised_description: Option<String>,
    #[serde(default)]
    pub optimised_readme: Option<String>,
    pub latest_update: Option<Date>,
    pub last_commit: Option<Date>,
    #[serde(default)]
    pub is_fork: bool,
}

impl Document {
    /// Description text to index: the optimised variant when present.
    pub fn search_description(&self) -> Option<&str> {
        self.optimised_description
            .as_deref()
            .or(self.description.as_deref())
    }

    /// Readme text to index: the optimised variant when present.
    pub fn search_readme(&self) -> Option<&str> {
        self.optimised_readme.as_deref().or(self.readme.as_deref())
    }
}

/// External projection of a [`Document`]: readme text stripped, absent
/// metadata degraded to `"(unknown)"` rather than nulls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub url: String,
    pub name: String,
    pub organisation: String,
    pub language: String,
    pub license: String,
    pub license_category: LicenseCategory,
    pub description: String,
    pub latest_update: String,
    pub last_commit: String,
    pub is_fork: bool,
}

fn unknown_if_none<T: ToString>(value: Option<&T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "(unknown)".to_owned(),
    }
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        DocumentSummary {
            url: doc.url.clone(),
            name: doc.name.clone(),
            organisation: doc.organisation.clone(),
            language: unknown_if_none(doc.language.as_ref()),
            license: unknown_if_none(doc.license.as_ref()),
            license_category: doc.license_category,
            description: doc.description.clone().unwrap_or_default(),
            latest_update: unknown_if_none(doc.latest_update.as_ref()),
            last_commit: unknown_if_none(doc.last_commit.as_ref()),
            is_fork: doc.is_fork,
        }
    }
}
