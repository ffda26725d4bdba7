use repofinder_core::document::Document;
use repofinder_core::error::SearchError;
use repofinder_core::licenses::LicenseCategory;
use repofinder_core::store::DocumentStore;
use time::macros::date;
use time::{Duration, OffsetDateTime};

fn doc(url: &str, name: &str) -> Document {
    Document {
        url: url.to_owned(),
        name: name.to_owned(),
        organisation: "acme".to_owned(),
        language: Some("Python".to_owned()),
        license: Some("MIT License".to_owned()),
        license_category: LicenseCategory::Unknown,
        description: Some("a tool".to_owned()),
        readme: Some("readme text".to_owned()),
        optimised_description: None,
        optimised_readme: None,
        latest_update: Some(date!(2020 - 06 - 01)),
        last_commit: Some(date!(2020 - 06 - 01)),
        is_fork: false,
    }
}

#[test]
fn load_rejects_empty_urls() {
    let err = DocumentStore::load(vec![doc("", "broken")]).unwrap_err();
    assert!(matches!(err, SearchError::Validation(_)));
}

#[test]
fn load_rejects_duplicate_urls() {
    let docs = vec![doc("https://x/a", "a"), doc("https://x/a", "b")];
    let err = DocumentStore::load(docs).unwrap_err();
    assert!(matches!(err, SearchError::Validation(_)));
}

#[test]
fn load_derives_license_category() {
    let store = DocumentStore::load(vec![doc("https://x/a", "a")]).unwrap();
    assert_eq!(
        store.documents().unwrap()[0].license_category,
        LicenseCategory::Mit
    );
}

#[test]
fn unloaded_store_reports_not_loaded() {
    let store = DocumentStore::new();
    assert!(matches!(store.documents(), Err(SearchError::NotLoaded)));
    assert!(matches!(store.statistics(), Err(SearchError::NotLoaded)));
}

#[test]
fn refine_by_languages_narrows_the_view() {
    let mut rust_doc = doc("https://x/r", "r");
    rust_doc.language = Some("Rust".to_owned());
    let mut store =
        DocumentStore::load(vec![doc("https://x/a", "a"), rust_doc]).unwrap();
    store.refine_by_languages(&["Rust".to_owned()]);
    assert_eq!(store.n_documents(), 1);
    assert_eq!(store.documents().unwrap()[0].url, "https://x/r");
}

#[test]
fn exclude_forks_drops_forks() {
    let mut fork = doc("https://x/f", "f");
    fork.is_fork = true;
    let mut store = DocumentStore::load(vec![doc("https://x/a", "a"), fork]).unwrap();
    store.exclude_forks();
    assert_eq!(store.n_documents(), 1);
}

#[test]
fn refine_by_active_since_uses_latest_update() {
    let mut fresh = doc("https://x/fresh", "fresh");
    fresh.latest_update = Some(OffsetDateTime::now_utc().date() - Duration::days(10));
    let stale = doc("https://x/stale", "stale"); // updated in 2020
    let mut none = doc("https://x/none", "none");
    none.latest_update = None;

    let mut store = DocumentStore::load(vec![fresh, stale, none]).unwrap();
    store.refine_by_active_since(Duration::days(365));
    assert_eq!(store.n_documents(), 1);
    assert_eq!(store.documents().unwrap()[0].url, "https://x/fresh");
}

#[test]
fn refine_by_license_category_narrows_the_view() {
    let mut gpl = doc("https://x/g", "g");
    gpl.license = Some("GNU General Public License v3.0".to_owned());
    let mut store = DocumentStore::load(vec![doc("https://x/a", "a"), gpl]).unwrap();
    store.refine_by_license_category(LicenseCategory::GnuGpl);
    assert_eq!(store.n_documents(), 1);
    assert_eq!(store.documents().unwrap()[0].url, "https://x/g");
}

#[test]
fn refine_by_keyword_matches_description_and_readme() {
    let mut in_readme = doc("https://x/r", "r");
    in_readme.readme = Some("Deep CARBON accounting".to_owned());
    let mut store =
        DocumentStore::load(vec![doc("https://x/a", "a"), in_readme]).unwrap();
    store.refine_by_keyword("carbon");
    assert_eq!(store.n_documents(), 1);
    assert_eq!(store.documents().unwrap()[0].url, "https://x/r");
}

#[test]
fn statistics_counts_facets() {
    let mut b = doc("https://x/b", "b");
    b.language = Some("Rust".to_owned());
    b.license = None;
    b.is_fork = true;
    let store = DocumentStore::load(vec![doc("https://x/a", "a"), b]).unwrap();

    let stats = store.statistics().unwrap();
    assert_eq!(stats.repositories, 2);
    assert_eq!(stats.n_languages, 2);
    assert_eq!(stats.n_organisations, 1);
    assert_eq!(stats.forks, 1);
    assert_eq!(stats.licenses["(unknown)"], 1);
    assert_eq!(stats.languages["Python"], 1);
}
