use repofinder_core::document::Document;
use repofinder_core::fusion::{
    matches_filters, recency_cutoff, FusionWeights, Lemmatizer, SearchContext, SearchFilters,
};
use repofinder_core::licenses::LicenseCategory;
use repofinder_core::store::DocumentStore;
use time::macros::date;
use time::{Duration, OffsetDateTime};

fn doc(url: &str, name: &str, description: &str, readme: &str) -> Document {
    Document {
        url: url.to_owned(),
        name: name.to_owned(),
        organisation: "acme".to_owned(),
        language: Some("Python".to_owned()),
        license: Some("MIT License".to_owned()),
        license_category: LicenseCategory::Mit,
        description: Some(description.to_owned()),
        readme: Some(readme.to_owned()),
        optimised_description: None,
        optimised_readme: None,
        latest_update: Some(date!(2023 - 01 - 01)),
        last_commit: Some(date!(2023 - 01 - 01)),
        is_fork: false,
    }
}

fn carbon_corpus() -> SearchContext {
    let docs = vec![
        doc(
            "https://x/a",
            "CarbonTracker",
            "emissions tracking tool",
            "tracks emissions",
        ),
        doc(
            "https://x/b",
            "WeatherKit",
            "carbon emissions model for weather",
            "a weather model",
        ),
        doc("https://x/c", "Unrelated", "unrelated topic", "nothing here"),
    ];
    let store = DocumentStore::load(docs).unwrap();
    SearchContext::build(store, FusionWeights::default(), None).unwrap()
}

#[test]
fn description_matches_rank_and_exclude_non_matches() {
    let ctx = carbon_corpus();
    let page = ctx
        .search_for_results("carbon", &SearchFilters::default(), 0, 100)
        .unwrap();

    let names: Vec<&str> = page.results.iter().map(|r| r.document.name.as_str()).collect();
    // B matches in description via BM25; A matches "carbon" as a name
    // substring but "carbon" is also absent from its description tokens.
    assert!(names.contains(&"WeatherKit"));
    assert!(names.contains(&"CarbonTracker"));
    assert!(!names.contains(&"Unrelated"));
    assert_eq!(page.total_count, 2);
}

#[test]
fn name_boost_ranks_exact_identifier_match_first() {
    let ctx = carbon_corpus();
    let page = ctx
        .search_for_results("CarbonTracker", &SearchFilters::default(), 0, 100)
        .unwrap();

    assert!(!page.results.is_empty());
    assert_eq!(page.results[0].document.name, "CarbonTracker");
    if page.results.len() > 1 {
        assert!(page.results[0].score > page.results[1].score);
    }
}

#[test]
fn empty_query_returns_whole_corpus_ordered_by_name() {
    let ctx = carbon_corpus();
    let page = ctx
        .search_for_results("", &SearchFilters::default(), 0, 100)
        .unwrap();

    assert_eq!(page.total_count, 3);
    let names: Vec<&str> = page.results.iter().map(|r| r.document.name.as_str()).collect();
    assert_eq!(names, vec!["CarbonTracker", "Unrelated", "WeatherKit"]);
    assert!(page.results.iter().all(|r| (r.score - 1.0).abs() < f64::EPSILON));
}

#[test]
fn document_indexed_without_text_appears_in_empty_query_results() {
    let mut bare = doc("https://x/bare", "BareRepo", "", "");
    bare.description = None;
    bare.readme = None;
    let store = DocumentStore::load(vec![bare, doc("https://x/a", "Aaa", "text", "text")]).unwrap();
    let ctx = SearchContext::build(store, FusionWeights::default(), None).unwrap();

    let page = ctx
        .search_for_results("", &SearchFilters::default(), 0, 100)
        .unwrap();
    assert_eq!(page.total_count, 2);
    assert!(page
        .results
        .iter()
        .any(|r| r.document.name == "BareRepo"));
}

#[test]
fn pagination_is_stable() {
    let docs: Vec<Document> = (0..10)
        .map(|i| {
            doc(
                &format!("https://x/{i}"),
                &format!("repo{i}"),
                "solar energy toolkit",
                "solar readme",
            )
        })
        .collect();
    let store = DocumentStore::load(docs).unwrap();
    let ctx = SearchContext::build(store, FusionWeights::default(), None).unwrap();
    let filters = SearchFilters::default();

    let full = ctx.search_for_results("solar", &filters, 0, 10).unwrap();
    let first = ctx.search_for_results("solar", &filters, 0, 5).unwrap();
    let second = ctx.search_for_results("solar", &filters, 5, 5).unwrap();

    let urls = |page: &repofinder_core::fusion::SearchPage| {
        page.results
            .iter()
            .map(|r| r.document.url.clone())
            .collect::<Vec<_>>()
    };
    let mut paged = urls(&first);
    paged.extend(urls(&second));
    assert_eq!(paged, urls(&full));
    assert_eq!(full.total_count, 10);
}

#[test]
fn language_filter_applies_after_scoring() {
    let mut rust_doc = doc("https://x/r", "RustCarbon", "carbon analysis", "");
    rust_doc.language = Some("Rust".to_owned());
    let store =
        DocumentStore::load(vec![rust_doc, doc("https://x/p", "PyCarbon", "carbon analysis", "")])
            .unwrap();
    let ctx = SearchContext::build(store, FusionWeights::default(), None).unwrap();

    let filters = SearchFilters {
        language: Some("Rust".to_owned()),
        ..Default::default()
    };
    let page = ctx.search_for_results("carbon", &filters, 0, 100).unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.results[0].document.name, "RustCarbon");
}

#[test]
fn filter_value_absent_from_corpus_yields_zero_results() {
    let ctx = carbon_corpus();
    let filters = SearchFilters {
        language: Some("COBOL".to_owned()),
        ..Default::default()
    };
    let page = ctx.search_for_results("carbon", &filters, 0, 100).unwrap();
    assert_eq!(page.total_count, 0);
    assert!(page.results.is_empty());
}

#[test]
fn recency_cutoff_is_computed_once_per_request() {
    let inactive_only = SearchFilters {
        exclude_inactive: true,
        ..Default::default()
    };
    let cutoff = recency_cutoff(&inactive_only).expect("cutoff set when excluding inactive");
    assert!(recency_cutoff(&SearchFilters::default()).is_none());

    let mut stale = doc("https://x/s", "StaleCarbon", "carbon tool", "");
    stale.latest_update = Some(date!(2019 - 01 - 01));
    let mut fresh = doc("https://x/m", "FreshCarbon", "carbon tool", "");
    fresh.latest_update = Some(OffsetDateTime::now_utc().date() - Duration::days(30));

    // The same precomputed cutoff decides every document in the page.
    assert!(!matches_filters(&stale, &inactive_only, Some(cutoff)));
    assert!(matches_filters(&fresh, &inactive_only, Some(cutoff)));
    assert!(matches_filters(&stale, &SearchFilters::default(), None));
}

#[test]
fn license_and_fork_and_recency_filters() {
    let mut apache_fork = doc("https://x/f", "ForkedCarbon", "carbon tool", "");
    apache_fork.is_fork = true;
    apache_fork.license = Some("Apache License 2.0".to_owned());
    apache_fork.license_category = LicenseCategory::Apache;
    let mut stale = doc("https://x/s", "StaleCarbon", "carbon tool", "");
    stale.latest_update = Some(date!(2019 - 01 - 01));
    let mut fresh = doc("https://x/m", "FreshCarbon", "carbon tool", "");
    fresh.latest_update = Some(OffsetDateTime::now_utc().date() - Duration::days(30));

    let store = DocumentStore::load(vec![apache_fork, stale, fresh]).unwrap();
    let ctx = SearchContext::build(store, FusionWeights::default(), None).unwrap();

    let page = ctx
        .search_for_results(
            "carbon",
            &SearchFilters {
                exclude_forks: true,
                exclude_inactive: true,
                ..Default::default()
            },
            0,
            100,
        )
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.results[0].document.name, "FreshCarbon");

    let page = ctx
        .search_for_results(
            "carbon",
            &SearchFilters {
                license_category: Some(LicenseCategory::Apache),
                ..Default::default()
            },
            0,
            100,
        )
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.results[0].document.name, "ForkedCarbon");
}

#[test]
fn short_keywords_earn_no_name_bonus() {
    let store = DocumentStore::load(vec![
        doc("https://x/api", "api", "nothing relevant", ""),
        doc("https://x/other", "other", "nothing relevant", ""),
    ])
    .unwrap();
    let ctx = SearchContext::build(store, FusionWeights::default(), None).unwrap();

    // "api" is only 3 chars: no exact-match bonus, no text match, no results.
    let page = ctx
        .search_for_results("api", &SearchFilters::default(), 0, 100)
        .unwrap();
    assert_eq!(page.total_count, 0);
}

#[test]
fn organisation_substring_earns_bonus() {
    let mut org_doc = doc("https://x/o", "plain", "nothing relevant", "");
    org_doc.organisation = "openclimate".to_owned();
    let store = DocumentStore::load(vec![org_doc, doc("https://x/p", "plain2", "none", "")]).unwrap();
    let ctx = SearchContext::build(store, FusionWeights::default(), None).unwrap();

    let page = ctx
        .search_for_results("openclimate", &SearchFilters::default(), 0, 100)
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.results[0].document.organisation, "openclimate");
}

struct FixedLemmatizer;

impl Lemmatizer for FixedLemmatizer {
    fn reduce_to_lemmas(&self, _text: &str) -> Vec<String> {
        vec!["carbon".to_owned()]
    }
}

#[test]
fn lemmatizer_transforms_the_scoring_query() {
    let docs = vec![
        doc("https://x/a", "Alpha", "carbon emissions model", ""),
        doc("https://x/c", "Unrelated", "unrelated topic", ""),
    ];
    let store = DocumentStore::load(docs).unwrap();
    let ctx =
        SearchContext::build(store, FusionWeights::default(), Some(Box::new(FixedLemmatizer)))
            .unwrap();

    // The raw query matches nothing, but the lemmatizer reduces it to
    // "carbon" for text scoring.
    let page = ctx
        .search_for_results("greenhouse gases", &SearchFilters::default(), 0, 100)
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.results[0].document.name, "Alpha");
}

#[test]
fn results_do_not_expose_readme() {
    let ctx = carbon_corpus();
    let page = ctx
        .search_for_results("carbon", &SearchFilters::default(), 0, 100)
        .unwrap();
    let json = serde_json::to_value(&page.results[0].document).unwrap();
    assert!(json.get("readme").is_none());
    assert!(json.get("url").is_some());
}

#[test]
fn repeated_queries_hit_the_cache_consistently() {
    let ctx = carbon_corpus();
    let filters = SearchFilters::default();
    let first = ctx.search_for_results("carbon", &filters, 0, 100).unwrap();
    let second = ctx.search_for_results("carbon", &filters, 0, 100).unwrap();
    let urls = |page: &repofinder_core::fusion::SearchPage| {
        page.results
            .iter()
            .map(|r| r.document.url.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(urls(&first), urls(&second));
}
