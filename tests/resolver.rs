use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use taxon_enricher::domain::{Language, Provider, TaxonKey};
use taxon_enricher::error::EnrichError;
use taxon_enricher::providers::commons::CommonsClient;
use taxon_enricher::providers::gbif::{GbifClient, OccurrenceRecord};
use taxon_enricher::providers::wikipedia::{PageSummary, WikipediaClient};
use taxon_enricher::providers::xeno_canto::XenoCantoClient;
use taxon_enricher::providers::{Lookup, Miss};
use taxon_enricher::resolver::Resolver;

#[derive(Default)]
struct MockCommons {
    url: Option<String>,
    fail: bool,
    queries: Arc<Mutex<Vec<String>>>,
}

impl CommonsClient for MockCommons {
    fn first_bitmap(&self, name: &str) -> Lookup<String> {
        self.queries.lock().unwrap().push(name.to_string());
        if self.fail {
            return Err(Miss::Provider(EnrichError::CommonsStatus {
                status: 503,
                message: "unavailable".to_string(),
            }));
        }
        self.url.clone().ok_or(Miss::NoMatch)
    }
}

#[derive(Default)]
struct MockGbif {
    key: Option<u64>,
    image: Option<String>,
    image_calls: Mutex<usize>,
}

impl GbifClient for MockGbif {
    fn species_key(&self, _name: &str) -> Lookup<TaxonKey> {
        self.key.map(TaxonKey).ok_or(Miss::NoMatch)
    }

    fn occurrence_image(&self, _key: TaxonKey) -> Lookup<String> {
        *self.image_calls.lock().unwrap() += 1;
        self.image.clone().ok_or(Miss::NoMatch)
    }

    fn occurrence_page(
        &self,
        _key: TaxonKey,
        _offset: usize,
        _limit: usize,
    ) -> Lookup<Vec<OccurrenceRecord>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct MockXenoCanto {
    names: Arc<Mutex<Vec<String>>>,
}

impl XenoCantoClient for MockXenoCanto {
    fn sonogram_url(&self, name: &str) -> Lookup<String> {
        self.names.lock().unwrap().push(name.to_string());
        Err(Miss::Provider(EnrichError::XenoCantoHttp(
            "connection reset".to_string(),
        )))
    }
}

/// Pages keyed by `(lang, title)`; searches keyed by `(lang, query)`.
#[derive(Default)]
struct MockWikipedia {
    pages: HashMap<(String, String), String>,
    searches: HashMap<(String, String), String>,
    search_calls: Arc<Mutex<Vec<String>>>,
}

impl MockWikipedia {
    fn with_page(mut self, lang: &str, title: &str, text: &str) -> Self {
        self.pages
            .insert((lang.to_string(), title.to_string()), text.to_string());
        self
    }

    fn with_search(mut self, lang: &str, query: &str, title: &str) -> Self {
        self.searches
            .insert((lang.to_string(), query.to_string()), title.to_string());
        self
    }
}

impl WikipediaClient for MockWikipedia {
    fn summary(&self, lang: &Language, title: &str) -> Lookup<PageSummary> {
        let text = self
            .pages
            .get(&(lang.to_string(), title.to_string()))
            .ok_or(Miss::NoMatch)?;
        Ok(PageSummary {
            title: title.to_string(),
            text: text.clone(),
            page_url: format!("https://{lang}.wikipedia.org/wiki/{}", title.replace(' ', "_")),
        })
    }

    fn search_title(&self, lang: &Language, query: &str) -> Lookup<String> {
        self.search_calls.lock().unwrap().push(query.to_string());
        self.searches
            .get(&(lang.to_string(), query.to_string()))
            .cloned()
            .ok_or(Miss::NoMatch)
    }
}

fn lang(code: &str) -> Language {
    code.parse().unwrap()
}

#[test]
fn description_falls_back_to_search_once() {
    let wikipedia = MockWikipedia::default()
        .with_search("es", "Turdus merula", "Mirlo común")
        .with_page("es", "Mirlo común", "El mirlo común es un ave paseriforme.");
    let searches = Arc::clone(&wikipedia.search_calls);
    let resolver = Resolver::new(
        MockCommons::default(),
        MockGbif::default(),
        MockXenoCanto::default(),
        wikipedia,
    );

    let summary = resolver
        .resolve_description("Turdus_merula (common blackbird)", &lang("es"))
        .unwrap();
    assert_eq!(summary.title, "Mirlo común");
    assert_eq!(summary.text, "El mirlo común es un ave paseriforme.");

    assert_eq!(*searches.lock().unwrap(), vec!["Turdus merula".to_string()]);
}

#[test]
fn exact_title_wins_without_search() {
    let wikipedia = MockWikipedia::default().with_page(
        "en",
        "Turdus merula",
        "The common blackbird is a species of true thrush.",
    );
    let searches = Arc::clone(&wikipedia.search_calls);
    let resolver = Resolver::new(
        MockCommons::default(),
        MockGbif::default(),
        MockXenoCanto::default(),
        wikipedia,
    );

    let summary = resolver
        .resolve_description("Turdus merula", &lang("en"))
        .unwrap();
    assert_eq!(summary.page_url, "https://en.wikipedia.org/wiki/Turdus_merula");
    assert!(searches.lock().unwrap().is_empty());
}

#[test]
fn description_misses_when_nothing_matches() {
    let resolver = Resolver::new(
        MockCommons::default(),
        MockGbif::default(),
        MockXenoCanto::default(),
        MockWikipedia::default(),
    );
    assert!(
        resolver
            .resolve_description("Turdus merula", &lang("es"))
            .is_none()
    );
}

#[test]
fn image_falls_back_to_occurrence_media() {
    let resolver = Resolver::new(
        MockCommons::default(),
        MockGbif {
            key: Some(2490719),
            image: Some(
                "https://inaturalist-open-data.s3.amazonaws.com/photos/1/original.jpg".to_string(),
            ),
            ..Default::default()
        },
        MockXenoCanto::default(),
        MockWikipedia::default(),
    );

    let asset = resolver.resolve_image("Turdus_merula").unwrap();
    assert_eq!(asset.provider, Provider::Gbif);
    assert!(asset.value.ends_with("original.jpg"));
}

#[test]
fn commons_hit_skips_occurrence_lookup() {
    let gbif = MockGbif {
        key: Some(2490719),
        image: Some("https://example.org/occurrence.jpg".to_string()),
        ..Default::default()
    };
    let commons = MockCommons {
        url: Some("https://upload.wikimedia.org/a/Turdus_merula.jpg".to_string()),
        ..Default::default()
    };
    let queries = Arc::clone(&commons.queries);
    let resolver = Resolver::new(
        commons,
        gbif,
        MockXenoCanto::default(),
        MockWikipedia::default(),
    );

    let asset = resolver.resolve_image("Turdus merula (Linnaeus, 1758)").unwrap();
    assert_eq!(asset.provider, Provider::WikimediaCommons);
    assert_eq!(*queries.lock().unwrap(), vec!["Turdus merula".to_string()]);
    assert_eq!(*resolver.gbif().image_calls.lock().unwrap(), 0);
}

#[test]
fn provider_failures_are_not_fatal() {
    let xeno_canto = MockXenoCanto::default();
    let names = Arc::clone(&xeno_canto.names);
    let resolver = Resolver::new(
        MockCommons {
            fail: true,
            ..Default::default()
        },
        MockGbif {
            key: Some(2490719),
            image: Some("https://example.org/occurrence.png".to_string()),
            ..Default::default()
        },
        xeno_canto,
        MockWikipedia::default(),
    );

    let asset = resolver.resolve_image("Turdus merula").unwrap();
    assert_eq!(asset.provider, Provider::Gbif);
    assert!(resolver.resolve_spectrogram("  Turdus merula ").is_none());
    assert_eq!(*names.lock().unwrap(), vec!["Turdus merula".to_string()]);
    assert_eq!(resolver.resolve_taxon_key("Turdus merula"), Some(TaxonKey(2490719)));
}
