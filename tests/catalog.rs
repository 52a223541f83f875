use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use taxon_enricher::catalog::Catalog;
use taxon_enricher::domain::Language;
use taxon_enricher::error::EnrichError;

const CATALOG: &str = r#"{
  "generated": "2024-03-01",
  "species": [
    {
      "species_id": "turdus_merula",
      "scientific_name": "  Turdus merula ",
      "common_name": { "es": "Mirlo común" },
      "assets": {
        "image_cover": "assets/aves/turdus_merula/cover.jpg",
        "gallery": ["a.jpg"]
      },
      "description": { "es": "   " },
      "sources": {
        "attribution": [
          { "type": "image", "source": "Wikimedia Commons", "url": "https://commons.wikimedia.org/a.jpg" }
        ],
        "license": "CC BY-SA"
      }
    },
    { "scientific_name": "Erithacus rubecula" }
  ]
}"#;

#[test]
fn round_trip_keeps_unknown_fields() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("db.json")).unwrap();

    let catalog = Catalog::parse(CATALOG).unwrap();
    catalog.persist(&path).unwrap();
    let reloaded = Catalog::load(&path).unwrap();

    let json = serde_json::to_value(&reloaded).unwrap();
    assert_eq!(json["generated"], "2024-03-01");
    assert_eq!(json["species"][0]["common_name"]["es"], "Mirlo común");
    assert_eq!(json["species"][0]["assets"]["gallery"][0], "a.jpg");
    assert_eq!(json["species"][0]["sources"]["license"], "CC BY-SA");
    assert_eq!(json["species"][0]["sources"]["attribution"][0]["type"], "image");
    assert!(json["species"][1].get("assets").is_none());

    let written = std::fs::read_to_string(path.as_std_path()).unwrap();
    assert!(written.ends_with("}\n"));
}

#[test]
fn labels_ids_and_descriptions() {
    let mut catalog = Catalog::parse(CATALOG).unwrap();
    let es: Language = "es".parse().unwrap();

    let blackbird = &mut catalog.species[0];
    assert_eq!(blackbird.label(), "Turdus merula");
    assert_eq!(blackbird.resolved_id(), "turdus_merula");
    assert_eq!(blackbird.description_for(&es), None);
    assert!(!blackbird.set_description(&es, "  "));
    assert!(blackbird.set_description(&es, " El mirlo común. "));
    assert_eq!(blackbird.description_for(&es), Some("El mirlo común."));

    assert_eq!(catalog.species[1].resolved_id(), "erithacus_rubecula");
}

#[test]
fn malformed_catalog_is_a_parse_error() {
    assert_matches!(
        Catalog::parse(r#"{ "species": [ "Turdus merula" ] }"#),
        Err(EnrichError::CatalogParse(_))
    );
    assert_matches!(
        Catalog::parse(r#"{ "species": { "turdus_merula": {} } }"#),
        Err(EnrichError::CatalogParse(_))
    );
    assert_matches!(
        Catalog::parse(r#"[ { "scientific_name": "Turdus merula" } ]"#),
        Err(EnrichError::CatalogParse(_))
    );
    assert_matches!(
        Catalog::load(camino::Utf8Path::new("/nonexistent/offline_db.json")),
        Err(EnrichError::CatalogRead(_))
    );
}

#[test]
fn null_fields_read_as_absent() {
    let catalog = Catalog::parse(
        r#"{
  "version": null,
  "species": [
    {
      "species_id": null,
      "scientific_name": null,
      "assets": { "image_cover": null, "spectrograms": null },
      "description": { "es": null, "en": "The common blackbird." },
      "sources": { "attribution": null }
    }
  ]
}"#,
    )
    .unwrap();
    let es: Language = "es".parse().unwrap();
    let en: Language = "en".parse().unwrap();

    assert!(catalog.get("version").is_none());
    let record = &catalog.species[0];
    assert_eq!(record.label(), "");
    assert_eq!(record.resolved_id(), "");
    assert_eq!(record.image_cover(), None);
    assert_eq!(record.first_spectrogram(), None);
    assert_eq!(record.description_for(&es), None);
    assert_eq!(record.description_for(&en), Some("The common blackbird."));
    assert!(record.attributions().is_empty());

    assert_matches!(Catalog::parse(r#"{ "species": null }"#), Ok(empty) if empty.species.is_empty());
}

#[test]
fn round_trip_keeps_key_order() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("db.json")).unwrap();
    let source = r#"{
  "version": 3,
  "species": [
    {
      "common_name": "Mirlo común",
      "species_id": "turdus_merula",
      "description": { "es": "uno", "en": "two" },
      "scientific_name": "Turdus merula"
    }
  ],
  "generated": "2024-03-01"
}"#;

    let mut catalog = Catalog::parse(source).unwrap();
    let es: Language = "es".parse().unwrap();
    let pt: Language = "pt".parse().unwrap();
    assert!(catalog.species[0].set_description(&es, "Uno."));
    assert!(catalog.species[0].set_description(&pt, "Melro."));
    catalog.persist(&path).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path.as_std_path()).unwrap()).unwrap();
    let keys = |value: &serde_json::Value| -> Vec<String> {
        value.as_object().unwrap().keys().cloned().collect()
    };
    assert_eq!(keys(&written), ["version", "species", "generated"]);
    let record = &written["species"][0];
    assert_eq!(
        keys(record),
        ["common_name", "species_id", "description", "scientific_name"]
    );
    assert_eq!(keys(&record["description"]), ["es", "en", "pt"]);
    assert_eq!(record["description"]["es"], "Uno.");
}
