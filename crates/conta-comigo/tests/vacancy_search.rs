use conta_comigo::config::SourceConfig;
use conta_comigo::vacancies::sources::{parse_vacancy_table, StaticFetcher};
use conta_comigo::vacancies::{
    apply, CorrectionTable, Dataset, DatasetLoader, FilterState, OriginStatus, Profession,
};
use std::collections::HashSet;

const VACANCY_URL: &str = "mem://apoiasus/listadevagas.asp";
const REGISTRY_URL: &str = "mem://apoiasus/populacaoBR2.csv";
const COORDINATES_URL: &str = "mem://municipios.csv";

const VACANCY_PAGE: &str = include_str!("fixtures/listadevagas.html");

fn load_fixture_dataset() -> Dataset {
    load_with_vacancy_page(StaticFetcher::default().with_document(VACANCY_URL, VACANCY_PAGE))
}

/// The vacancy page as an ISO-8859-1 server would send it.
fn latin1_vacancy_page() -> Vec<u8> {
    let page = VACANCY_PAGE.replace("charset=\"utf-8\"", "charset=\"iso-8859-1\"");
    let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(&page);
    assert!(!unmappable, "fixture fits in Latin-1");
    bytes.into_owned()
}

fn load_with_vacancy_page(fetcher: StaticFetcher) -> Dataset {
    let fetcher = fetcher
        .with_document(REGISTRY_URL, include_str!("fixtures/populacaoBR2.csv"))
        .with_document(COORDINATES_URL, include_str!("fixtures/municipios.csv"));
    let sources = SourceConfig {
        vacancy_url: VACANCY_URL.to_string(),
        registry_url: REGISTRY_URL.to_string(),
        coordinates_url: COORDINATES_URL.to_string(),
        ..SourceConfig::default()
    };

    DatasetLoader::new(fetcher, sources, CorrectionTable::builtin())
        .load()
        .expect("fixture dataset loads")
}

fn city_names(filter: &FilterState, dataset: &Dataset) -> Vec<String> {
    apply(dataset, filter, 200)
        .rows
        .iter()
        .map(|row| row.listing.city_name_raw.clone())
        .collect()
}

#[test]
fn every_listing_has_id_and_coordinates() {
    let dataset = load_fixture_dataset();

    assert_eq!(dataset.listings().len(), 7);
    for listing in dataset.listings() {
        assert!(!listing.ibge_id.as_str().is_empty());
        assert!(listing.coordinates.latitude.is_finite());
        assert!(listing.coordinates.longitude.is_finite());
    }

    let summary = dataset.summary();
    assert_eq!(summary.vacancy_rows, 9);
    assert_eq!(summary.without_registry_match, 1, "Cidade Inexistente");
    assert_eq!(summary.without_coordinates, 1, "Sena Madureira");
    assert_eq!(summary.corrections_applied, 1, "Embu");
    assert_eq!(summary.lookup_cities, 8);
}

#[test]
fn origin_with_zero_cutoff_keeps_only_itself() {
    let dataset = load_fixture_dataset();
    let filter = FilterState::for_profession(Profession::Medicine)
        .with_origin("Rio Branco", "AC")
        .with_max_distance(0);

    let view = apply(&dataset, &filter, 200);
    assert!(matches!(view.origin, OriginStatus::Resolved(_)));
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].listing.city_name_raw, "Rio Branco");
    assert_eq!(view.rows[0].distance_km, Some(0.0));
}

#[test]
fn origin_without_openings_for_profession_yields_nothing_at_zero() {
    let dataset = load_fixture_dataset();
    let filter = FilterState::for_profession(Profession::Pharmacy)
        .with_origin("Rio Branco", "AC")
        .with_max_distance(0);

    assert!(apply(&dataset, &filter, 200).rows.is_empty());
}

#[test]
fn unset_origin_filters_by_profession_in_source_order() {
    let dataset = load_fixture_dataset();
    let filter = FilterState::for_profession(Profession::Nursing);

    let view = apply(&dataset, &filter, 200);
    assert_eq!(view.origin, OriginStatus::NotSet);
    assert!(view.rows.iter().all(|row| row.distance_km.is_none()));
    assert!(view.distance_bounds.is_none());
    assert_eq!(
        city_names(&filter, &dataset),
        vec![
            "Rio Branco",
            "Cruzeiro do Sul",
            "Porto Velho",
            "Manaus",
            "SÃO PAULO",
            "Embu"
        ]
    );
}

#[test]
fn unknown_origin_behaves_like_unset_origin() {
    let dataset = load_fixture_dataset();
    let unset = FilterState::for_profession(Profession::Nursing);
    let unknown = FilterState::for_profession(Profession::Nursing)
        .with_origin("Nonexistent City", "ZZ")
        .with_max_distance(10);

    let view = apply(&dataset, &unknown, 200);
    assert!(matches!(view.origin, OriginStatus::NotFound { .. }));
    assert!(view.origin.message().is_some());
    assert_eq!(city_names(&unknown, &dataset), city_names(&unset, &dataset));
}

#[test]
fn blank_origin_is_not_an_error() {
    let dataset = load_fixture_dataset();
    let filter = FilterState::for_profession(Profession::Nursing).with_origin("", "AC");

    let view = apply(&dataset, &filter, 200);
    assert_eq!(view.origin, OriginStatus::NotSet);
    assert_eq!(view.rows.len(), 6);
}

#[test]
fn origin_input_is_accent_and_case_insensitive() {
    let dataset = load_fixture_dataset();
    let filter = FilterState::for_profession(Profession::Nursing).with_origin("TARAUACA", " ac ");

    let view = apply(&dataset, &filter, 200);
    let origin = view.origin.city().expect("city without vacancies still resolves");
    assert_eq!(origin.ibge_id.as_str(), "1200609");
    assert_eq!(view.rows[0].listing.city_name_raw, "Cruzeiro do Sul");
}

#[test]
fn rows_are_sorted_by_distance_and_cut_monotonically() {
    let dataset = load_fixture_dataset();
    let mut previous: HashSet<String> = HashSet::new();

    for cutoff in [0, 50, 150, 500, 1_000, 3_000, 5_000] {
        let filter = FilterState::for_profession(Profession::Medicine)
            .with_origin("Rio Branco", "AC")
            .with_max_distance(cutoff);
        let view = apply(&dataset, &filter, 200);

        let distances: Vec<f64> = view
            .rows
            .iter()
            .map(|row| row.distance_km.expect("distance with resolved origin"))
            .collect();
        assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(distances.iter().all(|km| *km >= 0.0 && *km <= f64::from(cutoff)));

        let current: HashSet<String> = view
            .rows
            .iter()
            .map(|row| row.listing.ibge_id.to_string())
            .collect();
        assert!(previous.is_subset(&current), "cutoff {cutoff} lost rows");
        previous = current;
    }

    assert_eq!(previous.len(), 5);
}

#[test]
fn slider_bounds_follow_profession_filtered_distances() {
    let dataset = load_fixture_dataset();
    let filter = FilterState::for_profession(Profession::Medicine).with_origin("Rio Branco", "AC");

    let view = apply(&dataset, &filter, 200);
    let bounds = view.distance_bounds.expect("bounds with resolved origin");
    assert_eq!(bounds.min_km, 0);
    assert!(bounds.max_km > 2_500);
    assert_eq!(view.max_distance_km, Some(200));
    let names: Vec<&str> = view
        .rows
        .iter()
        .map(|row| row.listing.city_name_raw.as_str())
        .collect();
    assert_eq!(names, vec!["Rio Branco", "Xapuri"]);
}

#[test]
fn identical_inputs_give_identical_output() {
    let dataset = load_fixture_dataset();
    let filter = FilterState::for_profession(Profession::Physiotherapy)
        .with_origin("Manaus", "AM")
        .with_max_distance(4_000);

    let first = apply(&dataset, &filter, 200);
    let second = apply(&dataset, &filter, 200);
    assert_eq!(first, second);
    assert!(!first.rows.is_empty());
}

#[test]
fn lossy_latin1_text_loses_the_accented_headers() {
    let decoded_as_utf8 = String::from_utf8_lossy(&latin1_vacancy_page()).into_owned();
    assert!(parse_vacancy_table(&decoded_as_utf8).is_err());
}

#[test]
fn latin1_vacancy_page_loads_like_utf8() {
    let expected = load_fixture_dataset();

    for content_type in [None, Some("text/html"), Some("text/html; charset=ISO-8859-1")] {
        let fetcher = StaticFetcher::default().with_encoded_document(
            VACANCY_URL,
            latin1_vacancy_page(),
            content_type,
        );
        let dataset = load_with_vacancy_page(fetcher);

        assert_eq!(dataset.listings(), expected.listings(), "content type {content_type:?}");
        assert!(dataset
            .listings()
            .iter()
            .any(|listing| listing.city_name_raw == "SÃO PAULO"));
    }
}
