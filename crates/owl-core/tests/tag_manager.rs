mod support;

use owl_core::habitica::{HabiticaApi, HttpMethod};
use owl_core::models::{CoreErrorKind, Credentials, TagId};
use owl_core::workflows::{
    CategorizationTag, TagLookup, ensure_categorization_tag, find_categorization_tag,
};
use support::{BASE_URL, FIXTURE_OWL_TAG_ID, FakeHabitica, TAGS_FIXTURE};

fn api(habitica: &std::sync::Arc<FakeHabitica>) -> HabiticaApi {
    let credentials =
        Credentials::from_parts(Some("user-1".to_string()), Some("token-1".to_string()))
            .unwrap();
    HabiticaApi::new(habitica.clone(), credentials).with_base_url(BASE_URL)
}

#[test]
fn first_exact_match_wins() {
    let habitica = FakeHabitica::new();
    habitica.seed_tags(TAGS_FIXTURE);

    let lookup = find_categorization_tag(&api(&habitica)).unwrap();

    assert_eq!(lookup, TagLookup::Found(TagId(FIXTURE_OWL_TAG_ID.to_string())));
}

#[test]
fn lowercase_name_does_not_count() {
    let habitica = FakeHabitica::new();
    habitica.seed_tags(r#"[{"id": "a", "name": "owl"}, {"id": "b", "name": "Owl "}]"#);

    assert_eq!(find_categorization_tag(&api(&habitica)).unwrap(), TagLookup::Missing);
}

#[test]
fn ensure_creates_then_reuses() {
    let habitica = FakeHabitica::new();
    let api = api(&habitica);

    let created = ensure_categorization_tag(&api).unwrap();
    let reused = ensure_categorization_tag(&api).unwrap();

    assert_eq!(created, reused);
    assert_eq!(habitica.count(HttpMethod::Post, "tags"), 1);
    assert_eq!(habitica.tag_names(), vec!["Owl"]);
}

#[test]
fn memoised_tag_is_fetched_once() {
    let habitica = FakeHabitica::new();
    habitica.seed_tags(TAGS_FIXTURE);
    let api = api(&habitica);
    let mut tag = CategorizationTag::new(&api);

    tag.id().unwrap();
    tag.id().unwrap();

    assert_eq!(habitica.count(HttpMethod::Get, "tags"), 1);
}

#[test]
fn failed_creation_surfaces_api_error() {
    let habitica = FakeHabitica::new();
    habitica.fail(
        HttpMethod::Post,
        "tags",
        400,
        "Bad Request",
        r#"{"success":false,"message":"Tag name too long."}"#,
    );

    let error = ensure_categorization_tag(&api(&habitica)).unwrap_err();

    assert_eq!(error.kind, CoreErrorKind::Api);
    assert_eq!(error.message, "Tag name too long.");
}
