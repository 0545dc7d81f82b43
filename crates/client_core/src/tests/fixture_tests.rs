use super::*;
use shared::protocol::ImageFile;
use tokio::time::Instant;

fn upload(title: &str, tags: &[&str]) -> ImageUpload {
    ImageUpload {
        title: title.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        image: ImageFile {
            filename: "photo.jpg".into(),
            mime_type: Some("image/jpeg".into()),
            bytes: vec![0xff, 0xd8, 0xff],
        },
    }
}

#[tokio::test(start_paused = true)]
async fn list_returns_seeded_records_after_simulated_latency() {
    let store = FixtureStore::seeded(FixtureLatency::default());
    let started = Instant::now();

    let records = store.list(None).await.expect("list");

    assert!(started.elapsed() >= DEFAULT_LIST_LATENCY);
    let ids: Vec<&str> = records.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn list_filters_by_tag() {
    let store = FixtureStore::seeded(FixtureLatency::none());

    let nature = store.list(Some("nature")).await.expect("list");
    let titles: Vec<&str> = nature.iter().map(|record| record.title.as_str()).collect();
    assert_eq!(titles, vec!["Mountain Landscape", "Forest Path"]);

    assert!(store.list(Some("nat")).await.expect("list").is_empty());
    assert!(store.list(Some("missing")).await.expect("list").is_empty());
}

#[tokio::test]
async fn create_assigns_identity_and_placeholder_url() {
    let store = FixtureStore::seeded(FixtureLatency::none());

    let record = store
        .create(upload("Sunset", &["beach", "sunset"]))
        .await
        .expect("create");

    assert!(!record.id.as_str().is_empty());
    assert_eq!(record.title, "Sunset");
    assert_eq!(record.tags, vec!["beach", "sunset"]);
    assert_eq!(
        record.image_url,
        "https://source.unsplash.com/random/800x600?beach,sunset"
    );

    let listed = store.list(None).await.expect("list");
    assert_eq!(listed.len(), 5);
    assert_eq!(listed[0], record);
}

#[tokio::test]
async fn create_generates_distinct_identifiers() {
    let store = FixtureStore::new(Vec::new(), FixtureLatency::none());
    let first = store.create(upload("a", &[])).await.expect("create");
    let second = store.create(upload("b", &[])).await.expect("create");
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn create_keeps_title_as_submitted() {
    let store = FixtureStore::new(Vec::new(), FixtureLatency::none());

    let record = store
        .create(upload("  Sunset ", &[]))
        .await
        .expect("create");

    assert_eq!(record.title, "  Sunset ");
}

#[tokio::test]
async fn create_rejects_blank_title() {
    let store = FixtureStore::seeded(FixtureLatency::none());

    let err = store
        .create(upload("   ", &["x"]))
        .await
        .expect_err("must reject");

    assert!(matches!(err, StoreError::Rejected(_)));
    assert_eq!(store.list(None).await.expect("list").len(), 4);
}

#[tokio::test]
async fn delete_removes_only_the_matching_record() {
    let store = FixtureStore::seeded(FixtureLatency::none());

    store.delete(&ImageId::new("1")).await.expect("delete");

    let ids: Vec<String> = store
        .list(None)
        .await
        .expect("list")
        .into_iter()
        .map(|record| record.id.0)
        .collect();
    assert_eq!(ids, vec!["2", "3", "4"]);
}

#[tokio::test]
async fn delete_of_unknown_identifier_is_a_no_op() {
    let store = FixtureStore::seeded(FixtureLatency::none());

    store.delete(&ImageId::new("nope")).await.expect("delete");

    assert_eq!(store.list(None).await.expect("list").len(), 4);
}

#[tokio::test]
async fn armed_faults_fail_only_their_operation() {
    let store = FixtureStore::seeded(FixtureLatency::none());
    store
        .set_faults(FixtureFaults::failing([StoreOperation::Delete]))
        .await;

    let err = store
        .delete(&ImageId::new("1"))
        .await
        .expect_err("delete must fail");
    assert!(matches!(err, StoreError::Unavailable(_)));
    assert_eq!(store.list(None).await.expect("list").len(), 4);

    store.set_faults(FixtureFaults::default()).await;
    store.delete(&ImageId::new("1")).await.expect("delete");
}

#[test]
fn latency_override_is_uniform() {
    assert_eq!(FixtureLatency::from_override(None), FixtureLatency::default());
    assert_eq!(
        FixtureLatency::from_override(Some(5)),
        FixtureLatency::uniform(Duration::from_millis(5))
    );
}
