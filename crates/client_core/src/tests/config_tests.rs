use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_to_fixture_backend() {
    let settings = GallerySettings::default();
    assert_eq!(settings.backend, BackendKind::Fixture);
    assert_eq!(settings.api_url, DEFAULT_API_URL);
    assert_eq!(settings.fixture_latency_ms, None);
    settings.validate().expect("defaults are valid");
}

#[test]
fn toml_overrides_only_present_keys() {
    let mut settings = GallerySettings::default();
    settings
        .apply_toml("backend = \"remote\"\napi_url = \"https://images.example/api\"\n")
        .expect("parse");

    assert_eq!(settings.backend, BackendKind::Remote);
    assert_eq!(settings.api_url, "https://images.example/api");
    assert_eq!(settings.fixture_latency_ms, None);
}

#[test]
fn rejects_unknown_backend_in_toml() {
    let mut settings = GallerySettings::default();
    assert!(settings.apply_toml("backend = \"ftp\"").is_err());
}

#[test]
fn app_prefixed_env_wins_over_gallery_prefix() {
    let mut settings = GallerySettings::default();
    settings
        .apply_env(env_from(&[
            ("GALLERY_API_URL", "http://first.example/api"),
            ("APP__API_URL", "http://second.example/api"),
            ("GALLERY_USE_FIXTURE", "false"),
            ("GALLERY_FIXTURE_LATENCY_MS", "25"),
        ]))
        .expect("env");

    assert_eq!(settings.api_url, "http://second.example/api");
    assert_eq!(settings.backend, BackendKind::Remote);
    assert_eq!(settings.fixture_latency_ms, Some(25));
}

#[test]
fn invalid_env_values_are_errors() {
    let mut settings = GallerySettings::default();
    assert!(settings
        .apply_env(env_from(&[("GALLERY_USE_FIXTURE", "maybe")]))
        .is_err());
    assert!(settings
        .apply_env(env_from(&[("GALLERY_FIXTURE_LATENCY_MS", "-1")]))
        .is_err());
}

#[test]
fn validate_requires_http_url() {
    let mut settings = GallerySettings::default();
    settings.api_url = "not a url".into();
    assert!(settings.validate().is_err());

    settings.api_url = "ftp://images.example".into();
    assert!(settings.validate().is_err());
}

#[test]
fn explicit_settings_file_must_exist() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let missing = env::temp_dir().join(format!("gallery_missing_{suffix}.toml"));

    assert!(load_settings(Some(&missing)).is_err());
}

#[test]
fn loads_settings_file_from_path() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("gallery_settings_{suffix}.toml"));
    fs::write(&path, "fixture_latency_ms = 0\n").expect("write settings");

    let settings = load_settings(Some(&path)).expect("load");
    assert_eq!(settings.fixture_latency_ms, Some(0));
    assert_eq!(settings.backend, BackendKind::Fixture);

    fs::remove_file(path).expect("cleanup");
}
