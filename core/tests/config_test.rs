/// Environment-driven configuration defaults
use serial_test::serial;
use wayside_core::llm::NarrationConfig;
use wayside_core::providers::PlacesConfig;
use wayside_core::tts::SpeechConfig;
use wayside_core::{PollInterval, SearchRadius, TourSettings};

const VARS: &[&str] = &[
    "GOOGLE_PLACES_API_KEY",
    "PLACES_BASE_URL",
    "PLACES_TIMEOUT_MS",
    "GEMINI_API_KEY",
    "GEMINI_BASE_URL",
    "GEMINI_MODEL",
    "NARRATION_TIMEOUT_MS",
    "LMNT_API_KEY",
    "LMNT_BASE_URL",
    "LMNT_VOICE",
    "SPEECH_TIMEOUT_MS",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_env() {
    clear_env();

    let places = PlacesConfig::default();
    assert_eq!(places.base_url, "https://places.googleapis.com");
    assert!(places.api_key.is_none());
    assert_eq!(places.included_types, vec!["tourist_attraction"]);
    assert_eq!(places.timeout_ms, 30_000);

    let narration = NarrationConfig::default();
    assert_eq!(
        narration.base_url,
        "https://generativelanguage.googleapis.com"
    );
    assert_eq!(narration.model, "gemini-2.0-flash");
    assert_eq!(narration.request_timeout_ms, 30_000);

    let speech = SpeechConfig::default();
    assert_eq!(speech.base_url, "https://api.lmnt.com");
    assert_eq!(speech.default_voice, "ava");
    assert_eq!(speech.request_timeout_ms, 30_000);

    let settings = TourSettings::default();
    assert_eq!(settings.search_radius, SearchRadius::default());
    assert_eq!(settings.poll_interval, PollInterval::OneMinute);
    assert_eq!(settings.voice, "ava");
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    std::env::set_var("GOOGLE_PLACES_API_KEY", "places-secret");
    std::env::set_var("PLACES_TIMEOUT_MS", "1500");
    std::env::set_var("GEMINI_MODEL", "gemini-1.5-pro");
    std::env::set_var("LMNT_VOICE", "morgan");
    std::env::set_var("SPEECH_TIMEOUT_MS", "not-a-number");

    let places = PlacesConfig::default();
    assert_eq!(places.api_key.as_deref(), Some("places-secret"));
    assert_eq!(places.timeout_ms, 1500);
    assert_eq!(NarrationConfig::default().model, "gemini-1.5-pro");

    let speech = SpeechConfig::default();
    assert_eq!(speech.default_voice, "morgan");
    assert_eq!(speech.request_timeout_ms, 30_000);
    assert_eq!(TourSettings::default().voice, "morgan");

    clear_env();
}

#[test]
#[serial]
fn test_debug_redacts_keys() {
    clear_env();
    std::env::set_var("GOOGLE_PLACES_API_KEY", "places-secret");
    std::env::set_var("GEMINI_API_KEY", "gemini-secret");
    std::env::set_var("LMNT_API_KEY", "lmnt-secret");

    let printed = format!(
        "{:?} {:?} {:?}",
        PlacesConfig::default(),
        NarrationConfig::default(),
        SpeechConfig::default()
    );
    assert!(!printed.contains("secret"));
    assert!(printed.contains("[REDACTED]"));

    clear_env();
}

#[test]
fn test_settings_deserialize_with_defaults() {
    let settings: TourSettings =
        serde_json::from_str(r#"{ "search_radius": 5000, "poll_interval": 120 }"#).unwrap();
    assert_eq!(settings.search_radius.meters(), 1000.0);
    assert_eq!(settings.poll_interval, PollInterval::TwoMinutes);
    assert!(!settings.voice.is_empty());

    let bad = serde_json::from_str::<TourSettings>(r#"{ "poll_interval": 45 }"#);
    assert!(bad.is_err());
}
