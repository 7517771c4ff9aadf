/// HTTP-level tests for the places lookup client
use mockito::{Matcher, Server};
use serde_json::json;
use wayside_core::providers::{PhotoRef, PlaceLookup, PlacesClient, PlacesConfig, MAX_RESULTS};
use wayside_core::{Coordinate, WaysideError};

const SEARCH_PATH: &str = "/v1/places:searchNearby";

fn client_for(base_url: String, api_key: Option<&str>) -> PlacesClient {
    PlacesClient::with_config(PlacesConfig {
        base_url,
        api_key: api_key.map(str::to_string),
        included_types: vec!["tourist_attraction".to_string()],
        timeout_ms: 5_000,
    })
    .unwrap()
}

fn place(name: &str, address: &str) -> serde_json::Value {
    json!({
        "displayName": { "text": name, "languageCode": "en" },
        "formattedAddress": address,
        "primaryType": "tourist_attraction",
        "types": ["tourist_attraction", "point_of_interest"],
        "location": { "latitude": 37.8199, "longitude": -122.4783 },
        "photos": [
            { "name": format!("places/{name}/photos/p1"), "widthPx": 4032, "heightPx": 3024 }
        ]
    })
}

fn golden_gate() -> Coordinate {
    Coordinate::new(37.8199, -122.4783)
}

#[tokio::test]
async fn test_search_sends_headers_and_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", SEARCH_PATH)
        .match_header("x-goog-api-key", "test-key")
        .match_header(
            "x-goog-fieldmask",
            Matcher::Regex("places.displayName".to_string()),
        )
        .match_body(Matcher::PartialJson(json!({
            "includedTypes": ["tourist_attraction"],
            "maxResultCount": 10,
            "locationRestriction": {
                "circle": {
                    "center": { "latitude": 37.8199, "longitude": -122.4783 },
                    "radius": 300.0
                }
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "places": [place("Golden Gate Bridge", "SF, CA")] }).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = client_for(server.url(), Some("test-key"));
    let pois = client.find_nearby(golden_gate(), 300.0).await.unwrap();

    mock.assert_async().await;
    assert_eq!(pois.len(), 1);
    let top = &pois[0];
    assert_eq!(top.name, "Golden Gate Bridge");
    assert_eq!(top.address, "SF, CA");
    assert_eq!(top.primary_category.as_deref(), Some("tourist_attraction"));
    assert_eq!(top.categories, vec!["tourist_attraction", "point_of_interest"]);
    assert_eq!(top.photo_refs.len(), 1);
    assert_eq!(top.photo_refs[0].width_px, 4032);
}

#[tokio::test]
async fn test_results_are_ranked_and_capped() {
    let mut server = Server::new_async().await;
    let places: Vec<_> = (0..12)
        .map(|i| place(&format!("Stop {i}"), "SF, CA"))
        .collect();
    let _mock = server
        .mock("POST", SEARCH_PATH)
        .with_status(200)
        .with_body(json!({ "places": places }).to_string())
        .create_async()
        .await;

    let client = client_for(server.url(), Some("test-key"));
    let pois = client.find_nearby(golden_gate(), 200.0).await.unwrap();

    assert_eq!(pois.len(), MAX_RESULTS);
    assert_eq!(pois[0].name, "Stop 0");
    assert_eq!(pois[9].name, "Stop 9");
}

#[tokio::test]
async fn test_empty_response_and_incomplete_places() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", SEARCH_PATH)
        .with_status(200)
        .with_body(
            json!({
                "places": [
                    { "formattedAddress": "no name" },
                    { "displayName": { "text": "No Location" } },
                    place("Coit Tower", "1 Telegraph Hill Blvd")
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(server.url(), Some("test-key"));
    let pois = client.find_nearby(golden_gate(), 200.0).await.unwrap();
    assert_eq!(pois.len(), 1);
    assert_eq!(pois[0].name, "Coit Tower");

    let mut empty = Server::new_async().await;
    let _mock = empty
        .mock("POST", SEARCH_PATH)
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let client = client_for(empty.url(), Some("test-key"));
    assert!(client.find_nearby(golden_gate(), 200.0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_error_mapping() {
    let mut server = Server::new_async().await;
    let _forbidden = server
        .mock("POST", SEARCH_PATH)
        .match_header("x-goog-api-key", "bad-key")
        .with_status(403)
        .with_body(r#"{"error":{"status":"PERMISSION_DENIED"}}"#)
        .create_async()
        .await;
    let _unavailable = server
        .mock("POST", SEARCH_PATH)
        .match_header("x-goog-api-key", "flaky-key")
        .with_status(503)
        .with_body("try later")
        .create_async()
        .await;
    let _garbage = server
        .mock("POST", SEARCH_PATH)
        .match_header("x-goog-api-key", "garbage-key")
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let err = client_for(server.url(), Some("bad-key"))
        .find_nearby(golden_gate(), 200.0)
        .await
        .unwrap_err();
    assert!(matches!(err, WaysideError::ConfigError(_)), "{err}");

    let err = client_for(server.url(), Some("flaky-key"))
        .find_nearby(golden_gate(), 200.0)
        .await
        .unwrap_err();
    match err {
        WaysideError::NetworkError(msg) => assert!(msg.contains("503")),
        other => panic!("expected network error, got {other}"),
    }

    let err = client_for(server.url(), Some("garbage-key"))
        .find_nearby(golden_gate(), 200.0)
        .await
        .unwrap_err();
    assert!(matches!(err, WaysideError::DecodeError(_)), "{err}");
}

#[tokio::test]
async fn test_missing_key_makes_no_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", SEARCH_PATH)
        .expect(0)
        .create_async()
        .await;

    let err = client_for(server.url(), None)
        .find_nearby(golden_gate(), 200.0)
        .await
        .unwrap_err();

    assert!(matches!(err, WaysideError::ConfigError(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    let client = client_for("http://127.0.0.1:1".to_string(), Some("test-key"));
    let err = client.find_nearby(golden_gate(), 200.0).await.unwrap_err();
    assert!(matches!(err, WaysideError::NetworkError(_)));
    assert!(err.is_retryable());
}

#[test]
fn test_photo_url_clamps_width() {
    let client = client_for("https://places.example.com/".to_string(), Some("k"));
    let photo = PhotoRef {
        name: "places/abc/photos/xyz".to_string(),
        width_px: 4032,
        height_px: 3024,
    };

    let url = client.photo_url(&photo, 10_000).unwrap();
    assert_eq!(
        url,
        "https://places.example.com/v1/places/abc/photos/xyz/media?maxWidthPx=4800&key=k"
    );
    let url = client.photo_url(&photo, 0).unwrap();
    assert!(url.contains("maxWidthPx=1&"));

    let keyless = client_for("https://places.example.com".to_string(), None);
    assert!(matches!(
        keyless.photo_url(&photo, 400),
        Err(WaysideError::ConfigError(_))
    ));
}
