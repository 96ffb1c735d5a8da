//! HTTP behaviour of the OpenWeather client against a mock server.

use std::sync::Arc;

use weather_core::{
    ApiConfig, ClientFetcher, FetchController, FetchState, MemoryPreferenceStore, OpenWeatherClient,
    Units, WeatherClient, WeatherQuery,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn london_payload() -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": -0.1257, "lat": 51.5085},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "base": "stations",
        "main": {
            "temp": 15.0, "feels_like": 14.2, "temp_min": 13.9, "temp_max": 16.1,
            "pressure": 1021, "humidity": 62
        },
        "visibility": 10000,
        "wind": {"speed": 4.12, "deg": 250},
        "clouds": {"all": 0},
        "dt": 1700000000,
        "sys": {"type": 2, "id": 2075535, "country": "GB", "sunrise": 1699945000, "sunset": 1699977000},
        "timezone": 0,
        "id": 2643743,
        "name": "London",
        "cod": 200
    })
}

fn create_test_client(mock_server: &MockServer, units: Units) -> OpenWeatherClient {
    let api = ApiConfig {
        base_url: mock_server.uri(),
        timeout_secs: 5,
        units,
        ..Default::default()
    };
    OpenWeatherClient::new(&api, "TEST_KEY").expect("Failed to create client")
}

async fn mount(mock_server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(response)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn sends_city_units_and_key_as_query_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "London,GB"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "TEST_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_payload()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, Units::Metric);
    let report = client.fetch("London,GB").await.expect("fetch should succeed");

    assert_eq!(report.location_name.as_deref(), Some("London"));
    assert_eq!(report.measurements.as_ref().map(|m| m.temperature), Some(15.0));
    assert_eq!(
        report.primary_condition().map(|c| c.description.as_str()),
        Some("clear sky")
    );
}

#[tokio::test]
async fn city_text_is_url_encoded_not_altered() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "São Paulo & Co"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_payload()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, Units::Imperial);
    assert!(client.fetch("São Paulo & Co").await.is_ok());
}

#[tokio::test]
async fn not_found_is_a_transport_error() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        ResponseTemplate::new(404)
            .set_body_json(serde_json::json!({"cod": "404", "message": "city not found"})),
    )
    .await;

    let client = create_test_client(&mock_server, Units::Metric);
    let err = client.fetch("Atlantis").await.unwrap_err();

    assert!(err.is_transport());
    let msg = err.to_string();
    assert!(msg.contains("404"));
    assert!(msg.contains("city not found"));
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let mock_server = MockServer::start().await;
    mount(&mock_server, ResponseTemplate::new(200).set_body_string("{not json")).await;

    let client = create_test_client(&mock_server, Units::Metric);
    let err = client.fetch("London").await.unwrap_err();

    assert!(err.is_decode());
}

#[tokio::test]
async fn wrong_shape_is_a_decode_error() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"main": {"temp": "warm"}})),
    )
    .await;

    let client = create_test_client(&mock_server, Units::Metric);
    assert!(client.fetch("London").await.unwrap_err().is_decode());
}

#[tokio::test]
async fn sparse_payload_decodes_with_unknowns() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "Reykjavik"})),
    )
    .await;

    let client = create_test_client(&mock_server, Units::Metric);
    let report = client.fetch("Reykjavik").await.unwrap();

    assert_eq!(report.location_name.as_deref(), Some("Reykjavik"));
    assert!(report.measurements.is_none());
    assert!(report.wind.is_none());
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server, Units::Metric);
    drop(mock_server);

    let err = client.fetch("London").await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn transport_failure_does_not_expose_api_key() {
    let api = ApiConfig {
        base_url: "http://127.0.0.1:1".into(),
        timeout_secs: 5,
        ..Default::default()
    };
    let client = OpenWeatherClient::new(&api, "SECRET_KEY_123").expect("Failed to create client");

    let err = client.fetch("London").await.unwrap_err();
    assert!(err.is_transport());
    assert!(!err.to_string().contains("SECRET_KEY_123"));

    let controller = FetchController::new(
        Arc::new(ClientFetcher::new(client)),
        Arc::new(MemoryPreferenceStore::new()),
    );
    controller.submit(&WeatherQuery::new("London").unwrap());

    let FetchState::Failed(message) = controller.settled().await else {
        panic!("expected failure");
    };
    assert!(!message.contains("SECRET_KEY_123"));
    assert!(!message.contains("appid"));
}

#[tokio::test]
async fn controller_reaches_success_through_real_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "London,GB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_payload()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = ClientFetcher::new(create_test_client(&mock_server, Units::Metric));
    let controller =
        FetchController::new(Arc::new(fetcher), Arc::new(MemoryPreferenceStore::new()))
            .with_region(Some("GB".into()));

    controller.submit(&WeatherQuery::new("London").unwrap());

    match controller.settled().await {
        FetchState::Success(report) => assert_eq!(report.location_name.as_deref(), Some("London")),
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn controller_reports_server_error_as_failed() {
    let mock_server = MockServer::start().await;
    mount(&mock_server, ResponseTemplate::new(500).set_body_string("boom")).await;

    let fetcher = ClientFetcher::new(create_test_client(&mock_server, Units::Metric));
    let controller =
        FetchController::new(Arc::new(fetcher), Arc::new(MemoryPreferenceStore::new()));

    controller.submit(&WeatherQuery::new("London").unwrap());

    let FetchState::Failed(message) = controller.settled().await else {
        panic!("expected failure");
    };
    assert!(message.contains("500"));
}
