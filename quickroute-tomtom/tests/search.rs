mod common;

use std::time::Duration;

use quickroute_tomtom::{
    AddressFinder, AddressFinderError, CancellationToken, SearchControl, SearchOptions,
    build_query_string,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn fixture() -> Value {
    serde_json::from_str(include_str!("fixtures/collins_street.json")).expect("fixture parses")
}

fn result_at(freeform: &str, lat: f64, lon: f64) -> Value {
    json!({
        "type": "Point Address",
        "id": freeform,
        "score": 1.0,
        "address": { "freeformAddress": freeform, "countryCode": "AU" },
        "position": { "lat": lat, "lon": lon }
    })
}

async fn finder_for(server: &MockServer) -> AddressFinder {
    common::init_test_tracing();
    AddressFinder::with_base_url(KEY, &server.uri()).expect("finder")
}

#[tokio::test]
async fn resolves_addresses_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/2/search/test.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
        .expect(1)
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let found = finder
        .search("test", &SearchOptions::default(), SearchControl::default())
        .await
        .unwrap();

    assert_eq!(found.addresses.len(), 1);
    let first = &found.addresses[0];
    assert_eq!(
        first.formatted,
        "123 Collins Street, Melbourne VIC 3000, Australia"
    );
    assert_eq!(first.latitude, -37.8136);
    assert_eq!(first.longitude, 144.9631);
    assert_eq!(first.components["streetName"], "Collins Street");
    assert_eq!(Value::Object(first.components.clone()), fixture()["results"][0]["address"]);
    assert_eq!(found.raw["summary"]["query"], "123 Collins Street, Melbourne");
    assert_eq!(found.raw, fixture());
}

#[tokio::test]
async fn sends_documented_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/2/search/test.json"))
        .and(query_param("limit", "5"))
        .and(query_param("minFuzzyLevel", "1"))
        .and(query_param("maxFuzzyLevel", "2"))
        .and(query_param("typeahead", "true"))
        .and(query_param("countrySet", "AUS"))
        .and(query_param("view", "Unified"))
        .and(query_param("relatedPois", "off"))
        .and(query_param("key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
        .expect(1)
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    finder
        .search("test", &SearchOptions::default(), SearchControl::default())
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let query = received[0].url.query().unwrap_or_default();
    assert!(!query.contains("geoBias"));
}

#[tokio::test]
async fn wire_query_matches_built_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
        .mount(&server)
        .await;

    let opts = SearchOptions::default()
        .with_limit(10)
        .with_fuzzy_levels(2, 3)
        .with_geo_bias(-37.8136, 144.9631);

    let finder = finder_for(&server).await;
    finder
        .search("test", &opts, SearchControl::default())
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let query = received[0].url.query().unwrap();
    assert_eq!(query, build_query_string(KEY, &opts));
    assert!(query.contains("geoBias=point%3A-37.8136%2C144.9631"));
}

#[tokio::test]
async fn free_text_is_encoded_as_a_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/2/search/123%20Collins%20St%2C%20Melbourne.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
        .expect(1)
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let found = finder
        .search(
            "123 Collins St, Melbourne",
            &SearchOptions::default(),
            SearchControl::default(),
        )
        .await
        .unwrap();
    assert_eq!(found.addresses.len(), 1);
}

#[tokio::test]
async fn provider_error_carries_status_text_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found Body"))
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let err = finder
        .search("test", &SearchOptions::default(), SearchControl::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(
        err.to_string(),
        "TomTom API request failed with status 404: Not Found and body Not Found Body"
    );
}

#[tokio::test]
async fn preserves_provider_order_without_filtering() {
    let server = MockServer::start().await;
    let body = json!({
        "summary": { "query": "george st", "numResults": 3 },
        "results": [
            result_at("1 George St, Sydney NSW 2000", -33.86, 151.20),
            result_at("1 George St, Brisbane QLD 4000", -27.47, 153.02),
            result_at("", 0.0, 0.0)
        ]
    });
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let found = finder
        .search("george st", &SearchOptions::default(), SearchControl::default())
        .await
        .unwrap();

    let formatted: Vec<&str> = found.addresses.iter().map(|a| a.formatted.as_str()).collect();
    assert_eq!(
        formatted,
        vec![
            "1 George St, Sydney NSW 2000",
            "1 George St, Brisbane QLD 4000",
            ""
        ]
    );
    assert_eq!(found.addresses[1].latitude, -27.47);
}

#[tokio::test]
async fn off_schema_fields_do_not_fail_the_search() {
    let server = MockServer::start().await;
    let body = json!({
        "summary": { "query": "12 somewhere", "numResults": "one" },
        "results": [{
            "type": "Point Address",
            "score": null,
            "poi": { "categorySet": [{ "id": "7315" }] },
            "address": {
                "streetNumber": 12,
                "streetName": null,
                "freeformAddress": "12 Somewhere St, Hobart TAS 7000"
            },
            "position": { "lat": -42.88, "lon": 147.33 }
        }]
    });
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let found = finder
        .search("12 somewhere", &SearchOptions::default(), SearchControl::default())
        .await
        .unwrap();

    assert_eq!(found.addresses.len(), 1);
    let address = &found.addresses[0];
    assert_eq!(address.formatted, "12 Somewhere St, Hobart TAS 7000");
    assert_eq!(address.components["streetNumber"], 12);
    assert!(address.components["streetName"].is_null());
    assert_eq!(
        serde_json::to_value(address).unwrap()["components"],
        body["results"][0]["address"]
    );
    assert_eq!(found.raw, body);
}

#[tokio::test]
async fn loose_numeric_options_are_forwarded_as_given() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("limit", "-1"))
        .and(query_param("minFuzzyLevel", "1.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
        .expect(1)
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    finder
        .find(
            "test",
            &json!({ "limit": -1, "minFuzzyLevel": 1.5 }),
            SearchControl::default(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn empty_result_list_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "summary": { "query": "zzz" }, "results": [] })),
        )
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let found = finder
        .search("zzz", &SearchOptions::default(), SearchControl::default())
        .await
        .unwrap();
    assert!(found.addresses.is_empty());
}

#[tokio::test]
async fn missing_results_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "summary": {} })))
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let err = finder
        .search("test", &SearchOptions::default(), SearchControl::default())
        .await
        .unwrap_err();
    match err {
        AddressFinderError::MalformedResponse { reason, .. } => {
            assert!(reason.contains("results"), "reason was {reason}")
        }
        other => panic!("expected malformed response, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_success_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let err = finder
        .search("test", &SearchOptions::default(), SearchControl::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, AddressFinderError::MalformedResponse { .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixture())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let err = finder
        .search(
            "test",
            &SearchOptions::default(),
            SearchControl::default().with_timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "got {err:?}");
}

#[tokio::test]
async fn finder_default_timeout_applies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixture())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let finder = finder_for(&server)
        .await
        .with_timeout(Duration::from_millis(50));
    let err = finder
        .search("test", &SearchOptions::default(), SearchControl::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, AddressFinderError::Timeout { after } if after == Duration::from_millis(50)),
        "got {err:?}"
    );
}

#[tokio::test]
async fn cancellation_wins_over_a_longer_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixture())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let err = finder
        .search(
            "test",
            &SearchOptions::default(),
            SearchControl::default()
                .with_timeout(Duration::from_secs(5))
                .with_cancel(cancel),
        )
        .await
        .unwrap_err();
    assert!(err.is_cancelled(), "got {err:?}");
}

#[tokio::test]
async fn timeout_still_applies_when_a_token_is_supplied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixture())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let err = finder
        .search(
            "test",
            &SearchOptions::default(),
            SearchControl::default()
                .with_timeout(Duration::from_millis(50))
                .with_cancel(CancellationToken::new()),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "got {err:?}");
}

#[tokio::test]
async fn concurrent_searches_do_not_interfere() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/2/search/sydney.json"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": { "query": "sydney" },
            "results": [result_at("Sydney NSW", -33.87, 151.21)]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/2/search/perth.json"))
        .and(query_param("limit", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": { "query": "perth" },
            "results": [result_at("Perth WA", -31.95, 115.86)]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/2/search/slow.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixture())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let sydney_opts = SearchOptions::default().with_limit(3);
    let perth_opts = SearchOptions::default().with_limit(7);
    let slow_opts = SearchOptions::default();
    let (sydney, perth, slow) = tokio::join!(
        finder.search("sydney", &sydney_opts, SearchControl::default()),
        finder.search("perth", &perth_opts, SearchControl::default()),
        finder.search(
            "slow",
            &slow_opts,
            SearchControl::default().with_cancel(cancel)
        ),
    );

    assert_eq!(sydney.unwrap().addresses[0].formatted, "Sydney NSW");
    assert_eq!(perth.unwrap().addresses[0].formatted, "Perth WA");
    assert!(slow.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn invalid_options_never_reach_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
        .expect(0)
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let err = finder
        .find(
            "test",
            &json!({ "geoBias": { "lat": "invalid" } }),
            SearchControl::default(),
        )
        .await
        .unwrap_err();

    match err {
        AddressFinderError::Validation(v) => {
            assert!(v.issue_at(&["geoBias", "lat"]).is_some());
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn loosely_typed_options_flow_through_find() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("limit", "5"))
        .and(query_param("geoBias", "point:90,180"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
        .expect(1)
        .mount(&server)
        .await;

    let finder = finder_for(&server).await;
    let found = finder
        .find(
            "test",
            &json!({ "limit": 0, "geoBias": { "lat": 90, "lon": 180 } }),
            SearchControl::default(),
        )
        .await
        .unwrap();
    assert_eq!(found.addresses.len(), 1);
}
