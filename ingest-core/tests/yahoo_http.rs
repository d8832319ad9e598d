//! Yahoo provider against a local mock HTTP server.

use chrono::NaiveDate;
use ingest_core::{fetch_prices, Column, DataError, FetchRequest, ProviderConfig, YahooProvider};
use mockito::Matcher;

const CHART_PATH: &str = "/v8/finance/chart/SPY";

fn provider_for(server: &mockito::Server) -> YahooProvider {
    YahooProvider::new(&ProviderConfig {
        base_url: server.url(),
        timeout_secs: 5,
        ..ProviderConfig::default()
    })
    .unwrap()
}

fn request() -> FetchRequest {
    FetchRequest {
        start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end: Some(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()),
        ..FetchRequest::default()
    }
}

#[test]
fn row_with_missing_volume_is_dropped_from_fetch() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", CHART_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("period1".into(), "1704067200".into()),
            Matcher::UrlEncoded("period2".into(), "1704240000".into()),
            Matcher::UrlEncoded("interval".into(), "1d".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "chart": {
                    "result": [{
                        "meta": {"gmtoffset": -18000},
                        "timestamp": [1704205800],
                        "indicators": {
                            "quote": [{
                                "open": [472.16], "high": [473.67], "low": [470.49],
                                "close": [472.65], "volume": [null]
                            }],
                            "adjclose": [{"adjclose": [462.9]}]
                        }
                    }],
                    "error": null
                }
            }"#,
        )
        .create();

    let table = fetch_prices(&provider_for(&server), "SPY", &request()).unwrap();

    mock.assert();
    assert!(table.is_empty());
}

#[test]
fn complete_rows_come_through() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", CHART_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{
                "chart": {
                    "result": [{
                        "meta": {"gmtoffset": -18000},
                        "timestamp": [1704205800],
                        "indicators": {
                            "quote": [{
                                "open": [472.16], "high": [473.67], "low": [470.49],
                                "close": [472.65], "volume": [123623700]
                            }],
                            "adjclose": [{"adjclose": [462.9]}]
                        }
                    }],
                    "error": null
                }
            }"#,
        )
        .create();

    let table = fetch_prices(&provider_for(&server), "SPY", &request()).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.column(Column::Volume), vec![Some(123_623_700.0)]);
}

#[test]
fn not_found_status_maps_to_symbol_not_found() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", CHART_PATH)
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#)
        .create();

    let err = fetch_prices(&provider_for(&server), "SPY", &request()).unwrap_err();
    assert!(matches!(err, DataError::SymbolNotFound { ref symbol } if symbol == "SPY"));
}

#[test]
fn rate_limit_reports_retry_after() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", CHART_PATH)
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("retry-after", "30")
        .create();

    let err = fetch_prices(&provider_for(&server), "SPY", &request()).unwrap_err();
    assert!(matches!(err, DataError::RateLimited { retry_after_secs: 30 }));
}

#[test]
fn server_error_is_not_retried() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", CHART_PATH)
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(1)
        .create();

    let err = fetch_prices(&provider_for(&server), "SPY", &request()).unwrap_err();

    mock.assert();
    assert!(matches!(err, DataError::Http { status: 500, .. }));
}

#[test]
fn unreachable_host_is_a_network_error() {
    let provider = YahooProvider::new(&ProviderConfig {
        // Nothing listens on the discard port.
        base_url: "http://127.0.0.1:9".into(),
        timeout_secs: 2,
        ..ProviderConfig::default()
    })
    .unwrap();

    let err = fetch_prices(&provider, "SPY", &request()).unwrap_err();
    assert!(matches!(err, DataError::NetworkUnreachable(_)));
}
