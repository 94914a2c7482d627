//! Integration tests for the lookup → fetch → write pipeline
//!
//! Drives the public service API with a counting fake on the fetch seam and
//! shared in-memory and file-backed store backends, covering the cache
//! behaviors end to end: historical immutability, forecast supersession,
//! naive-timestamp rejection, non-success statuses, and hourly aggregation.

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use grillwx::client::FetchError;
use grillwx::{
    BudgetConfig, Fetch, MemoryStore, RawApiResponse, Regime, TimeInput, WeatherConfig,
    WeatherError, WeatherService,
};

/// Fake fetcher returning a canned Dark Sky style document; each call is
/// stamped with its ordinal as the current temperature.
struct CannedFetcher {
    calls: AtomicUsize,
    fail_status: Option<u16>,
}

impl CannedFetcher {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_status: None,
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::new()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for CannedFetcher {
    async fn fetch(
        &self,
        _regime: Regime,
        _instant: Option<DateTime<Tz>>,
    ) -> Result<RawApiResponse, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(status) = self.fail_status {
            return Err(FetchError::Status(status));
        }
        let body = json!({
            "timezone": "America/Toronto",
            "offset": -4,
            "currently": {"time": 1710075600, "summary": "Partly Cloudy", "temperature": call as f64},
            "hourly": {
                "summary": "Cloudy through the evening.",
                "data": [
                    {"time": 1710072000, "temperature": 3.8},
                    {"time": 1710075600, "temperature": 4.2, "humidity": 0.71},
                    {"time": 1710079200, "temperature": 4.6, "humidity": 0.69, "windSpeed": 11.0}
                ]
            }
        });
        Ok(serde_json::from_value(body).expect("canned body is valid"))
    }
}

fn make_service(
    fetcher: Arc<CannedFetcher>,
    store: Arc<MemoryStore>,
    budget: BudgetConfig,
) -> WeatherService<Arc<CannedFetcher>, Arc<MemoryStore>> {
    let config = WeatherConfig::new("secret", 43.6532, -79.3832)
        .expect("valid config")
        .with_budget(budget)
        .expect("valid budget");
    WeatherService::new(&config, fetcher, store)
}

fn generous_budget() -> BudgetConfig {
    // Hour-scale TTLs so nothing expires mid-test
    BudgetConfig {
        current_per_day: 24.0,
        forecast_per_day: 24.0,
    }
}

#[tokio::test]
async fn test_current_is_cached_within_budget() {
    let fetcher = Arc::new(CannedFetcher::new());
    let service = make_service(fetcher.clone(), Arc::new(MemoryStore::new()), generous_budget());

    let first = service.current().await.unwrap();
    let second = service.current().await.unwrap();

    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_expired_current_is_refetched() {
    let fetcher = Arc::new(CannedFetcher::new());
    // 8.64 million requests/day -> 10ms TTL
    let service = make_service(
        fetcher.clone(),
        Arc::new(MemoryStore::new()),
        BudgetConfig {
            current_per_day: 8_640_000.0,
            forecast_per_day: 24.0,
        },
    );

    service.current().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    let refetched = service.current().await.unwrap();

    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(refetched.temperature(), Some(2.0));
}

#[tokio::test]
async fn test_past_date_fetched_once_and_stored_once() {
    let fetcher = Arc::new(CannedFetcher::new());
    let store = Arc::new(MemoryStore::new());
    let service = make_service(fetcher.clone(), store.clone(), generous_budget());

    let past = TimeInput::parse("2019-07-04").unwrap();
    let first = service.weather_at(past).await.unwrap();
    let second = service.weather_at(past).await.unwrap();

    assert_eq!(fetcher.call_count(), 1, "Second call must be served from the store");
    assert_eq!(store.len(Regime::Historical), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_expired_forecast_is_superseded_not_accumulated() {
    let fetcher = Arc::new(CannedFetcher::new());
    let store = Arc::new(MemoryStore::new());
    let service = make_service(
        fetcher.clone(),
        store.clone(),
        BudgetConfig {
            current_per_day: 24.0,
            forecast_per_day: 8_640_000.0, // 10ms TTL
        },
    );

    let today = chrono::Utc::now().date_naive();
    let input = TimeInput::Date(today);

    service.weather_at(input).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    let latest = service.weather_at(input).await.unwrap();

    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(store.len(Regime::Forecast), 1, "Same date must hold one record");
    assert_eq!(latest.temperature(), Some(2.0), "Latest write must win");
}

#[tokio::test]
async fn test_naive_timestamp_rejected_before_any_fetch() {
    let fetcher = Arc::new(CannedFetcher::new());
    let service = make_service(fetcher.clone(), Arc::new(MemoryStore::new()), generous_budget());

    let err = TimeInput::parse("2024-03-10T23:00:00").unwrap_err();
    assert!(err.to_string().contains("naive timestamp not accepted"));

    // Nothing reached the network
    assert_eq!(fetcher.call_count(), 0);
    drop(service);
}

#[tokio::test]
async fn test_rate_limited_status_surfaces_and_store_stays_empty() {
    let fetcher = Arc::new(CannedFetcher::failing(429));
    let store = Arc::new(MemoryStore::new());
    let service = make_service(fetcher.clone(), store.clone(), generous_budget());

    let result = service.current().await;

    match result {
        Err(WeatherError::Fetch(FetchError::Status(status))) => assert_eq!(status, 429),
        other => panic!("Expected FetchError::Status(429), got {:?}", other),
    }
    assert!(store.is_empty(Regime::Current));
    assert!(store.is_empty(Regime::Forecast));
    assert!(store.is_empty(Regime::Historical));
}

#[tokio::test]
async fn test_hourly_table_unions_fields_across_hours() {
    let fetcher = Arc::new(CannedFetcher::new());
    let service = make_service(fetcher.clone(), Arc::new(MemoryStore::new()), generous_budget());

    let table = service.hourly(TimeInput::Now).await.unwrap();

    assert_eq!(table.len(), 3);
    let humidity = table.column("humidity").unwrap();
    assert_eq!(humidity[0], serde_json::Value::Null);
    assert_eq!(humidity[1], json!(0.71));
    assert_eq!(humidity[2], json!(0.69));

    let wind = table.column("windSpeed").unwrap();
    assert_eq!(wind[..2], [serde_json::Value::Null, serde_json::Value::Null]);
    assert_eq!(wind[2], json!(11.0));

    // Times carry the response's zone, not the service's configured UTC
    assert_eq!(table.times[0].to_rfc3339(), "2024-03-10T08:00:00-04:00");
}

#[tokio::test]
async fn test_hourly_is_derived_from_the_cached_response() {
    let fetcher = Arc::new(CannedFetcher::new());
    let service = make_service(fetcher.clone(), Arc::new(MemoryStore::new()), generous_budget());

    service.current().await.unwrap();
    let table = service.hourly(TimeInput::Now).await.unwrap();

    assert_eq!(fetcher.call_count(), 1, "Hourly view must reuse the cached payload");
    assert_eq!(table.len(), 3);
}
