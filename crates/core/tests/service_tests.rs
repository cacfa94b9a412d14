// ═══════════════════════════════════════════════════════════════════
// Service Tests — RefreshService (staleness, fallback, atomicity) and
// ValuationService (share resolution, revaluation)
// ═══════════════════════════════════════════════════════════════════

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::tempdir;

use invest_tracker_core::errors::CoreError;
use invest_tracker_core::models::instrument::{Instrument, InstrumentProfile};
use invest_tracker_core::models::price::{PricePoint, PriceSeries};
use invest_tracker_core::providers::registry::ProviderRegistry;
use invest_tracker_core::providers::traits::MarketDataProvider;
use invest_tracker_core::services::refresh_service::RefreshService;
use invest_tracker_core::services::valuation_service::{OpenRequest, ValuationService};
use invest_tracker_core::storage::instrument_store::InstrumentStore;

fn ts(y: i32, m: u32, day: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, day, h, min, 0).unwrap()
}

fn point(at: DateTime<Utc>, price: f64) -> PricePoint {
    PricePoint::new(at, price)
}

// ═══════════════════════════════════════════════════════════════════
//  Mock provider
// ═══════════════════════════════════════════════════════════════════

/// Which of the three fetches should fail.
#[derive(Clone, Copy, PartialEq)]
enum Failure {
    None,
    Profile,
    Daily,
    Intraday,
}

/// An in-memory provider serving canned data, counting every call.
struct MockProvider {
    name: &'static str,
    daily: Vec<PricePoint>,
    intraday: Vec<PricePoint>,
    failure: Failure,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    fn new(name: &'static str, calls: Arc<AtomicUsize>) -> Self {
        Self {
            name,
            daily: vec![point(Utc::now() - Duration::days(1), 10.0)],
            intraday: vec![point(Utc::now() - Duration::hours(1), 10.5)],
            failure: Failure::None,
            calls,
        }
    }

    fn failing(name: &'static str, failure: Failure, calls: Arc<AtomicUsize>) -> Self {
        Self {
            failure,
            ..Self::new(name, calls)
        }
    }

    fn fail(&self, stage: Failure) -> Result<(), CoreError> {
        if self.failure == stage {
            Err(CoreError::Api {
                provider: self.name.to_string(),
                message: "mock failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<InstrumentProfile, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fail(Failure::Profile)?;
        Ok(InstrumentProfile {
            name: format!("{symbol} ({})", self.name),
            currency: "USD".to_string(),
            sector: "Technology".to_string(),
        })
    }

    async fn fetch_daily_history(
        &self,
        _symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, CoreError> {
        self.fail(Failure::Daily)?;
        Ok(self.daily.clone())
    }

    async fn fetch_intraday_history(
        &self,
        _symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, CoreError> {
        self.fail(Failure::Intraday)?;
        Ok(self.intraday.clone())
    }
}

fn registry_of(providers: Vec<MockProvider>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for p in providers {
        registry.register(Box::new(p));
    }
    registry
}

// ═══════════════════════════════════════════════════════════════════
//  RefreshService
// ═══════════════════════════════════════════════════════════════════

mod refresh {
    use super::*;

    #[tokio::test]
    async fn successful_refresh_populates_instrument() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let service = RefreshService::new(
            registry_of(vec![MockProvider::new("mock", calls.clone())]),
            InstrumentStore::new(dir.path()),
        );

        let mut instrument = Instrument::new("ACME");
        service.refresh(&mut instrument, false).await.unwrap();

        assert_eq!(instrument.name, "ACME (mock)");
        assert_eq!(instrument.currency, "USD");
        assert_eq!(instrument.sector, "Technology");
        assert_eq!(instrument.daily.len(), 1);
        assert_eq!(instrument.intraday.len(), 1);
        assert!(instrument.last_refreshed.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_persists_snapshot_to_store() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let service = RefreshService::new(
            registry_of(vec![MockProvider::new("mock", calls)]),
            InstrumentStore::new(dir.path()),
        );

        let mut instrument = Instrument::new("ACME");
        service.refresh(&mut instrument, false).await.unwrap();

        let cached = service.store().load("ACME").unwrap().unwrap();
        assert_eq!(cached, instrument);
    }

    #[tokio::test]
    async fn fresh_instrument_is_not_refetched() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let service = RefreshService::new(
            registry_of(vec![MockProvider::new("mock", calls.clone())]),
            InstrumentStore::new(dir.path()),
        );

        let mut instrument = Instrument::new("ACME");
        service.refresh(&mut instrument, false).await.unwrap();
        service.refresh(&mut instrument, false).await.unwrap();

        // Second call is a no-op under the staleness policy
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_bypasses_staleness_policy() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let service = RefreshService::new(
            registry_of(vec![MockProvider::new("mock", calls.clone())]),
            InstrumentStore::new(dir.path()),
        );

        let mut instrument = Instrument::new("ACME");
        service.refresh(&mut instrument, false).await.unwrap();
        service.refresh(&mut instrument, true).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_instrument_is_refetched() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let service = RefreshService::new(
            registry_of(vec![MockProvider::new("mock", calls.clone())]),
            InstrumentStore::new(dir.path()),
        );

        let mut instrument = Instrument::new("ACME");
        instrument.last_refreshed = Some(Utc::now() - Duration::hours(2));

        service.refresh(&mut instrument, false).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_registry_reports_no_provider() {
        let dir = tempdir().unwrap();
        let service =
            RefreshService::new(ProviderRegistry::new(), InstrumentStore::new(dir.path()));

        let mut instrument = Instrument::new("ACME");
        let result = service.refresh(&mut instrument, false).await;
        assert!(matches!(result, Err(CoreError::NoProvider)));
    }

    #[tokio::test]
    async fn partial_fetch_failure_leaves_instrument_untouched() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        // Profile succeeds, daily history fails: the refresh must fail as a
        // unit without half-applying the profile
        let service = RefreshService::new(
            registry_of(vec![MockProvider::failing("mock", Failure::Daily, calls)]),
            InstrumentStore::new(dir.path()),
        );

        let mut instrument = Instrument::new("ACME");
        instrument.daily =
            PriceSeries::from_points(vec![point(ts(2025, 1, 6, 16, 0), 10.0)]);
        let before = instrument.clone();

        let result = service.refresh(&mut instrument, false).await;
        assert!(matches!(result, Err(CoreError::Api { .. })));
        assert_eq!(instrument, before);
        assert!(service.store().load("ACME").unwrap().is_none());
    }

    #[tokio::test]
    async fn intraday_failure_also_fails_the_unit() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let service = RefreshService::new(
            registry_of(vec![MockProvider::failing("mock", Failure::Intraday, calls)]),
            InstrumentStore::new(dir.path()),
        );

        let mut instrument = Instrument::new("ACME");
        let before = instrument.clone();
        assert!(service.refresh(&mut instrument, false).await.is_err());
        assert_eq!(instrument, before);
    }

    #[tokio::test]
    async fn falls_back_to_next_provider_in_order() {
        let dir = tempdir().unwrap();
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let service = RefreshService::new(
            registry_of(vec![
                MockProvider::failing("primary", Failure::Profile, primary_calls.clone()),
                MockProvider::new("fallback", fallback_calls.clone()),
            ]),
            InstrumentStore::new(dir.path()),
        );

        let mut instrument = Instrument::new("ACME");
        service.refresh(&mut instrument, false).await.unwrap();

        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert_eq!(instrument.name, "ACME (fallback)");
    }

    #[tokio::test]
    async fn all_providers_failing_propagates_last_error() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let service = RefreshService::new(
            registry_of(vec![
                MockProvider::failing("a", Failure::Profile, calls.clone()),
                MockProvider::failing("b", Failure::Profile, calls.clone()),
            ]),
            InstrumentStore::new(dir.path()),
        );

        let mut instrument = Instrument::new("ACME");
        let result = service.refresh(&mut instrument, false).await;
        match result {
            Err(CoreError::Api { provider, .. }) => assert_eq!(provider, "b"),
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persist_failure_does_not_fail_the_refresh() {
        // Point the store at a path occupied by a regular file so the
        // directory cannot be created
        let dir = tempdir().unwrap();
        let blocked = dir.path().join("not_a_dir");
        std::fs::write(&blocked, b"occupied").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let service = RefreshService::new(
            registry_of(vec![MockProvider::new("mock", calls)]),
            InstrumentStore::new(&blocked),
        );

        let mut instrument = Instrument::new("ACME");
        service.refresh(&mut instrument, false).await.unwrap();
        assert!(instrument.last_refreshed.is_some());
    }
}

// ═══════════════════════════════════════════════════════════════════
//  ValuationService — opening positions
// ═══════════════════════════════════════════════════════════════════

mod open_position {
    use super::*;

    /// Daily closes Mon 10 / Wed 12 / Fri 15, no intraday.
    fn acme() -> Instrument {
        let mut instrument = Instrument::new("ACME");
        instrument.daily = PriceSeries::from_points(vec![
            point(ts(2025, 1, 6, 16, 0), 10.0),
            point(ts(2025, 1, 8, 16, 0), 12.0),
            point(ts(2025, 1, 10, 16, 0), 15.0),
        ]);
        instrument
    }

    #[test]
    fn explicit_shares_used_as_given() {
        let service = ValuationService::new();
        let position = service.open_position(
            &acme(),
            OpenRequest {
                invested_amount: 1000.0,
                shares: Some(42.0),
                ..Default::default()
            },
            "EUR",
        );
        assert_eq!(position.number_of_shares, 42.0);
        assert_eq!(position.purchase_price, None);
        // Revalued against the latest close of 15
        assert_eq!(position.current_value, 42.0 * 15.0);
    }

    #[test]
    fn negative_share_count_clamped_to_zero() {
        let service = ValuationService::new();
        let position = service.open_position(
            &acme(),
            OpenRequest {
                invested_amount: 1000.0,
                shares: Some(-5.0),
                ..Default::default()
            },
            "EUR",
        );
        assert_eq!(position.number_of_shares, 0.0);
    }

    #[test]
    fn explicit_price_derives_exact_share_count() {
        let service = ValuationService::new();
        let position = service.open_position(
            &acme(),
            OpenRequest {
                invested_amount: 1000.0,
                purchase_price: Some(8.0),
                ..Default::default()
            },
            "EUR",
        );
        // Exactly amount / price, no rounding
        assert_eq!(position.number_of_shares, 125.0);
        assert_eq!(position.purchase_price, Some(8.0));
    }

    #[test]
    fn non_positive_explicit_price_is_ignored() {
        let service = ValuationService::new();
        let position = service.open_position(
            &acme(),
            OpenRequest {
                invested_amount: 1000.0,
                purchase_price: Some(-8.0),
                purchased_at: Some(ts(2025, 1, 7, 12, 0)),
                ..Default::default()
            },
            "EUR",
        );
        // Falls through to the historical price for Tuesday (Monday's 10)
        assert_eq!(position.purchase_price, Some(10.0));
        assert_eq!(position.number_of_shares, 100.0);
    }

    #[test]
    fn purchase_timestamp_resolves_historical_price() {
        let service = ValuationService::new();
        // 1000 invested on the gap Tuesday → Monday's close of 10 → 100 shares
        let position = service.open_position(
            &acme(),
            OpenRequest {
                invested_amount: 1000.0,
                purchased_at: Some(ts(2025, 1, 7, 12, 0)),
                ..Default::default()
            },
            "EUR",
        );
        assert_eq!(position.number_of_shares, 100.0);
        assert_eq!(position.purchase_price, Some(10.0));
        assert_eq!(position.opened_at, ts(2025, 1, 7, 12, 0));
        // Current value reflects the latest close of 15
        assert_eq!(position.current_value, 1500.0);
        assert!((position.performance() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn without_timestamp_current_price_is_used() {
        let service = ValuationService::new();
        let position = service.open_position(
            &acme(),
            OpenRequest {
                invested_amount: 300.0,
                ..Default::default()
            },
            "EUR",
        );
        assert_eq!(position.purchase_price, Some(15.0));
        assert_eq!(position.number_of_shares, 20.0);
    }

    #[test]
    fn no_data_at_all_gives_degenerate_zero_share_position() {
        let service = ValuationService::new();
        let position = service.open_position(
            &Instrument::new("ACME"),
            OpenRequest {
                invested_amount: 1000.0,
                ..Default::default()
            },
            "EUR",
        );
        assert_eq!(position.number_of_shares, 0.0);
        assert_eq!(position.purchase_price, None);
        // Value stays at the invested amount until data arrives
        assert_eq!(position.current_value, 1000.0);
        assert_eq!(position.performance(), 0.0);
    }

    #[test]
    fn currency_defaults_and_overrides() {
        let service = ValuationService::new();
        let defaulted = service.open_position(
            &acme(),
            OpenRequest {
                invested_amount: 100.0,
                ..Default::default()
            },
            "EUR",
        );
        assert_eq!(defaulted.currency, "EUR");

        let explicit = service.open_position(
            &acme(),
            OpenRequest {
                invested_amount: 100.0,
                currency: Some("USD".to_string()),
                ..Default::default()
            },
            "EUR",
        );
        assert_eq!(explicit.currency, "USD");
    }

    #[test]
    fn tags_are_carried_over() {
        let service = ValuationService::new();
        let position = service.open_position(
            &acme(),
            OpenRequest {
                invested_amount: 100.0,
                tags: vec!["tech".into(), "long".into()],
                ..Default::default()
            },
            "EUR",
        );
        assert_eq!(position.tags, vec!["tech".to_string(), "long".to_string()]);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  ValuationService — revaluation & history
// ═══════════════════════════════════════════════════════════════════

mod revaluation {
    use super::*;
    use chrono::NaiveDate;
    use invest_tracker_core::models::position::Position;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn instrument_with_closes(closes: &[(DateTime<Utc>, f64)]) -> Instrument {
        let mut instrument = Instrument::new("ACME");
        instrument.daily = PriceSeries::from_points(
            closes.iter().map(|&(at, p)| point(at, p)).collect(),
        );
        instrument
    }

    #[test]
    fn update_value_tracks_latest_price() {
        let service = ValuationService::new();
        let instrument = instrument_with_closes(&[(ts(2025, 1, 10, 16, 0), 15.0)]);
        let mut position =
            Position::new("ACME", 1000.0, "EUR", 100.0, Some(10.0), Utc::now(), vec![]);

        let value = service.update_value(&mut position, &instrument);
        assert_eq!(value, 1500.0);
        assert_eq!(position.current_value, 1500.0);
    }

    #[test]
    fn update_value_keeps_stale_value_when_price_missing() {
        let service = ValuationService::new();
        let empty = Instrument::new("ACME");
        let mut position =
            Position::new("ACME", 1000.0, "EUR", 100.0, Some(10.0), Utc::now(), vec![]);
        position.current_value = 1234.0;

        let value = service.update_value(&mut position, &empty);
        assert_eq!(value, 1234.0);
        assert_eq!(position.current_value, 1234.0);
    }

    #[test]
    fn performance_history_scales_closes_by_share_count() {
        let service = ValuationService::new();
        let instrument = instrument_with_closes(&[
            (ts(2025, 1, 6, 16, 0), 10.0),
            (ts(2025, 1, 8, 16, 0), 12.0),
        ]);
        let position =
            Position::new("ACME", 1000.0, "EUR", 100.0, Some(10.0), Utc::now(), vec![]);

        let history = service.performance_history(&position, &instrument, 30);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].date, d(2025, 1, 6));
        assert_eq!(history[0].value, 1000.0);
        assert_eq!(history[1].value, 1200.0);
    }

    #[test]
    fn performance_history_empty_for_zero_shares() {
        let service = ValuationService::new();
        let instrument = instrument_with_closes(&[(ts(2025, 1, 6, 16, 0), 10.0)]);
        let position = Position::new("ACME", 1000.0, "EUR", 0.0, None, Utc::now(), vec![]);
        assert!(service
            .performance_history(&position, &instrument, 30)
            .is_empty());
    }
}
