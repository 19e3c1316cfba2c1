use async_trait::async_trait;
use cryptowatch::alerts::{AlertConditions, AlertRule, CapitalFlowCondition, TriggerKind};
use cryptowatch::apis::{CoinListing, CoinMarket, Kline, MarketApi, Ticker24h};
use cryptowatch::cache::ResponseCache;
use cryptowatch::config::{
    parse_config, report_config_problems, CacheConfig, MonitorConfig, MonitoredSymbol, RateLimitConfig,
    WindowLimitConfig,
};
use cryptowatch::errors::{CryptoWatchError, CryptoWatchResult};
use cryptowatch::market::MarketDataService;
use cryptowatch::monitor::{Monitor, MonitorEvent};
use cryptowatch::rate_limiter::RateLimiter;
use cryptowatch::shutdown::ShutdownSignal;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Scripted exchange: tickers can be made to throttle once
#[derive(Default)]
struct FakeExchange {
    requests: AtomicUsize,
    throttle_next_ticker: Mutex<Option<u64>>,
    prices: Mutex<Vec<(String, f64)>>,
}

impl FakeExchange {
    fn with_prices(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: Mutex::new(prices.iter().map(|(s, p)| (s.to_string(), *p)).collect()),
            ..Self::default()
        }
    }

    fn set_price(&self, symbol: &str, price: f64) {
        for entry in self.prices.lock().iter_mut() {
            if entry.0 == symbol {
                entry.1 = price;
            }
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketApi for FakeExchange {
    async fn fetch_klines(&self, _symbol: &str, _interval: &str, limit: u32) -> CryptoWatchResult<Vec<Kline>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        // Slow uptrend: enough history for every indicator
        Ok((0..limit as i64)
            .map(|i| Kline {
                open_time: i * 3_600_000,
                close: 100.0 + i as f64 * 0.5,
                close_time: (i + 1) * 3_600_000 - 1,
                ..Kline::default()
            })
            .collect())
    }

    async fn fetch_tickers(&self) -> CryptoWatchResult<Vec<Ticker24h>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(retry_after) = self.throttle_next_ticker.lock().take() {
            return Err(CryptoWatchError::Throttled {
                endpoint: "ticker/24hr".to_string(),
                retry_after_secs: Some(retry_after),
            });
        }
        Ok(self
            .prices
            .lock()
            .iter()
            .map(|(symbol, price)| Ticker24h {
                symbol: symbol.clone(),
                last_price: *price,
                price_change_percent: -6.0,
                quote_volume: 3.0e9,
            })
            .collect())
    }

    async fn fetch_exchange_symbols(&self) -> CryptoWatchResult<Vec<String>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["BTCUSDT".to_string(), "ETHUSDT".to_string(), "ETHBTC".to_string()])
    }

    async fn fetch_coins_list(&self) -> CryptoWatchResult<Vec<CoinListing>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            CoinListing {
                id: "bitcoin".to_string(),
                symbol: "btc".to_string(),
                name: "Bitcoin".to_string(),
            },
            CoinListing {
                id: "ethereum".to_string(),
                symbol: "eth".to_string(),
                name: "Ethereum".to_string(),
            },
        ])
    }

    async fn fetch_coin_markets(&self, ids: &[String]) -> CryptoWatchResult<Vec<CoinMarket>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(ids
            .iter()
            .map(|id| CoinMarket {
                id: id.clone(),
                market_cap: Some(if id == "bitcoin" { 1.2e12 } else { 2.0e10 }),
            })
            .collect())
    }

    async fn fetch_global(&self) -> CryptoWatchResult<Value> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"data": {"market_cap_percentage": {"btc": 51.2}}}))
    }
}

struct Harness {
    exchange: Arc<FakeExchange>,
    monitor: Arc<Monitor>,
    events: UnboundedReceiver<MonitorEvent>,
}

fn harness(symbols: Vec<MonitoredSymbol>, rate_limit: RateLimitConfig) -> Harness {
    let exchange = Arc::new(FakeExchange::with_prices(&[("BTCUSDT", 60_000.0), ("ETHUSDT", 3_000.0)]));
    let market = Arc::new(MarketDataService::new(
        Arc::clone(&exchange) as Arc<dyn MarketApi>,
        Arc::new(ResponseCache::new()),
        Arc::new(RateLimiter::new(&rate_limit)),
        CacheConfig::default(),
    ));

    let mut config = MonitorConfig {
        symbols,
        check_interval_seconds: 300,
        ..MonitorConfig::default()
    };
    config.coingecko_names.insert("BTC".to_string(), "Bitcoin".to_string());
    config.coingecko_names.insert("ETH".to_string(), "Ethereum".to_string());

    let (tx, rx) = mpsc::unbounded_channel();
    Harness {
        exchange,
        monitor: Arc::new(Monitor::new(market, config, tx)),
        events: rx,
    }
}

fn drain(rx: &mut UnboundedReceiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn alert_kinds(events: &[MonitorEvent]) -> Vec<TriggerKind> {
    events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::Alert(alert) => Some(alert.trigger.kind),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn background_loop_refetches_expired_responses() {
    let mut h = harness(
        vec![MonitoredSymbol::new("BTCUSDT"), MonitoredSymbol::new("ETHUSDT")],
        RateLimitConfig::default(),
    );
    let shutdown = ShutdownSignal::new();

    let runner = Arc::clone(&h.monitor);
    let signal = shutdown.clone();
    let handle = tokio::spawn(async move { runner.run_monitoring_cycle(&signal).await });

    // First cycle plus most of the interval
    tokio::time::sleep(Duration::from_secs(200)).await;
    let after_first = h.exchange.requests();
    // tickers, coins list, market caps, two klines, global
    assert_eq!(after_first, 6);

    // Second cycle starts just past 300s: only the hour-long coins list survives
    tokio::time::sleep(Duration::from_secs(200)).await;
    let second = h.exchange.requests() - after_first;
    assert_eq!(second, 5);

    shutdown.trigger();
    handle.await.unwrap();

    let completed = drain(&mut h.events)
        .into_iter()
        .filter(|e| matches!(e, MonitorEvent::CycleCompleted(_)))
        .count();
    assert_eq!(completed, 2);
}

#[tokio::test(start_paused = true)]
async fn alerts_rearm_after_condition_clears() {
    let rule = AlertRule {
        conditions: AlertConditions {
            price_below: Some(55_000.0),
            ..AlertConditions::default()
        },
        notes: None,
    };
    let mut h = harness(
        vec![MonitoredSymbol::new("BTCUSDT").with_alert(rule)],
        RateLimitConfig::default(),
    );
    let shutdown = ShutdownSignal::new();
    let market = Arc::clone(h.monitor.market());

    let mut fired = Vec::new();
    for price in [60_000.0, 50_000.0, 49_000.0, 58_000.0, 54_000.0] {
        h.exchange.set_price("BTCUSDT", price);
        market.force_refresh();
        h.monitor.run_single_cycle(&shutdown).await;
        fired.push(alert_kinds(&drain(&mut h.events)).len());
        tokio::time::sleep(Duration::from_secs(60)).await;
    }

    assert_eq!(fired, vec![0, 1, 0, 0, 1]);
}

#[tokio::test(start_paused = true)]
async fn capital_outflow_uses_market_cap() {
    let rule = AlertRule {
        conditions: AlertConditions {
            capital_outflow: Some(CapitalFlowCondition {
                volume_pct_of_mcap: 10.0,
                price_change_pct: -5.0,
            }),
            ..AlertConditions::default()
        },
        notes: Some("watch ETH".to_string()),
    };
    // ETH: 3e9 volume over 2e10 cap = 15%, change -6%
    let mut h = harness(
        vec![MonitoredSymbol::new("ETHUSDT").with_alert(rule)],
        RateLimitConfig::default(),
    );

    h.monitor.run_single_cycle(&ShutdownSignal::new()).await;
    let events = drain(&mut h.events);
    assert_eq!(alert_kinds(&events), vec![TriggerKind::CapitalOutflow]);

    let Some(MonitorEvent::Alert(alert)) = events.iter().find(|e| matches!(e, MonitorEvent::Alert(_))) else {
        panic!("alert event expected");
    };
    assert!(alert.message.starts_with("ALERT: ETHUSDT"));
    assert!(alert.message.contains("Market cap: $20,000,000,000"));
    assert!(alert.message.contains("Notes: watch ETH"));
    assert_eq!(alert.sound_key, "critical_alert");
}

#[tokio::test(start_paused = true)]
async fn throttled_ticker_skips_cycle_and_cools_down() {
    let mut h = harness(vec![MonitoredSymbol::new("BTCUSDT")], RateLimitConfig::default());
    *h.exchange.throttle_next_ticker.lock() = Some(30);
    let shutdown = ShutdownSignal::new();
    let limiter = Arc::clone(h.monitor.market().limiter());

    let summary = h.monitor.run_single_cycle(&shutdown).await;
    assert!(summary.ticker_unavailable);
    assert!(limiter.cooldown_remaining() >= Duration::from_secs(29));
    assert!(!limiter.can_perform_manual_update().allowed);

    // The next cycle waits out the cooldown before its first request
    let start = tokio::time::Instant::now();
    let summary = h.monitor.run_single_cycle(&shutdown).await;
    assert!(!summary.ticker_unavailable);
    assert_eq!(summary.analyzed, 1);
    assert!(start.elapsed() >= Duration::from_secs(29));
    assert_eq!(limiter.consecutive_throttles(), 0);
    drain(&mut h.events);
}

#[tokio::test(start_paused = true)]
async fn manual_update_respects_manual_thresholds() {
    let rate_limit = RateLimitConfig {
        windows: vec![WindowLimitConfig::new("1min", 60, 12, 10)],
        manual_safety_percent: 80.0,
        ..RateLimitConfig::default()
    };
    let symbols: Vec<MonitoredSymbol> = ["BTCUSDT", "ETHUSDT"]
        .iter()
        .map(|s| MonitoredSymbol::new(*s))
        .collect();
    let mut h = harness(symbols, rate_limit);
    let limiter = Arc::clone(h.monitor.market().limiter());

    let start = tokio::time::Instant::now();
    let status = h.monitor.run_manual_update().await;
    assert!(!status.is_rejected());
    assert!(!limiter.is_manual_mode());

    // 2 explicit permits, ticker, coins list, caps per symbol, 2 klines and
    // global: 9 requests against a manual limit of 10, so no waiting
    assert_eq!(limiter.get_current_usage().windows[0].requests, 9);
    assert!(start.elapsed() < Duration::from_secs(60));

    // 9 of 12 is past the 80% safety threshold
    assert!(!limiter.can_perform_manual_update().allowed);
    assert!(h.monitor.run_manual_update().await.is_rejected());
    drain(&mut h.events);
}

#[tokio::test(start_paused = true)]
async fn invalid_symbol_in_config_only_skips_itself() {
    let config = parse_config(
        r#"
[monitor]
symbols = [{ symbol = "BTCUSDT" }, { symbol = "bad-one" }]
"#,
    )
    .unwrap();
    assert_eq!(report_config_problems(&config), 1);

    let mut h = harness(config.monitor.symbols.clone(), config.rate_limit.clone());
    let summary = h.monitor.run_single_cycle(&ShutdownSignal::new()).await;
    assert_eq!(summary.analyzed, 1);
    assert_eq!(summary.skipped, 1);

    let analyzed: Vec<String> = drain(&mut h.events)
        .into_iter()
        .filter_map(|e| match e {
            MonitorEvent::Data(snapshot) => Some(snapshot.symbol),
            _ => None,
        })
        .collect();
    assert_eq!(analyzed, vec!["BTCUSDT".to_string()]);
}
