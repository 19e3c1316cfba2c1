use super::events::{CycleSummary, ManualUpdateStatus, MonitorEvent};
use super::snapshot::AnalysisSnapshot;
use crate::alerts::{self, AlertEvent, AlertTracker};
use crate::apis::Ticker24h;
use crate::config::{MonitorConfig, MonitoredSymbol};
use crate::indicators;
use crate::logger::{self, LogTag};
use crate::market::{MarketDataService, DOMINANCE_UNAVAILABLE};
use crate::shutdown::ShutdownSignal;
use crate::validator;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Progress is reported after this many symbols during a manual update
const PROGRESS_EVERY: usize = 5;

/// Background monitoring loop plus the on-demand update paths
///
/// Every path shares the same `MarketDataService`, so the cycle and the
/// manual actions draw from one cache and one request budget. Results only
/// leave through the event channel.
pub struct Monitor {
    market: Arc<MarketDataService>,
    config: RwLock<MonitorConfig>,
    alerts: Mutex<AlertTracker>,
    events: UnboundedSender<MonitorEvent>,
}

impl Monitor {
    pub fn new(
        market: Arc<MarketDataService>,
        config: MonitorConfig,
        events: UnboundedSender<MonitorEvent>,
    ) -> Self {
        Self {
            market,
            config: RwLock::new(config),
            alerts: Mutex::new(AlertTracker::new()),
            events,
        }
    }

    pub fn market(&self) -> &Arc<MarketDataService> {
        &self.market
    }

    pub fn config(&self) -> MonitorConfig {
        self.config.read().clone()
    }

    /// Swap in a new configuration; takes effect at the next symbol
    ///
    /// Symbols whose alert rule changed have their suppression state cleared.
    pub fn update_config(&self, config: MonitorConfig) {
        let mut current = self.config.write();
        {
            let mut tracker = self.alerts.lock();
            for entry in &config.symbols {
                let previous = current.find_symbol(&entry.symbol).and_then(|s| s.alert.as_ref());
                if previous != entry.alert.as_ref() {
                    tracker.reset(&entry.symbol);
                }
            }
        }
        *current = config;
        logger::info(LogTag::Config, "Monitor configuration updated");
    }

    /// Loop until shutdown: one cycle, then an interruptible sleep
    pub async fn run_monitoring_cycle(&self, shutdown: &ShutdownSignal) {
        logger::info(LogTag::Monitor, "Monitoring cycle started");

        while !shutdown.is_triggered() {
            let config = self.config();

            if config.symbols.is_empty() {
                logger::debug(LogTag::Monitor, "No symbols configured, waiting");
                if shutdown
                    .check_shutdown_or_delay(Duration::from_secs(config.idle_poll_seconds))
                    .await
                {
                    break;
                }
                continue;
            }

            let summary = self.run_single_cycle(shutdown).await;
            if summary.interrupted {
                break;
            }

            let interval = Duration::from_secs(config.check_interval_seconds);
            logger::debug(
                LogTag::Monitor,
                &format!("Cycle done, next in {}s", interval.as_secs()),
            );
            if shutdown.check_shutdown_or_delay(interval).await {
                break;
            }
        }

        logger::info(LogTag::Monitor, "Monitoring cycle stopped");
    }

    /// One pass over every configured symbol, without the trailing sleep
    pub async fn run_single_cycle(&self, shutdown: &ShutdownSignal) -> CycleSummary {
        let config = self.config();
        let mut summary = CycleSummary::default();

        let tickers = match self.market.tickers().await {
            Ok(tickers) if !tickers.is_empty() => tickers,
            Ok(_) => {
                logger::warning(LogTag::Monitor, "Ticker data empty, skipping this cycle");
                summary.ticker_unavailable = true;
                self.publish(MonitorEvent::CycleCompleted(summary.clone()));
                return summary;
            }
            Err(e) => {
                logger::warning(
                    LogTag::Monitor,
                    &format!("Could not fetch ticker data ({}), skipping this cycle", e),
                );
                summary.ticker_unavailable = true;
                self.publish(MonitorEvent::CycleCompleted(summary.clone()));
                return summary;
            }
        };

        let caps = self
            .fetch_market_caps(&config.symbol_names(), &config.coingecko_names)
            .await;
        let pause = Duration::from_millis(config.symbol_pause_ms);

        logger::debug(
            LogTag::Monitor,
            &format!("Processing {} symbols", config.symbols.len()),
        );

        for entry in &config.symbols {
            if shutdown.is_triggered() {
                logger::debug(LogTag::Monitor, "Shutdown requested, leaving cycle");
                summary.interrupted = true;
                break;
            }

            if !validator::validate_symbol(&entry.symbol) {
                logger::warning(
                    LogTag::Monitor,
                    &format!("Skipping invalid symbol '{}'", entry.symbol),
                );
                summary.skipped += 1;
                continue;
            }

            let snapshot = self
                .analyze_symbol(&entry.symbol, tickers.get(&entry.symbol), caps.get(&entry.symbol).copied().flatten())
                .await;
            self.publish(MonitorEvent::Data(snapshot.clone()));
            summary.analyzed += 1;
            summary.alerts += self.check_alerts(entry, &snapshot);

            if shutdown.check_shutdown_or_delay(pause).await {
                summary.interrupted = true;
                break;
            }
        }

        if !summary.interrupted {
            self.publish_dominance().await;
        }
        self.market.purge_stale();

        logger::info(
            LogTag::Monitor,
            &format!(
                "Cycle complete: {} analyzed, {} skipped, {} alerts",
                summary.analyzed, summary.skipped, summary.alerts
            ),
        );
        self.publish(MonitorEvent::CycleCompleted(summary.clone()));
        summary
    }

    /// Immediate analysis of one configured symbol
    ///
    /// Unknown symbols are ignored. Alerts are not evaluated here; the
    /// background cycle stays the only source of alerts.
    pub async fn run_single_symbol_update(&self, symbol: &str) -> Option<AnalysisSnapshot> {
        let config = self.config();
        if config.find_symbol(symbol).is_none() {
            logger::warning(
                LogTag::Monitor,
                &format!("{} is not a monitored symbol", symbol),
            );
            return None;
        }

        logger::info(LogTag::Monitor, &format!("Forced update for {}", symbol));
        let snapshot = self.update_symbol(symbol, &config).await;
        self.publish(MonitorEvent::Data(snapshot.clone()));
        Some(snapshot)
    }

    /// Refresh every symbol now, bypassing cached responses
    ///
    /// Refused up front when recent traffic leaves too little headroom. While
    /// it runs the limiter uses the lower manual thresholds.
    pub async fn run_manual_update(&self) -> ManualUpdateStatus {
        let limiter = Arc::clone(self.market.limiter());
        let check = limiter.can_perform_manual_update();
        if !check.allowed {
            logger::warning(
                LogTag::RateLimit,
                &format!("Manual update refused: {}", check.message),
            );
            let status = ManualUpdateStatus::Rejected {
                reason: check.message,
            };
            self.publish(MonitorEvent::ManualUpdate(status.clone()));
            return status;
        }

        let _guard = limiter.manual_update_guard();
        let config = self.config();
        let total = config.symbols.len();

        logger::info(
            LogTag::Monitor,
            &format!("Manual update of {} symbols ({})", total, check.message),
        );
        self.publish(MonitorEvent::ManualUpdate(ManualUpdateStatus::Started { total }));
        self.market.force_refresh();

        let pause = Duration::from_millis(config.symbol_pause_ms);
        let mut updated = 0;

        for (index, entry) in config.symbols.iter().enumerate() {
            if validator::validate_symbol(&entry.symbol) {
                limiter.wait_if_needed().await;
                let snapshot = self.update_symbol(&entry.symbol, &config).await;
                self.publish(MonitorEvent::Data(snapshot));
                updated += 1;
            } else {
                logger::warning(
                    LogTag::Monitor,
                    &format!("Skipping invalid symbol '{}'", entry.symbol),
                );
            }

            let completed = index + 1;
            if completed % PROGRESS_EVERY == 0 && completed < total {
                self.publish(MonitorEvent::ManualUpdate(ManualUpdateStatus::Progress {
                    completed,
                    total,
                }));
            }

            if completed < total && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        self.publish_dominance().await;

        logger::info(
            LogTag::Monitor,
            &format!("Manual update finished: {}/{} symbols", updated, total),
        );
        let status = ManualUpdateStatus::Completed { updated, total };
        self.publish(MonitorEvent::ManualUpdate(status.clone()));
        status
    }

    /// Ticker fields plus indicators; a failed klines fetch keeps the ticker part
    pub async fn analyze_symbol(
        &self,
        symbol: &str,
        ticker: Option<&Ticker24h>,
        market_cap: Option<f64>,
    ) -> AnalysisSnapshot {
        let snapshot = AnalysisSnapshot::from_ticker(symbol, ticker, market_cap);
        let (interval, limit) = {
            let config = self.config.read();
            (config.kline_interval.clone(), config.kline_limit)
        };

        let klines = match self.market.klines(symbol, &interval, limit).await {
            Ok(klines) if !klines.is_empty() => klines,
            Ok(_) => {
                logger::debug(
                    LogTag::Monitor,
                    &format!("No klines for {}, ticker data only", symbol),
                );
                return snapshot;
            }
            Err(e) => {
                logger::warning(
                    LogTag::Monitor,
                    &format!("Klines for {} unavailable: {}", symbol, e),
                );
                return snapshot;
            }
        };

        let closes: Vec<f64> = klines.iter().map(|k| k.close).collect();
        let indicators = indicators::analyze(&closes, snapshot.current_price);
        logger::verbose(
            LogTag::Monitor,
            &format!("{} indicators: {:?}", symbol, indicators),
        );
        snapshot.with_indicators(indicators)
    }

    /// Evaluate the symbol's rule and publish alerts that just started firing
    fn check_alerts(&self, entry: &MonitoredSymbol, snapshot: &AnalysisSnapshot) -> usize {
        let Some(rule) = entry.alert.as_ref().filter(|rule| !rule.is_empty()) else {
            return 0;
        };

        let firing = alerts::evaluate(rule, snapshot);
        let fresh = self.alerts.lock().update(&entry.symbol, firing);

        for trigger in &fresh {
            logger::info(
                LogTag::Alerts,
                &format!("{}: {}", entry.symbol, trigger.message),
            );
            let event = AlertEvent::new(trigger.clone(), snapshot, rule.notes.as_deref());
            self.publish(MonitorEvent::Alert(event));
        }
        fresh.len()
    }

    async fn update_symbol(&self, symbol: &str, config: &MonitorConfig) -> AnalysisSnapshot {
        let ticker = match self.market.tickers().await {
            Ok(tickers) => tickers.get(symbol).cloned(),
            Err(e) => {
                logger::warning(
                    LogTag::Monitor,
                    &format!("Ticker for {} unavailable: {}", symbol, e),
                );
                None
            }
        };
        let caps = self
            .fetch_market_caps(&[symbol.to_string()], &config.coingecko_names)
            .await;

        self.analyze_symbol(symbol, ticker.as_ref(), caps.get(symbol).copied().flatten())
            .await
    }

    async fn fetch_market_caps(
        &self,
        symbols: &[String],
        names: &HashMap<String, String>,
    ) -> Arc<HashMap<String, Option<f64>>> {
        match self.market.market_caps(symbols, names).await {
            Ok(caps) => caps,
            Err(e) => {
                logger::warning(
                    LogTag::Monitor,
                    &format!("Market caps unavailable: {}", e),
                );
                Arc::new(HashMap::new())
            }
        }
    }

    async fn publish_dominance(&self) {
        let dominance = match self.market.btc_dominance().await {
            Ok(value) => value,
            Err(e) => {
                logger::warning(
                    LogTag::Monitor,
                    &format!("BTC dominance unavailable: {}", e),
                );
                DOMINANCE_UNAVAILABLE.to_string()
            }
        };
        self.publish(MonitorEvent::Dominance(dominance));
    }

    fn publish(&self, event: MonitorEvent) {
        if self.events.send(event).is_err() {
            logger::debug(LogTag::Monitor, "Event receiver dropped, event discarded");
        }
    }
}
