use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use cryptowatch::{
    apis::ApiManager,
    arguments::{Args, RunMode},
    cache::ResponseCache,
    config::{self, Config},
    logger::{self, LogLevel, LogTag},
    market::MarketDataService,
    monitor::{ManualUpdateStatus, Monitor, MonitorEvent},
    rate_limiter::RateLimiter,
    shutdown::{install_ctrlc_handler, ShutdownSignal},
};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init();

    if let Err(e) = run(args).await {
        logger::error(LogTag::System, &format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    apply_logging_config(&config);

    logger::info(
        LogTag::System,
        &format!("CryptoWatch {} starting", env!("CARGO_PKG_VERSION")),
    );
    logger::debug(
        LogTag::System,
        &format!(
            "Command-line tags: debug {:?}, verbose {:?}",
            args.debug_tags(),
            args.verbose_tags()
        ),
    );

    let shutdown = ShutdownSignal::new();
    install_ctrlc_handler(shutdown.clone()).map_err(|e| anyhow!(e))?;

    let api = ApiManager::new(&config.apis).map_err(|e| anyhow!(e))?;
    let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    let cache = Arc::new(ResponseCache::with_capacity(config.cache.capacity));
    let market = Arc::new(MarketDataService::new(
        Arc::new(api),
        cache,
        Arc::clone(&limiter),
        config.cache.clone(),
    ));

    if args.mode() == RunMode::ListSymbols {
        let symbols = market
            .quote_symbols(&config.monitor.quote_asset, &config.monitor.symbol_names())
            .await;
        for symbol in symbols {
            println!("{}", symbol);
        }
        return Ok(());
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let monitor = Arc::new(Monitor::new(Arc::clone(&market), config.monitor.clone(), tx));
    let printer = tokio::spawn(print_events(rx));

    match args.mode() {
        RunMode::Continuous => {
            let runner = Arc::clone(&monitor);
            let signal = shutdown.clone();
            let handle = tokio::spawn(async move { runner.run_monitoring_cycle(&signal).await });
            shutdown.wait().await;
            handle.await.context("monitoring task failed")?;
        }
        RunMode::Once => {
            monitor.run_single_cycle(&shutdown).await;
        }
        RunMode::Manual => {
            if let ManualUpdateStatus::Rejected { reason } = monitor.run_manual_update().await {
                logger::warning(LogTag::RateLimit, &reason);
            }
        }
        RunMode::Symbol(symbol) => {
            if monitor.run_single_symbol_update(&symbol).await.is_none() {
                return Err(anyhow!("{} is not in the monitored symbol list", symbol));
            }
        }
        RunMode::ListSymbols => {}
    }

    logger::info(
        LogTag::RateLimit,
        &format!("Request usage: {}", limiter.get_current_usage().summary()),
    );
    let metrics = market.cache().metrics();
    logger::debug(
        LogTag::Cache,
        &format!(
            "Cache: {} hits, {} misses ({:.0}% hit rate)",
            metrics.hits,
            metrics.misses,
            metrics.hit_rate() * 100.0
        ),
    );

    // Closing the channel lets the printer drain and finish
    drop(monitor);
    printer.await.context("event printer failed")?;
    logger::info(LogTag::System, "CryptoWatch stopped");
    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let path = &args.config;
    let config = config::load_config_from_path(path)
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("loading {}", path.display()))?;

    if !path.exists() {
        match config::save_config(&config, path) {
            Ok(()) => logger::info(
                LogTag::Config,
                &format!("Wrote default configuration to {}", path.display()),
            ),
            Err(e) => logger::warning(LogTag::Config, &e),
        }
    }

    let problems = config::report_config_problems(&config);
    if problems > 0 {
        logger::warning(
            LogTag::Config,
            &format!("{} configuration problem(s), continuing with the valid entries", problems),
        );
    }
    Ok(config)
}

fn apply_logging_config(config: &Config) {
    logger::enable_debug_tags(&config.logging.debug_tags);
    if config.logging.verbose {
        logger::update_logger_config(|c| c.min_level = LogLevel::Verbose);
    }
}

async fn print_events(mut rx: UnboundedReceiver<MonitorEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            MonitorEvent::Data(s) => println!(
                "{:<12} ${:<14} {:>7.2}%  RSI {:<6}  BB {:<11} MACD {:<13} EMA {}",
                s.symbol.bold(),
                s.current_price,
                s.price_change_24h,
                s.rsi_signal,
                s.bollinger.to_string(),
                s.macd.to_string(),
                s.ema_cross
            ),
            MonitorEvent::Alert(alert) => {
                println!("\n{}\n", alert.message.red().bold());
            }
            MonitorEvent::Dominance(value) => {
                println!("{} {}", "BTC dominance:".cyan(), value);
            }
            MonitorEvent::CycleCompleted(summary) => {
                if summary.ticker_unavailable {
                    println!("{}", "Cycle skipped: ticker data unavailable".yellow());
                }
            }
            MonitorEvent::ManualUpdate(status) => match status {
                ManualUpdateStatus::Rejected { reason } => println!("{}", reason.yellow()),
                ManualUpdateStatus::Started { total } => {
                    println!("Manual update of {} symbols started", total)
                }
                ManualUpdateStatus::Progress { completed, total } => {
                    println!("  {}/{} symbols updated", completed, total)
                }
                ManualUpdateStatus::Completed { updated, total } => {
                    println!("{}", format!("Manual update done: {}/{}", updated, total).green())
                }
            },
        }
    }
}
