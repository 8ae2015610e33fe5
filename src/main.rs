//! Back/lay arbitrage scanner entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use backlay_arb::api::{create_router, AppState};
use backlay_arb::arbitrage::OpportunityGate;
use backlay_arb::config::Config;
use backlay_arb::exchange::{ExchangeGateway, SessionManager};
use backlay_arb::metrics;
use backlay_arb::notify::LogNotifier;
use backlay_arb::odds::OddsClient;
use backlay_arb::scanner::Scanner;
use backlay_arb::store::MemoryStore;
use backlay_arb::utils::shutdown_signal;

/// Back/lay arbitrage scanner.
#[derive(Parser, Debug)]
#[command(name = "backlay-arb")]
#[command(about = "Scans bookmaker back prices against exchange lay prices for arbitrage")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port for health/metrics (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scan loop with the HTTP API (default).
    Run {
        /// HTTP server port for health/metrics (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a single scan cycle and exit.
    Scan,

    /// Check configuration validity.
    CheckConfig,

    /// Log in to the exchange and fetch account funds.
    CheckSession,

    /// Look up the exchange market for one event.
    FindMarket {
        /// Feed sport key, e.g. soccer_epl.
        #[arg(long)]
        sport: String,

        /// Event name to search for.
        #[arg(long)]
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("backlay_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::CheckSession) => cmd_check_session().await,
        Some(Command::FindMarket { sport, query }) => cmd_find_market(sport, query).await,
        Some(Command::Scan) => cmd_scan().await,
        Some(Command::Run { port }) => cmd_run(port).await,
        None => cmd_run(args.port).await,
    }
}

fn load_and_validate() -> anyhow::Result<Config> {
    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config)
}

fn build_session(config: &Config, store: Arc<MemoryStore>) -> anyhow::Result<Arc<SessionManager>> {
    Ok(Arc::new(SessionManager::new(
        store,
        config.exchange_auth_url.clone(),
        config.exchange_app_key.clone(),
        config.exchange_username.clone(),
        config.exchange_password.clone(),
    )?))
}

fn build_gateway(config: &Config, session: Arc<SessionManager>) -> anyhow::Result<ExchangeGateway> {
    Ok(ExchangeGateway::new(
        session,
        config.exchange_api_url.clone(),
        config.exchange_account_url.clone(),
        config.exchange_app_key.clone(),
    )?)
}

fn build_scanner(config: Arc<Config>, store: Arc<MemoryStore>) -> anyhow::Result<Scanner> {
    let session = build_session(&config, store.clone())?;
    let gateway = build_gateway(&config, session)?;
    let odds = OddsClient::new(config.odds_api_key.clone(), config.odds_regions.clone())?
        .with_base_url(config.odds_api_url.clone());
    let gate = OpportunityGate::new(store, config.min_profit_margin);

    Ok(Scanner::new(
        config,
        odds,
        gateway,
        gate,
        Arc::new(LogNotifier),
    ))
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("BACK/LAY ARB SCANNER - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Detection Strategy: {}", config.detection);
    println!("  Min Profit Margin: {}", config.min_profit_margin);
    println!(
        "  Stake Range: {}..{}",
        config.stake_min, config.stake_max
    );
    println!("  Sports: {}", config.sports);
    println!("  Odds Regions: {}", config.odds_regions);
    println!("  Scan Interval: {}s", config.scan_interval_secs);
    println!("  Auto Bet: {}", config.auto_bet);
    if config.auto_bet {
        println!("  Target Liability: {}", config.target_liability);
    }
    println!("  HTTP Port: {}", config.port);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Log in to the exchange and fetch account funds.
async fn cmd_check_session() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("BACK/LAY ARB SCANNER - SESSION CHECK");
    println!("======================================================================");

    let config = load_and_validate()?;

    println!("Identity endpoint: {}", config.exchange_auth_url);
    println!("Betting API: {}", config.exchange_api_url);
    println!("======================================================================");

    let store = Arc::new(MemoryStore::new());

    // Log in
    print!("\n1. Logging in... ");
    let session = build_session(&config, store)?;
    match session.login().await {
        Ok(_) => {
            println!("OK");
            println!("   Session token acquired");
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
            return Err(anyhow::anyhow!("Exchange login failed"));
        }
    }

    // Fetch funds
    print!("\n2. Fetching account funds... ");
    let gateway = build_gateway(&config, session)?;
    match gateway.account_funds().await {
        Ok(funds) => {
            println!("OK");
            println!("   Available to bet: {:.2}", funds.available_to_bet_balance);
            if let Some(exposure) = funds.exposure {
                println!("   Exposure: {:.2}", exposure);
            }
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    println!("\n======================================================================");
    println!("SESSION CHECK COMPLETED");
    println!("======================================================================");

    Ok(())
}

/// Look up the exchange market for one event.
async fn cmd_find_market(sport: String, query: String) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("BACK/LAY ARB SCANNER - MARKET LOOKUP");
    println!("======================================================================");

    let config = load_and_validate()?;
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&config, store)?;
    let gateway = build_gateway(&config, session)?;

    println!("\nSearching for \"{}\" ({})...\n", query, sport);

    match gateway.find_market(&sport, &query).await {
        Ok(Some(market)) => {
            println!("MARKET FOUND");
            println!("----------------------------------------------------------------------");
            println!("  Market ID: {}", market.market_id);
            println!("  Name: {}", market.market_name);
            println!("  Runners:");
            for runner in &market.runners {
                let back = runner
                    .best_back()
                    .map(|p| format!("{} @ {}", p.size, p.price))
                    .unwrap_or_else(|| "-".to_string());
                let lay = runner
                    .best_lay()
                    .map(|p| format!("{} @ {}", p.size, p.price))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "    {} (id {}): back {} / lay {}",
                    runner.name, runner.selection_id, back, lay
                );
            }
            println!("======================================================================");
        }
        Ok(None) => {
            println!("NO MARKET FOUND");
            println!("  The sport may be unmapped or the event not yet listed.");
            println!("======================================================================");
        }
        Err(e) => {
            println!("LOOKUP FAILED");
            println!("  Error: {}", e);
            println!("======================================================================");
        }
    }

    Ok(())
}

/// Run a single scan cycle and exit.
async fn cmd_scan() -> anyhow::Result<()> {
    let config = Arc::new(load_and_validate()?);
    let store = Arc::new(MemoryStore::new());
    let scanner = build_scanner(config, store)?;

    info!("Running a single scan cycle...");
    let stats = scanner.scan_cycle().await;

    println!("======================================================================");
    println!("SCAN CYCLE SUMMARY");
    println!("======================================================================");
    println!("  Sports scanned: {}", stats.sports_scanned);
    println!("  Events scanned: {}", stats.events_scanned);
    println!("  Markets matched: {}", stats.markets_matched);
    println!("  Opportunities detected: {}", stats.opportunities_detected);
    println!("  Approved: {}", stats.opportunities_approved);
    println!("  Rejected: {}", stats.opportunities_rejected);
    println!("  Orders placed: {}", stats.orders_placed);
    println!("  Errors: {}", stats.errors);
    if stats.quota_exhausted {
        println!("  WARNING: feed quota exhausted, cycle was cut short");
    }
    println!("======================================================================");

    Ok(())
}

/// Run the scan loop with the HTTP API.
async fn cmd_run(port_override: Option<u16>) -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    let config = Arc::new(config);
    let port = port_override.unwrap_or(config.port);

    // Install the metrics recorder before anything records
    let prometheus = PrometheusBuilder::new().install_recorder()?;
    metrics::init_metrics();

    // Create app state
    let app_state = AppState::new(prometheus);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());

    // Spawn HTTP server
    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    // Build the scanner
    let store = Arc::new(MemoryStore::new());
    let scanner = build_scanner(config.clone(), store)?;

    info!("========================================");
    info!("BACK/LAY ARBITRAGE SCANNER STARTED");
    info!("========================================");
    info!("Strategy: {}", config.detection);
    info!("Sports: {}", config.sports);
    info!("Min margin: {}", config.min_profit_margin);
    info!("Stake range: {}..{}", config.stake_min, config.stake_max);
    info!(
        "Auto bet: {}",
        if config.auto_bet { "ENABLED" } else { "disabled" }
    );
    info!("Scan interval: {}s", config.scan_interval_secs);
    info!("========================================");

    app_state.set_ready(true);

    let mut interval = tokio::time::interval(Duration::from_secs(config.scan_interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let stats = scanner.scan_cycle().await;
                app_state.record_scan(stats).await;
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping scan loop");
                break;
            }
        }
    }

    app_state.set_ready(false);
    Ok(())
}
