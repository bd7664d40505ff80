use anyhow::Result;
use colored::Colorize;
use nse_signal_screener::{api_server_axum, config, logging, notifier, CycleReport, Screener, ScreenerConfig};
use std::time::Instant;

/// Print one cycle's signals and failures
fn print_cycle(report: &CycleReport, elapsed_secs: f64) {
    for symbol_report in &report.symbols {
        match &symbol_report.outcome {
            Ok(screened) => {
                println!(
                    "{} {} (expiry {}) → {} signal(s)",
                    "✓".green(),
                    screened.symbol.yellow(),
                    screened.expiry,
                    screened.signals.len()
                );
                println!(
                    "    CE avg OI: {:.0}, avg vol: {:.0} | PE avg OI: {:.0}, avg vol: {:.0}",
                    screened.call_stats.avg_change_in_oi,
                    screened.call_stats.avg_volume,
                    screened.put_stats.avg_change_in_oi,
                    screened.put_stats.avg_volume
                );
                if screened.signals.is_empty() {
                    println!("    {} No signals found for this strategy right now.", "ℹ".blue());
                }
                for signal in &screened.signals {
                    println!();
                    for line in signal.card().lines() {
                        println!("    {}", line);
                    }
                }
            }
            Err(e) => {
                let msg: String = e.to_string().chars().take(80).collect();
                println!("{} {} → {}", "✗".red(), symbol_report.symbol.yellow(), msg);
            }
        }
        println!();
    }

    println!("{}", "=".repeat(60).blue());
    println!("{} Successful: {}", "✓".green(), report.successful());
    println!("{} Failed: {}", "✗".red(), report.failures().count());
    println!("{} Signals: {}", "ℹ".blue(), report.signals().count());
    if report.notify_failures() > 0 {
        println!("{} Undelivered notifications: {}", "⚠".yellow(), report.notify_failures());
    }
    println!("{} Time taken: {:.2}s", "⏱".yellow(), elapsed_secs);
    println!("{}", "=".repeat(60).blue());
}

async fn run_cycle(screener: &Screener) {
    let start_time = Instant::now();
    let report = screener.run_cycle().await;
    print_cycle(&report, start_time.elapsed().as_secs_f64());
}

fn build_screener(config: ScreenerConfig) -> Result<Screener> {
    let sink = notifier::notifier_from_config(config.telegram.as_ref())?;
    Ok(Screener::new(config, sink))
}

fn print_banner(title: &str, config: &ScreenerConfig) {
    println!("{}", "=".repeat(60).blue());
    println!("{}", title.green().bold());
    println!("{}", "=".repeat(60).blue());
    println!("{} Symbols: {}", "→".cyan(), config.symbols.join(", ").yellow());
    println!("{} Strategy: {}", "→".cyan(), config.strategy.yellow());
    println!("{} Threshold mode: {}", "→".cyan(), config.policy.name().yellow());
    println!(
        "{} Notifier: {}",
        "→".cyan(),
        if config.telegram.is_some() { "telegram" } else { "log" }
    );
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let mode = config::get_execution_mode();
    let screener_config = ScreenerConfig::from_env()?;

    tracing::info!(
        mode = %mode,
        strategy = %screener_config.strategy,
        policy = %screener_config.policy,
        symbols = ?screener_config.symbols,
        "starting"
    );

    match mode.as_str() {
        "poll" => {
            print_banner("NSE Option Screener", &screener_config);
            let screener = build_screener(screener_config)?;
            run_cycle(&screener).await;
        }
        "watch" => {
            print_banner("NSE Option Screener (watch)", &screener_config);
            let interval = config::get_poll_interval();
            let screener = build_screener(screener_config)?;
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => run_cycle(&screener).await,
                    _ = tokio::signal::ctrl_c() => {
                        println!("{} Stopping", "ℹ".blue());
                        break;
                    }
                }
            }
        }
        "server" => {
            print_banner("NSE Option Chain Server", &screener_config);
            api_server_axum::start_server(screener_config, config::get_port()).await?;
        }
        _ => {
            eprintln!("Invalid mode '{}'. Use 'poll', 'watch' or 'server'", mode);
            eprintln!("Set SCREENER_MODE environment variable to control execution mode");
            eprintln!("Examples:");
            eprintln!("  SCREENER_MODE=poll cargo run");
            eprintln!("  SCREENER_MODE=watch SCREENER_POLL_INTERVAL_SECS=60 cargo run");
            eprintln!("  SCREENER_MODE=server SCREENER_PORT=3001 cargo run");
            eprintln!("  SCREENER_STRATEGY='OI Surge' SCREENER_THRESHOLD_MODE=fixed cargo run");
            std::process::exit(1);
        }
    }

    Ok(())
}
