use chrono::Utc;

mod app;
mod config;
mod db;
mod error;
mod feed;
mod models;
mod pipeline;
mod services;

use app::App;
use config::Config;
use error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; pipeline counts go to stderr so cron logs show them
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);

    let config = Config::load()?;
    let app = App::new(config).await?;

    let now = Utc::now();
    let force = std::env::var("FORCE_RUN").map(|v| v == "1").unwrap_or(false);

    match command {
        Some("daily") => app.run_daily(now).await?,
        Some("priority") => app.run_priority(now, force).await?,
        Some("scan") => {
            let stats = app.run_scan(now).await?;
            println!(
                "scan: raw={} dropped={} new={} updated={} unchanged={} fresh={}",
                stats.raw_count,
                stats.dropped_count,
                stats.new_count,
                stats.updated_count,
                stats.unchanged_count,
                stats.fresh_count
            );
        }
        Some("status") => app.print_status().await?,
        _ => {
            eprintln!("Usage: news-radar <daily|priority|scan|status>");
            eprintln!();
            eprintln!("  daily     scan all sources and send the daily digest");
            eprintln!("  priority  scan and send urgent alerts (suppressed in quiet hours;");
            eprintln!("            set FORCE_RUN=1 to override)");
            eprintln!("  scan      ingest only, no delivery");
            eprintln!("  status    show the most recent scan_log entry");
            std::process::exit(2);
        }
    }

    Ok(())
}
