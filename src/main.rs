use anyhow::{Context, Result};
use clap::Parser;
use deal_radar::{
    config::Cli,
    notify::{LogNotifier, NotifierSet, OutboxNotifier, TerminalBell},
    store::JsonFileAlertStore,
    Pipeline,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = cli.into_config();

    info!("==================================================");
    info!("  DEAL RADAR v{}", env!("CARGO_PKG_VERSION"));
    info!("==================================================");
    info!("Input: {}", config.input_dir.display());
    info!("Alert store: {}", config.alert_store_path.display());
    info!(
        "Threshold: {} | top-k: {} | model years {}..={}",
        config.alert_threshold, config.top_k, config.min_model_year, config.current_year
    );

    let store = JsonFileAlertStore::new(&config.alert_store_path);
    let mut notifiers = NotifierSet::new().with(LogNotifier);
    if let Some(outbox) = &config.outbox_dir {
        notifiers = notifiers.with(OutboxNotifier::new(outbox));
    }
    let beeps = config.beep_count;

    let mut pipeline = Pipeline::new(config, store).with_notifier(notifiers);
    if beeps > 0 {
        pipeline = pipeline.with_signal(TerminalBell::new(beeps));
    }

    let summary = pipeline
        .run(chrono::Local::now())
        .context("deal-radar run failed")?;

    info!("Report: {}", summary.report_path.display());
    info!("Archive: {}", summary.archive_path.display());
    Ok(())
}
