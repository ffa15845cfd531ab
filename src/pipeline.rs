use crate::archive::archive_records;
use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::features::FeatureNormalizer;
use crate::ingest::{ingest_dir, IngestReport};
use crate::model::{fit_and_score, FairValueModel};
use crate::notify::{LocalSignal, LogNotifier, NoSignal, Notifier};
use crate::ranker::top_deals;
use crate::report::write_report;
use crate::store::AlertStore;
use crate::tracker::AlertTracker;
use crate::types::{NewDeal, Rejection, ScoredRow};
use chrono::{DateTime, Local, SecondsFormat};
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything one run produced, including what it chose to skip.
#[derive(Debug)]
pub struct RunSummary {
    pub ingest: IngestReport,
    pub archive_path: PathBuf,
    pub report_path: PathBuf,
    pub rejections: Vec<Rejection>,
    pub feature_rows: usize,
    pub model: Option<FairValueModel>,
    pub ranked: Vec<ScoredRow>,
    pub new_deals: Vec<NewDeal>,
}

impl RunSummary {
    pub fn unfittable(&self) -> bool {
        self.model.is_none()
    }
}

/// Runs one batch over a fixed config: ingest, archive, score, rank, report,
/// then alert. Owns the alert store for the duration of the run.
pub struct Pipeline<S: AlertStore> {
    config: PipelineConfig,
    store: S,
    signal: Box<dyn LocalSignal>,
    notifier: Box<dyn Notifier>,
}

impl<S: AlertStore> Pipeline<S> {
    pub fn new(config: PipelineConfig, store: S) -> Self {
        Self {
            config,
            store,
            signal: Box::new(NoSignal),
            notifier: Box::new(LogNotifier),
        }
    }

    pub fn with_signal(mut self, signal: impl LocalSignal + 'static) -> Self {
        self.signal = Box::new(signal);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// One full pass. Returns an error only for failures that must not be
    /// reported as success: missing input, or a failed archive, report or
    /// alert-store write.
    pub fn run(&mut self, run_at: DateTime<Local>) -> Result<RunSummary, PipelineError> {
        let config = &self.config;

        let ingest = ingest_dir(&config.input_dir)?;
        let archive_path = archive_records(&config.archive_dir, &ingest.records, &run_at)?;

        self.store.load();
        info!("[Pipeline] {} link(s) previously alerted", self.store.len());

        let normalizer = FeatureNormalizer::new(config.current_year, config.min_model_year);
        let (rows, rejections) = normalizer.normalize_all(&ingest.records);
        let feature_rows = rows.len();

        let (model, scored) = fit_and_score(rows);
        let ranked = top_deals(scored, config.top_k);

        let report_path = write_report(&config.output_dir, &ranked, &run_at)?;

        let alerted_at = run_at.to_rfc3339_opts(SecondsFormat::Secs, false);
        let new_deals =
            AlertTracker::new(&mut self.store, config.alert_threshold).apply(&ranked, &alerted_at);
        self.store.persist()?;

        // Alert state is durable from here on; nothing below may fail the run.
        if !new_deals.is_empty() {
            if let Err(e) = self.signal.signal(new_deals.len()) {
                warn!("[Pipeline] Local signal unavailable: {}", e);
            }
        }
        if let Err(e) = self.notifier.notify(&new_deals, &run_at) {
            warn!("[Pipeline] Notifier failed, alert state kept: {}", e);
        }

        let summary = RunSummary {
            ingest,
            archive_path,
            report_path,
            rejections,
            feature_rows,
            model,
            ranked,
            new_deals,
        };
        log_summary(&summary);
        Ok(summary)
    }
}

fn log_summary(summary: &RunSummary) {
    info!(
        "[Pipeline] Run complete: {} record(s), {} feature row(s), {} rejected, {} ranked, {} new deal(s)",
        summary.ingest.records.len(),
        summary.feature_rows,
        summary.rejections.len(),
        summary.ranked.len(),
        summary.new_deals.len()
    );
    for path in &summary.ingest.skipped_files {
        warn!("[Pipeline] Skipped input file: {}", path.display());
    }
    if summary.unfittable() {
        warn!("[Pipeline] Model was unfittable; report is empty and no alerts were raised");
    }
}
