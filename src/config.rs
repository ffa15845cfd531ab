use chrono::Datelike;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_ALERT_THRESHOLD: f64 = -1500.0;
pub const DEFAULT_MIN_MODEL_YEAR: i32 = 2010;
pub const DEFAULT_TOP_K: usize = 25;
pub const DEFAULT_BEEP_COUNT: u32 = 3;

/// Immutable settings for one pipeline run, handed to each component.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub output_dir: PathBuf,
    pub alert_store_path: PathBuf,
    pub outbox_dir: Option<PathBuf>,
    /// Residuals at or below this value qualify for an alert.
    pub alert_threshold: f64,
    pub current_year: i32,
    pub min_model_year: i32,
    pub top_k: usize,
    pub beep_count: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("json_data"),
            archive_dir: PathBuf::from("archive"),
            output_dir: PathBuf::from("best_deal_output"),
            alert_store_path: PathBuf::from("alerted_deals.json"),
            outbox_dir: None,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            current_year: chrono::Local::now().year(),
            min_model_year: DEFAULT_MIN_MODEL_YEAR,
            top_k: DEFAULT_TOP_K,
            beep_count: DEFAULT_BEEP_COUNT,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "deal-radar",
    about = "Score scraped vehicle listings against a per-run fair-value model",
    long_about = "Reads scraped listing batches, fits a price ~ age + miles regression, writes a ranked report and alerts once per underpriced listing.",
    after_help = "Every option can also be set through its DEAL_RADAR_* environment variable or a .env file."
)]
pub struct Cli {
    #[arg(long, env = "DEAL_RADAR_INPUT_DIR", default_value = "json_data", help = "Directory of scraped JSON batch files")]
    pub input_dir: PathBuf,
    #[arg(long, env = "DEAL_RADAR_ARCHIVE_DIR", default_value = "archive", help = "Directory for immutable run archives")]
    pub archive_dir: PathBuf,
    #[arg(long, env = "DEAL_RADAR_OUTPUT_DIR", default_value = "best_deal_output", help = "Directory for ranked deal reports")]
    pub output_dir: PathBuf,
    #[arg(long, env = "DEAL_RADAR_ALERT_STORE", default_value = "alerted_deals.json", help = "JSON file recording already-alerted links")]
    pub alert_store: PathBuf,
    #[arg(long, env = "DEAL_RADAR_OUTBOX_DIR", help = "Optional directory receiving new-deal files for delivery")]
    pub outbox_dir: Option<PathBuf>,
    #[arg(
        long,
        env = "DEAL_RADAR_ALERT_THRESHOLD",
        default_value_t = DEFAULT_ALERT_THRESHOLD,
        allow_hyphen_values = true,
        help = "Alert when residual is at or below this amount"
    )]
    pub alert_threshold: f64,
    #[arg(long, env = "DEAL_RADAR_CURRENT_YEAR", help = "Reference year for vehicle age (defaults to this year)")]
    pub current_year: Option<i32>,
    #[arg(long, env = "DEAL_RADAR_MIN_MODEL_YEAR", default_value_t = DEFAULT_MIN_MODEL_YEAR, help = "Oldest model year kept in the sample")]
    pub min_model_year: i32,
    #[arg(long, env = "DEAL_RADAR_TOP_K", default_value_t = DEFAULT_TOP_K, help = "Number of deals in the report")]
    pub top_k: usize,
    #[arg(long, env = "DEAL_RADAR_BEEP_COUNT", default_value_t = DEFAULT_BEEP_COUNT, help = "Terminal bells rung when new deals appear")]
    pub beep_count: u32,
    #[arg(long, env = "DEAL_RADAR_QUIET", help = "Never ring the terminal bell")]
    pub quiet: bool,
    #[arg(long, env = "DEAL_RADAR_LOG", default_value = "deal_radar=info", help = "Fallback log filter when RUST_LOG is unset")]
    pub log_level: String,
}

impl Cli {
    pub fn into_config(self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            input_dir: self.input_dir,
            archive_dir: self.archive_dir,
            output_dir: self.output_dir,
            alert_store_path: self.alert_store,
            outbox_dir: self.outbox_dir,
            alert_threshold: self.alert_threshold,
            current_year: self.current_year.unwrap_or(defaults.current_year),
            min_model_year: self.min_model_year,
            top_k: self.top_k,
            beep_count: if self.quiet { 0 } else { self.beep_count },
        }
    }
}
