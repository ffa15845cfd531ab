use crate::archive::{create_write_once, run_stamp};
use crate::errors::PipelineError;
use crate::types::NewDeal;
use chrono::{DateTime, Local};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::info;

/// Best-effort local attention cue. Callers ignore failures beyond logging.
pub trait LocalSignal {
    fn signal(&self, new_deals: usize) -> io::Result<()>;
}

/// Rings the terminal bell `beeps` times on stderr.
#[derive(Debug, Clone, Copy)]
pub struct TerminalBell {
    pub beeps: u32,
    pub gap: Duration,
}

impl TerminalBell {
    pub fn new(beeps: u32) -> Self {
        Self {
            beeps,
            gap: Duration::from_millis(300),
        }
    }
}

impl LocalSignal for TerminalBell {
    fn signal(&self, _new_deals: usize) -> io::Result<()> {
        let mut err = io::stderr().lock();
        for i in 0..self.beeps {
            if i > 0 {
                thread::sleep(self.gap);
            }
            err.write_all(b"\x07")?;
            err.flush()?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignal;

impl LocalSignal for NoSignal {
    fn signal(&self, _new_deals: usize) -> io::Result<()> {
        Ok(())
    }
}

/// Receives a run's new deals once alert state is durable. Delivery is the
/// implementor's concern.
pub trait Notifier {
    fn notify(&self, new_deals: &[NewDeal], run_at: &DateTime<Local>) -> Result<(), PipelineError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, new_deals: &[NewDeal], _run_at: &DateTime<Local>) -> Result<(), PipelineError> {
        if new_deals.is_empty() {
            return Ok(());
        }
        info!("*** ALERT: {} new deal(s) found ***", new_deals.len());
        for deal in new_deals {
            info!(
                "  {} | {} | {} | ${:.0} below fair value | {}",
                deal.name.as_deref().unwrap_or("N/A"),
                deal.price.as_deref().unwrap_or("N/A"),
                deal.location.as_deref().unwrap_or("N/A"),
                -deal.residual,
                deal.link
            );
        }
        Ok(())
    }
}

/// Drops `new_deals_<stamp>.json` into a directory watched by whatever
/// delivers notifications. Nothing is written for an empty set.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    dir: PathBuf,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Notifier for OutboxNotifier {
    fn notify(&self, new_deals: &[NewDeal], run_at: &DateTime<Local>) -> Result<(), PipelineError> {
        if new_deals.is_empty() {
            return Ok(());
        }
        let stem = format!("new_deals_{}", run_stamp(run_at));
        let (file, path) = create_write_once(&self.dir, &stem, "json").map_err(|source| PipelineError::Outbox {
            path: self.dir.join(format!("{}.json", stem)),
            source,
        })?;

        let write = || -> io::Result<()> {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, new_deals)?;
            writer.flush()
        };
        write().map_err(|source| PipelineError::Outbox { path: path.clone(), source })?;

        info!("[Outbox] Queued {} new deal(s) in {}", new_deals.len(), path.display());
        Ok(())
    }
}

/// Fans out to several notifiers; every one is attempted, the first error is
/// returned.
#[derive(Default)]
pub struct NotifierSet {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifiers.push(Box::new(notifier));
        self
    }
}

impl Notifier for NotifierSet {
    fn notify(&self, new_deals: &[NewDeal], run_at: &DateTime<Local>) -> Result<(), PipelineError> {
        let mut first_err = None;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(new_deals, run_at) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    fn deal(link: &str) -> NewDeal {
        NewDeal {
            link: link.into(),
            name: Some("2017 Honda Civic".into()),
            price: Some("$8,500".into()),
            miles: Some("90K miles".into()),
            location: Some("Provo, UT".into()),
            predicted_price: 11000.0,
            residual: -2500.0,
            alerted_at: "2025-03-01T09:30:00+00:00".into(),
        }
    }

    #[test]
    fn outbox_writes_only_when_there_is_news() {
        let dir = tempdir().unwrap();
        let run_at = Local.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let outbox = OutboxNotifier::new(dir.path());

        outbox.notify(&[], &run_at).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        outbox.notify(&[deal("a")], &run_at).unwrap();
        let text = fs::read_to_string(dir.path().join("new_deals_20250301_093000.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["link"], "a");
        assert_eq!(parsed[0]["residual"], -2500.0);
    }
}
