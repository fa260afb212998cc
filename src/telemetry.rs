use std::fs::OpenOptions;
use std::path::Path;

use serde::Serialize;

/// One row per cycle, delivered to the external telemetry store. Optional
/// fields stay empty when the cycle was skipped before reaching them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleRecord {
    pub timestamp: String,
    pub cycle: u64,
    pub market_tick: Option<f64>,
    pub pool_tick: Option<f64>,
    pub center_tick: Option<f64>,
    pub half_width: Option<f64>,
    pub d_center: Option<f64>,
    pub d_half_width: Option<f64>,
    pub cost_min: Option<f64>,
    pub cost_mean: Option<f64>,
    pub cost_max: Option<f64>,
    pub effective_samples: Option<f64>,
    pub rebalanced: bool,
    pub target_lower: Option<i32>,
    pub target_upper: Option<i32>,
    pub outcome: Option<String>,
    pub skipped: Option<String>,
}

impl CycleRecord {
    pub fn begin(cycle: u64) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            cycle,
            ..Self::default()
        }
    }
}

pub trait TelemetrySink {
    fn record(&mut self, record: &CycleRecord) -> anyhow::Result<()>;
}

/// Appends cycle records to a CSV file, writing the header only when the
/// file is created.
pub struct CsvSink {
    writer: csv::Writer<std::fs::File>,
}

impl CsvSink {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let exists = path.as_ref().exists();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(!exists)
            .from_writer(file);
        Ok(Self { writer })
    }
}

impl TelemetrySink for CsvSink {
    fn record(&mut self, record: &CycleRecord) -> anyhow::Result<()> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Discards records. Used in tests.
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&mut self, _record: &CycleRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_sink_appends_rows_with_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycles.csv");

        let mut sink = CsvSink::open(&path).unwrap();
        sink.record(&CycleRecord::begin(1)).unwrap();
        drop(sink);

        let mut sink = CsvSink::open(&path).unwrap();
        let mut rec = CycleRecord::begin(2);
        rec.market_tick = Some(78240.0);
        rec.rebalanced = true;
        sink.record(&rec).unwrap();
        drop(sink);

        let raw = std::fs::read_to_string(&path).unwrap();
        let headers: Vec<&str> = raw.lines().filter(|l| l.starts_with("timestamp")).collect();
        assert_eq!(headers.len(), 1);
        assert_eq!(raw.lines().count(), 3);
    }
}
