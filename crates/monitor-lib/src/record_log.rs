//! Append-only CSV record log
//!
//! One row per sample with the fixed schema
//! `Timestamp,Namespace,Pod,CPU,Memory,Status`. Writes are batched per tick, encoded in memory
//! and written with a single `write_all` followed by a flush and `sync_data`, so a crash can
//! only lose the batch in flight. Reads are lenient: a row that fails to parse is counted and
//! skipped while the rest of the scan continues.
//!
//! There is exactly one writer. Readers may run while the collector appends and observe some
//! prefix of the log; no snapshot isolation is provided.

use crate::error::{MonitorError, Result};
use crate::models::{Sample, SampleStatus, Usage, WorkloadKey};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Column names written once at the top of an empty log
pub const HEADER: [&str; 6] = ["Timestamp", "Namespace", "Pod", "CPU", "Memory", "Status"];

/// Literal written for usage that could not be obtained
pub const ABSENT: &str = "N/A";

const CPU_SUFFIX: &str = "m";
const MEMORY_SUFFIX: &str = "Mi";

/// Result of clearing the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncateOutcome {
    /// The file existed and now holds zero samples
    Cleared,
    /// There was no file to clear
    NothingToClear,
}

/// Handle to the record log file
#[derive(Debug, Clone)]
pub struct RecordLog {
    path: PathBuf,
}

impl RecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append one sample
    pub fn append(&self, sample: &Sample) -> Result<()> {
        self.append_all(std::slice::from_ref(sample))
    }

    /// Durably append a batch of samples in order
    ///
    /// The header is written only if the file is empty at the time of the call.
    pub fn append_all(&self, samples: &[Sample]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| MonitorError::io(&self.path, e))?;

        let is_empty = file
            .metadata()
            .map_err(|e| MonitorError::io(&self.path, e))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::with_capacity(samples.len() * 64));

        if is_empty {
            writer.write_record(HEADER).map_err(|e| self.encode_error(e))?;
        }
        for sample in samples {
            writer
                .write_record(encode_row(sample))
                .map_err(|e| self.encode_error(e))?;
        }

        let buffer = writer
            .into_inner()
            .map_err(|e| MonitorError::io(&self.path, e.into_error()))?;

        file.write_all(&buffer)
            .and_then(|_| file.flush())
            .and_then(|_| file.sync_data())
            .map_err(|e| MonitorError::io(&self.path, e))?;

        debug!(path = %self.path.display(), rows = samples.len(), "Appended samples");
        Ok(())
    }

    /// Start a fresh scan from the beginning of the log
    ///
    /// Each call opens the file again, so a scan can be restarted at any time.
    pub fn scan(&self) -> Result<RecordScan> {
        let file = File::open(&self.path).map_err(|e| MonitorError::io(&self.path, e))?;
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(BufReader::new(file));

        Ok(RecordScan {
            path: self.path.clone(),
            records: reader.into_records(),
            row: 0,
            skipped: 0,
        })
    }

    /// Read every parseable sample into memory
    pub fn read_all(&self) -> Result<LoadedSamples> {
        let mut scan = self.scan()?;
        let samples = scan.by_ref().collect::<Result<Vec<_>>>()?;
        Ok(LoadedSamples {
            samples,
            skipped: scan.skipped(),
        })
    }

    /// Discard all samples, keeping the file in place
    pub fn truncate(&self) -> Result<TruncateOutcome> {
        match OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
        {
            Ok(_) => Ok(TruncateOutcome::Cleared),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(TruncateOutcome::NothingToClear),
            Err(e) => Err(MonitorError::io(&self.path, e)),
        }
    }

    fn encode_error(&self, source: csv::Error) -> MonitorError {
        MonitorError::Encode {
            path: self.path.clone(),
            source,
        }
    }
}

/// Samples read from the log plus the number of malformed rows skipped
#[derive(Debug, Clone, Default)]
pub struct LoadedSamples {
    pub samples: Vec<Sample>,
    pub skipped: u64,
}

/// Lazy iterator over the samples of a log
///
/// Yields `Err` only for I/O failures of the underlying file; malformed rows are skipped.
pub struct RecordScan {
    path: PathBuf,
    records: csv::StringRecordsIntoIter<BufReader<File>>,
    row: u64,
    skipped: u64,
}

impl RecordScan {
    /// Number of malformed rows skipped so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn skip(&mut self, reason: String) {
        self.skipped += 1;
        let err = MonitorError::ParseSkip {
            row: self.row,
            reason,
        };
        warn!(path = %self.path.display(), error = %err, "Skipping record");
    }
}

impl Iterator for RecordScan {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = self.records.next()?;
            self.row += 1;

            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => {
                    if let csv::ErrorKind::Io(io) = e.into_kind() {
                        return Some(Err(MonitorError::io(&self.path, io)));
                    }
                    continue;
                }
                Err(e) => {
                    self.skip(e.to_string());
                    continue;
                }
            };

            if is_header(&record) {
                continue;
            }

            match decode_row(&record) {
                Ok(sample) => return Some(Ok(sample)),
                Err(reason) => self.skip(reason),
            }
        }
    }
}

fn is_header(record: &csv::StringRecord) -> bool {
    record.get(0).map(str::trim) == Some(HEADER[0])
}

fn encode_row(sample: &Sample) -> [String; 6] {
    let (cpu, memory) = match sample.usage() {
        Some(usage) => (
            format!("{}{}", usage.cpu_milli, CPU_SUFFIX),
            format!("{}{}", usage.memory_mi, MEMORY_SUFFIX),
        ),
        None => (ABSENT.to_string(), ABSENT.to_string()),
    };

    [
        sample.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        sample.namespace.clone(),
        sample.workload_name.clone(),
        cpu,
        memory,
        sample.status().to_string(),
    ]
}

fn decode_row(record: &csv::StringRecord) -> std::result::Result<Sample, String> {
    if record.len() != HEADER.len() {
        return Err(format!(
            "expected {} fields, found {}",
            HEADER.len(),
            record.len()
        ));
    }

    let field = |i: usize| field_at(record, i);

    let timestamp = DateTime::parse_from_rfc3339(field(0))
        .map_err(|e| format!("bad timestamp {:?}: {}", field(0), e))?
        .with_timezone(&Utc);

    let namespace = field(1);
    let name = field(2);
    if namespace.is_empty() || name.is_empty() {
        return Err("empty namespace or pod name".to_string());
    }
    let key = WorkloadKey::new(namespace, name);

    let cpu = decode_quantity(field(3), CPU_SUFFIX)?;
    let memory = decode_quantity(field(4), MEMORY_SUFFIX)?;
    let status: SampleStatus = field(5).parse()?;

    match status {
        SampleStatus::Ok => match (cpu, memory) {
            (Some(cpu_milli), Some(memory_mi)) => Ok(Sample::ok(
                timestamp,
                &key,
                Usage {
                    cpu_milli,
                    memory_mi,
                },
            )),
            _ => Err("OK status without usage values".to_string()),
        },
        // The status decides presence; stray values on a non-OK row are dropped
        SampleStatus::Skip(phase) => Ok(Sample::skipped(timestamp, &key, phase)),
        SampleStatus::Error(reason) => Ok(Sample::failed(timestamp, &key, reason)),
    }
}

fn field_at(record: &csv::StringRecord, i: usize) -> &str {
    record.get(i).map(str::trim).unwrap_or_default()
}

fn decode_quantity(raw: &str, suffix: &str) -> std::result::Result<Option<u64>, String> {
    if raw == ABSENT {
        return Ok(None);
    }
    raw.strip_suffix(suffix)
        .and_then(|digits| digits.parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| format!("bad quantity {:?} (expected <int>{})", raw, suffix))
}
