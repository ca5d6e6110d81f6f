use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Mutex,
};

use tracing::debug;

use crate::{
    error::SinkError,
    extractor::{discover::TopKEntry, row::FeatureRow},
};

/// Header of the working set file
pub const TOP_K_COLUMNS: [&str; 3] = ["hashtag", "rank", "count"];

/// Write the top-K working set as csv, one `hashtag,rank,count` line per entry.
pub fn write_top_k<W: Write>(entries: &[TopKEntry], inner: W) -> Result<W, SinkError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(inner);
    writer.write_record(TOP_K_COLUMNS)?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.into_inner().map_err(|e| SinkError::Io(e.into_error()))
}

/// [`write_top_k`] into a file at `path`, truncating it
pub fn write_top_k_file(entries: &[TopKEntry], path: &Path) -> Result<(), SinkError> {
    let file = File::create(path)?;
    let mut inner = write_top_k(entries, BufWriter::new(file))?;
    inner.flush()?;
    debug!(path = %path.display(), entries = entries.len(), "working set written");
    Ok(())
}

/// Destination of the feature table.
///
/// Rows arrive one at a time; `write_header` is true only for the first row
/// of a run.
pub trait FeatureSink: Send {
    /// Column header line, written at most once per run
    fn write_header(&mut self) -> Result<(), SinkError>;

    fn append_row(&mut self, row: &FeatureRow) -> Result<(), SinkError>;

    fn append(&mut self, row: &FeatureRow, write_header: bool) -> Result<(), SinkError> {
        if write_header {
            self.write_header()?;
        }
        self.append_row(row)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// CSV feature table
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<BufWriter<File>> {
    /// Truncate or create the file at `path`
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().has_headers(false).from_writer(inner),
        }
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

impl<W: Write + Send> FeatureSink for CsvSink<W> {
    fn write_header(&mut self) -> Result<(), SinkError> {
        self.writer.write_record(FeatureRow::COLUMNS)?;
        Ok(())
    }

    fn append_row(&mut self, row: &FeatureRow) -> Result<(), SinkError> {
        self.writer.serialize(row)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps rows in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub rows: Vec<FeatureRow>,
    /// how many appends asked for a header
    pub header_writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeatureSink for MemorySink {
    fn write_header(&mut self) -> Result<(), SinkError> {
        self.header_writes += 1;
        Ok(())
    }

    fn append_row(&mut self, row: &FeatureRow) -> Result<(), SinkError> {
        self.rows.push(row.clone());
        Ok(())
    }
}

struct Shared<K> {
    sink: K,
    rows: u64,
    header_written: bool,
}

/// Serializes appends from the worker pool.
///
/// The header is written before the first row, and never again once it made
/// it to the sink, even if that row then failed.
pub struct SharedSink<K: FeatureSink> {
    inner: Mutex<Shared<K>>,
}

impl<K: FeatureSink> SharedSink<K> {
    pub fn new(sink: K) -> Self {
        Self {
            inner: Mutex::new(Shared { sink, rows: 0, header_written: false }),
        }
    }

    pub fn append(&self, row: &FeatureRow) -> Result<(), SinkError> {
        let mut guard = self.inner.lock().map_err(|_| SinkError::Poisoned)?;
        if !guard.header_written {
            guard.sink.write_header()?;
            guard.header_written = true;
        }
        guard.sink.append_row(row)?;
        guard.rows += 1;
        debug!(hashtag = %row.hashtag, rows = guard.rows, "row appended");
        Ok(())
    }

    /// Rows appended so far
    pub fn rows(&self) -> Result<u64, SinkError> {
        Ok(self.inner.lock().map_err(|_| SinkError::Poisoned)?.rows)
    }

    /// Flush and unwrap the sink
    pub fn into_inner(self) -> Result<K, SinkError> {
        let mut shared = self.inner.into_inner().map_err(|_| SinkError::Poisoned)?;
        shared.sink.flush()?;
        Ok(shared.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn csv_header_only_once() {
        let shared = SharedSink::new(CsvSink::new(Vec::new()));
        shared.append(&FeatureRow::new("A")).unwrap();
        shared.append(&FeatureRow::new("B")).unwrap();
        let bytes = shared.into_inner().unwrap().into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], FeatureRow::COLUMNS.join(","));
        assert!(lines[1].starts_with("A,"));
        assert!(lines[2].starts_with("B,"));
    }

    #[test]
    fn empty_optionals_are_empty_fields() {
        let mut sink = CsvSink::new(Vec::new());
        sink.append(&FeatureRow::new("A"), false).unwrap();
        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let fields: Vec<&str> = text.trim_end().split(',').collect();
        assert_eq!(fields.len(), FeatureRow::COLUMNS.len());
        // location, tweet_topic
        assert_eq!(fields[8], "");
        assert_eq!(fields[20], "");
        assert_eq!(fields[9], "0");
    }

    #[test]
    fn concurrent_appends_keep_every_row() {
        let shared = SharedSink::new(MemorySink::new());
        (0..64).into_par_iter().for_each(|i| {
            shared.append(&FeatureRow::new(format!("h{i}"))).unwrap();
        });
        assert_eq!(shared.rows().unwrap(), 64);
        let sink = shared.into_inner().unwrap();
        assert_eq!(sink.rows.len(), 64);
        assert_eq!(sink.header_writes, 1);
    }

    /// Accepts the header, then fails the first row
    struct FailsFirstRow {
        lines: Vec<String>,
        failed: bool,
    }

    impl FeatureSink for FailsFirstRow {
        fn write_header(&mut self) -> Result<(), SinkError> {
            self.lines.push("header".into());
            Ok(())
        }

        fn append_row(&mut self, row: &FeatureRow) -> Result<(), SinkError> {
            if !self.failed {
                self.failed = true;
                return Err(SinkError::Io(std::io::Error::other("disk full")));
            }
            self.lines.push(row.hashtag.clone());
            Ok(())
        }
    }

    #[test]
    fn retry_after_failed_first_row_keeps_one_header() {
        let shared = SharedSink::new(FailsFirstRow { lines: Vec::new(), failed: false });
        assert!(shared.append(&FeatureRow::new("A")).is_err());
        assert_eq!(shared.rows().unwrap(), 0);
        shared.append(&FeatureRow::new("A")).unwrap();
        shared.append(&FeatureRow::new("B")).unwrap();

        let sink = shared.into_inner().unwrap();
        assert_eq!(sink.lines, vec!["header", "A", "B"]);
    }

    #[test]
    fn header_is_not_repeated_after_the_first_row() {
        let shared = SharedSink::new(MemorySink::new());
        for tag in ["A", "B", "C"] {
            shared.append(&FeatureRow::new(tag)).unwrap();
        }
        assert_eq!(shared.into_inner().unwrap().header_writes, 1);
    }

    #[test]
    fn working_set_csv() {
        let entries = vec![
            TopKEntry { hashtag: "A".into(), rank: 1, count: 7 },
            TopKEntry { hashtag: "COVID19".into(), rank: 2, count: 3 },
        ];
        let text = String::from_utf8(write_top_k(&entries, Vec::new()).unwrap()).unwrap();
        assert_eq!(text, "hashtag,rank,count\nA,1,7\nCOVID19,2,3\n");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top_k.csv");
        write_top_k_file(&entries, &path).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let back: Vec<TopKEntry> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(back, entries);
    }

    #[test]
    fn csv_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.append(&FeatureRow::new("A"), true).unwrap();
        sink.flush().unwrap();
        drop(sink);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<FeatureRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows, vec![FeatureRow::new("A")]);
    }
}
