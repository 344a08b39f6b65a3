use crate::output::traits::{DiscoveredFile, OutputResult, ResultSink};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Newline-delimited JSON writer for discovered files
///
/// Every record is flushed as soon as it is written so an interrupted crawl
/// still leaves a readable stream behind.
pub struct JsonlSink<W: Write> {
    writer: W,
    written: u64,
}

impl JsonlSink<BufWriter<File>> {
    /// Creates (or truncates) the results file at `path`
    pub fn create(path: &Path) -> OutputResult<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of records written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ResultSink for JsonlSink<W> {
    fn emit(&mut self, file: &DiscoveredFile) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, file)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
