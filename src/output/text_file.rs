//! Line-oriented file output

use crate::config::WriteMode;
use crate::extract::Record;
use crate::output::traits::{poisoned, Sink, SinkResult};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// How a record is rendered as one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    /// The record text only
    Plain,
    /// The whole record as a JSON object
    Json,
}

/// Writes one record per line to a file
///
/// Output is buffered; call [`Sink::flush`] to push it to disk (the buffer is
/// also flushed when the sink is dropped).
pub struct TextFileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    format: LineFormat,
    echo: bool,
}

impl TextFileSink {
    /// Opens the destination file, creating parent directories as needed
    ///
    /// # Arguments
    ///
    /// * `path` - Destination file
    /// * `format` - Plain text or JSON lines
    /// * `mode` - `Overwrite` truncates an existing file, `Append` keeps it
    ///
    /// # Returns
    ///
    /// * `Ok(TextFileSink)` - The file is open for writing
    /// * `Err(SinkError)` - The file or its directory could not be created
    pub fn open(path: impl AsRef<Path>, format: LineFormat, mode: WriteMode) -> SinkResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Overwrite => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        let file = options.open(&path)?;

        tracing::debug!("Opened {} for {:?} output", path.display(), format);

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            format,
            echo: false,
        })
    }

    /// Also prints every record's text to stdout
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self, record: &Record) -> SinkResult<String> {
        Ok(match self.format {
            LineFormat::Plain => record.text.replace(['\r', '\n'], " "),
            LineFormat::Json => serde_json::to_string(record)?,
        })
    }
}

impl Sink for TextFileSink {
    fn accept(&self, record: Record) -> SinkResult<()> {
        let line = self.render(&record)?;

        let mut writer = self.writer.lock().map_err(poisoned)?;
        writeln!(writer, "{}", line)?;

        if self.echo {
            println!("{}", record.text);
        }
        Ok(())
    }

    fn flush(&self) -> SinkResult<()> {
        self.writer.lock().map_err(poisoned)?.flush()?;
        Ok(())
    }
}
