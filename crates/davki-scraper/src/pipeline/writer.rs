use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::{ItemPipeline, PipelineError};
use crate::item::ArticleItem;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    /// A single JSON array, written when the run ends
    Json,
    /// One JSON object per line, flushed after each item
    #[default]
    Jsonl,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" => Ok(Self::Jsonl),
            other => Err(format!("Unknown output format: {other}")),
        }
    }
}

enum Output {
    Lines(BufWriter<fs_err::File>),
    Array {
        file: fs_err::File,
        items: Vec<ArticleItem>,
    },
}

/// Writes items to `<spider>_<YYYYMMDD_HHMMSS>.<ext>` in `output_dir`.
pub struct JsonWriterPipeline {
    output_dir: PathBuf,
    format: OutputFormat,
    path: Option<PathBuf>,
    output: Option<Output>,
    written: usize,
}

impl JsonWriterPipeline {
    pub fn new(output_dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
            path: None,
            output: None,
            written: 0,
        }
    }

    /// Output file of the current or last run.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn closed() -> PipelineError {
        std::io::Error::new(std::io::ErrorKind::NotConnected, "Output file is not open").into()
    }
}

impl ItemPipeline for JsonWriterPipeline {
    fn open_spider(&mut self, spider: &str) -> Result<(), PipelineError> {
        fs_err::create_dir_all(&self.output_dir)?;

        let file_name = format!(
            "{spider}_{}.{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            self.format.extension()
        );
        let path = self.output_dir.join(file_name);
        let file = fs_err::File::create(&path)?;
        log::info!("Writing {} items to {}", self.format, path.display());

        self.output = Some(match self.format {
            OutputFormat::Jsonl => Output::Lines(BufWriter::new(file)),
            OutputFormat::Json => Output::Array {
                file,
                items: vec![],
            },
        });
        self.path = Some(path);
        self.written = 0;
        Ok(())
    }

    fn process_item(&mut self, item: ArticleItem) -> Result<ArticleItem, PipelineError> {
        match self.output.as_mut().ok_or_else(Self::closed)? {
            Output::Lines(wtr) => {
                serde_json::to_writer(&mut *wtr, &item)?;
                wtr.write_all(b"\n")?;
                wtr.flush()?;
            }
            Output::Array { items, .. } => items.push(item.clone()),
        }
        self.written += 1;
        Ok(item)
    }

    fn close_spider(&mut self) -> Result<(), PipelineError> {
        match self.output.take() {
            Some(Output::Lines(mut wtr)) => wtr.flush()?,
            Some(Output::Array { mut file, items }) => {
                serde_json::to_writer_pretty(&mut file, &items)?;
                file.write_all(b"\n")?;
                file.flush()?;
            }
            None => return Ok(()),
        }
        if let Some(path) = &self.path {
            log::info!("Wrote {} items to {}", self.written, path.display());
        }
        Ok(())
    }
}
