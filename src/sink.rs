/// Destinations for detected episodes
use crate::models::Episode;
use crate::{NotifierError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Receives every episode the processor produces
pub trait EpisodeSink {
    fn deliver(&mut self, episode: &Episode) -> Result<()>;
}

/// Collects episodes in memory
impl EpisodeSink for Vec<Episode> {
    fn deliver(&mut self, episode: &Episode) -> Result<()> {
        self.push(episode.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// "Title - Chapter N <url>"
    Text,
    /// One JSON object per line
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Writes one line per episode to a writer (usually stdout)
pub struct ConsoleSink<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EpisodeSink for ConsoleSink<W> {
    fn deliver(&mut self, episode: &Episode) -> Result<()> {
        let line = match self.format {
            OutputFormat::Text => episode.to_string(),
            OutputFormat::Json => serde_json::to_string(episode)?,
        };

        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|e| NotifierError::Sink(format!("failed to write episode: {}", e)))
    }
}
