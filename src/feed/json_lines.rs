/// Newline-delimited JSON feed, one submission object per line
use super::{Pull, SubmissionFeed};
use crate::models::Submission;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::{debug, info, warn};

/// Reads submissions from any buffered async reader
pub struct JsonLinesFeed<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
}

impl JsonLinesFeed<BufReader<File>> {
    /// Open a JSON lines file
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await?;
        info!("📂 Reading submissions from: {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl JsonLinesFeed<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        info!("📥 Reading submissions from stdin");
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_number: 0,
        }
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> SubmissionFeed for JsonLinesFeed<R> {
    async fn next_submission(&mut self) -> Result<Pull> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            debug!("Reached end of input after {} lines", self.line_number);
            return Ok(Pull::Closed);
        }
        self.line_number += 1;

        let line = match std::str::from_utf8(&self.buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!("Skipping non UTF-8 line {}: {}", self.line_number, e);
                return Ok(Pull::Absent);
            }
        };
        if line.is_empty() || line == "null" {
            return Ok(Pull::Absent);
        }

        match serde_json::from_str::<Submission>(line) {
            Ok(submission) => Ok(Pull::Item(submission)),
            Err(e) => {
                warn!("Skipping malformed submission on line {}: {}", self.line_number, e);
                Ok(Pull::Absent)
            }
        }
    }
}
