use std::io::Write;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::types::MatchResult;

/// Receives the final result of a match. Sessions call `deliver` once per
/// match end.
pub trait ResultSink: Send {
    fn deliver(&mut self, result: MatchResult);
}

/// Hands the result to one waiting receiver. Later deliveries are refused.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Option<oneshot::Sender<MatchResult>>,
}

impl ChannelSink {
    pub fn new() -> (Self, oneshot::Receiver<MatchResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }
}

impl ResultSink for ChannelSink {
    fn deliver(&mut self, result: MatchResult) {
        let Some(tx) = self.tx.take() else {
            warn!(score = result.score, "match result already delivered");
            return;
        };
        if tx.send(result).is_err() {
            debug!("match result receiver dropped");
        }
    }
}

/// Writes each result as one JSON line.
#[derive(Debug)]
pub struct JsonLineSink<W> {
    out: W,
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ResultSink for JsonLineSink<W> {
    fn deliver(&mut self, result: MatchResult) {
        info!(
            score = result.score,
            difficulty = result.difficulty.label(),
            mode = result.mode.label(),
            "match result"
        );
        let written = serde_json::to_writer(&mut self.out, &result)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.out))
            .and_then(|()| self.out.flush());
        if let Err(err) = written {
            warn!(%err, "failed to write match result");
        }
    }
}
