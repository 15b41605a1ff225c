//! Fan-out of multiplexed output frames into sinks and a transcript

use super::Sink;
use crate::error::{Error, Result};
use crate::runtime::{FrameStream, StreamKind};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

/// Caller-provided stdout/stderr destinations
pub struct OutputSinks<'a> {
    stdout: Sink<'a>,
    stderr: Sink<'a>,
}

impl<'a> OutputSinks<'a> {
    /// Pair of sinks
    pub fn new(stdout: Sink<'a>, stderr: Sink<'a>) -> Self {
        Self { stdout, stderr }
    }

    fn route(&mut self, stream: StreamKind) -> &mut Sink<'a> {
        match stream {
            StreamKind::Stderr => &mut self.stderr,
            StreamKind::Stdout | StreamKind::Console | StreamKind::Stdin => &mut self.stdout,
        }
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.stdout.flush().await?;
        self.stderr.flush().await
    }
}

/// Drain `output` into `transcript`, routing each frame to `sinks` as well.
///
/// Stops at the first stream or write error. Frames read before the error
/// stay in the transcript. Returns the number of payload bytes read.
pub(crate) async fn copy_frames(
    output: &mut FrameStream,
    mut sinks: Option<OutputSinks<'_>>,
    transcript: &mut Vec<u8>,
) -> Result<u64> {
    let mut copied = 0u64;

    while let Some(frame) = output.next().await {
        let frame = frame?;
        transcript.extend_from_slice(&frame.payload);
        copied += frame.payload.len() as u64;

        if let Some(sinks) = sinks.as_mut() {
            sinks
                .route(frame.stream)
                .write_all(&frame.payload)
                .await
                .map_err(|e| Error::Stream(format!("write to {:?} sink: {}", frame.stream, e)))?;
        }
    }

    if let Some(sinks) = sinks.as_mut() {
        sinks.flush().await?;
    }

    Ok(copied)
}
