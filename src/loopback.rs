//! Bounded row queue with a [`Sink`] on one end and a [`Source`] on the other.
//!
//! The two halves may live on different threads. The queue holds at most
//! `capacity` rows; the writer blocks when it is full and the reader blocks
//! when it is empty.

use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use tracing::{debug, trace, warn};

use crate::error::StreamError;
use crate::pixel::PixelEncoding;
use crate::row::PixelRow;
use crate::stream::{Sink, Source};

/// Create a connected writer/reader pair for a `width` x `height` stream.
///
/// A `capacity` of zero is treated as one.
pub fn loopback(
    width: u32,
    height: u32,
    encoding: PixelEncoding,
    capacity: usize,
) -> (LoopbackWriter, LoopbackReader) {
    let (tx, rx) = sync_channel(capacity.max(1));
    let writer = LoopbackWriter {
        tx: Some(tx),
        width,
        height,
        encoding,
        written: 0,
    };
    let reader = LoopbackReader {
        rx: Some(rx),
        width,
        height,
        encoding,
        read: 0,
    };
    (writer, reader)
}

/// Producer half of a [`loopback`] queue.
///
/// At most `height` rows are queued. Later writes, writes after [`close`],
/// and writes after the reader went away are ignored.
///
/// [`close`]: Sink::close
#[derive(Debug)]
pub struct LoopbackWriter {
    tx: Option<SyncSender<PixelRow>>,
    width: u32,
    height: u32,
    encoding: PixelEncoding,
    written: u32,
}

impl LoopbackWriter {
    /// Rows accepted so far.
    pub fn rows_written(&self) -> u32 {
        self.written
    }
}

impl Sink for LoopbackWriter {
    fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn write_row(&mut self, row: &PixelRow) -> Result<(), StreamError> {
        if self.written >= self.height {
            return Ok(());
        }
        let Some(tx) = &self.tx else {
            return Ok(());
        };
        let mut owned = PixelRow::new(self.encoding, self.width as usize);
        owned.copy_from(row);
        if tx.send(owned).is_err() {
            debug!(written = self.written, "loopback: reader gone, discarding rows");
            self.tx = None;
        }
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StreamError> {
        if self.tx.take().is_some() {
            trace!(written = self.written, height = self.height, "loopback writer closed");
        }
        Ok(())
    }
}

/// Consumer half of a [`loopback`] queue.
///
/// Yields at most `height` rows, then end of stream. If the writer closes
/// after fewer rows, the reader yields those rows, then a single
/// [`StreamError::UnexpectedEnd`], then end of stream.
#[derive(Debug)]
pub struct LoopbackReader {
    rx: Option<Receiver<PixelRow>>,
    width: u32,
    height: u32,
    encoding: PixelEncoding,
    read: u32,
}

impl Source for LoopbackReader {
    fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_row(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
        if self.read >= self.height {
            return Ok(0);
        }
        let Some(rx) = &self.rx else {
            return Ok(0);
        };
        match rx.recv() {
            Ok(received) => {
                row.copy_from(&received);
                self.read += 1;
                Ok(1)
            }
            Err(_) => {
                warn!(read = self.read, height = self.height, "loopback: writer closed early");
                self.read = self.height;
                Err(StreamError::UnexpectedEnd)
            }
        }
    }

    /// Stop reading. Rows still queued, and any the writer sends later, are
    /// drained on a background thread so the writer never blocks on a full
    /// queue.
    fn close(&mut self) {
        let Some(rx) = self.rx.take() else {
            return;
        };
        let spawned = std::thread::Builder::new()
            .name("loopback-drain".to_string())
            .spawn(move || {
                let discarded = rx.iter().count();
                trace!(discarded, "loopback drain finished");
            });
        if let Err(e) = spawned {
            // Dropping the receiver also unblocks the writer, whose sends
            // then fail and are ignored.
            debug!(error = %e, "loopback: no drain thread, dropping queue");
        }
    }
}
