//! Run a random-access image algorithm inside a row stream.
//!
//! ```text
//!          worker thread                                 caller thread
//!  upstream ─► WindowedSource ─► transform ─► TargetAdapter ─► LoopbackWriter
//!                                                                   │ queue
//!                                       Transformer::read_row ◄─ LoopbackReader
//! ```
//!
//! The only state shared between the threads, besides the queue, is the error
//! slot and the stop flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use enough::{Stop, StopReason};
use tracing::{debug, warn};

use crate::adapter::{ErrorSlot, ImageView, ImageViewMut, TargetAdapter, WindowedSource};
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::limits::check_dimensions;
use crate::loopback::{LoopbackReader, loopback};
use crate::pixel::PixelEncoding;
use crate::row::PixelRow;
use crate::stream::{Sink, Source, StickyError};

/// Raised by [`Transformer::close`]; polled by the transform through [`Stop`].
#[derive(Clone, Debug, Default)]
struct CloseSignal(Arc<AtomicBool>);

impl CloseSignal {
    fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl Stop for CloseSignal {
    fn check(&self) -> Result<(), StopReason> {
        if self.0.load(Ordering::Acquire) {
            Err(StopReason::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A [`Source`] whose rows are produced by a random-access transform running
/// on a worker thread.
///
/// The transform receives an [`ImageView`] over the upstream and an
/// [`ImageViewMut`] over the output, both windowed (see [`WindowedSource`]
/// for what happens when it strays outside the window). It should poll the
/// [`Stop`] token in long loops; it fires when the transformer is closed
/// early.
///
/// An error returned by the transform, a read failure of the upstream, or a
/// worker panic is reported by [`read_row`](Source::read_row) instead of
/// further rows, and stays reported.
pub struct Transformer {
    reader: LoopbackReader,
    width: u32,
    height: u32,
    encoding: PixelEncoding,
    slot: ErrorSlot,
    stop: CloseSignal,
    worker: Option<JoinHandle<Box<dyn Source>>>,
    /// The upstream, once the worker has handed it back.
    upstream: Option<Box<dyn Source>>,
    error: StickyError,
    closed: bool,
}

impl Transformer {
    pub fn new<F>(
        source: Box<dyn Source>,
        width: u32,
        height: u32,
        encoding: PixelEncoding,
        config: &StreamConfig,
        transform: F,
    ) -> Result<Self, StreamError>
    where
        F: FnOnce(&mut dyn ImageView, &mut dyn ImageViewMut, &dyn Stop) -> Result<(), StreamError>
            + Send
            + 'static,
    {
        check_dimensions(width, height)?;
        let (writer, reader) = loopback(width, height, encoding, config.capacity());
        let slot = ErrorSlot::default();
        let stop = CloseSignal::default();

        let worker_slot = slot.clone();
        let worker_stop = stop.clone();
        let config = config.clone();
        debug!(
            source = ?source.size(),
            width,
            height,
            ?encoding,
            window = config.window(),
            "transformer: spawning worker"
        );
        let worker = std::thread::Builder::new()
            .name("zenstream-transform".to_string())
            .spawn(move || {
                let mut view = WindowedSource::with_error_slot(source, &config, worker_slot.clone());
                let mut target = TargetAdapter::new(writer, &config);
                if let Err(e) = transform(&mut view, &mut target, &worker_stop) {
                    debug!(error = %e, "transformer: transform failed");
                    worker_slot.set(e);
                }
                if !worker_slot.is_set() {
                    if let Err(e) = target.flush() {
                        worker_slot.set(e);
                    }
                }
                // Closing short tells the reader the stream was truncated.
                let _ = target.into_inner().close();
                debug!("transformer: worker done");
                view.into_inner()
            })?;

        Ok(Self {
            reader,
            width,
            height,
            encoding,
            slot,
            stop,
            worker: Some(worker),
            upstream: None,
            error: StickyError::default(),
            closed: false,
        })
    }

    /// Wait for the worker and keep the upstream it hands back.
    /// Returns false if the worker panicked.
    fn join_worker(&mut self) -> bool {
        let Some(handle) = self.worker.take() else {
            return true;
        };
        match handle.join() {
            Ok(upstream) => {
                self.upstream = Some(upstream);
                true
            }
            Err(_) => {
                warn!("transformer: worker panicked");
                false
            }
        }
    }

    /// Decide what a truncated output stream means.
    fn truncation_cause(&mut self, fallback: StreamError) -> StreamError {
        let panicked = !self.join_worker();
        if let Some(e) = self.slot.get() {
            return e;
        }
        if panicked {
            return StreamError::WorkerPanicked;
        }
        fallback
    }
}

impl Source for Transformer {
    fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_row(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
        self.error.check()?;
        if self.closed {
            return Ok(0);
        }
        let result = match self.reader.read_row(row) {
            Ok(0) => Ok(0),
            Ok(n) => match self.slot.get() {
                Some(e) => Err(e),
                None => Ok(n),
            },
            Err(e) => Err(self.truncation_cause(e)),
        };
        self.error.track(result)
    }

    /// Close the output, stop and join the worker, then close the upstream.
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.reader.close();
        self.stop.raise();
        self.join_worker();
        if let Some(mut upstream) = self.upstream.take() {
            upstream.close();
        }
        debug!("transformer closed");
    }
}

impl Drop for Transformer {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySink, MemorySource};
    use crate::pixel::Color;
    use crate::stream::pump;
    use enough::Unstoppable;
    use std::sync::atomic::AtomicUsize;

    fn numbered(width: u8, height: u8) -> Box<dyn Source> {
        let rows = (0..height)
            .map(|y| PixelRow::from((0..width).map(|x| y * 10 + x).collect::<Vec<u8>>()))
            .collect();
        Box::new(MemorySource::new(rows).unwrap())
    }

    fn drain(t: &mut Transformer) -> Result<Vec<PixelRow>, StreamError> {
        let (w, h) = t.size();
        let mut sink = MemorySink::new(t.encoding(), w, h);
        pump(t, &mut sink, &Unstoppable)?;
        Ok(sink.into_rows())
    }

    fn copy_all(src: &mut dyn ImageView, dst: &mut dyn ImageViewMut, stop: &dyn Stop) -> Result<(), StreamError> {
        let (w, h) = dst.size();
        for y in 0..h {
            stop.check()?;
            for x in 0..w {
                dst.set_pixel(x, y, src.pixel(x, y));
            }
        }
        Ok(())
    }

    #[test]
    fn identity_transform_copies_rows() {
        let mut t = Transformer::new(
            numbered(3, 20),
            3,
            20,
            PixelEncoding::Gray8,
            &StreamConfig::default().with_window_rows(2).with_queue_capacity(1),
            copy_all,
        )
        .unwrap();
        let rows = drain(&mut t).unwrap();
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[13], PixelRow::from(vec![130u8, 131, 132]));
        t.close();
    }

    #[test]
    fn horizontal_flip() {
        let mut t = Transformer::new(
            numbered(4, 3),
            4,
            3,
            PixelEncoding::Gray8,
            &StreamConfig::default(),
            |src, dst, _stop| {
                let (w, h) = src.size();
                for y in 0..h {
                    for x in 0..w {
                        dst.set_pixel(w - 1 - x, y, src.pixel(x, y));
                    }
                }
                Ok(())
            },
        )
        .unwrap();
        let rows = drain(&mut t).unwrap();
        assert_eq!(rows[2], PixelRow::from(vec![23u8, 22, 21, 20]));
    }

    #[test]
    fn vertical_flip_within_window() {
        let mut t = Transformer::new(
            numbered(2, 4),
            2,
            4,
            PixelEncoding::Rgba32,
            &StreamConfig::default(),
            |src, dst, _stop| {
                let (w, h) = src.size();
                for y in 0..h {
                    for x in 0..w {
                        dst.set_pixel(x, h - 1 - y, src.pixel(x, y));
                    }
                }
                Ok(())
            },
        )
        .unwrap();
        let rows = drain(&mut t).unwrap();
        assert_eq!(rows[0].get(1), Some(Color::Gray8(31).convert(PixelEncoding::Rgba32)));
        assert_eq!(rows[3].get(0), Some(Color::Gray8(0).convert(PixelEncoding::Rgba32)));
    }

    #[test]
    fn transform_error_is_reported_and_sticky() {
        let mut t = Transformer::new(
            numbered(2, 30),
            2,
            30,
            PixelEncoding::Gray8,
            &StreamConfig::default().with_window_rows(2),
            |src, dst, _stop| {
                for y in 0..10 {
                    dst.set_pixel(0, y, src.pixel(0, y));
                }
                Err(StreamError::Transform("gave up".into()))
            },
        )
        .unwrap();
        let mut row = t.new_row();
        let err = loop {
            match t.read_row(&mut row) {
                Ok(1) => continue,
                Ok(_) => panic!("stream ended without reporting the failure"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, StreamError::Transform(ref m) if m == "gave up"));
        assert!(matches!(t.read_row(&mut row), Err(StreamError::Transform(_))));
    }

    #[test]
    fn upstream_failure_is_reported() {
        let rows = (0..6u8).map(|v| PixelRow::from(vec![v])).collect();
        let src = MemorySource::new(rows).unwrap().fail_after(3);
        let mut t = Transformer::new(
            Box::new(src),
            1,
            6,
            PixelEncoding::Gray8,
            &StreamConfig::default(),
            copy_all,
        )
        .unwrap();
        assert!(matches!(drain(&mut t), Err(StreamError::Io(_))));
    }

    #[test]
    fn panic_is_reported() {
        let mut t = Transformer::new(
            numbered(1, 3),
            1,
            3,
            PixelEncoding::Gray8,
            &StreamConfig::default(),
            |_src, _dst, _stop| panic!("transform bug"),
        )
        .unwrap();
        assert!(matches!(drain(&mut t), Err(StreamError::WorkerPanicked)));
    }

    /// Counts how often the upstream is closed.
    struct Tracked(MemorySource, Arc<AtomicUsize>);

    impl Source for Tracked {
        fn encoding(&self) -> PixelEncoding {
            self.0.encoding()
        }
        fn size(&self) -> (u32, u32) {
            self.0.size()
        }
        fn read_row(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
            self.0.read_row(row)
        }
        fn close(&mut self) {
            self.1.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn early_close_stops_worker_and_closes_upstream_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let rows = (0..200u8).map(|v| PixelRow::from(vec![v])).collect();
        let src = Tracked(MemorySource::new(rows).unwrap(), closes.clone());
        let mut t = Transformer::new(
            Box::new(src),
            1,
            200,
            PixelEncoding::Gray8,
            &StreamConfig::default().with_queue_capacity(1),
            copy_all,
        )
        .unwrap();
        let mut row = t.new_row();
        assert_eq!(t.read_row(&mut row).unwrap(), 1);
        t.close();
        t.close();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(t.read_row(&mut row).unwrap(), 0);
        drop(t);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_closes_upstream() {
        let closes = Arc::new(AtomicUsize::new(0));
        let src = Tracked(MemorySource::new(vec![PixelRow::from(vec![1u8])]).unwrap(), closes.clone());
        let t = Transformer::new(
            Box::new(src),
            1,
            1,
            PixelEncoding::Gray8,
            &StreamConfig::default(),
            copy_all,
        )
        .unwrap();
        drop(t);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_dimensions_rejected() {
        let r = Transformer::new(
            numbered(1, 1),
            0,
            1,
            PixelEncoding::Gray8,
            &StreamConfig::default(),
            copy_all,
        );
        assert!(matches!(r, Err(StreamError::InvalidDimensions { .. })));
    }
}
