//! Per-frame driver: decode, detect, estimate, annotate, emit.

use crate::{
    annotator::FrameAnnotator,
    center_of_mass::{CenterOfMass, CenterOfMassEstimator, Subject},
    landmarks::LandmarkAdapter,
    pose_detector::PoseDetector,
    utils::image_conversion::{bgr_to_rgb, rgb_to_bgr},
    video::{ChannelOrder, FrameSink, FrameSource},
    Error, Result,
};
use log::{debug, error, info, warn};
use opencv::core::Mat;
use opencv::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Frames between progress messages
const PROGRESS_INTERVAL: u64 = 100;

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Opened,
    Running,
    Draining,
    Closed,
}

/// Why a run ended without a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// File source reached end of stream and the output was finalized
    SourceExhausted,
    /// Stop was requested on a live source
    Cancelled,
    /// A live source stopped delivering frames
    SourceFailed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::SourceExhausted => "end of stream",
            Self::Cancelled => "cancelled",
            Self::SourceFailed => "source failed",
        };
        f.write_str(text)
    }
}

/// Cooperative cancellation flag, shareable with a signal handler or UI
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Counters and outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames_read: u64,
    pub frames_written: u64,
    /// Frames that received a CoM overlay
    pub frames_annotated: u64,
    /// Frames whose processing failed and were emitted unannotated
    pub frames_failed: u64,
    /// Frames the sink rejected
    pub frames_dropped: u64,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Average processing rate over the run
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Frame counts are far below 2^52
    pub fn throughput_fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames_read as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames read, {} written, {} annotated, {} failed, {} dropped ({}, {:.1} fps)",
            self.frames_read,
            self.frames_written,
            self.frames_annotated,
            self.frames_failed,
            self.frames_dropped,
            self.stop_reason,
            self.throughput_fps()
        )
    }
}

#[derive(Debug, Default)]
struct Counters {
    read: u64,
    written: u64,
    annotated: u64,
    failed: u64,
    dropped: u64,
}

/// Drives one source into one sink, annotating each frame with the
/// subject's center of mass.
///
/// Processing failures are contained per frame: the original frame is
/// emitted in place of the annotated one. Source, sink and flush failures end
/// the run with an error.
pub struct StreamPipeline<D: PoseDetector> {
    detector: D,
    adapter: LandmarkAdapter,
    estimator: CenterOfMassEstimator,
    annotator: FrameAnnotator,
    subject: Subject,
    state: PipelineState,
}

impl<D: PoseDetector> StreamPipeline<D> {
    /// Create a pipeline. The landmark subset is taken from the estimator's
    /// segment model.
    pub fn new(detector: D, estimator: CenterOfMassEstimator, annotator: FrameAnnotator, subject: Subject) -> Self {
        let adapter = LandmarkAdapter::new(estimator.model().required_landmarks());
        Self {
            detector,
            adapter,
            estimator,
            annotator,
            subject,
            state: PipelineState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    /// Mutable access to the detector, e.g. to inspect a test double
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Run the source to completion, cancellation or failure.
    ///
    /// The stop signal and the sink's stop request are honored only for live
    /// sources; file runs always go to the end.
    ///
    /// # Errors
    ///
    /// Returns an error if a file source fails to decode, the sink fails, or
    /// the output cannot be finalized. Partial file output is discarded.
    pub fn run(&mut self, source: &mut dyn FrameSource, sink: &mut dyn FrameSink, stop: &StopSignal) -> Result<RunSummary> {
        if matches!(self.state, PipelineState::Running | PipelineState::Draining) {
            return Err(Error::InvalidInput("Pipeline is already running".to_string()));
        }

        let metadata = source.metadata().clone();
        let live = metadata.live;
        let channel_order = metadata.channel_order;

        self.state = PipelineState::Opened;
        self.detector.reset();
        info!(
            "Processing {} source ({}x{} @ {:.2} fps) for a {:.1} kg subject",
            if live { "live" } else { "file" },
            metadata.width,
            metadata.height,
            metadata.fps,
            self.subject.mass_kg()
        );

        let started = Instant::now();
        let mut counters = Counters::default();
        self.state = PipelineState::Running;

        let stop_reason = loop {
            if live && (stop.is_stop_requested() || sink.stop_requested()) {
                info!("Stop requested after {} frames", counters.read);
                break StopReason::Cancelled;
            }

            let frame = match source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) if live => {
                    warn!("Live source ended unexpectedly");
                    break StopReason::SourceFailed;
                }
                Ok(None) => {
                    self.state = PipelineState::Draining;
                    break StopReason::SourceExhausted;
                }
                Err(e) if live => {
                    warn!("Live source failed: {e}");
                    break StopReason::SourceFailed;
                }
                Err(e) => {
                    error!("Decoding failed after {} frames: {e}", counters.read);
                    return Err(self.fail(sink, e));
                }
            };

            counters.read += 1;
            let frame_index = counters.read;

            let processed = match self.process_frame(&frame, channel_order) {
                Ok(Some((annotated, com))) => {
                    debug!("Frame {frame_index}: {}", com.label());
                    counters.annotated += 1;
                    Some(annotated)
                }
                Ok(None) => {
                    debug!("Frame {frame_index}: no pose detected");
                    None
                }
                Err(e) => {
                    warn!("Frame {frame_index}: processing failed, emitting original: {e}");
                    counters.failed += 1;
                    None
                }
            };

            match sink.write(processed.as_ref().unwrap_or(&frame)) {
                Ok(()) => counters.written += 1,
                Err(e) if e.is_frame_local() => {
                    warn!("Frame {frame_index}: rejected by sink: {e}");
                    counters.dropped += 1;
                }
                Err(e) => {
                    error!("Writing frame {frame_index} failed: {e}");
                    return Err(self.fail(sink, e));
                }
            }

            if frame_index % PROGRESS_INTERVAL == 0 {
                match metadata.frame_count {
                    Some(total) => info!("Processed {frame_index}/{total} frames"),
                    None => info!("Processed {frame_index} frames"),
                }
            }
        };

        if let Err(e) = sink.finish() {
            error!("Finalizing output failed: {e}");
            self.state = PipelineState::Closed;
            return Err(e);
        }
        self.state = PipelineState::Closed;

        let summary = RunSummary {
            frames_read: counters.read,
            frames_written: counters.written,
            frames_annotated: counters.annotated,
            frames_failed: counters.failed,
            frames_dropped: counters.dropped,
            stop_reason,
            elapsed: started.elapsed(),
        };
        info!("Run finished: {summary}");
        Ok(summary)
    }

    fn fail(&mut self, sink: &mut dyn FrameSink, error: Error) -> Error {
        sink.abort();
        self.state = PipelineState::Closed;
        error
    }

    /// Process one frame. `Ok(None)` means no usable pose: emit the original.
    fn process_frame(&mut self, frame: &Mat, order: ChannelOrder) -> Result<Option<(Mat, CenterOfMass)>> {
        let mut working = match order {
            ChannelOrder::Bgr => bgr_to_rgb(frame)?,
            ChannelOrder::Rgb => frame.try_clone()?,
        };

        let Some(detection) = self.detector.detect(&working)? else {
            return Ok(None);
        };
        let Some(landmarks) = self.adapter.extract(&detection) else {
            return Ok(None);
        };

        let com = self.estimator.estimate_for(&landmarks, &self.subject)?;
        self.annotator.annotate(&mut working, Some(&detection), Some(&com))?;

        let output = match order {
            ChannelOrder::Bgr => rgb_to_bgr(&working)?,
            ChannelOrder::Rgb => working,
        };
        Ok(Some((output, com)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_shared() {
        let signal = StopSignal::new();
        let handle = signal.clone();
        assert!(!signal.is_stop_requested());
        handle.request_stop();
        assert!(signal.is_stop_requested());
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            frames_read: 10,
            frames_written: 9,
            frames_annotated: 7,
            frames_failed: 1,
            frames_dropped: 1,
            stop_reason: StopReason::SourceExhausted,
            elapsed: Duration::from_secs(2),
        };
        assert!((summary.throughput_fps() - 5.0).abs() < 1e-9);
        assert_eq!(
            summary.to_string(),
            "10 frames read, 9 written, 7 annotated, 1 failed, 1 dropped (end of stream, 5.0 fps)"
        );
    }
}
