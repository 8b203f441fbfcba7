//! Frame sources and sinks: video files, cameras and the display window.

use crate::{
    constants::{DEFAULT_FPS, DISPLAY_WINDOW_NAME},
    Error, Result,
};
use log::{debug, info, warn};
use opencv::{
    core::{Mat, Size},
    highgui,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::path::{Path, PathBuf};

/// Channel order of the frames a source produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Bgr,
    Rgb,
}

/// Stream properties reported by a source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    /// Codec FOURCC code as reported by the container (0 when unknown)
    pub fourcc: i32,
    /// Frames per second, never zero
    pub fps: f64,
    pub width: i32,
    pub height: i32,
    /// Decoder pixel format, when the backend reports one
    pub pixel_format: Option<String>,
    /// Frame count hint; containers can be wrong about this
    pub frame_count: Option<u64>,
    /// Live sources can be cancelled and never reach end of stream
    pub live: bool,
    pub channel_order: ChannelOrder,
}

impl SourceMetadata {
    /// Codec name decoded from the FOURCC
    #[must_use]
    pub fn codec(&self) -> String {
        fourcc_to_string(self.fourcc)
    }
}

/// Decode a FOURCC code into its four characters.
///
/// Returns an empty string for 0 and replaces non-printable bytes with `?`.
#[must_use]
pub fn fourcc_to_string(fourcc: i32) -> String {
    if fourcc == 0 {
        return String::new();
    }
    fourcc
        .to_le_bytes()
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Encode four characters as a FOURCC code
///
/// # Errors
///
/// Returns an error if the code is not exactly four ASCII characters
pub fn fourcc_from_str(code: &str) -> Result<i32> {
    let bytes: [u8; 4] = code
        .as_bytes()
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("FOURCC must have 4 characters, got '{code}'")))?;
    if !bytes.iter().all(u8::is_ascii) {
        return Err(Error::InvalidInput(format!("FOURCC must be ASCII, got '{code}'")));
    }
    Ok(i32::from_le_bytes(bytes))
}

/// Producer of frames for one run
pub trait FrameSource {
    /// Stream properties, known once the source is open
    fn metadata(&self) -> &SourceMetadata;

    /// Read the next frame.
    ///
    /// `Ok(None)` is end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be read or decoded
    fn read(&mut self) -> Result<Option<Mat>>;
}

/// Consumer of frames for one run
pub trait FrameSink {
    /// Accept one frame in source channel order.
    ///
    /// # Errors
    ///
    /// Returns `Error::FrameProcessing` for a frame the sink rejects (it is
    /// dropped), any other error when the sink itself failed
    fn write(&mut self, frame: &Mat) -> Result<()>;

    /// Flush and release the sink. Output is complete only after this
    /// returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails; the output is then unusable
    fn finish(&mut self) -> Result<()>;

    /// Release the sink and discard partial output
    fn abort(&mut self);

    /// Whether the viewer asked to stop
    fn stop_requested(&self) -> bool {
        false
    }
}

fn capture_property(capture: &VideoCapture, property: i32) -> f64 {
    capture.get(property).unwrap_or(0.0)
}

#[allow(clippy::cast_possible_truncation)] // Capture properties are integral values reported as f64
#[allow(clippy::cast_sign_loss)]
fn read_metadata(capture: &VideoCapture, live: bool) -> SourceMetadata {
    let fps = capture_property(capture, videoio::CAP_PROP_FPS);
    let fps = if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        warn!("Source reports no frame rate, assuming {DEFAULT_FPS}");
        DEFAULT_FPS
    };

    let frame_count = capture_property(capture, videoio::CAP_PROP_FRAME_COUNT);
    let pixel_format = capture_property(capture, videoio::CAP_PROP_CODEC_PIXEL_FORMAT) as i32;

    SourceMetadata {
        fourcc: capture_property(capture, videoio::CAP_PROP_FOURCC) as i32,
        fps,
        width: capture_property(capture, videoio::CAP_PROP_FRAME_WIDTH) as i32,
        height: capture_property(capture, videoio::CAP_PROP_FRAME_HEIGHT) as i32,
        pixel_format: (pixel_format != 0).then(|| fourcc_to_string(pixel_format)),
        frame_count: (frame_count.is_finite() && frame_count > 0.0).then_some(frame_count as u64),
        live,
        channel_order: ChannelOrder::Bgr,
    }
}

/// Decodes frames from a video file
pub struct FileSource {
    capture: VideoCapture,
    metadata: SourceMetadata,
    path: PathBuf,
}

impl FileSource {
    /// Open a video file
    ///
    /// # Errors
    ///
    /// Returns `Error::SourceOpen` if the file is missing or cannot be decoded
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening video file: {}", path.display());

        if !path.is_file() {
            return Err(Error::SourceOpen(format!("{} does not exist", path.display())));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::SourceOpen(format!("{} is not valid UTF-8", path.display())))?;

        let capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .map_err(|e| Error::SourceOpen(format!("{}: {e}", path.display())))?;
        if !capture.is_opened()? {
            return Err(Error::SourceOpen(format!("{} could not be decoded", path.display())));
        }

        let metadata = read_metadata(&capture, false);
        info!(
            "Video '{}' ({}x{}, {:.2} fps, {} frames)",
            metadata.codec(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata
                .frame_count
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );

        Ok(Self {
            capture,
            metadata,
            path: path.to_path_buf(),
        })
    }
}

impl FrameSource for FileSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn read(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let grabbed = self
            .capture
            .read(&mut frame)
            .map_err(|e| Error::Decode(format!("{}: {e}", self.path.display())))?;
        if !grabbed || frame.empty() {
            debug!("End of video file reached");
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

/// Captures frames from a camera
pub struct CameraSource {
    capture: VideoCapture,
    metadata: SourceMetadata,
    index: i32,
}

impl CameraSource {
    /// Open a camera by index
    ///
    /// # Errors
    ///
    /// Returns `Error::SourceOpen` if the camera is unavailable
    pub fn open(index: i32) -> Result<Self> {
        if index < 0 {
            return Err(Error::InvalidInput(format!("Camera index must be non-negative, got {index}")));
        }
        info!("Opening camera {index}");

        let mut capture = VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|e| Error::SourceOpen(format!("camera {index}: {e}")))?;
        if !capture.is_opened()? {
            return Err(Error::SourceOpen(format!("camera {index} is not available")));
        }

        // Reduce buffer size for lower latency
        if let Err(e) = capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0) {
            warn!("Could not set camera buffer size: {e}");
        }

        let metadata = read_metadata(&capture, true);
        Ok(Self {
            capture,
            metadata,
            index,
        })
    }
}

impl FrameSource for CameraSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn read(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let grabbed = self
            .capture
            .read(&mut frame)
            .map_err(|e| Error::Decode(format!("camera {}: {e}", self.index)))?;
        if !grabbed || frame.empty() {
            return Err(Error::Decode(format!("camera {} returned no frame", self.index)));
        }
        Ok(Some(frame))
    }
}

/// FOURCC used when the source does not report its codec
pub const FALLBACK_FOURCC: &str = "mp4v";

/// Codec, frame rate and frame size for encoding a source's frames.
///
/// The source codec is kept; an unknown codec (FOURCC 0) falls back to
/// [`FALLBACK_FOURCC`].
///
/// # Errors
///
/// Returns `Error::SinkOpen` if the source has no valid frame size
pub fn encoder_settings(metadata: &SourceMetadata) -> Result<(i32, f64, Size)> {
    if metadata.width <= 0 || metadata.height <= 0 {
        return Err(Error::SinkOpen(format!(
            "Invalid frame size {}x{}",
            metadata.width, metadata.height
        )));
    }

    let fourcc = if metadata.fourcc == 0 {
        warn!("Source codec unknown, encoding with '{FALLBACK_FOURCC}'");
        fourcc_from_str(FALLBACK_FOURCC)?
    } else {
        metadata.fourcc
    };

    Ok((fourcc, metadata.fps, Size::new(metadata.width, metadata.height)))
}

/// Encodes frames into a video file with the source's codec and frame rate.
///
/// Output is deleted unless [`FrameSink::finish`] succeeds.
pub struct FileSink {
    writer: VideoWriter,
    path: PathBuf,
    frame_size: Size,
    finished: bool,
}

impl FileSink {
    /// Create an encoder matching a source
    ///
    /// # Errors
    ///
    /// Returns `Error::SinkOpen` if the encoder cannot be opened with the
    /// source's codec, frame rate and size
    pub fn create<P: AsRef<Path>>(path: P, metadata: &SourceMetadata) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::SinkOpen(format!("{} is not valid UTF-8", path.display())))?;

        let (fourcc, fps, frame_size) = encoder_settings(metadata)?;
        info!(
            "Opening output {} (codec '{}', {:.2} fps, {}x{})",
            path.display(),
            fourcc_to_string(fourcc),
            fps,
            frame_size.width,
            frame_size.height
        );

        let writer = VideoWriter::new(path_str, fourcc, fps, frame_size, true)
            .map_err(|e| Error::SinkOpen(format!("{}: {e}", path.display())))?;
        if !writer.is_opened()? {
            return Err(Error::SinkOpen(format!(
                "No encoder for codec '{}' at {}",
                fourcc_to_string(fourcc),
                path.display()
            )));
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            frame_size,
            finished: false,
        })
    }

    fn discard(&mut self) {
        if let Err(e) = self.writer.release() {
            debug!("Releasing writer for {} failed: {e}", self.path.display());
        }
        if self.path.exists() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => info!("Discarded incomplete output {}", self.path.display()),
                Err(e) => warn!("Failed to remove incomplete output {}: {e}", self.path.display()),
            }
        }
        self.finished = true;
    }
}

impl FrameSink for FileSink {
    fn write(&mut self, frame: &Mat) -> Result<()> {
        if self.finished {
            return Err(Error::SinkOpen(format!("{} is already closed", self.path.display())));
        }
        let size = frame.size()?;
        if size != self.frame_size {
            return Err(Error::FrameProcessing(format!(
                "Frame is {}x{}, output is {}x{}",
                size.width, size.height, self.frame_size.width, self.frame_size.height
            )));
        }
        self.writer.write(frame)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if let Err(e) = self.writer.release() {
            self.discard();
            return Err(Error::Finalize(format!("{}: {e}", self.path.display())));
        }
        self.finished = true;

        if !self.path.is_file() {
            return Err(Error::Finalize(format!("{} was not written", self.path.display())));
        }
        info!("Output written to {}", self.path.display());
        Ok(())
    }

    fn abort(&mut self) {
        if !self.finished {
            self.discard();
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Shows frames in a window; `q` or Esc requests a stop
pub struct DisplaySink {
    window: String,
    stop: bool,
    open: bool,
}

impl DisplaySink {
    /// Open the display window
    ///
    /// # Errors
    ///
    /// Returns `Error::SinkOpen` if no window can be created
    pub fn open() -> Result<Self> {
        Self::with_title(DISPLAY_WINDOW_NAME)
    }

    /// Open a display window with a custom title
    ///
    /// # Errors
    ///
    /// Returns `Error::SinkOpen` if no window can be created
    pub fn with_title(title: &str) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_NORMAL)
            .map_err(|e| Error::SinkOpen(format!("display window: {e}")))?;
        Ok(Self {
            window: title.to_string(),
            stop: false,
            open: true,
        })
    }

    fn close(&mut self) {
        if self.open {
            if let Err(e) = highgui::destroy_window(&self.window) {
                debug!("Closing display window failed: {e}");
            }
            self.open = false;
        }
    }
}

impl FrameSink for DisplaySink {
    fn write(&mut self, frame: &Mat) -> Result<()> {
        highgui::imshow(&self.window, frame)?;
        let key = highgui::wait_key(1)?;
        if key == 27 || key == i32::from(b'q') {
            info!("Exit requested by user");
            self.stop = true;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.close();
        Ok(())
    }

    fn abort(&mut self) {
        self.close();
    }

    fn stop_requested(&self) -> bool {
        self.stop
    }
}

impl Drop for DisplaySink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_round_trip() {
        let code = fourcc_from_str("avc1").unwrap();
        assert_eq!(fourcc_to_string(code), "avc1");
        assert_eq!(code, i32::from_le_bytes(*b"avc1"));
    }

    #[test]
    fn test_fourcc_unknown_is_empty() {
        assert_eq!(fourcc_to_string(0), "");
    }

    #[test]
    fn test_fourcc_rejects_wrong_length() {
        assert!(fourcc_from_str("h264x").is_err());
        assert!(fourcc_from_str("mp4").is_err());
    }

    #[test]
    fn test_file_source_missing_file() {
        let result = FileSource::open("definitely/not/here.mp4");
        assert!(matches!(result, Err(Error::SourceOpen(_))));
    }

    #[test]
    fn test_camera_rejects_negative_index() {
        assert!(matches!(CameraSource::open(-1), Err(Error::InvalidInput(_))));
    }

    fn metadata(fourcc: i32, width: i32, height: i32) -> SourceMetadata {
        SourceMetadata {
            fourcc,
            fps: 29.97,
            width,
            height,
            pixel_format: Some("I420".to_string()),
            frame_count: Some(300),
            live: false,
            channel_order: ChannelOrder::Bgr,
        }
    }

    #[test]
    fn test_encoder_keeps_source_codec_and_rate() {
        let avc1 = fourcc_from_str("avc1").unwrap();
        let (fourcc, fps, size) = encoder_settings(&metadata(avc1, 1280, 720)).unwrap();
        assert_eq!(fourcc, avc1);
        assert!((fps - 29.97).abs() < f64::EPSILON);
        assert_eq!(size, Size::new(1280, 720));
    }

    #[test]
    fn test_encoder_falls_back_for_unknown_codec() {
        let (fourcc, _, _) = encoder_settings(&metadata(0, 640, 480)).unwrap();
        assert_eq!(fourcc_to_string(fourcc), FALLBACK_FOURCC);
    }

    #[test]
    fn test_encoder_rejects_empty_frame_size() {
        for (width, height) in [(0, 480), (640, 0), (-1, 480)] {
            assert!(matches!(
                encoder_settings(&metadata(0, width, height)),
                Err(Error::SinkOpen(_))
            ));
        }
    }

    #[test]
    fn test_metadata_codec_name() {
        let metadata = SourceMetadata {
            fourcc: fourcc_from_str("mp4v").unwrap(),
            fps: 25.0,
            width: 64,
            height: 48,
            pixel_format: None,
            frame_count: Some(10),
            live: false,
            channel_order: ChannelOrder::Bgr,
        };
        assert_eq!(metadata.codec(), "mp4v");
    }
}
