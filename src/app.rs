//! Main application module: wires a source, the pose model and a sink into
//! one pipeline run.

use crate::{
    annotator::FrameAnnotator,
    center_of_mass::{CenterOfMassEstimator, Subject},
    config::Config,
    error::{Error, Result},
    pipeline::{RunSummary, StopSignal, StreamPipeline},
    pose_detector::OnnxPoseDetector,
    video::{CameraSource, DisplaySink, FileSink, FileSource, FrameSource},
};
use log::info;
use std::path::{Path, PathBuf};

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(PathBuf),
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Camera index or video file path
    pub video_source: VideoSource,
    /// Subject body mass in kilograms
    pub mass_kg: f64,
    /// Output file; derived from the input name when absent
    pub output_path: Option<PathBuf>,
    /// Model, segment and drawing settings
    pub settings: Config,
}

impl AppConfig {
    /// Output path for file mode
    #[must_use]
    pub fn resolve_output_path(&self, input: &Path) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| self.settings.output.output_path_for(input))
    }
}

/// Center-of-mass overlay application
pub struct CenterOfMassApp {
    config: AppConfig,
    pipeline: StreamPipeline<OnnxPoseDetector>,
}

impl CenterOfMassApp {
    /// Create the application and load the pose model.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject mass or settings are invalid, or the
    /// pose model cannot be loaded
    pub fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing Center of Mass Overlay application");

        let subject = Subject::new(config.mass_kg)?;
        config.settings.validate()?;

        let detector = OnnxPoseDetector::new(
            &config.settings.detector.model_path,
            config.settings.detector.thresholds(),
        )?;
        let estimator = CenterOfMassEstimator::new(config.settings.segments.clone());
        let annotator = FrameAnnotator::new(config.settings.annotation.clone());

        Ok(Self {
            pipeline: StreamPipeline::new(detector, estimator, annotator, subject),
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the configured source to completion or cancellation
    ///
    /// # Errors
    ///
    /// Returns an error if the source or sink cannot be opened, decoding
    /// fails, or the output cannot be finalized
    pub fn run(&mut self, stop: &StopSignal) -> Result<RunSummary> {
        match self.config.video_source.clone() {
            VideoSource::File(input) => {
                let mut source = FileSource::open(&input)?;
                let output = self.config.resolve_output_path(&input);
                if same_file(&input, &output) {
                    return Err(Error::InvalidInput(format!(
                        "Output {} would overwrite the input",
                        output.display()
                    )));
                }
                let mut sink = FileSink::create(&output, source.metadata())?;
                self.pipeline.run(&mut source, &mut sink, stop)
            }
            VideoSource::Camera(index) => {
                let mut source = CameraSource::open(index)?;
                let mut sink = DisplaySink::open()?;
                self.pipeline.run(&mut source, &mut sink, stop)
            }
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_config(source: VideoSource) -> AppConfig {
        AppConfig {
            video_source: source,
            mass_kg: 70.0,
            output_path: None,
            settings: Config::default(),
        }
    }

    #[test]
    fn test_resolve_output_path_default() {
        let config = app_config(VideoSource::File(PathBuf::from("run.mov")));
        assert_eq!(config.resolve_output_path(Path::new("run.mov")), PathBuf::from("run_com.mov"));
    }

    #[test]
    fn test_resolve_output_path_explicit() {
        let mut config = app_config(VideoSource::Camera(0));
        config.output_path = Some(PathBuf::from("out.avi"));
        assert_eq!(config.resolve_output_path(Path::new("in.avi")), PathBuf::from("out.avi"));
    }

    #[test]
    fn test_invalid_mass_rejected_before_model_load() {
        let mut config = app_config(VideoSource::Camera(0));
        config.mass_kg = 0.0;
        assert!(matches!(CenterOfMassApp::new(config), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_missing_model_reported() {
        let mut config = app_config(VideoSource::Camera(0));
        config.settings.detector.model_path = PathBuf::from("no/such/model.onnx");
        assert!(matches!(CenterOfMassApp::new(config), Err(Error::ModelError(_))));
    }

    #[test]
    fn test_same_file() {
        assert!(same_file(Path::new("a.mp4"), Path::new("a.mp4")));
        assert!(!same_file(Path::new("a.mp4"), Path::new("a_com.mp4")));
    }
}
