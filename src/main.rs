//! Center-of-mass overlay for video files and live cameras.

use anyhow::{Context, Result};
use clap::Parser;
use com_overlay::{
    app::{AppConfig, CenterOfMassApp, VideoSource},
    center_of_mass::Subject,
    config::Config,
    pipeline::StopSignal,
};
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file to process
    #[arg(short, long, conflicts_with = "cam")]
    video: Option<PathBuf>,

    /// Camera index to use (default when no video is given)
    #[arg(long)]
    cam: Option<i32>,

    /// Subject body mass in kilograms
    #[arg(short, long)]
    mass: f64,

    /// Output video path (defaults to <input>_com.<ext>)
    #[arg(short, long, requires = "video")]
    output: Option<PathBuf>,

    /// Path to the pose landmark ONNX model
    #[arg(long)]
    model: Option<PathBuf>,

    /// Minimum presence score to detect a person (0.0-1.0)
    #[arg(long)]
    min_detection_confidence: Option<f32>,

    /// Minimum presence score to keep tracking a person (0.0-1.0)
    #[arg(long)]
    min_tracking_confidence: Option<f32>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn video_source(&self) -> VideoSource {
        match &self.video {
            Some(path) => VideoSource::File(path.clone()),
            None => VideoSource::Camera(self.cam.unwrap_or(0)),
        }
    }

    /// Merge the configuration file with command-line overrides
    fn settings(&self) -> Result<Config> {
        let mut settings = match &self.config {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Config::from_file(path).with_context(|| format!("loading {}", path.display()))?
            }
            None => Config::default(),
        };

        if let Some(model) = &self.model {
            settings.detector.model_path.clone_from(model);
        }
        if let Some(value) = self.min_detection_confidence {
            settings.detector.min_detection_confidence = value;
        }
        if let Some(value) = self.min_tracking_confidence {
            settings.detector.min_tracking_confidence = value;
        }

        settings.validate().context("invalid settings")?;
        Ok(settings)
    }

    fn app_config(&self) -> Result<AppConfig> {
        let subject = Subject::new(self.mass).context("invalid --mass")?;
        Ok(AppConfig {
            video_source: self.video_source(),
            mass_kg: subject.mass_kg(),
            output_path: self.output.clone(),
            settings: self.settings()?,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Center of Mass Overlay v{}", env!("CARGO_PKG_VERSION"));

    let config = args.app_config()?;
    let mut app = CenterOfMassApp::new(config).context("initialization failed")?;

    let summary = app.run(&StopSignal::new()).map_err(|e| {
        error!("Run failed: {e}");
        e
    })?;

    println!("{summary}");
    if let VideoSource::File(input) = &app.config().video_source {
        println!("Output: {}", app.config().resolve_output_path(input).display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_video_mode() {
        let args = Args::try_parse_from(["com-overlay", "--video", "jump.mp4", "--mass", "72.5"]).unwrap();
        assert_eq!(args.video_source(), VideoSource::File(PathBuf::from("jump.mp4")));
        assert!((args.mass - 72.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_camera_is_default_source() {
        let args = Args::try_parse_from(["com-overlay", "--mass", "70"]).unwrap();
        assert_eq!(args.video_source(), VideoSource::Camera(0));

        let args = Args::try_parse_from(["com-overlay", "--cam", "2", "--mass", "70"]).unwrap();
        assert_eq!(args.video_source(), VideoSource::Camera(2));
    }

    #[test]
    fn test_video_and_cam_conflict() {
        let result = Args::try_parse_from(["com-overlay", "--video", "a.mp4", "--cam", "1", "--mass", "70"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mass_is_required() {
        assert!(Args::try_parse_from(["com-overlay", "--video", "a.mp4"]).is_err());
    }

    #[test]
    fn test_non_positive_mass_rejected() {
        let args = Args::try_parse_from(["com-overlay", "--video", "a.mp4", "--mass", "0"]).unwrap();
        assert!(args.app_config().is_err());

        let args = Args::try_parse_from(["com-overlay", "--video", "a.mp4", "--mass=-5"]).unwrap();
        assert!(args.app_config().is_err());
    }

    #[test]
    fn test_threshold_overrides() {
        let args = Args::try_parse_from([
            "com-overlay",
            "--mass",
            "70",
            "--min-detection-confidence",
            "0.7",
            "--min-tracking-confidence",
            "0.3",
            "--model",
            "models/pose.onnx",
        ])
        .unwrap();
        let settings = args.settings().unwrap();
        assert!((settings.detector.min_detection_confidence - 0.7).abs() < f32::EPSILON);
        assert!((settings.detector.min_tracking_confidence - 0.3).abs() < f32::EPSILON);
        assert_eq!(settings.detector.model_path, PathBuf::from("models/pose.onnx"));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let args =
            Args::try_parse_from(["com-overlay", "--mass", "70", "--min-detection-confidence", "1.5"]).unwrap();
        assert!(args.settings().is_err());
    }

    #[test]
    fn test_output_requires_video() {
        assert!(Args::try_parse_from(["com-overlay", "--mass", "70", "--output", "x.mp4"]).is_err());
    }
}
