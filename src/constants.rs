//! Constants used throughout the application

/// Number of landmarks produced by the full-body pose model
pub const NUM_POSE_LANDMARKS: usize = 33;

/// Values per landmark in the model output (x, y, z, visibility, presence)
pub const LANDMARK_STRIDE: usize = 5;

/// Side length of the square pose model input
pub const POSE_MODEL_INPUT_SIZE: i32 = 256;

/// Default detection and tracking confidence thresholds
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_MIN_TRACKING_CONFIDENCE: f32 = 0.5;

/// Landmarks below this visibility are not drawn
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

/// Segmental mass fractions (Dempster-style approximation)
pub const HEAD_MASS_FRACTION: f64 = 0.08;
pub const TORSO_MASS_FRACTION: f64 = 0.50;
pub const UPPER_ARM_MASS_FRACTION: f64 = 0.03;
pub const LOWER_ARM_MASS_FRACTION: f64 = 0.02;
pub const THIGH_MASS_FRACTION: f64 = 0.10;
pub const LOWER_LEG_MASS_FRACTION: f64 = 0.05;

/// Center-of-mass marker radius in pixels
pub const DEFAULT_MARKER_RADIUS: i32 = 5;

/// Label offset from the marker, in pixels (right, up)
pub const DEFAULT_LABEL_OFFSET: (i32, i32) = (10, -10);

/// Label font scale
pub const DEFAULT_FONT_SCALE: f64 = 0.5;

/// Frame rate assumed when a container does not report one
pub const DEFAULT_FPS: f64 = 30.0;

/// Suffix appended to the input file stem for the annotated output
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_com";

/// Window title for live display
pub const DISPLAY_WINDOW_NAME: &str = "Center of Mass";

