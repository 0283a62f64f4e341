//! Constants used throughout the application

/// Default frame width in pixels
pub const DEFAULT_PIXEL_WIDTH: u32 = 640;

/// Default frame height in pixels
pub const DEFAULT_PIXEL_HEIGHT: u32 = 480;

/// Horizontal field of view of the reference webcam (Logi C920s), degrees
pub const CAMERA_HFOV_DEG: f64 = 70.42;

/// Vertical field of view of the reference webcam, degrees
pub const CAMERA_VFOV_DEG: f64 = 43.3;

/// Empirical horizontal FoV rectification, degrees.
/// The vertical rectification is derived proportionally.
pub const HFOV_RECTIFICATION_DEG: f64 = 21.42;

/// Default distance between the two camera optical centers, centimeters
pub const DEFAULT_CAMERA_SEPARATION_CM: f64 = 14.21;

/// Default distance from the baseline midpoint to the keyboard plane, cm
pub const DEFAULT_KEYBOARD_PLANE_DISTANCE_CM: f64 = 71.0;

/// Offset subtracted from the keyboard plane distance to form the press
/// threshold, cm
pub const PRESS_THRESHOLD_OFFSET_CM: f64 = 2.5;

/// Quadratic coefficient of the camera-angle distance correction
pub const DISTANCE_CORRECTION_QUAD: f64 = 0.006_509_695_290_859;

/// Linear coefficient of the camera-angle distance correction
pub const DISTANCE_CORRECTION_LIN: f64 = 0.039_473_684_210_526;

/// White keys per octave
pub const WHITE_KEYS_PER_OCTAVE: usize = 7;

/// Black keys per octave
pub const BLACK_KEYS_PER_OCTAVE: usize = 5;

/// Semitones per octave
pub const SEMITONES_PER_OCTAVE: usize = 12;

/// Default octave count of the on-screen keyboard
pub const DEFAULT_OCTAVES: usize = 3;

/// Physical black/white key width ratio (13.7 mm / 23.5 mm at the base)
pub const BLACK_TO_WHITE_KEY_RATIO: f64 = 13.7 / 23.5;

/// Black key height as a fraction of the white key height
pub const BLACK_KEY_HEIGHT_FRACTION: f64 = 2.0 / 3.0;

/// Keyboard bounding box as fractions of the canvas (left, top, right, bottom)
pub const KEYBOARD_BOX_X0_FRACTION: f64 = 0.20;
pub const KEYBOARD_BOX_Y0_FRACTION: f64 = 0.35;
pub const KEYBOARD_BOX_X1_FRACTION: f64 = 0.80;
pub const KEYBOARD_BOX_Y1_FRACTION: f64 = 0.55;

/// MIDI note number of key index 0 (C2, GM2 recommended range 21-108)
pub const MIDI_BASE_NOTE: u8 = 36;

/// Default note-on velocity (127 * 2 / 3)
pub const DEFAULT_VELOCITY: u8 = 84;

/// Default MIDI channel
pub const DEFAULT_MIDI_CHANNEL: u8 = 0;

/// Number of hand landmarks produced by the landmark model
pub const NUM_HAND_LANDMARKS: usize = 21;

/// Landmark indices of the five fingertips (thumb through pinky)
pub const FINGERTIP_LANDMARKS: [usize; 5] = [4, 8, 12, 16, 20];

/// Default frames per second requested from the cameras
pub const DEFAULT_FPS: f64 = 30.0;

/// Cooldown between camera reconnection attempts, seconds
pub const RECONNECT_COOLDOWN_SECS: f64 = 10.0;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
