//! Configuration management for the virtual piano application

use crate::constants::{
    CAMERA_HFOV_DEG, CAMERA_VFOV_DEG, DEFAULT_CAMERA_SEPARATION_CM, DEFAULT_FPS,
    DEFAULT_KEYBOARD_PLANE_DISTANCE_CM, DEFAULT_MIDI_CHANNEL, DEFAULT_OCTAVES, DEFAULT_PIXEL_HEIGHT,
    DEFAULT_PIXEL_WIDTH, DEFAULT_VELOCITY, DISTANCE_CORRECTION_LIN, DISTANCE_CORRECTION_QUAD,
    HFOV_RECTIFICATION_DEG, PRESS_THRESHOLD_OFFSET_CM, WHITE_KEYS_PER_OCTAVE,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stereo camera pair configuration
    pub cameras: CameraConfig,

    /// Triangulation and press threshold configuration
    pub stereo: StereoConfig,

    /// Virtual keyboard configuration
    pub keyboard: KeyboardConfig,

    /// MIDI output configuration
    pub synth: SynthConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Stereo camera pair parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Left camera device index (camera point of view)
    pub left_index: i32,

    /// Right camera device index (camera point of view)
    pub right_index: i32,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Requested capture frame rate
    pub frame_rate: f64,

    /// Nominal horizontal field of view, degrees
    pub horizontal_fov: f64,

    /// Nominal vertical field of view, degrees
    pub vertical_fov: f64,

    /// Horizontal field-of-view rectification, degrees
    pub fov_rectification: f64,

    /// Reopen a camera after read failures
    pub try_to_reconnect: bool,
}

/// Triangulation and press-plane parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoConfig {
    /// Distance between camera optical centers, centimeters
    pub camera_separation: f64,

    /// Distance from the baseline midpoint to the keyboard plane, cm
    pub keyboard_plane_distance: f64,

    /// Subtracted from the plane distance to form the press threshold, cm
    pub press_threshold_offset: f64,

    /// Quadratic coefficient of the camera-angle distance correction
    pub correction_quadratic: f64,

    /// Linear coefficient of the camera-angle distance correction
    pub correction_linear: f64,
}

/// Virtual keyboard parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Number of full octaves; a final C is always appended
    pub octaves: usize,

    /// Shift applied to emitted MIDI notes, semitones
    pub octave_base: i8,
}

/// MIDI output parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Substring of the MIDI output port to connect to
    pub port: Option<String>,

    /// MIDI channel (0-15)
    pub channel: u8,

    /// Note-on velocity (0-127)
    pub velocity: u8,

    /// Instrument program selected at startup (0-127)
    pub program: u8,
}

/// Display parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the X/Y/Z/D and frame-rate dashboard
    pub show_dashboard: bool,

    /// Cameras face the player; swap the side-by-side frame order
    pub cameras_in_front: bool,

    /// Show GUI windows at all
    pub gui: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            left_index: 2,
            right_index: 0,
            width: DEFAULT_PIXEL_WIDTH,
            height: DEFAULT_PIXEL_HEIGHT,
            frame_rate: DEFAULT_FPS,
            horizontal_fov: CAMERA_HFOV_DEG,
            vertical_fov: CAMERA_VFOV_DEG,
            fov_rectification: HFOV_RECTIFICATION_DEG,
            try_to_reconnect: false,
        }
    }
}

impl Default for StereoConfig {
    fn default() -> Self {
        Self {
            camera_separation: DEFAULT_CAMERA_SEPARATION_CM,
            keyboard_plane_distance: DEFAULT_KEYBOARD_PLANE_DISTANCE_CM,
            press_threshold_offset: PRESS_THRESHOLD_OFFSET_CM,
            correction_quadratic: DISTANCE_CORRECTION_QUAD,
            correction_linear: DISTANCE_CORRECTION_LIN,
        }
    }
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            octaves: DEFAULT_OCTAVES,
            octave_base: 0,
        }
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            port: None,
            channel: DEFAULT_MIDI_CHANNEL,
            velocity: DEFAULT_VELOCITY,
            program: 0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_dashboard: true,
            cameras_in_front: true,
            gui: true,
        }
    }
}

impl CameraConfig {
    /// Effective horizontal view angle after rectification, degrees
    #[must_use]
    pub fn angle_width(&self) -> f64 {
        self.horizontal_fov - self.fov_rectification
    }

    /// Effective vertical view angle, rectified proportionally, degrees
    #[must_use]
    pub fn angle_height(&self) -> f64 {
        self.vertical_fov - self.vertical_fov * self.fov_rectification / self.horizontal_fov
    }
}

impl StereoConfig {
    /// Corrected-distance threshold above which a fingertip counts as
    /// pressing a key
    #[must_use]
    pub fn press_threshold(&self) -> f64 {
        self.keyboard_plane_distance - self.press_threshold_offset
    }
}

impl KeyboardConfig {
    /// White key count: full octaves plus the final C
    #[must_use]
    pub fn white_key_count(&self) -> usize {
        self.octaves * WHITE_KEYS_PER_OCTAVE + 1
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns a [`Error::ConfigError`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.cameras.width == 0 || self.cameras.height == 0 {
            return Err(Error::ConfigError("Frame dimensions must be non-zero".to_string()));
        }
        if self.cameras.frame_rate <= 0.0 {
            return Err(Error::ConfigError("Frame rate must be positive".to_string()));
        }
        if !(0.0..180.0).contains(&self.cameras.angle_width()) || self.cameras.angle_width() <= 0.0 {
            return Err(Error::ConfigError(
                "Rectified horizontal view angle must be in (0, 180) degrees".to_string(),
            ));
        }
        if self.cameras.left_index == self.cameras.right_index {
            return Err(Error::ConfigError(
                "Left and right cameras must be different devices".to_string(),
            ));
        }
        if self.stereo.camera_separation <= 0.0 {
            return Err(Error::ConfigError("Camera separation must be positive".to_string()));
        }
        if self.stereo.keyboard_plane_distance <= 0.0 {
            return Err(Error::ConfigError(
                "Keyboard plane distance must be positive".to_string(),
            ));
        }
        if self.keyboard.octaves == 0 {
            return Err(Error::ConfigError("Keyboard needs at least one octave".to_string()));
        }
        if self.synth.channel > 15 {
            return Err(Error::ConfigError("MIDI channel must be 0-15".to_string()));
        }
        if self.synth.velocity > 127 {
            return Err(Error::ConfigError("MIDI velocity must be 0-127".to_string()));
        }
        if self.synth.program > 127 {
            return Err(Error::ConfigError("MIDI program must be 0-127".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Virtual Piano Configuration

# Stereo camera pair
cameras:
  left_index: 2
  right_index: 0
  width: 640
  height: 480
  frame_rate: 30.0
  horizontal_fov: 70.42
  vertical_fov: 43.3
  fov_rectification: 21.42
  try_to_reconnect: false

# Triangulation and press plane
stereo:
  camera_separation: 14.21
  keyboard_plane_distance: 71.0
  press_threshold_offset: 2.5
  correction_quadratic: 0.006509695290859
  correction_linear: 0.039473684210526

# Virtual keyboard
keyboard:
  octaves: 3
  octave_base: 0

# MIDI output
synth:
  port: null
  channel: 0
  velocity: 84
  program: 0

# Display
display:
  show_dashboard: true
  cameras_in_front: true
  gui: true
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.keyboard.white_key_count(), 22);
        assert!((config.stereo.press_threshold() - 68.5).abs() < 1e-9);
    }

    #[test]
    fn test_rectified_angles() {
        let cameras = CameraConfig::default();
        assert!((cameras.angle_width() - 49.0).abs() < 1e-9);
        // Vertical rectification is proportional to the horizontal one
        let expected = 43.3 - 43.3 * 21.42 / 70.42;
        assert!((cameras.angle_height() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        config.validate().unwrap();
        assert_eq!(config.cameras.left_index, 2);
        assert_eq!(config.synth.velocity, 84);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.synth.channel = 16;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stereo.camera_separation = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cameras.right_index = config.cameras.left_index;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cameras.fov_rectification = config.cameras.horizontal_fov;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("keyboard:\n  octaves: 2\n").unwrap();
        assert_eq!(config.keyboard.white_key_count(), 15);
        assert_eq!(config.cameras.width, 640);
    }
}
