//! Command-line entry point for the stereo virtual piano.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use virtual_piano::app::VirtualPianoApp;
use virtual_piano::config::{Config, EXAMPLE_CONFIG};
use virtual_piano::hand_tracking::HandDetector;
use virtual_piano::synth::open_sink;

/// Play a virtual piano in the air in front of a stereo webcam pair
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,

    /// Path to the hand landmark ONNX model
    #[arg(long, default_value = "assets/hand_landmarks.onnx")]
    model: PathBuf,

    /// Left camera device index (camera point of view)
    #[arg(long)]
    left_camera: Option<i32>,

    /// Right camera device index (camera point of view)
    #[arg(long)]
    right_camera: Option<i32>,

    /// Frame width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Distance between camera centers in centimeters
    #[arg(long)]
    camera_separation: Option<f64>,

    /// Distance from the cameras to the keyboard plane in centimeters
    #[arg(long)]
    plane_distance: Option<f64>,

    /// Number of keyboard octaves
    #[arg(long)]
    octaves: Option<usize>,

    /// MIDI output port to connect to (substring match)
    #[arg(long)]
    midi_port: Option<String>,

    /// Run without GUI windows
    #[arg(long)]
    no_gui: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Load the configuration file, then layer CLI overrides on top
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(index) = self.left_camera {
            config.cameras.left_index = index;
        }
        if let Some(index) = self.right_camera {
            config.cameras.right_index = index;
        }
        if let Some(width) = self.width {
            config.cameras.width = width;
        }
        if let Some(height) = self.height {
            config.cameras.height = height;
        }
        if let Some(separation) = self.camera_separation {
            config.stereo.camera_separation = separation;
        }
        if let Some(distance) = self.plane_distance {
            config.stereo.keyboard_plane_distance = distance;
        }
        if let Some(octaves) = self.octaves {
            config.keyboard.octaves = octaves;
        }
        if self.midi_port.is_some() {
            config.synth.port = self.midi_port;
        }
        if self.no_gui {
            config.display.gui = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if args.debug { "debug" } else { "info" }),
    )
    .init();

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    let model = args.model.clone();
    let config = args.into_config()?;

    info!(
        "Cameras {} (left) and {} (right), {}x{}",
        config.cameras.left_index, config.cameras.right_index, config.cameras.width, config.cameras.height
    );

    let left_tracker = Box::new(HandDetector::from_model(&model)?);
    let right_tracker = Box::new(HandDetector::from_model(&model)?);
    let sink = open_sink(config.synth.port.as_deref());

    let mut app = VirtualPianoApp::new(config, left_tracker, right_tracker, sink)?;
    if let Err(e) = app.run() {
        error!("Pipeline failed: {e}");
        return Err(e.into());
    }

    Ok(())
}
