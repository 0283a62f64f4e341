//! Stereo-vision virtual piano.
//!
//! Two horizontally separated webcams watch the player's hands. Each frame
//! pair runs through the pipeline:
//!
//! 1. A hand landmark model finds fingertip pixels in each camera's frame
//!    ([`hand_tracking`]).
//! 2. Pixels become angles from each frame center and matched observations
//!    are triangulated into 3D positions ([`angles`]).
//! 3. Fingertip positions are hit-tested against an on-screen keyboard
//!    ([`keyboard`]) and compared with the press plane; press/release edges
//!    are detected across frames ([`mapper`]).
//! 4. Edges become MIDI note-on/note-off events ([`synth`]).
//!
//! [`app`] wires the stages together over threaded camera capture
//! ([`video`]).

pub mod angles;
pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod hand_tracking;
pub mod keyboard;
pub mod mapper;
pub mod synth;
pub mod utils;
pub mod video;

pub use error::{Error, Result};
