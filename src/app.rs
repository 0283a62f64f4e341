//! Application wiring: capture, tracking, triangulation and note output.
//!
//! [`VirtualPianoApp`] owns both capture threads, a hand tracker per camera,
//! the stereo geometry, the on-screen keyboard and the MIDI sink, and runs
//! the per-frame pipeline until a camera finishes or the user quits.

use crate::angles::{FrameAngles, TriangulatedPoint};
use crate::config::Config;
use crate::hand_tracking::{FingertipObservation, HandTracker};
use crate::keyboard::VirtualKeyboard;
use crate::mapper::{KeyEdges, KeyStateMapper};
use crate::synth::NoteSink;
use crate::utils::round_half_up;
use crate::utils::safe_cast::{f64_to_i32_clamp, usize_to_i32};
use crate::video::{VideoThread, VideoThreadConfig};
use crate::{Error, Result};
use log::{debug, info, warn};
use opencv::core::{self, Mat, Point, Scalar, Vector};
use opencv::highgui;
use opencv::prelude::*;
use std::time::{Duration, Instant};

/// Window title for the side-by-side camera view
const WINDOW_NAME: &str = "Virtual Piano";

/// How long to wait for a frame before reusing the black placeholder
const FRAME_WAIT: Duration = Duration::from_millis(500);

/// Per-fingertip result of the stereo stage, in left-frame pixels plus
/// triangulated space
#[derive(Debug, Clone, Copy)]
struct TrackedTip {
    observation: FingertipObservation,
    point: TriangulatedPoint,
    /// Camera-angle-corrected distance used against the press threshold
    height: f64,
}

/// Send note events for one frame's edges: all presses in ascending key
/// order, then all releases in ascending key order. `note_shift` transposes
/// the emitted notes; shifted notes outside MIDI range are dropped.
///
/// # Errors
///
/// Propagates keyboard range errors and sink delivery errors.
pub fn emit_note_events(
    keyboard: &VirtualKeyboard,
    edges: &KeyEdges,
    sink: &mut dyn NoteSink,
    channel: u8,
    velocity: u8,
    note_shift: i8,
) -> Result<()> {
    let shifted = |key: usize| -> Result<Option<u8>> {
        let note = i16::from(keyboard.note_from_key(key)?) + i16::from(note_shift);
        Ok(u8::try_from(note).ok().filter(|&n| n <= 127))
    };

    for (key, &on) in edges.on.iter().enumerate() {
        if on {
            if let Some(note) = shifted(key)? {
                debug!("note on: key {key} -> note {note}");
                sink.note_on(channel, note, velocity)?;
            }
        }
    }
    for (key, &off) in edges.off.iter().enumerate() {
        if off {
            if let Some(note) = shifted(key)? {
                debug!("note off: key {key} -> note {note}");
                sink.note_off(channel, note)?;
            }
        }
    }

    Ok(())
}

/// The assembled virtual piano pipeline
pub struct VirtualPianoApp {
    config: Config,
    left_video: VideoThread,
    right_video: VideoThread,
    left_tracker: Box<dyn HandTracker>,
    right_tracker: Box<dyn HandTracker>,
    angles: FrameAngles,
    keyboard: VirtualKeyboard,
    mapper: KeyStateMapper,
    sink: Box<dyn NoteSink>,
    show_dashboard: bool,
}

impl VirtualPianoApp {
    /// Assemble the pipeline from a validated configuration and the two
    /// injectable backends (hand trackers and note sink).
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid, a capture thread
    /// cannot start or the initial program change fails.
    pub fn new(
        config: Config,
        left_tracker: Box<dyn HandTracker>,
        right_tracker: Box<dyn HandTracker>,
        mut sink: Box<dyn NoteSink>,
    ) -> Result<Self> {
        config.validate()?;

        let cameras = &config.cameras;
        let angles = FrameAngles::new(
            cameras.width,
            cameras.height,
            cameras.angle_width(),
            Some(cameras.angle_height()),
        )?;
        let keyboard = VirtualKeyboard::new(
            cameras.width,
            cameras.height,
            config.keyboard.white_key_count(),
        )?;

        let mut left_config =
            VideoThreadConfig::camera(cameras.left_index, cameras.width, cameras.height, cameras.frame_rate);
        left_config.try_to_reconnect = cameras.try_to_reconnect;
        let mut right_config =
            VideoThreadConfig::camera(cameras.right_index, cameras.width, cameras.height, cameras.frame_rate);
        right_config.try_to_reconnect = cameras.try_to_reconnect;

        let left_video = VideoThread::start(left_config)?;
        let right_video = VideoThread::start(right_config)?;

        sink.program_change(config.synth.channel, config.synth.program)?;

        let show_dashboard = config.display.show_dashboard;
        Ok(Self {
            config,
            left_video,
            right_video,
            left_tracker,
            right_tracker,
            angles,
            keyboard,
            mapper: KeyStateMapper::new(),
            sink,
            show_dashboard,
        })
    }

    /// Pair the two cameras' fingertip observations and triangulate each
    /// pair. Observations are paired by list position; a pair whose rays are
    /// degenerate is skipped.
    fn triangulate_tips(
        &self,
        left_tips: &[FingertipObservation],
        right_tips: &[FingertipObservation],
    ) -> Vec<TrackedTip> {
        let stereo = &self.config.stereo;
        let mut tracked = Vec::with_capacity(left_tips.len().min(right_tips.len()));

        for (left, right) in left_tips.iter().zip(right_tips) {
            let lcamera = self.angles.angles_from_center(left.x, left.y, true, true);
            let rcamera = self.angles.angles_from_center(right.x, right.y, true, true);

            let point = match self
                .angles
                .location(stereo.camera_separation, lcamera, rcamera, true, true)
            {
                Ok(point) => point,
                Err(Error::DegenerateGeometry(reason)) => {
                    debug!("skipping fingertip pair: {reason}");
                    continue;
                }
                Err(e) => {
                    warn!("triangulation failed: {e}");
                    continue;
                }
            };

            // Empirical correction for the distance error that grows with
            // the horizontal angle off the rig center.
            let delta =
                stereo.correction_quadratic * point.x * point.x - stereo.correction_linear * point.x;
            let height = point.distance - delta;

            tracked.push(TrackedTip {
                observation: *left,
                point,
                height,
            });
        }

        tracked
    }

    /// Run one frame's worth of detection and note emission against frames
    /// that have already been flipped to the player's view.
    fn process_frame(&mut self, left_frame: &Mat, right_frame: &Mat) -> Result<Vec<TrackedTip>> {
        let left_found = self.left_tracker.find_hands(left_frame)?;
        let right_found = self.right_tracker.find_hands(right_frame)?;

        let tracked = if left_found && right_found {
            self.triangulate_tips(
                &self.left_tracker.fingertip_positions(),
                &self.right_tracker.fingertip_positions(),
            )
        } else {
            Vec::new()
        };

        let observations: Vec<FingertipObservation> =
            tracked.iter().map(|tip| tip.observation).collect();
        let heights: Vec<f64> = tracked.iter().map(|tip| tip.height).collect();

        let edges = self.mapper.compute_edges(
            &self.keyboard,
            &observations,
            &heights,
            self.config.stereo.press_threshold(),
            self.keyboard.total_keys(),
        );

        if !edges.is_silent() {
            emit_note_events(
                &self.keyboard,
                &edges,
                self.sink.as_mut(),
                self.config.synth.channel,
                self.config.synth.velocity,
                self.config.keyboard.octave_base,
            )?;
        }

        Ok(tracked)
    }

    /// Overlay the dashboard: last triangulated tip and loop rates
    fn draw_dashboard(&self, frame: &mut Mat, tracked: &[TrackedTip], frame_rate: f64) -> Result<()> {
        let mut lines = vec![
            format!("X: {}", tracked.last().map_or_else(String::new, |t| round_half_up(t.point.x, 2).to_string())),
            format!("Y: {}", tracked.last().map_or_else(String::new, |t| round_half_up(t.point.y, 2).to_string())),
            format!("Z: {}", tracked.last().map_or_else(String::new, |t| round_half_up(t.point.z, 2).to_string())),
            format!("D: {}", tracked.last().map_or_else(String::new, |t| round_half_up(t.height, 2).to_string())),
        ];
        lines.push(format!("FPS: {}", round_half_up(frame_rate, 1)));
        lines.push(format!(
            "CPS: {} / {}",
            round_half_up(self.left_video.current_frame_rate(), 1),
            round_half_up(self.right_video.current_frame_rate(), 1),
        ));

        for (row, line) in lines.iter().enumerate() {
            imgproc_put_text(frame, line, 10, 22 + 18 * usize_to_i32(row)?)?;
        }

        Ok(())
    }

    /// Main loop: poll frames, track, triangulate, emit notes and display.
    ///
    /// Exits cleanly when both cameras finish, or on `q`/Escape. The `d` key
    /// toggles the dashboard.
    ///
    /// # Errors
    ///
    /// Returns the first unrecoverable pipeline error.
    pub fn run(&mut self) -> Result<()> {
        info!(
            "Starting virtual piano: {} white keys, {} chromatic keys, press threshold {:.1} cm",
            self.keyboard.white_key_count(),
            self.keyboard.total_keys(),
            self.config.stereo.press_threshold(),
        );

        let mut frame_counter = 0u32;
        let mut rate_window_start = Instant::now();
        let mut frame_rate = 0.0;

        loop {
            let (left_done, left_frame) = self.left_video.next(true, FRAME_WAIT);
            let (right_done, right_frame) = self.right_video.next(true, FRAME_WAIT);

            if left_done && right_done {
                info!("Both cameras finished");
                break;
            }
            let (Some(left_frame), Some(right_frame)) = (left_frame, right_frame) else {
                continue;
            };

            // Mirror both axes so the display behaves like a piano seen by
            // the player.
            let mut left_view = Mat::default();
            let mut right_view = Mat::default();
            core::flip(&left_frame, &mut left_view, -1)?;
            core::flip(&right_frame, &mut right_view, -1)?;

            let tracked = self.process_frame(&left_view, &right_view)?;

            frame_counter += 1;
            if frame_counter >= 10 {
                let elapsed = rate_window_start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    frame_rate = f64::from(frame_counter) / elapsed;
                }
                frame_counter = 0;
                rate_window_start = Instant::now();
            }

            if !self.config.display.gui {
                continue;
            }

            self.keyboard.draw(&mut left_view)?;
            self.angles.frame_add_crosshairs(&mut left_view)?;
            self.angles.frame_add_crosshairs(&mut right_view)?;
            for tip in &tracked {
                draw_tip_marker(&mut left_view, tip.observation.x, tip.observation.y)?;
            }
            if self.show_dashboard {
                self.draw_dashboard(&mut left_view, &tracked, frame_rate)?;
            }

            // Left camera sees the right half of the scene, so it goes on
            // the right when the cameras face the player.
            let mut display = Mat::default();
            let panes: Vector<Mat> = if self.config.display.cameras_in_front {
                Vector::from_iter([right_view, left_view])
            } else {
                Vector::from_iter([left_view, right_view])
            };
            core::hconcat(&panes, &mut display)?;
            highgui::imshow(WINDOW_NAME, &display)?;

            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            match highgui::wait_key(1)? as u8 {
                b'q' | 27 => {
                    info!("Quit requested");
                    break;
                }
                b'd' => {
                    self.show_dashboard = !self.show_dashboard;
                }
                _ => {}
            }
        }

        self.shutdown()
    }

    /// Release cameras, close windows and silence any held notes
    fn shutdown(&mut self) -> Result<()> {
        self.left_video.stop();
        self.right_video.stop();
        if self.config.display.gui {
            let _ = highgui::destroy_all_windows();
        }

        // Anything still held gets an explicit note-off
        let release = self.mapper.compute_edges(
            &self.keyboard,
            &[],
            &[],
            self.config.stereo.press_threshold(),
            self.keyboard.total_keys(),
        );
        if !release.is_silent() {
            emit_note_events(
                &self.keyboard,
                &release,
                self.sink.as_mut(),
                self.config.synth.channel,
                self.config.synth.velocity,
                self.config.keyboard.octave_base,
            )?;
        }

        Ok(())
    }
}

/// Crosshair marker on a tracked fingertip
fn draw_tip_marker(frame: &mut Mat, x: f64, y: f64) -> Result<()> {
    opencv::imgproc::draw_marker(
        frame,
        Point::new(
            f64_to_i32_clamp(x, 0, frame.cols()),
            f64_to_i32_clamp(y, 0, frame.rows()),
        ),
        Scalar::new(0.0, 0.0, 255.0, 0.0),
        opencv::imgproc::MARKER_CROSS,
        14,
        2,
        opencv::imgproc::LINE_8,
    )?;
    Ok(())
}

/// Dashboard text line at a fixed left margin
fn imgproc_put_text(frame: &mut Mat, text: &str, x: i32, y: i32) -> Result<()> {
    opencv::imgproc::put_text(
        frame,
        text,
        Point::new(x, y),
        opencv::imgproc::FONT_HERSHEY_SIMPLEX,
        0.5,
        Scalar::new(0.0, 255.0, 255.0, 0.0),
        1,
        opencv::imgproc::LINE_8,
        false,
    )?;
    Ok(())
}
