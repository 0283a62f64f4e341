//! Threaded camera frame source.
//!
//! Each camera runs its own capture thread that keeps only the latest frame
//! in a single-slot buffer; the pipeline polls with [`VideoThread::next`]
//! and receives a black placeholder while no frame is ready. Losing frames
//! is intended: the piano reacts to the most recent view, not to history.

use crate::constants::RECONNECT_COOLDOWN_SECS;
use crate::utils::safe_cast::usize_to_i32;
use crate::Result;
use log::{info, warn};
use opencv::core::{Mat, MatTraitConst, CV_8UC3};
use opencv::videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Video input selector
#[derive(Debug, Clone)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

/// Capture thread configuration
#[derive(Debug, Clone)]
pub struct VideoThreadConfig {
    /// Device or file to read from
    pub source: VideoSource,
    /// Requested frame width in pixels
    pub width: u32,
    /// Requested frame height in pixels
    pub height: u32,
    /// Requested capture frame rate
    pub frame_rate: f64,
    /// Reopen the device after read failures instead of finishing
    pub try_to_reconnect: bool,
    /// Pause between reconnection attempts
    pub reconnect_cooldown: Duration,
}

impl VideoThreadConfig {
    /// Configuration for a webcam at the given index
    #[must_use]
    pub fn camera(index: i32, width: u32, height: u32, frame_rate: f64) -> Self {
        Self {
            source: VideoSource::Camera(index),
            width,
            height,
            frame_rate,
            try_to_reconnect: false,
            reconnect_cooldown: Duration::from_secs_f64(RECONNECT_COOLDOWN_SECS),
        }
    }
}

/// Shared state between the capture thread and the consumer
struct Shared {
    slot: Mutex<Option<Mat>>,
    frame_ready: Condvar,
    alive: AtomicBool,
    frame_rate: Mutex<f64>,
}

/// Background frame grabber with a single-slot latest-frame buffer
pub struct VideoThread {
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    black_frame: Mat,
    finished: bool,
    frames_returned: u64,
}

impl VideoThread {
    /// Start a capture thread for the configured source.
    ///
    /// # Errors
    ///
    /// Returns an error if the black placeholder frame cannot be allocated.
    pub fn start(config: VideoThreadConfig) -> Result<Self> {
        let black_frame = Mat::new_rows_cols_with_default(
            usize_to_i32(config.height as usize)?,
            usize_to_i32(config.width as usize)?,
            CV_8UC3,
            opencv::core::Scalar::all(0.0),
        )?;

        let shared = Arc::new(Shared {
            slot: Mutex::new(None),
            frame_ready: Condvar::new(),
            alive: AtomicBool::new(true),
            frame_rate: Mutex::new(0.0),
        });
        let running = Arc::new(AtomicBool::new(true));

        let thread_shared = Arc::clone(&shared);
        let thread_running = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name(format!("capture-{:?}", config.source))
            .spawn(move || capture_loop(&config, &thread_shared, &thread_running))?;

        Ok(Self {
            shared,
            running,
            handle: Some(handle),
            black_frame,
            finished: false,
            frames_returned: 0,
        })
    }

    /// Poll for the latest frame.
    ///
    /// Waits up to `wait` for a frame when none is buffered. Returns
    /// `(finished, frame)`: once the source is exhausted `finished` stays
    /// true and, with `black`, the frame is the black placeholder.
    pub fn next(&mut self, black: bool, wait: Duration) -> (bool, Option<Mat>) {
        let placeholder = || if black { Some(self.black_frame.clone()) } else { None };

        if self.finished {
            return (true, placeholder());
        }

        let mut slot = match self.shared.slot.lock() {
            Ok(slot) => slot,
            Err(_) => {
                self.finished = true;
                return (true, placeholder());
            }
        };

        if slot.is_none() && !wait.is_zero() && self.shared.alive.load(Ordering::Acquire) {
            let (guard, _) = match self.shared.frame_ready.wait_timeout(slot, wait) {
                Ok(result) => result,
                Err(_) => {
                    self.finished = true;
                    return (true, placeholder());
                }
            };
            slot = guard;
        }

        match slot.take() {
            Some(frame) => {
                self.frames_returned += 1;
                (false, Some(frame))
            }
            None => {
                if !self.shared.alive.load(Ordering::Acquire) {
                    self.finished = true;
                }
                (self.finished, placeholder())
            }
        }
    }

    /// Frames handed to the consumer so far
    #[must_use]
    pub fn frames_returned(&self) -> u64 {
        self.frames_returned
    }

    /// Capture rate measured by the grab loop, frames per second
    #[must_use]
    pub fn current_frame_rate(&self) -> f64 {
        self.shared.frame_rate.lock().map(|rate| *rate).unwrap_or(0.0)
    }

    /// True once the source is exhausted or the device is gone
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished || !self.shared.alive.load(Ordering::Acquire)
    }

    /// Stop the capture thread and release the device
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Capture thread panicked during shutdown");
            }
        }
        self.finished = true;
    }
}

impl Drop for VideoThread {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open the configured capture device
fn open_capture(config: &VideoThreadConfig) -> Result<VideoCapture> {
    let mut capture = match &config.source {
        VideoSource::Camera(index) => {
            info!("Opening camera {index}");
            let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)?;
            cap.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(config.width))?;
            cap.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(config.height))?;
            cap.set(videoio::CAP_PROP_FPS, config.frame_rate)?;
            cap.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;
            cap
        }
        VideoSource::File(path) => {
            info!("Opening video file: {path}");
            VideoCapture::from_file(path, videoio::CAP_ANY)?
        }
    };

    if !capture.is_opened()? {
        let _ = capture.release();
        return Err(crate::Error::Camera(format!(
            "Could not open video source {:?}",
            config.source
        )));
    }

    Ok(capture)
}

/// Grab frames until stopped or the source is exhausted
fn capture_loop(config: &VideoThreadConfig, shared: &Arc<Shared>, running: &Arc<AtomicBool>) {
    let mut capture: Option<VideoCapture> = None;
    let mut last_open_attempt: Option<Instant> = None;
    let mut frame_counter = 0u32;
    let mut rate_window_start = Instant::now();

    while running.load(Ordering::Acquire) {
        let Some(cap) = capture.as_mut() else {
            let cooldown_elapsed = last_open_attempt
                .map(|at| at.elapsed() >= config.reconnect_cooldown)
                .unwrap_or(true);
            if !cooldown_elapsed {
                std::thread::sleep(Duration::from_millis(100));
                continue;
            }

            last_open_attempt = Some(Instant::now());
            match open_capture(config) {
                Ok(cap) => {
                    capture = Some(cap);
                    rate_window_start = Instant::now();
                    frame_counter = 0;
                }
                Err(e) if config.try_to_reconnect => {
                    warn!("{e}; retrying in {:?}", config.reconnect_cooldown);
                }
                Err(e) => {
                    warn!("{e}; capture finished");
                    break;
                }
            }
            continue;
        };

        let mut frame = Mat::default();
        let grabbed = cap.read(&mut frame).unwrap_or(false);
        if !grabbed || frame.empty() {
            let _ = cap.release();
            capture = None;
            if config.try_to_reconnect {
                warn!("Frame grab failed; scheduling reconnect");
                last_open_attempt = Some(Instant::now());
                continue;
            }
            break;
        }

        if let Ok(mut slot) = shared.slot.lock() {
            // Latest frame wins; an unread older frame is dropped
            *slot = Some(frame);
            shared.frame_ready.notify_one();
        }

        frame_counter += 1;
        if frame_counter >= 10 {
            let elapsed = rate_window_start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                if let Ok(mut rate) = shared.frame_rate.lock() {
                    *rate = f64::from(frame_counter) / elapsed;
                }
            }
            frame_counter = 0;
            rate_window_start = Instant::now();
        }
    }

    shared.alive.store(false, Ordering::Release);
    if let Ok(slot) = shared.slot.lock() {
        drop(slot);
        shared.frame_ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_finishes() {
        let config = VideoThreadConfig {
            source: VideoSource::File("does-not-exist.mp4".to_string()),
            width: 640,
            height: 480,
            frame_rate: 30.0,
            try_to_reconnect: false,
            reconnect_cooldown: Duration::from_millis(10),
        };

        let mut thread = VideoThread::start(config).unwrap();

        // The capture thread gives up immediately on a missing file
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let (finished, frame) = thread.next(true, Duration::from_millis(50));
            if finished {
                assert!(frame.is_some());
                break;
            }
            assert!(Instant::now() < deadline, "source never finished");
        }

        thread.stop();
    }

    #[test]
    fn test_black_placeholder_dimensions() {
        let config = VideoThreadConfig {
            source: VideoSource::File("does-not-exist.mp4".to_string()),
            width: 320,
            height: 240,
            frame_rate: 30.0,
            try_to_reconnect: false,
            reconnect_cooldown: Duration::from_millis(10),
        };

        let mut thread = VideoThread::start(config).unwrap();
        let (_, frame) = thread.next(true, Duration::ZERO);
        let frame = frame.unwrap();
        assert_eq!(frame.cols(), 320);
        assert_eq!(frame.rows(), 240);
        thread.stop();
    }
}
