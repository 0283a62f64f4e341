//! Hand tracking: fingertip observations and the ONNX landmark detector.
//!
//! The pipeline only needs pixel positions of the five fingertips per hand,
//! so the detector interface is a thin [`HandTracker`] trait. The bundled
//! implementation runs a 21-landmark hand model through `ONNX` Runtime.
//!
//! Detected hands and their landmark sets are associated by list position;
//! nothing verifies that the ordering is stable across frames or matches
//! between two cameras.

use crate::constants::{FINGERTIP_LANDMARKS, NUM_HAND_LANDMARKS};
use crate::utils::safe_cast::{f64_to_i32_clamp, usize_to_i32};
use crate::Result;
use ndarray::{Array1, Array4, CowArray};
use opencv::core::{Mat, Point, Point2f, Scalar, Size, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Default landmark model input size
const DEFAULT_HAND_INPUT_SIZE: i32 = 224;

/// Default hand presence score threshold
const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;

/// The five tracked fingertips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fingertip {
    /// Thumb tip (landmark 4)
    Thumb,
    /// Index finger tip (landmark 8)
    Index,
    /// Middle finger tip (landmark 12)
    Middle,
    /// Ring finger tip (landmark 16)
    Ring,
    /// Pinky tip (landmark 20)
    Pinky,
}

impl Fingertip {
    /// All fingertips in thumb-to-pinky order
    pub const ALL: [Self; 5] = [Self::Thumb, Self::Index, Self::Middle, Self::Ring, Self::Pinky];

    /// Landmark index of this fingertip in the 21-point hand model
    #[must_use]
    pub fn landmark(self) -> usize {
        FINGERTIP_LANDMARKS[self as usize]
    }
}

/// One fingertip position in frame pixels, valid for a single video frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingertipObservation {
    /// Index of the detected hand this tip belongs to
    pub hand: usize,
    /// Which fingertip
    pub tip: Fingertip,
    /// Pixel x from the left frame edge
    pub x: f64,
    /// Pixel y from the top frame edge
    pub y: f64,
}

/// Source of fingertip observations for one camera
pub trait HandTracker {
    /// Run detection on a frame; true if at least one hand was found
    ///
    /// # Errors
    ///
    /// Returns an error when detection itself fails; "no hands" is Ok(false).
    fn find_hands(&mut self, frame: &Mat) -> Result<bool>;

    /// Fingertip observations from the most recent [`Self::find_hands`] call
    fn fingertip_positions(&self) -> Vec<FingertipObservation>;
}

/// Landmarks of one detected hand, in frame pixels
#[derive(Debug, Clone)]
pub struct HandLandmarks {
    /// 21 (x, y) landmark positions
    pub points: Vec<Point2f>,
}

/// Hand landmark detector using `ONNX` Runtime
pub struct HandDetector {
    session: Session,
    input_size: i32,
    score_threshold: f32,
    hands: Vec<HandLandmarks>,
}

impl HandDetector {
    /// Create a new hand detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file cannot be loaded
    /// - The ONNX runtime environment cannot be created
    pub fn new<P: AsRef<Path>>(model_path: P, score_threshold: f32) -> Result<Self> {
        log::info!(
            "Initializing HandDetector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("hand_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(crate::Error::ModelInputError("Model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(crate::Error::ModelOutputError("Model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            input_size: DEFAULT_HAND_INPUT_SIZE,
            score_threshold,
            hands: Vec::new(),
        })
    }

    /// Create a detector with the default presence threshold
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_model<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::new(model_path, DEFAULT_SCORE_THRESHOLD)
    }

    /// Hands found by the last detection pass
    #[must_use]
    pub fn hands(&self) -> &[HandLandmarks] {
        &self.hands
    }

    /// Resize, color-convert and normalize a frame for the model
    #[allow(clippy::cast_sign_loss)] // OpenCV dimensions are positive
    fn preprocess(&self, frame: &Mat) -> Result<Array4<f32>> {
        let size = self.input_size as usize;
        let channels = 3;

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb_image = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let mut data = vec![0.0f32; size * size * channels];
        for row in 0..size {
            for col in 0..size {
                let pixel = float_image.at_2d::<opencv::core::Vec3f>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..channels {
                    data[(row * size + col) * channels + ch] = pixel[ch];
                }
            }
        }

        Array4::from_shape_vec((1, size, size, channels), data)
            .map_err(|e| crate::Error::ModelDataFormatError(format!("Failed to create array: {e}")))
    }

    /// Run the model; returns landmark coordinates and the presence score
    fn forward(&self, inputs: Array4<f32>) -> Result<(Array1<f32>, f32)> {
        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;
        let mut outputs = outputs.into_iter();

        let landmarks_output = outputs
            .next()
            .ok_or_else(|| crate::Error::ModelOutputError("No output from model".to_string()))?;
        let landmarks_tensor = landmarks_output.try_extract::<f32>()?;
        let landmarks_view = landmarks_tensor.view();
        let landmarks = landmarks_view
            .as_slice()
            .ok_or_else(|| crate::Error::ModelOutputError("Failed to get landmark data".to_string()))?;

        // Second output, when present, is the hand presence score
        let score = match outputs.next() {
            Some(score_output) => {
                let score_tensor = score_output.try_extract::<f32>()?;
                let view = score_tensor.view();
                view.as_slice().and_then(|s| s.first().copied()).unwrap_or(0.0)
            }
            None => 1.0,
        };

        Ok((Array1::from(landmarks.to_vec()), score))
    }

    /// Scale normalized model coordinates back to frame pixels
    #[allow(clippy::cast_precision_loss)] // Precision loss acceptable for pixel coordinates
    fn postprocess(&self, landmarks: &Array1<f32>, frame: &Mat) -> Option<HandLandmarks> {
        // x, y, z per landmark in input-size coordinates; z is unused here
        let stride = landmarks.len() / NUM_HAND_LANDMARKS;
        if stride < 2 {
            return None;
        }

        let frame_width = frame.cols() as f32;
        let frame_height = frame.rows() as f32;
        let input = self.input_size as f32;

        let mut points = Vec::with_capacity(NUM_HAND_LANDMARKS);
        for i in 0..NUM_HAND_LANDMARKS {
            let x = landmarks[i * stride] * frame_width / input;
            let y = landmarks[i * stride + 1] * frame_height / input;
            points.push(Point2f::new(x, y));
        }

        Some(HandLandmarks { points })
    }

    /// Draw circles on the detected fingertips
    ///
    /// # Errors
    ///
    /// Returns an error if `OpenCV` drawing operations fail.
    pub fn draw_tips(&self, frame: &mut Mat) -> Result<()> {
        for hand in &self.hands {
            for tip in Fingertip::ALL {
                let Some(point) = hand.points.get(tip.landmark()) else {
                    continue;
                };
                imgproc::circle(
                    frame,
                    Point::new(
                        f64_to_i32_clamp(f64::from(point.x), 0, frame.cols()),
                        f64_to_i32_clamp(f64::from(point.y), 0, frame.rows()),
                    ),
                    6,
                    Scalar::new(255.0, 0.0, 255.0, 0.0),
                    2,
                    imgproc::LINE_8,
                    0,
                )?;
            }
        }
        Ok(())
    }
}

impl HandTracker for HandDetector {
    fn find_hands(&mut self, frame: &Mat) -> Result<bool> {
        self.hands.clear();

        let inputs = self.preprocess(frame)?;
        let (landmarks, score) = self.forward(inputs)?;

        if score >= self.score_threshold {
            if let Some(hand) = self.postprocess(&landmarks, frame) {
                self.hands.push(hand);
            }
        }

        Ok(!self.hands.is_empty())
    }

    fn fingertip_positions(&self) -> Vec<FingertipObservation> {
        let mut observations = Vec::with_capacity(self.hands.len() * Fingertip::ALL.len());

        for (hand, landmarks) in self.hands.iter().enumerate() {
            for tip in Fingertip::ALL {
                if let Some(point) = landmarks.points.get(tip.landmark()) {
                    observations.push(FingertipObservation {
                        hand,
                        tip,
                        x: f64::from(point.x),
                        y: f64::from(point.y),
                    });
                }
            }
        }

        observations
    }
}
