//! Virtual on-screen piano keyboard layout and hit testing.
//!
//! The keyboard occupies a fixed fraction of the camera canvas. White keys
//! split the box into equal columns; black keys sit on the column boundaries
//! in the upper two thirds of the box ("upper zone"), offset left, right or
//! centered the way physical piano keys are. Key indices are chromatic and
//! contiguous from 0; [`VirtualKeyboard::note_from_key`] maps them to MIDI
//! note numbers.
//!
//! Everything geometric is derived once at construction; the rectangles used
//! for drawing are the same ones used for hit testing.

use crate::constants::{
    BLACK_KEY_HEIGHT_FRACTION, BLACK_TO_WHITE_KEY_RATIO, KEYBOARD_BOX_X0_FRACTION,
    KEYBOARD_BOX_X1_FRACTION, KEYBOARD_BOX_Y0_FRACTION, KEYBOARD_BOX_Y1_FRACTION, MIDI_BASE_NOTE,
    SEMITONES_PER_OCTAVE, WHITE_KEYS_PER_OCTAVE,
};
use crate::utils::round_half_up;
use crate::utils::safe_cast::f64_to_i32_clamp;
use crate::{Error, Result};
use opencv::core::{self, Mat, Point, Rect, Scalar};
use opencv::imgproc;
use opencv::prelude::*;

/// Chromatic offsets of the seven white keys within one octave (C D E F G A B)
const WHITE_SEMITONE_OFFSETS: [usize; WHITE_KEYS_PER_OCTAVE] = [0, 2, 4, 5, 7, 9, 11];

/// White-key column boundaries with no adjacent black key (E-F and B-C)
const BOUNDARIES_WITHOUT_BLACK: [usize; 2] = [2, 6];

/// A black key rectangle in the upper zone, in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackKey {
    /// Chromatic key index
    pub index: usize,
    /// Left edge
    pub x0: f64,
    /// Right edge
    pub x1: f64,
}

/// Chromatic key index of a white key column (closed form over the repeating
/// 7-white octave pattern).
#[must_use]
pub fn white_key_index(column: usize) -> usize {
    let octave = column / WHITE_KEYS_PER_OCTAVE;
    let position = column % WHITE_KEYS_PER_OCTAVE;
    octave * SEMITONES_PER_OCTAVE + WHITE_SEMITONE_OFFSETS[position]
}

/// Chromatic key index of the black key at a white-column boundary, if the
/// boundary carries one. Boundary `p` lies between white columns `p` and
/// `p + 1`; the E-F and B-C boundaries carry none.
#[must_use]
pub fn black_key_index(boundary: usize) -> Option<usize> {
    if BOUNDARIES_WITHOUT_BLACK.contains(&(boundary % WHITE_KEYS_PER_OCTAVE)) {
        None
    } else {
        Some(white_key_index(boundary) + 1)
    }
}

/// Virtual piano keyboard over a pixel canvas
#[derive(Debug, Clone)]
pub struct VirtualKeyboard {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    white_key_count: usize,
    total_keys: usize,
    white_key_width: f64,
    black_key_width: f64,
    black_key_height: f64,
    black_keys: Vec<BlackKey>,
}

impl VirtualKeyboard {
    /// Create a keyboard layout over a `canvas_w` x `canvas_h` canvas with
    /// the given number of white keys.
    ///
    /// The bounding box spans 20%-80% of the canvas horizontally and 35%-55%
    /// vertically; the same fractions are applied to any canvas size.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas is empty or `white_key_count` is zero.
    pub fn new(canvas_w: u32, canvas_h: u32, white_key_count: usize) -> Result<Self> {
        if canvas_w == 0 || canvas_h == 0 {
            return Err(Error::InvalidInput(format!(
                "Canvas must be non-empty, got {canvas_w}x{canvas_h}"
            )));
        }
        if white_key_count == 0 {
            return Err(Error::InvalidInput(
                "Keyboard needs at least one white key".to_string(),
            ));
        }

        let x0 = round_half_up(f64::from(canvas_w) * KEYBOARD_BOX_X0_FRACTION, 0);
        let y0 = round_half_up(f64::from(canvas_h) * KEYBOARD_BOX_Y0_FRACTION, 0);
        let x1 = round_half_up(f64::from(canvas_w) * KEYBOARD_BOX_X1_FRACTION, 0);
        let y1 = round_half_up(f64::from(canvas_h) * KEYBOARD_BOX_Y1_FRACTION, 0);

        let white_key_width = (x1 - x0) / white_key_count as f64;
        let black_key_width = white_key_width * BLACK_TO_WHITE_KEY_RATIO;
        let black_key_height = (y1 - y0) * BLACK_KEY_HEIGHT_FRACTION;

        // One chromatic slot past the last white key's
        let total_keys = white_key_index(white_key_count - 1) + 1;

        let black_keys = Self::build_black_keys(x0, white_key_width, black_key_width, white_key_count);

        Ok(Self {
            x0,
            y0,
            x1,
            y1,
            white_key_count,
            total_keys,
            white_key_width,
            black_key_width,
            black_key_height,
            black_keys,
        })
    }

    /// Black key rectangles along the white column boundaries. A boundary
    /// after the final white key may produce an index equal to
    /// `total_keys`; the key-state mapper range-checks and drops it.
    fn build_black_keys(
        x0: f64,
        white_key_width: f64,
        black_key_width: f64,
        white_key_count: usize,
    ) -> Vec<BlackKey> {
        let mut keys = Vec::new();

        for boundary in 0..white_key_count {
            let Some(index) = black_key_index(boundary) else {
                continue;
            };

            let line_x = x0 + white_key_width * (boundary + 1) as f64;

            // C# and F# lean left of the boundary, D# and A# lean right,
            // G# sits centered.
            let (left, right) = match boundary % WHITE_KEYS_PER_OCTAVE {
                0 | 3 => (2.0 / 3.0, 1.0 / 3.0),
                1 | 5 => (1.0 / 3.0, 2.0 / 3.0),
                _ => (0.5, 0.5),
            };

            keys.push(BlackKey {
                index,
                x0: round_half_up(line_x - black_key_width * left, 0),
                x1: round_half_up(line_x + black_key_width * right, 0),
            });
        }

        keys
    }

    /// Number of white keys
    #[must_use]
    pub fn white_key_count(&self) -> usize {
        self.white_key_count
    }

    /// Total chromatic key count (white + black)
    #[must_use]
    pub fn total_keys(&self) -> usize {
        self.total_keys
    }

    /// Width of one white key column in pixels
    #[must_use]
    pub fn white_key_width(&self) -> f64 {
        self.white_key_width
    }

    /// Bounding box as (x0, y0, x1, y1) canvas pixels
    #[must_use]
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        (self.x0, self.y0, self.x1, self.y1)
    }

    /// The black key rectangles of the upper zone
    #[must_use]
    pub fn black_keys(&self) -> &[BlackKey] {
        &self.black_keys
    }

    /// True iff the point lies strictly inside the keyboard bounding box
    #[must_use]
    pub fn hit_test(&self, x: f64, y: f64) -> bool {
        x > self.x0 && x < self.x1 && y > self.y0 && y < self.y1
    }

    /// Black key containing `x`, if the point probes the upper zone
    fn black_key_at(&self, x: f64) -> Option<usize> {
        self.black_keys
            .iter()
            .find(|key| x > key.x0 && x < key.x1)
            .map(|key| key.index)
    }

    /// Resolve the chromatic key index at a canvas point.
    ///
    /// Callers are expected to have passed [`Self::hit_test`] first. Within
    /// the black-key height band the black rectangles are probed before
    /// falling back to the white column; below the band only the white
    /// column counts. The result may equal [`Self::total_keys`] for the
    /// stray boundary past the final white key and must be range-checked.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // hit-tested coordinates
    pub fn find_key(&self, x: f64, y: f64) -> usize {
        let local_y = y - self.y0;

        if local_y < self.black_key_height {
            if let Some(key) = self.black_key_at(x) {
                return key;
            }
        }

        let column = (((x - self.x0) / self.white_key_width).floor().max(0.0)) as usize;
        white_key_index(column.min(self.white_key_count - 1))
    }

    /// MIDI note number of a chromatic key index (key 0 = MIDI 36).
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyOutOfRange`] for indices outside the keyboard or
    /// past MIDI note 127.
    pub fn note_from_key(&self, key: usize) -> Result<u8> {
        if key >= self.total_keys {
            return Err(Error::KeyOutOfRange {
                index: key,
                total: self.total_keys,
            });
        }

        u8::try_from(usize::from(MIDI_BASE_NOTE) + key).map_err(|_| Error::KeyOutOfRange {
            index: key,
            total: self.total_keys,
        })
    }

    /// Draw the keyboard onto a frame: translucent box, white key
    /// separators, black keys and per-column markers.
    ///
    /// # Errors
    ///
    /// Returns an error if `OpenCV` drawing operations fail.
    pub fn draw(&self, img: &mut Mat) -> Result<()> {
        let cols = img.cols();
        let rows = img.rows();
        let x0 = f64_to_i32_clamp(self.x0, 0, cols);
        let y0 = f64_to_i32_clamp(self.y0, 0, rows);
        let x1 = f64_to_i32_clamp(self.x1, 0, cols);
        let y1 = f64_to_i32_clamp(self.y1, 0, rows);
        let black_band_bottom = f64_to_i32_clamp(round_half_up(self.y0 + self.black_key_height, 0), 0, rows);

        // Translucent white fill: blend against an overlay that only differs
        // inside the box.
        let mut overlay = img.clone();
        imgproc::rectangle(
            &mut overlay,
            Rect::new(x0, y0, x1 - x0, y1 - y0),
            Scalar::new(255.0, 255.0, 255.0, 0.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )?;
        let blended = img.clone();
        core::add_weighted(&blended, 0.5, &overlay, 0.5, 0.0, img, -1)?;

        for boundary in 0..self.white_key_count {
            let line_x = self.x0 + self.white_key_width * (boundary + 1) as f64;
            let line_x_px = f64_to_i32_clamp(round_half_up(line_x, 0), 0, cols);

            imgproc::line(
                img,
                Point::new(line_x_px, y0),
                Point::new(line_x_px, y1),
                Scalar::new(0.0, 0.0, 0.0, 0.0),
                2,
                imgproc::LINE_8,
                0,
            )?;

            // Middle C gets a black marker, the rest green
            let marker_color = if boundary == 7 {
                Scalar::new(0.0, 0.0, 0.0, 0.0)
            } else {
                Scalar::new(0.0, 255.0, 0.0, 0.0)
            };
            let marker_x = f64_to_i32_clamp(line_x - self.white_key_width / 2.0, 0, cols);
            let marker_y = f64_to_i32_clamp(self.y0 + (self.y1 - self.y0) * 0.75, 0, rows);
            imgproc::circle(
                img,
                Point::new(marker_x, marker_y),
                7,
                marker_color,
                imgproc::FILLED,
                imgproc::LINE_8,
                0,
            )?;
            imgproc::put_text(
                img,
                &format!("{}", boundary + 1),
                Point::new(marker_x - 7, marker_y + 3),
                imgproc::FONT_HERSHEY_DUPLEX,
                0.4,
                Scalar::new(0.0, 0.0, 255.0, 0.0),
                1,
                imgproc::LINE_8,
                false,
            )?;
        }

        for key in &self.black_keys {
            let bx0 = f64_to_i32_clamp(key.x0, 0, cols);
            let bx1 = f64_to_i32_clamp(key.x1, 0, cols);
            imgproc::rectangle(
                img,
                Rect::new(bx0, y0, bx1 - bx0, black_band_bottom - y0),
                Scalar::new(0.0, 0.0, 0.0, 0.0),
                imgproc::FILLED,
                imgproc::LINE_8,
                0,
            )?;
        }

        imgproc::rectangle(
            img,
            Rect::new(x0, y0, x1 - x0, y1 - y0),
            Scalar::new(255.0, 0.0, 0.0, 0.0),
            2,
            imgproc::LINE_8,
            0,
        )?;

        Ok(())
    }
}
