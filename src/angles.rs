//! Per-camera pixel/angle geometry and two-camera triangulation.
//!
//! A [`FrameAngles`] instance describes one camera's frame: pixel extent and
//! field of view. From those it derives the frame center and the "adjacent
//! distance" (the theoretical pixel distance from the camera to the frame
//! plane) used for all tangent arithmetic. Both cameras of a stereo pair are
//! assumed identical, so one instance serves both.
//!
//! Angle sign convention: angles are measured from the frame center, negative
//! is left/down and positive is right/up.

use crate::constants::EPSILON;
use crate::utils::safe_cast::f64_to_i32_clamp;
use crate::{Error, Result};
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc;

/// A 3D point triangulated from a matched pair of angle observations.
///
/// `x` runs along the camera baseline, `y` vertically, `z` is depth away
/// from the baseline. `distance` is the Euclidean distance from the origin
/// (left camera, or the baseline midpoint when requested).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangulatedPoint {
    /// Position along the baseline
    pub x: f64,
    /// Vertical position
    pub y: f64,
    /// Depth from the baseline
    pub z: f64,
    /// Euclidean distance from the reference origin
    pub distance: f64,
}

/// Frame geometry of a single camera
#[derive(Debug, Clone)]
pub struct FrameAngles {
    pixel_width: u32,
    pixel_height: u32,
    angle_width: f64,
    angle_height: f64,
    x_origin: f64,
    y_origin: f64,
    x_adjacent: f64,
    y_adjacent: f64,
}

impl FrameAngles {
    /// Create frame geometry from pixel dimensions and field of view.
    ///
    /// `angle_height` defaults to `angle_width * pixel_height / pixel_width`
    /// when not given (square pixels).
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero or a field of view is outside
    /// the open interval (0°, 180°).
    pub fn new(
        pixel_width: u32,
        pixel_height: u32,
        angle_width: f64,
        angle_height: Option<f64>,
    ) -> Result<Self> {
        if pixel_width == 0 || pixel_height == 0 {
            return Err(Error::InvalidInput(format!(
                "Frame dimensions must be non-zero, got {pixel_width}x{pixel_height}"
            )));
        }

        let angle_height = angle_height
            .unwrap_or(angle_width * f64::from(pixel_height) / f64::from(pixel_width));

        for (name, fov) in [("horizontal", angle_width), ("vertical", angle_height)] {
            if !(fov > 0.0 && fov < 180.0) {
                return Err(Error::InvalidInput(format!(
                    "{name} field of view must be in (0, 180) degrees, got {fov}"
                )));
            }
        }

        let x_origin = f64::from(pixel_width) / 2.0;
        let y_origin = f64::from(pixel_height) / 2.0;

        // Adjacent-side lengths of the tangent triangles; strictly positive
        // for any valid field of view.
        let x_adjacent = x_origin / (angle_width.to_radians() / 2.0).tan();
        let y_adjacent = y_origin / (angle_height.to_radians() / 2.0).tan();

        Ok(Self {
            pixel_width,
            pixel_height,
            angle_width,
            angle_height,
            x_origin,
            y_origin,
            x_adjacent,
            y_adjacent,
        })
    }

    /// Frame width in pixels
    #[must_use]
    pub fn pixel_width(&self) -> u32 {
        self.pixel_width
    }

    /// Frame height in pixels
    #[must_use]
    pub fn pixel_height(&self) -> u32 {
        self.pixel_height
    }

    /// Horizontal field of view in degrees
    #[must_use]
    pub fn angle_width(&self) -> f64 {
        self.angle_width
    }

    /// Vertical field of view in degrees
    #[must_use]
    pub fn angle_height(&self) -> f64 {
        self.angle_height
    }

    /// Convert a pixel coordinate to signed angles from the frame center.
    ///
    /// With `top_left` the input is measured from the top-left frame corner
    /// (image convention, y growing downward); otherwise from the frame
    /// center. Returned angles are degrees when `degrees` is set, radians
    /// otherwise; positive means right/up.
    #[must_use]
    pub fn angles_from_center(&self, x: f64, y: f64, top_left: bool, degrees: bool) -> (f64, f64) {
        let (x, y) = if top_left {
            (x - self.x_origin, self.y_origin - y)
        } else {
            (x, y)
        };

        let x_rad = (x / self.x_adjacent).atan();
        let y_rad = (y / self.y_adjacent).atan();

        if degrees {
            (x_rad.to_degrees(), y_rad.to_degrees())
        } else {
            (x_rad, y_rad)
        }
    }

    /// Convert angles from the frame center back to pixel offsets from the
    /// center. Exact inverse of [`Self::angles_from_center`] with
    /// `top_left = false`.
    #[must_use]
    pub fn pixels_from_center(&self, x_angle: f64, y_angle: f64, degrees: bool) -> (f64, f64) {
        let (x_rad, y_rad) = if degrees {
            (x_angle.to_radians(), y_angle.to_radians())
        } else {
            (x_angle, y_angle)
        };

        (self.x_adjacent * x_rad.tan(), self.y_adjacent * y_rad.tan())
    }

    /// Euclidean norm of a coordinate tuple
    #[must_use]
    pub fn distance_from_origin(coordinates: &[f64]) -> f64 {
        coordinates.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// Triangulate the (X, Z) position of a target from two horizontal angle
    /// observations.
    ///
    /// `pdistance` is the baseline length (left camera center to right camera
    /// center). `langle`/`rangle` are each camera's horizontal angle to the
    /// target measured from its frame center, right positive. The left camera
    /// center is the origin; X runs along the baseline, Z away from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateGeometry`] when the reoriented rays are
    /// parallel to the baseline or to each other, which would require a
    /// division by zero.
    pub fn intersection(
        &self,
        pdistance: f64,
        langle: f64,
        rangle: f64,
        degrees: bool,
    ) -> Result<(f64, f64)> {
        let (langle, rangle) = if degrees {
            (langle.to_radians(), rangle.to_radians())
        } else {
            (langle, rangle)
        };

        // Reorient: langle measured from the right side of the baseline,
        // rangle from the left side.
        let langle = std::f64::consts::FRAC_PI_2 - langle;
        let rangle = std::f64::consts::FRAC_PI_2 + rangle;

        let ltan = langle.tan();
        let rtan = rangle.tan();

        if !ltan.is_finite() || !rtan.is_finite() || ltan.abs() < EPSILON || rtan.abs() < EPSILON {
            return Err(Error::DegenerateGeometry(format!(
                "ray parallel to baseline (ltan={ltan}, rtan={rtan})"
            )));
        }

        // pdistance = Z/ltan + Z/rtan
        let denominator = 1.0 / ltan + 1.0 / rtan;
        if denominator.abs() < EPSILON {
            return Err(Error::DegenerateGeometry(format!(
                "parallel rays (ltan={ltan}, rtan={rtan})"
            )));
        }

        let z = pdistance / denominator;
        let x = z / ltan;

        Ok((x, z))
    }

    /// Triangulate the full 3D position of a target from a pair of
    /// (horizontal, vertical) angle observations.
    ///
    /// The vertical angles of both cameras are averaged (they describe the
    /// same elevation when the rig is aligned). With `center` the X
    /// coordinate is shifted so the origin is the baseline midpoint rather
    /// than the left camera center.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::DegenerateGeometry`] from [`Self::intersection`].
    pub fn location(
        &self,
        pdistance: f64,
        lcamera: (f64, f64),
        rcamera: (f64, f64),
        center: bool,
        degrees: bool,
    ) -> Result<TriangulatedPoint> {
        let (lx_angle, ly_angle) = lcamera;
        let (rx_angle, ry_angle) = rcamera;

        let y_angle = (ly_angle + ry_angle) / 2.0;

        let (lx_angle, rx_angle, y_angle) = if degrees {
            (lx_angle.to_radians(), rx_angle.to_radians(), y_angle.to_radians())
        } else {
            (lx_angle, rx_angle, y_angle)
        };

        let (mut x, z) = self.intersection(pdistance, lx_angle, rx_angle, false)?;

        let y = y_angle.tan() * Self::distance_from_origin(&[x, z]);

        if center {
            x -= pdistance / 2.0;
        }

        let distance = Self::distance_from_origin(&[x, y, z]);

        Ok(TriangulatedPoint { x, y, z, distance })
    }

    /// Draw alignment crosshairs through the frame center.
    ///
    /// # Errors
    ///
    /// Returns an error if `OpenCV` drawing operations fail.
    pub fn frame_add_crosshairs(&self, frame: &mut Mat) -> Result<()> {
        let color = Scalar::new(0.0, 255.0, 0.0, 0.0);
        let width = f64_to_i32_clamp(f64::from(self.pixel_width), 0, i32::MAX);
        let height = f64_to_i32_clamp(f64::from(self.pixel_height), 0, i32::MAX);
        let x_origin = f64_to_i32_clamp(self.x_origin, 0, width);
        let y_origin = f64_to_i32_clamp(self.y_origin, 0, height);

        imgproc::line(
            frame,
            Point::new(0, y_origin),
            Point::new(width, y_origin),
            color,
            1,
            imgproc::LINE_8,
            0,
        )?;
        imgproc::line(
            frame,
            Point::new(x_origin, 0),
            Point::new(x_origin, height),
            color,
            1,
            imgproc::LINE_8,
            0,
        )?;
        imgproc::circle(
            frame,
            Point::new(x_origin, y_origin),
            f64_to_i32_clamp((self.y_origin / 8.0).round(), 1, height),
            color,
            1,
            imgproc::LINE_8,
            0,
        )?;

        Ok(())
    }

    /// Draw lines every 10 degrees to verify the configured field of view
    /// against a printed target.
    ///
    /// # Errors
    ///
    /// Returns an error if `OpenCV` drawing operations fail.
    pub fn frame_add_degrees(&self, frame: &mut Mat) -> Result<()> {
        let color = Scalar::new(255.0, 0.0, 255.0, 0.0);
        let width = f64_to_i32_clamp(f64::from(self.pixel_width), 0, i32::MAX);
        let height = f64_to_i32_clamp(f64::from(self.pixel_height), 0, i32::MAX);
        let x_origin = f64_to_i32_clamp(self.x_origin, 0, width);
        let y_origin = f64_to_i32_clamp(self.y_origin, 0, height);

        for angle in (10..95).step_by(10) {
            let (x, y) = self.pixels_from_center(f64::from(angle), f64::from(angle), true);

            if x <= self.x_origin {
                let x = f64_to_i32_clamp(x, 0, width);
                for x_line in [x_origin - x, x_origin + x] {
                    imgproc::line(
                        frame,
                        Point::new(x_line, 0),
                        Point::new(x_line, height),
                        color,
                        1,
                        imgproc::LINE_8,
                        0,
                    )?;
                }
            }

            if y <= self.y_origin {
                let y = f64_to_i32_clamp(y, 0, height);
                for y_line in [y_origin - y, y_origin + y] {
                    imgproc::line(
                        frame,
                        Point::new(0, y_line),
                        Point::new(width, y_line),
                        color,
                        1,
                        imgproc::LINE_8,
                        0,
                    )?;
                }
            }
        }

        Ok(())
    }
}
