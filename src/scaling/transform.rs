use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;
use tracing::debug;

/// Configuration errors raised when a transform is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaleError {
    #[error("resolution bounds must be positive (got {0})")]
    InvalidBounds(ScaleBounds),
    #[error("resolution bounds are inverted: min {min} exceeds max {max} ({axis})")]
    InvertedBounds {
        axis: &'static str,
        min: u32,
        max: u32,
    },
    #[error("resolution {0} has a zero dimension")]
    EmptyResolution(Resolution),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Inclusive bounds for the model-facing resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self {
            min_width: 640,
            min_height: 480,
            max_width: 1024,
            max_height: 768,
        }
    }
}

impl fmt::Display for ScaleBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}..={}x{}",
            self.min_width, self.min_height, self.max_width, self.max_height
        )
    }
}

impl ScaleBounds {
    pub fn validate(&self) -> Result<(), ScaleError> {
        if self.min_width == 0 || self.min_height == 0 || self.max_width == 0 || self.max_height == 0
        {
            return Err(ScaleError::InvalidBounds(*self));
        }
        if self.min_width > self.max_width {
            return Err(ScaleError::InvertedBounds {
                axis: "width",
                min: self.min_width,
                max: self.max_width,
            });
        }
        if self.min_height > self.max_height {
            return Err(ScaleError::InvertedBounds {
                axis: "height",
                min: self.min_height,
                max: self.max_height,
            });
        }
        Ok(())
    }

    pub fn contains(&self, resolution: Resolution) -> bool {
        (self.min_width..=self.max_width).contains(&resolution.width)
            && (self.min_height..=self.max_height).contains(&resolution.height)
    }

    fn axis_factor(value: u32, min: u32, max: u32) -> f64 {
        if value > max {
            f64::from(max) / f64::from(value)
        } else if value < min {
            f64::from(min) / f64::from(value)
        } else {
            1.0
        }
    }
}

/// Marker for the true desktop coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Original;

/// Marker for the coordinate space presented to the automation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Model;

/// An integer pixel position tagged with the space it lives in.
pub struct Point<S> {
    pub x: i32,
    pub y: i32,
    space: PhantomData<S>,
}

pub type OriginalPoint = Point<Original>;
pub type ModelPoint = Point<Model>;

impl<S> Point<S> {
    pub const fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }
}

impl<S> Clone for Point<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Point<S> {}

impl<S> PartialEq for Point<S> {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl<S> Eq for Point<S> {}

impl<S> fmt::Debug for Point<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Result of mapping an original-space point to model space and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTrip {
    pub original: OriginalPoint,
    pub model: ModelPoint,
    pub round_trip: OriginalPoint,
    pub error: (i32, i32),
}

/// Immutable mapping between the desktop resolution and the bounded model
/// resolution, with a single scale factor shared by both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTransform {
    original: Resolution,
    scaled: Resolution,
    scale_factor: f64,
}

impl ScaleTransform {
    pub fn new(original: Resolution, bounds: ScaleBounds) -> Result<Self, ScaleError> {
        let transform = compute_scaled(original, bounds)?;
        transform.validate_round_trip();
        Ok(transform)
    }

    pub fn original(&self) -> Resolution {
        self.original
    }

    pub fn scaled(&self) -> Resolution {
        self.scaled
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn is_identity(&self) -> bool {
        self.original == self.scaled
    }

    pub fn original_aspect_ratio(&self) -> f64 {
        self.original.aspect_ratio()
    }

    pub fn scaled_aspect_ratio(&self) -> f64 {
        self.scaled.aspect_ratio()
    }

    /// Maps a desktop position into model space. The result is not clamped.
    pub fn to_model_space(&self, point: OriginalPoint) -> ModelPoint {
        ModelPoint::new(
            round_coordinate(f64::from(point.x) * self.scale_factor),
            round_coordinate(f64::from(point.y) * self.scale_factor),
        )
    }

    /// Maps a model position back onto the desktop. The result is not clamped.
    pub fn to_original_space(&self, point: ModelPoint) -> OriginalPoint {
        OriginalPoint::new(
            round_coordinate(f64::from(point.x) / self.scale_factor),
            round_coordinate(f64::from(point.y) / self.scale_factor),
        )
    }

    pub fn round_trip(&self, point: OriginalPoint) -> RoundTrip {
        let model = self.to_model_space(point);
        let round_trip = self.to_original_space(model);
        RoundTrip {
            original: point,
            model,
            round_trip,
            error: (round_trip.x - point.x, round_trip.y - point.y),
        }
    }

    /// Largest per-axis round-trip error any in-range point can show.
    ///
    /// Mapping to model space loses at most half a model pixel, which is
    /// `0.5 / scale_factor` desktop pixels before the final rounding.
    pub fn round_trip_bound(&self) -> u32 {
        (0.5 / self.scale_factor).ceil().max(1.0) as u32
    }

    pub fn clamp_to_original(&self, point: OriginalPoint) -> OriginalPoint {
        OriginalPoint::new(
            clamp_axis(point.x, self.original.width),
            clamp_axis(point.y, self.original.height),
        )
    }

    pub fn clamp_to_model(&self, point: ModelPoint) -> ModelPoint {
        ModelPoint::new(
            clamp_axis(point.x, self.scaled.width),
            clamp_axis(point.y, self.scaled.height),
        )
    }

    fn validate_round_trip(&self) {
        let last_x = self.original.width as i32 - 1;
        let last_y = self.original.height as i32 - 1;
        let probes = [
            ("top-left", OriginalPoint::new(0, 0)),
            ("top-right", OriginalPoint::new(last_x, 0)),
            ("bottom-left", OriginalPoint::new(0, last_y)),
            ("bottom-right", OriginalPoint::new(last_x, last_y)),
            ("center", OriginalPoint::new(last_x / 2, last_y / 2)),
            ("small target", OriginalPoint::new(10, 10)),
        ];

        let worst = probes
            .iter()
            .map(|(name, point)| (*name, self.round_trip(*point)))
            .max_by_key(|(_, trip)| trip.error.0.abs().max(trip.error.1.abs()));

        if let Some((name, trip)) = worst {
            debug!(
                original = %self.original,
                scaled = %self.scaled,
                scale_factor = self.scale_factor,
                probe = name,
                error_x = trip.error.0,
                error_y = trip.error.1,
                "coordinate round-trip probe"
            );
        }
    }
}

/// Derives the model resolution and unified scale factor for `original`.
pub fn compute_scaled(
    original: Resolution,
    bounds: ScaleBounds,
) -> Result<ScaleTransform, ScaleError> {
    bounds.validate()?;
    if original.is_empty() {
        return Err(ScaleError::EmptyResolution(original));
    }

    if bounds.contains(original) {
        return Ok(ScaleTransform {
            original,
            scaled: original,
            scale_factor: 1.0,
        });
    }

    let width_factor = ScaleBounds::axis_factor(original.width, bounds.min_width, bounds.max_width);
    let height_factor =
        ScaleBounds::axis_factor(original.height, bounds.min_height, bounds.max_height);

    // Any shrink wins over growth so both maxima hold.
    let factor = if width_factor < 1.0 || height_factor < 1.0 {
        width_factor.min(height_factor)
    } else {
        width_factor.max(height_factor)
    };

    let scaled = Resolution::new(
        round_dimension(f64::from(original.width) * factor),
        round_dimension(f64::from(original.height) * factor),
    );

    // Independent rounding leaves the two axes with slightly different ratios;
    // their geometric mean is the one factor every coordinate goes through.
    let effective_width = f64::from(scaled.width) / f64::from(original.width);
    let effective_height = f64::from(scaled.height) / f64::from(original.height);
    let scale_factor = (effective_width * effective_height).sqrt();

    Ok(ScaleTransform {
        original,
        scaled,
        scale_factor,
    })
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn round_dimension(value: f64) -> u32 {
    round_half_up(value).max(1.0) as u32
}

fn round_coordinate(value: f64) -> i32 {
    round_half_up(value) as i32
}

fn clamp_axis(value: i32, extent: u32) -> i32 {
    let last = extent.saturating_sub(1).min(i32::MAX as u32) as i32;
    value.clamp(0, last)
}
