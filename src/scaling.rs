//! Mapping between the true desktop resolution and the bounded resolution
//! the automation model sees.

mod frame;
mod transform;

pub use frame::{FileScreenshotSource, FrameScaler, ScreenshotSource};
pub use transform::{
    compute_scaled, Model, ModelPoint, Original, OriginalPoint, Point, Resolution, RoundTrip,
    ScaleBounds, ScaleError, ScaleTransform,
};
