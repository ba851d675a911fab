//! Frame-indexed evaluation of Lottie documents into transforms and bezier geometry.
//!
//! A [`Composition`] is built once from a parsed [`lottie_data::model::LottieJson`];
//! each call to [`Composition::evaluate`] bumps the epoch and lazily recomputes only
//! the properties, transforms and shapes whose inputs moved.

pub mod animatable;
pub mod arc_length;
pub mod composition;
pub mod config;
pub mod easing;
pub mod errors;
pub mod geometry;
pub mod matrix;
pub mod modifiers;
pub mod pool;
pub mod shapes;
pub mod transform;

pub use composition::{Composition, LayerState, ShapeOutput};
pub use config::EvalConfig;
pub use errors::{EvalError, Result};
pub use geometry::{PathGeometry, ShapeCollection};
pub use matrix::Matrix;
pub use pool::GeometryPool;

/// The frame being evaluated plus the epoch that identifies this evaluation pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    pub frame: f32,
    pub epoch: u64,
    pub frame_rate: f32,
}

impl FrameContext {
    pub fn new(frame: f32, epoch: u64, frame_rate: f32) -> Self {
        Self {
            frame,
            epoch,
            frame_rate,
        }
    }

    /// Same pass, different local time (layer start offsets and stretch).
    pub fn with_frame(&self, frame: f32) -> Self {
        Self { frame, ..*self }
    }
}
