/*!
Error type shared by every fallible operation of the crate.
 */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Rotations are only defined for multiples of 90 degrees.
    #[error("rotation by {0} degrees is not implemented, must be a multiple of 90")]
    UnsupportedRotation(i64),

    /// Crop amounts are [left, right, top, bottom].
    #[error("crop {crop:?} exceeds the {height}x{width} image")]
    CropOutOfRange {
        crop: [i64; 4],
        height: i64,
        width: i64,
    },

    #[error("expected a [N, C, H, W] tensor, got shape {dims:?}")]
    NotImage { dims: Vec<i64> },

    #[error("height and width must be even, got {height}x{width}")]
    OddSpatialSize { height: i64, width: i64 },

    #[error("batched rotation needs a square image, got {height}x{width}")]
    NonSquareBatch { height: i64, width: i64 },

    /// Back-propagation found no autograd graph from the input to the output.
    #[error("the output is not connected to the input by the autograd graph")]
    NoGradientPath,

    #[error("invalid network configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Tch(#[from] tch::TchError),

    #[cfg(feature = "ndarray")]
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, Error>;
