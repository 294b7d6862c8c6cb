/*!
Contains diverse extensions to the Tensor struct.
 */

use tch::Tensor;

use crate::error::{Error, Result};

pub trait TensorExt {
    /// Leaky rectification with an arbitrary negative slope in [0, 1].
    fn leaky_relu_with_slope(&self, slope: f64) -> Tensor;
    /// (H, W) of a [N, C, H, W] tensor.
    fn spatial_size(&self) -> Result<(i64, i64)>;
}

impl TensorExt for Tensor {
    fn leaky_relu_with_slope(&self, slope: f64) -> Tensor {
        self.maximum(&(self * slope))
    }

    fn spatial_size(&self) -> Result<(i64, i64)> {
        match self.size4() {
            Ok((_, _, h, w)) => Ok((h, w)),
            Err(_) => Err(Error::NotImage { dims: self.size() }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tch::{Device, Kind};

    use crate::utils::assert_eq_tensor;

    #[test]
    fn test_leaky_relu_with_slope() {
        let input = Tensor::of_slice(&[-2.0f32, -0.5, 0.0, 1.5]);
        let expected = Tensor::of_slice(&[-0.2f32, -0.05, 0.0, 1.5]);
        assert_eq_tensor(&input.leaky_relu_with_slope(0.1), &expected);
    }

    #[test]
    fn test_spatial_size() {
        let image = Tensor::zeros(&[2, 3, 5, 7], (Kind::Float, Device::Cpu));
        assert_eq!(image.spatial_size().unwrap(), (5, 7));

        let flat = Tensor::zeros(&[5, 7], (Kind::Float, Device::Cpu));
        assert!(matches!(flat.spatial_size(), Err(Error::NotImage { .. })));
    }
}
