use ndarray::Array4;
use tch::{Kind, Tensor};

use crate::error::Result;

/// Conversion between [N, C, H, W] image batches held in `ndarray` and tensors.
pub trait NDATensorExt: Sized {
    fn to_ndarray4(&self) -> Result<Array4<f32>>;

    fn from_ndarray4(array: &Array4<f32>) -> Self;
}

impl NDATensorExt for tch::Tensor {
    fn to_ndarray4(&self) -> Result<Array4<f32>> {
        let (n, c, h, w) = self.size4()?;
        let casted = self.f_to_kind(Kind::Float)?.f_contiguous()?;
        let data = Vec::<f32>::from(&casted);
        let array = Array4::from_shape_vec((n as usize, c as usize, h as usize, w as usize), data)?;
        Ok(array)
    }

    fn from_ndarray4(array: &Array4<f32>) -> Self {
        let shape = array.shape().iter().map(|&d| d as i64).collect::<Vec<i64>>();
        // iter() walks in logical order whatever the memory layout
        let data = array.iter().copied().collect::<Vec<f32>>();
        Tensor::of_slice(&data).view(shape.as_slice())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::{s, Array};
    use tch::{index::*, Device};

    use crate::ops_2d::rotate_2d;
    use crate::utils::assert_eq_tensor;

    #[test]
    fn test_to_ndarray4_follows_indexing() {
        let t = Tensor::arange(2 * 3 * 4 * 5, (Kind::Float, Device::Cpu)).view([2, 3, 4, 5]);
        // a transposed, non-contiguous view
        let rotated = rotate_2d(&t, 90).unwrap();
        let array = rotated.to_ndarray4().unwrap();
        assert_eq!(array.shape(), &[2, 3, 5, 4]);
        assert_eq!(array[[1, 2, 3, 1]], f32::from(rotated.i((1, 2, 3, 1))));
        assert_eq!(array[[0, 0, 0, 3]], f32::from(rotated.i((0, 0, 0, 3))));
    }

    #[test]
    fn test_from_ndarray4() {
        let array = Array::from_shape_fn((1, 2, 3, 4), |(_, c, y, x)| (c * 100 + y * 10 + x) as f32);
        let t = Tensor::from_ndarray4(&array);
        assert_eq!(t.size(), [1, 2, 3, 4]);
        assert_eq!(f32::from(t.i((0, 1, 2, 3))), 123.0);

        let transposed = array.clone().permuted_axes([0, 1, 3, 2]);
        let t = Tensor::from_ndarray4(&transposed.to_owned());
        assert_eq!(t.size(), [1, 2, 4, 3]);
        assert_eq!(f32::from(t.i((0, 1, 3, 2))), 123.0);
        assert_eq_tensor(&t.i((.., .., .., 0)), &Tensor::from_ndarray4(&array).i((.., .., 0, ..)));
        assert_eq!(array.slice(s![0, 1, 2, ..]).to_vec(), vec![120.0, 121.0, 122.0, 123.0]);
    }

    #[test]
    fn test_to_ndarray4_rejects_non_image() {
        let t = Tensor::zeros(&[3, 4], (Kind::Float, Device::Cpu));
        assert!(t.to_ndarray4().is_err());
    }
}
