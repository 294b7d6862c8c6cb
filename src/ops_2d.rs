/*!
 * # 2D Operations
 *
 * Geometric operations on tensors of shape [N, C, H, W]. All of them move whole pixels:
 * nothing is resampled, so every transform here is exact.
 *
 */

use tch::Tensor;

use crate::error::{Error, Result};
use crate::tensor_ext::TensorExt;

pub const H_DIM: i64 = 2;
pub const W_DIM: i64 = 3;

/**
 * Clockwise rotation of the (H, W) plane by a multiple of 90 degrees.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// The four orientations in the order the network stacks them.
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    pub fn from_degrees(angle: i64) -> Result<Self> {
        if angle % 90 != 0 {
            return Err(Error::UnsupportedRotation(angle));
        }
        Ok(match angle.rem_euclid(360) {
            0 => Rotation::R0,
            90 => Rotation::R90,
            180 => Rotation::R180,
            _ => Rotation::R270,
        })
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// The rotation undoing this one: 0 <-> 0, 90 <-> 270, 180 <-> 180.
    pub fn inverse(self) -> Self {
        match self {
            Rotation::R0 => Rotation::R0,
            Rotation::R90 => Rotation::R270,
            Rotation::R180 => Rotation::R180,
            Rotation::R270 => Rotation::R90,
        }
    }

    /**
     * Apply the rotation with axis flips and transposes.
     *
     * # Arguments
     * t: Tensor - The images to rotate [N, C, H, W]
     *
     * # Returns
     * Tensor - The rotated images, [N, C, W, H] for quarter turns
     */
    pub fn f_apply(self, t: &Tensor) -> Result<Tensor> {
        t.spatial_size()?;
        let rotated = match self {
            Rotation::R0 => t.shallow_clone(),
            Rotation::R90 => t.f_flip(&[H_DIM])?.f_transpose(H_DIM, W_DIM)?,
            Rotation::R180 => t.f_flip(&[H_DIM, W_DIM])?,
            Rotation::R270 => t.f_flip(&[W_DIM])?.f_transpose(H_DIM, W_DIM)?,
        };
        Ok(rotated)
    }
}

/**
 * Rotate images clockwise by `angle` degrees.
 *
 * # Arguments
 * t: Tensor - The images to rotate [N, C, H, W]
 * angle: i64 - The clockwise angle, a multiple of 90
 *
 * # Returns
 * Tensor - A copy of the images with the rotation applied
 *
 * # Example
 * ```rust,no_run
 * # use tch::Tensor;
 * # use tch_blindspot::ops_2d::rotate_2d;
 * let t = Tensor::of_slice(&[1.0, 2.0, 3.0, 4.0]).view([1, 1, 2, 2]);
 * let r = rotate_2d(&t, 90).unwrap();
 * assert!(r.equal(&Tensor::of_slice(&[3.0, 1.0, 4.0, 2.0]).view([1, 1, 2, 2])));
 * ```
 */
pub fn rotate_2d(t: &Tensor, angle: i64) -> Result<Tensor> {
    Rotation::from_degrees(angle)?.f_apply(t)
}

/**
 * Remove rows and columns from the borders of images.
 *
 * # Arguments
 * t: Tensor - The images to crop [N, C, H, W]
 * crop: [i64; 4] - The amounts to remove as [left, right, top, bottom]
 *
 * # Returns
 * Tensor - The cropped images [N, C, H - top - bottom, W - left - right]
 */
pub fn crop_2d(t: &Tensor, crop: [i64; 4]) -> Result<Tensor> {
    let (height, width) = t.spatial_size()?;
    let [left, right, top, bottom] = crop;
    if crop.iter().any(|&c| c < 0) || left + right >= width || top + bottom >= height {
        return Err(Error::CropOutOfRange { crop, height, width });
    }
    let t = t
        .f_narrow(H_DIM, top, height - top - bottom)?
        .f_narrow(W_DIM, left, width - left - right)?;
    Ok(t)
}

/**
 * Padding and cropping amounts realising an integer shift, both as [left, right, top, bottom].
 *
 * The content moves by `(vertical, horizontal)` pixels, positive towards the bottom and the
 * right. The pad goes on the side the content leaves, the crop on the side it moves into,
 * so each crop amount mirrors a pad amount and the shape is unchanged.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftAmounts {
    pub pad: [i64; 4],
    pub crop: [i64; 4],
}

impl ShiftAmounts {
    pub fn new(shift: (i64, i64)) -> Self {
        let (vertical, horizontal) = shift;
        let (mut y_a, mut y_b) = (vertical.abs(), 0);
        let (mut x_a, mut x_b) = (horizontal.abs(), 0);
        if vertical < 0 {
            std::mem::swap(&mut y_a, &mut y_b);
        }
        if horizontal < 0 {
            std::mem::swap(&mut x_a, &mut x_b);
        }
        ShiftAmounts {
            pad: [x_a, x_b, y_a, y_b],
            crop: [x_b, x_a, y_b, y_a],
        }
    }

    pub fn is_identity(&self) -> bool {
        self.pad == [0; 4]
    }
}

/// Zero-pad the borders of images, amounts as [left, right, top, bottom].
pub fn zero_pad_2d(t: &Tensor, pad: [i64; 4]) -> Result<Tensor> {
    t.spatial_size()?;
    let [left, right, top, bottom] = pad;
    Ok(t.zero_pad2d(left, right, top, bottom))
}

/**
 * Shift the content of images by whole pixels, filling the vacated side with zeros.
 *
 * # Arguments
 * t: Tensor - The images to shift [N, C, H, W]
 * shift: (i64, i64) - The vertical and horizontal shift, positive towards bottom and right
 *
 * # Returns
 * Tensor - The shifted images [N, C, H, W]
 */
pub fn shift_2d(t: &Tensor, shift: (i64, i64)) -> Result<Tensor> {
    let amounts = ShiftAmounts::new(shift);
    if amounts.is_identity() {
        t.spatial_size()?;
        return Ok(t.shallow_clone());
    }
    let padded = zero_pad_2d(t, amounts.pad)?;
    crop_2d(&padded, amounts.crop)
}

#[cfg(test)]
mod test {
    use super::*;
    use tch::{index::*, Device, Kind};

    use crate::utils::assert_eq_tensor;

    fn arange_image(n: i64, c: i64, h: i64, w: i64) -> Tensor {
        Tensor::arange(n * c * h * w, (Kind::Float, Device::Cpu)).view([n, c, h, w])
    }

    #[test]
    fn test_rotate_clockwise() {
        #[rustfmt::skip]
        let input = Tensor::of_slice(&[
            1.0f32, 2.0, 3.0,
            4.0, 5.0, 6.0,
        ]).view([1, 1, 2, 3]);
        #[rustfmt::skip]
        let expected = Tensor::of_slice(&[
            4.0f32, 1.0,
            5.0, 2.0,
            6.0, 3.0,
        ]).view([1, 1, 3, 2]);
        let rotated = rotate_2d(&input, 90).unwrap();
        assert_eq!(rotated.size(), [1, 1, 3, 2]);
        assert!(rotated.equal(&expected));

        let half_turn = rotate_2d(&input, 180).unwrap();
        let expected = Tensor::of_slice(&[6.0f32, 5.0, 4.0, 3.0, 2.0, 1.0]).view([1, 1, 2, 3]);
        assert!(half_turn.equal(&expected));
    }

    #[test]
    fn test_rotate_round_trip() {
        let input = Tensor::randn(&[2, 3, 4, 6], (Kind::Float, Device::Cpu));
        for angle in [0, 90, 180, 270] {
            let rotated = rotate_2d(&input, angle).unwrap();
            let restored = rotate_2d(&rotated, (360 - angle) % 360).unwrap();
            assert!(restored.equal(&input), "round trip failed for {angle}");

            let rotation = Rotation::from_degrees(angle).unwrap();
            let restored = rotation.inverse().f_apply(&rotation.f_apply(&input).unwrap()).unwrap();
            assert!(restored.equal(&input));
        }
    }

    #[test]
    fn test_rotate_composes() {
        let input = Tensor::randn(&[1, 2, 5, 5], (Kind::Float, Device::Cpu));
        let twice = rotate_2d(&rotate_2d(&input, 90).unwrap(), 90).unwrap();
        assert!(twice.equal(&rotate_2d(&input, 180).unwrap()));
        assert!(rotate_2d(&input, -90).unwrap().equal(&rotate_2d(&input, 270).unwrap()));
        assert!(rotate_2d(&input, 360).unwrap().equal(&input));
    }

    #[test]
    fn test_rotate_unsupported_angle() {
        let input = arange_image(1, 1, 2, 2);
        assert!(matches!(rotate_2d(&input, 45), Err(Error::UnsupportedRotation(45))));
        assert!(matches!(Rotation::from_degrees(91), Err(Error::UnsupportedRotation(91))));
    }

    #[test]
    fn test_crop() {
        let input = arange_image(1, 1, 4, 5);
        let cropped = crop_2d(&input, [1, 2, 0, 1]).unwrap();
        assert_eq!(cropped.size(), [1, 1, 3, 2]);
        assert_eq_tensor(&cropped, &input.i((.., .., 0..3, 1..3)));
    }

    #[test]
    fn test_crop_out_of_range() {
        let input = arange_image(1, 1, 4, 5);
        assert!(matches!(
            crop_2d(&input, [3, 2, 0, 0]),
            Err(Error::CropOutOfRange { height: 4, width: 5, .. })
        ));
        assert!(crop_2d(&input, [0, 0, 2, 2]).is_err());
        assert!(crop_2d(&input, [-1, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_shift_amounts_mirror() {
        let amounts = ShiftAmounts::new((2, -3));
        assert_eq!(amounts.pad, [0, 3, 2, 0]);
        assert_eq!(amounts.crop, [3, 0, 0, 2]);
        assert!(ShiftAmounts::new((0, 0)).is_identity());
    }

    #[test]
    fn test_shift_preserves_shape() {
        let input = arange_image(2, 3, 5, 4);
        for v in -4..=4 {
            for h in -3..=3 {
                let shifted = shift_2d(&input, (v, h)).unwrap();
                assert_eq!(shifted.size(), input.size(), "shift ({v}, {h})");
            }
        }
    }

    #[test]
    fn test_shift_zero_fill() {
        let input = Tensor::ones(&[1, 2, 4, 3], (Kind::Float, Device::Cpu));
        let shifted = shift_2d(&input, (1, 0)).unwrap();
        assert_eq_tensor(&shifted.i((.., .., 0..1, ..)), &Tensor::zeros(&[1, 2, 1, 3], (Kind::Float, Device::Cpu)));
        assert_eq_tensor(&shifted.i((.., .., 1.., ..)), &input.i((.., .., 1.., ..)));
    }

    #[test]
    fn test_shift_moves_content() {
        let input = arange_image(1, 1, 4, 4);
        let down_right = shift_2d(&input, (1, 2)).unwrap();
        assert_eq_tensor(&down_right.i((.., .., 1.., 2..)), &input.i((.., .., ..3, ..2)));
        assert_eq!(f64::from(down_right.i((.., .., 0, ..)).abs().sum(Kind::Float)), 0.0);
        assert_eq!(f64::from(down_right.i((.., .., .., 0..2)).abs().sum(Kind::Float)), 0.0);

        let up_left = shift_2d(&input, (-1, -1)).unwrap();
        assert_eq_tensor(&up_left.i((.., .., ..3, ..3)), &input.i((.., .., 1.., 1..)));
        assert_eq!(f64::from(up_left.i((.., .., 3, ..)).abs().sum(Kind::Float)), 0.0);
    }
}
