/*!
 * # Layers
 *
 * The geometric transforms of [`ops_2d`](crate::ops_2d) as `tch` modules, and the
 * convolution used by the network, optionally wrapped in a downward shift.
 *
 * Like `tch`'s own operators, `Module::forward` panics on a contract violation while the
 * `f_forward` variants return the error.
 */

use std::borrow::Borrow;

use rand::rngs::StdRng;
use tch::{nn, Tensor};

use crate::error::Result;
use crate::init::{self, Nonlinearity};
use crate::ops_2d::{self, ShiftAmounts};

/// Removes [left, right, top, bottom] rows and columns from [N, C, H, W] images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop2d {
    crop: [i64; 4],
}

impl Crop2d {
    pub fn new(crop: [i64; 4]) -> Self {
        Crop2d { crop }
    }

    pub fn amounts(&self) -> [i64; 4] {
        self.crop
    }

    pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
        ops_2d::crop_2d(xs, self.crop)
    }
}

impl nn::Module for Crop2d {
    fn forward(&self, xs: &Tensor) -> Tensor {
        self.f_forward(xs).unwrap_or_else(|err| panic!("Crop2d: {err}"))
    }
}

/**
 * Shifts image content by whole pixels: zero-pad on the side the content leaves, then crop
 * the side it moves into. The two halves are exposed separately so another layer can run
 * in between.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift2d {
    shift: (i64, i64),
    amounts: ShiftAmounts,
}

impl Shift2d {
    /// `shift` is (vertical, horizontal), positive towards bottom and right.
    pub fn new(shift: (i64, i64)) -> Self {
        Shift2d {
            shift,
            amounts: ShiftAmounts::new(shift),
        }
    }

    pub fn shift(&self) -> (i64, i64) {
        self.shift
    }

    pub fn f_pad(&self, xs: &Tensor) -> Result<Tensor> {
        ops_2d::zero_pad_2d(xs, self.amounts.pad)
    }

    pub fn f_crop(&self, xs: &Tensor) -> Result<Tensor> {
        ops_2d::crop_2d(xs, self.amounts.crop)
    }

    pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
        ops_2d::shift_2d(xs, self.shift)
    }
}

impl nn::Module for Shift2d {
    fn forward(&self, xs: &Tensor) -> Tensor {
        self.f_forward(xs).unwrap_or_else(|err| panic!("Shift2d: {err}"))
    }
}

/// Which convolution the network is built from, picked once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvVariant {
    Plain,
    /// Receptive field restricted upwards, see [`Conv2d`].
    Shifted,
}

/**
 * A convolution with an optional downward shift around it.
 *
 * Stride, padding, dilation and groups all come from the [`nn::ConvConfig`] the
 * convolution was built with. The shifted variant follows Laine et al. (2019): for a kernel of height `kh` the input
 * gets `kh / 2` zero rows on top and the same number of rows is cropped off the bottom of
 * the output. Output row `r` then only sees input rows `<= r`, the width stays two-sided
 * and the output shape is the one of the plain convolution.
 */
#[derive(Debug)]
pub struct Conv2d {
    conv: nn::Conv2D,
    config: nn::ConvConfig,
    shift: Option<Shift2d>,
}

impl Conv2d {
    pub fn new<'a, T: Borrow<nn::Path<'a>>>(
        vs: T,
        in_channels: i64,
        out_channels: i64,
        kernel_size: i64,
        config: nn::ConvConfig,
        variant: ConvVariant,
    ) -> Self {
        let conv = nn::conv2d(vs, in_channels, out_channels, kernel_size, config);
        let offset = kernel_size / 2;
        let shift = match variant {
            ConvVariant::Shifted if offset > 0 => Some(Shift2d::new((offset, 0))),
            _ => None,
        };
        Conv2d {
            conv,
            config,
            shift,
        }
    }

    pub fn variant(&self) -> ConvVariant {
        match self.shift {
            Some(_) => ConvVariant::Shifted,
            None => ConvVariant::Plain,
        }
    }

    pub fn weight(&self) -> &Tensor {
        &self.conv.ws
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.conv.bs.as_ref()
    }

    pub fn config(&self) -> &nn::ConvConfig {
        &self.config
    }

    /// Kaiming-normal weights for the activation that follows, zero bias.
    pub fn init(&mut self, nonlinearity: Nonlinearity, rng: Option<&mut StdRng>) -> Result<()> {
        init::kaiming_normal_(&mut self.conv.ws, nonlinearity, rng)?;
        if let Some(bias) = self.conv.bs.as_mut() {
            init::zeros_(bias);
        }
        Ok(())
    }

    fn f_convolve(&self, xs: &Tensor) -> Result<Tensor> {
        let nn::ConvConfig {
            stride,
            padding,
            dilation,
            groups,
            ..
        } = self.config;
        let ys = xs.f_conv2d(
            &self.conv.ws,
            self.conv.bs.as_ref(),
            &[stride, stride],
            &[padding, padding],
            &[dilation, dilation],
            groups,
        )?;
        Ok(ys)
    }

    pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
        match &self.shift {
            None => self.f_convolve(xs),
            Some(shift) => {
                let xs = shift.f_pad(xs)?;
                let ys = self.f_convolve(&xs)?;
                shift.f_crop(&ys)
            }
        }
    }
}

impl nn::Module for Conv2d {
    fn forward(&self, xs: &Tensor) -> Tensor {
        self.f_forward(xs).unwrap_or_else(|err| panic!("Conv2d: {err}"))
    }
}
