/*!
 * # Blind-spot network
 *
 * U-Net style denoiser after Laine et al. (2019), "High-Quality Self-Supervised Deep Image
 * Denoising". With a non-zero blind spot every convolution only looks upwards, the input is
 * presented in four orientations and the orientations are fused after being rotated back,
 * so the prediction at a pixel never depends on the noisy value of that pixel.
 *
 * ```text
 * input ─┬─ rot 0   ─┐                                           ┌─ rot 0   ─┐
 *        ├─ rot 90  ─┤                                           ├─ rot 270 ─┤
 *        ├─ rot 180 ─┼─ encoder ── decoder ── shift down ── split ┼─ rot 180 ─┼─ cat C ── 1x1 fuse ── output
 *        └─ rot 270 ─┘                                           └─ rot 90  ─┘
 * ```
 */

use rand::{rngs::StdRng, SeedableRng};
use tch::{nn, Tensor};
use tracing::{debug, trace};

use crate::config::{BranchMode, NetConfig};
use crate::error::{Error, Result};
use crate::init::Nonlinearity;
use crate::layers::{Conv2d, ConvVariant, Shift2d};
use crate::ops_2d::Rotation;
use crate::tensor_ext::TensorExt;

fn conv_config(padding: i64) -> nn::ConvConfig {
    nn::ConvConfig {
        padding,
        ws_init: nn::Init::Const(0.0),
        bs_init: nn::Init::Const(0.0),
        ..Default::default()
    }
}

/// Convolutions each followed by a leaky rectification.
#[derive(Debug)]
struct ConvBlock {
    convs: Vec<Conv2d>,
    negative_slope: f64,
}

impl ConvBlock {
    /// `channels` lists (in, out) for each convolution, all `kernel_size` wide with same padding.
    /// Weights start at zero until [`BlindSpotNet::init_weights`] draws them.
    fn new(
        vs: nn::Path,
        channels: &[(i64, i64)],
        kernel_size: i64,
        variant: ConvVariant,
        negative_slope: f64,
    ) -> Self {
        let config = conv_config(kernel_size / 2);
        let convs = channels
            .iter()
            .enumerate()
            .map(|(i, &(c_in, c_out))| Conv2d::new(&vs / i, c_in, c_out, kernel_size, config, variant))
            .collect();
        ConvBlock {
            convs,
            negative_slope,
        }
    }

    fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.shallow_clone();
        for conv in self.convs.iter() {
            xs = conv.f_forward(&xs)?.leaky_relu_with_slope(self.negative_slope);
        }
        Ok(xs)
    }
}

// The hidden blocks in forward order, borrowed with `&` or `&mut`.
macro_rules! hidden_blocks {
    ($net:ident, $($borrow:tt)+) => {
        [
            $($borrow)+ $net.encode_1,
            $($borrow)+ $net.encode_3,
            $($borrow)+ $net.encode_4,
            $($borrow)+ $net.encode_5,
            $($borrow)+ $net.decode_5,
            $($borrow)+ $net.decode_4,
            $($borrow)+ $net.decode_3,
            $($borrow)+ $net.decode_1,
            $($borrow)+ $net.fuse,
        ]
    };
}

#[derive(Debug)]
pub struct BlindSpotNet {
    config: NetConfig,
    // enc_conv0, enc_conv1
    encode_1: ConvBlock,
    // moves the pooling windows down one row so pooling stays causal
    pool_shift: Option<Shift2d>,
    encode_3: ConvBlock,
    encode_4: ConvBlock,
    encode_5: ConvBlock,
    decode_5: ConvBlock,
    decode_4: ConvBlock,
    decode_3: ConvBlock,
    decode_1: ConvBlock,
    // realigns the blind pixel with the centre row
    output_shift: Option<Shift2d>,
    fuse: ConvBlock,
    output_conv: Conv2d,
}

impl BlindSpotNet {
    /**
     * Build the network under `vs` and initialize its weights.
     *
     * # Errors
     * `Error::InvalidConfig` if the configuration does not validate.
     */
    pub fn new(vs: &nn::Path, config: NetConfig) -> Result<Self> {
        config.validate()?;
        let variant = if config.is_blind() {
            ConvVariant::Shifted
        } else {
            ConvVariant::Plain
        };
        let slope = config.negative_slope;
        let dim = config.features;
        let dim_all = config.fused_features();
        let block = |name: &str, channels: &[(i64, i64)], kernel_size: i64| {
            ConvBlock::new(vs / name, channels, kernel_size, variant, slope)
        };

        let encode_1 = block("encode_block_1", &[(config.in_channels, dim), (dim, dim)], 3);
        let encode_3 = block("encode_block_3", &[(dim, dim)], 3);
        let encode_4 = block("encode_block_4", &[(dim, dim)], 3);
        let encode_5 = block("encode_block_5", &[(dim, dim / 2)], 3);
        let decode_5 = block("decode_block_5", &[(dim / 2, dim)], 3);
        let decode_4 = block("decode_block_4", &[(2 * dim, dim), (dim, dim)], 3);
        let decode_3 = block("decode_block_3", &[(2 * dim, dim), (dim, dim)], 3);
        let decode_1 = block("decode_block_1", &[(2 * dim, dim), (dim, dim)], 3);
        let fuse = block("output_block", &[(dim_all, dim_all), (dim_all, dim_all / 2)], 1);
        let output_conv = Conv2d::new(
            vs / "output_conv",
            dim_all / 2,
            config.out_channels,
            1,
            conv_config(0),
            variant,
        );

        let (pool_shift, output_shift) = if config.is_blind() {
            (
                Some(Shift2d::new((1, 0))),
                Some(Shift2d::new((config.output_shift(), 0))),
            )
        } else {
            (None, None)
        };

        let mut net = BlindSpotNet {
            config,
            encode_1,
            pool_shift,
            encode_3,
            encode_4,
            encode_5,
            decode_5,
            decode_4,
            decode_3,
            decode_1,
            output_shift,
            fuse,
            output_conv,
        };
        debug!(
            blindspot = net.config.blindspot,
            convs = net.convs().count(),
            fused_features = dim_all,
            "built blind-spot network"
        );
        net.init_weights()?;
        Ok(net)
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Every convolution of the network, the linear output convolution last.
    pub fn convs(&self) -> impl Iterator<Item = &Conv2d> + '_ {
        self.blocks()
            .into_iter()
            .flat_map(|block| block.convs.iter())
            .chain(std::iter::once(&self.output_conv))
    }

    fn blocks(&self) -> [&ConvBlock; 9] {
        hidden_blocks!(self, &)
    }

    fn blocks_mut(&mut self) -> [&mut ConvBlock; 9] {
        hidden_blocks!(self, &mut)
    }

    /**
     * Kaiming-normal for every hidden convolution, linear gain for the output one, zero biases.
     *
     * With `NetConfig::seed` the weights come from a generator owned by this call, in the
     * order of [`BlindSpotNet::convs`], otherwise from libtorch's generator.
     */
    fn init_weights(&mut self) -> Result<()> {
        let mut rng = self.config.seed.map(StdRng::seed_from_u64);
        let hidden = Nonlinearity::LeakyRelu(self.config.negative_slope);
        for block in self.blocks_mut() {
            for conv in block.convs.iter_mut() {
                conv.init(hidden, rng.as_mut())?;
            }
        }
        self.output_conv.init(Nonlinearity::Linear, rng.as_mut())?;
        debug!(seed = ?self.config.seed, "initialized weights");
        Ok(())
    }

    /// Encoder/decoder shared by every orientation, [N, C_in, H, W] -> [N, features, H, W].
    fn f_unet(&self, xs: &Tensor) -> Result<Tensor> {
        let pool1 = self.encode_1.f_forward(xs)?;
        let pool2 = match &self.pool_shift {
            Some(shift) => shift.f_forward(&pool1)?,
            None => pool1.shallow_clone(),
        };
        let pool2 = pool2.f_max_pool2d(&[2, 2], &[2, 2], &[0, 0], &[1, 1], false)?;

        let pool3 = self.encode_3.f_forward(&pool2)?;
        let pool4 = self.encode_4.f_forward(&pool3)?;
        let encoded = self.encode_5.f_forward(&pool4)?;

        let upsample5 = self.decode_5.f_forward(&encoded)?;
        let concat5 = Tensor::f_cat(&[&upsample5, &pool4], 1)?;
        let upsample4 = self.decode_4.f_forward(&concat5)?;
        let concat4 = Tensor::f_cat(&[&upsample4, &pool3], 1)?;
        let upsample3 = self.decode_3.f_forward(&concat4)?;

        let (height, width) = pool1.spatial_size()?;
        let upsample2 = upsample3.f_upsample_nearest2d(&[height, width], None::<f64>, None::<f64>)?;
        let concat2 = Tensor::f_cat(&[&upsample2, &pool1], 1)?;
        self.decode_1.f_forward(&concat2)
    }

    fn f_realign(&self, xs: &Tensor) -> Result<Tensor> {
        match &self.output_shift {
            Some(shift) => shift.f_forward(xs),
            None => Ok(xs.shallow_clone()),
        }
    }

    /// The four orientations stacked on the batch axis and run in one pass.
    fn f_branches_batched(&self, xs: &Tensor) -> Result<Vec<Tensor>> {
        let rotated = Rotation::ALL
            .iter()
            .map(|rotation| rotation.f_apply(xs))
            .collect::<Result<Vec<_>>>()?;
        let stacked = Tensor::f_cat(&rotated, 0)?;
        let decoded = self.f_realign(&self.f_unet(&stacked)?)?;
        decoded
            .f_chunk(4, 0)?
            .iter()
            .zip(Rotation::ALL)
            .map(|(branch, rotation)| rotation.inverse().f_apply(branch))
            .collect()
    }

    /// One orientation at a time, joined once all four are back in the input frame.
    fn f_branches_separate(&self, xs: &Tensor) -> Result<Vec<Tensor>> {
        Rotation::ALL
            .iter()
            .map(|rotation| {
                let rotated = rotation.f_apply(xs)?;
                let decoded = self.f_realign(&self.f_unet(&rotated)?)?;
                rotation.inverse().f_apply(&decoded)
            })
            .collect()
    }

    /**
     * Denoise a batch of images.
     *
     * # Arguments
     * xs: Tensor - The noisy images [N, C_in, H, W], H and W even
     *
     * # Returns
     * Tensor - The denoised images [N, C_out, H, W]
     *
     * # Errors
     * - `Error::NotImage` if `xs` is not 4-D
     * - `Error::OddSpatialSize` if H or W is odd
     * - `Error::NonSquareBatch` for a non-square image with `BranchMode::Batched`
     * - `Error::Tch` for any other shape mismatch, channel counts included
     */
    pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
        let (height, width) = xs.spatial_size()?;
        if height % 2 != 0 || width % 2 != 0 {
            return Err(Error::OddSpatialSize { height, width });
        }

        let features = if self.config.is_blind() {
            let batched = match self.config.branch_mode {
                BranchMode::Batched if height != width => {
                    return Err(Error::NonSquareBatch { height, width })
                }
                BranchMode::Batched => true,
                BranchMode::PerBranch => false,
                BranchMode::Auto => height == width,
            };
            trace!(shape = ?xs.size(), batched, "blind-spot forward");
            let branches = if batched {
                self.f_branches_batched(xs)?
            } else {
                self.f_branches_separate(xs)?
            };
            Tensor::f_cat(&branches, 1)?
        } else {
            trace!(shape = ?xs.size(), "plain forward");
            self.f_unet(xs)?
        };

        let fused = self.fuse.f_forward(&features)?;
        self.output_conv.f_forward(&fused)
    }
}

impl nn::Module for BlindSpotNet {
    fn forward(&self, xs: &Tensor) -> Tensor {
        self.f_forward(xs)
            .unwrap_or_else(|err| panic!("BlindSpotNet: {err}"))
    }
}
