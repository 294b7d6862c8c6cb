/*!
 * # Tch-blindspot - Blind-spot denoising network for the tch-rs crate
 *
 * A self-supervised denoiser in the style of Laine et al. (2019): the prediction made for a
 * pixel never depends on the noisy value of that pixel, so the network can be trained on
 * noisy images alone.
 *
 * ## Features
 * - 2D operations : exact crop, shift and quarter-turn rotation of [N, C, H, W] tensors
 * - Layers : the operations as `tch` modules and a convolution whose receptive field only extends upwards
 * - Network : the blind-spot U-Net, built on a `tch::nn::Path` and initialized on construction
 * - Probe : receptive-field maps computed by back-propagation
 *
 * ## Conventions
 *
 * ### Shapes
 * - N : The number of samples
 * - C : The number of channels
 * - H : The height of the image
 * - W : The width of the image
 *
 * - [N, C, H, W] : A tensor of shape [N, C, H, W] is a batch of N images of shape [C, H, W]
 *                 A batch of single channel images is never represented as [N, H, W] but as [N, 1, H, W]
 *
 * ### Axis
 *
 * the y axis will always be top to bottom
 * the x axis will always be left to right
 *
 * ```text
 * 0 ----> 1 (x)
 * |
 * |
 * v
 * 1
 * ```
 * (y)
 *
 * Shifts are given as (vertical, horizontal), positive towards the bottom and the right.
 * Rotations are clockwise.
 *
 * ### Errors
 *
 * Fallible operations come in two forms, following `tch`: `f_`-prefixed functions return a
 * [`Result`](error::Result) and the `nn::Module` implementations panic with the same message.
 *
 * ## Example
 * ```rust,no_run
 * use tch::{nn, nn::Module, Device, Kind, Tensor};
 * use tch_blindspot::{config::NetConfig, network::BlindSpotNet};
 *
 * let vs = nn::VarStore::new(Device::Cpu);
 * let config = NetConfig::default().with_channels(3, 3).with_features(32);
 * let net = BlindSpotNet::new(&vs.root(), config).unwrap();
 * let noisy = Tensor::rand(&[1, 3, 64, 64], (Kind::Float, Device::Cpu));
 * let denoised = net.forward(&noisy);
 * assert_eq!(denoised.size(), [1, 3, 64, 64]);
 * ```
 */

pub mod config;
pub mod error;
pub mod init;
pub mod layers;
pub mod network;
pub mod ops_2d;
pub mod probe;
pub mod tensor_ext;
pub mod utils;
#[cfg(feature = "ndarray")]
pub mod ndarray;
