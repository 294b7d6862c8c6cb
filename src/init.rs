/*!
# Weight initialization

Kaiming-normal initialization (He et al., 2015) for convolution weights, either from
libtorch's generator through [`nn::Init`] or from a caller-owned [`StdRng`].
 */

use rand::{rngs::StdRng, Rng};
use rand_distr::StandardNormal;
use tch::{nn, Tensor};

use crate::error::Result;

/// Activation following a layer, decides the gain of its initialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Nonlinearity {
    /// Leaky rectification with the given negative slope.
    LeakyRelu(f64),
    Linear,
}

impl Nonlinearity {
    pub fn gain(self) -> f64 {
        match self {
            Nonlinearity::LeakyRelu(slope) => (2.0 / (1.0 + slope * slope)).sqrt(),
            Nonlinearity::Linear => 1.0,
        }
    }

    /// `tch`'s Kaiming-normal initializer (fan-in mode) with this gain.
    pub fn kaiming_normal(self) -> nn::Init {
        nn::Init::Kaiming {
            dist: nn::NormalOrUniform::Normal,
            fan: nn::FanInOut::FanIn,
            non_linearity: nn::NonLinearity::ExplicitGain(self.gain()),
        }
    }

    /// Standard deviation of [`Nonlinearity::kaiming_normal`] for a weight of shape `dims`.
    pub fn kaiming_std(self, dims: &[i64]) -> f64 {
        let fan_in = nn::FanInOut::FanIn.for_weight_dims(dims);
        self.gain() / (fan_in as f64).sqrt()
    }
}

/**
Fill a weight tensor in place with Kaiming-normal samples.

With `rng` the samples come from that generator, so the result does not depend on
libtorch's process-wide generator or on other threads drawing from it. Without it the
draw goes through [`nn::Init::set`].
 */
pub fn kaiming_normal_(
    weight: &mut Tensor,
    nonlinearity: Nonlinearity,
    rng: Option<&mut StdRng>,
) -> Result<()> {
    let _guard = tch::no_grad_guard();
    match rng {
        None => nonlinearity.kaiming_normal().set(weight),
        Some(rng) => {
            let dims = weight.size();
            let std = nonlinearity.kaiming_std(&dims);
            let samples = (0..weight.numel())
                .map(|_| rng.sample::<f64, _>(StandardNormal) * std)
                .collect::<Vec<f64>>();
            let samples = Tensor::of_slice(&samples)
                .f_view(dims.as_slice())?
                .f_to_kind(weight.kind())?
                .to_device(weight.device());
            weight.f_copy_(&samples)?;
        }
    }
    Ok(())
}

pub fn zeros_(bias: &mut Tensor) {
    let _guard = tch::no_grad_guard();
    nn::Init::Const(0.0).set(bias);
}
