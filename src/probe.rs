/*!
Receptive-field probing by back-propagation.
 */

use tch::{Kind, Tensor};

use crate::error::{Error, Result};

/**
Find the input pixels an output pixel depends on.

A random input of the given shape is pushed through `forward`, the output at `position` is
summed over batch and channels and back-propagated to the input. Pixels with a non-zero
gradient in any sample or channel belong to the receptive field.

`forward` has to keep the autograd graph from its input to its output: an output computed
under `no_grad`, detached, or not depending on the input gives an error.

Max pooling only routes gradient to the winner of each window, so the map can miss pixels
that influence the output through a pooling stage. A pixel reported as outside is only
guaranteed outside for networks without pooling; a pixel reported inside always is.

# Arguments
- forward: the operation to probe
- shape: [N, C, H, W] shape of the random input
- position: (y, x) of the output pixel
- options: (Kind, Device) of the random input

# Returns
Tensor - [H, W] boolean map, true where the input pixel reaches the output pixel
 */
pub fn receptive_field<F>(
    forward: F,
    shape: [i64; 4],
    position: (i64, i64),
    options: (Kind, tch::Device),
) -> Result<Tensor>
where
    F: FnOnce(&Tensor) -> Result<Tensor>,
{
    let (y, x) = position;
    let input = Tensor::f_randn(&shape, options)?.set_requires_grad(true);
    let output = forward(&input)?;
    let target = output.f_select(2, y)?.f_select(2, x)?.f_sum(Kind::Double)?;
    if !target.requires_grad() {
        return Err(Error::NoGradientPath);
    }
    let mut grads = Tensor::f_run_backward(&[&target], &[&input], false, false)?;
    let grad = grads.swap_remove(0);
    if !grad.defined() {
        return Err(Error::NoGradientPath);
    }
    let field = grad
        .f_abs()?
        .f_sum_dim_intlist(Some(&[0, 1][..]), false, Kind::Double)?
        .f_gt(0.0)?;
    Ok(field)
}
