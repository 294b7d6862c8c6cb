use tch::{Kind, Tensor};

/// Largest element-wise absolute difference between two tensors of the same shape.
pub fn max_abs_diff(a: &Tensor, b: &Tensor) -> f64 {
    let delta = (a.to_kind(Kind::Double) - b.to_kind(Kind::Double)).abs();
    if delta.numel() == 0 {
        return 0.0;
    }
    f64::from(delta.max())
}

pub fn assert_close_tensor(a: &Tensor, b: &Tensor, tolerance: f64) {
    assert_eq!(a.size(), b.size(), "Tensors must have the same shape");
    let delta = max_abs_diff(a, b);
    assert!(
        delta <= tolerance,
        "Tensors must be equal, max difference {delta} > {tolerance}"
    );
}

pub fn assert_eq_tensor(a: &Tensor, b: &Tensor) {
    assert_close_tensor(a, b, 1e-5);
}
