use crate::common::*;

/// Power-iteration spectral weight normalization state.
///
/// Built into a block at construction when the block is configured as
/// spectral; the wrapped weight is divided by its largest-singular-value
/// estimate on every forward. The `u` vector is a persistent, non-trainable
/// buffer refreshed by one power iteration per training forward.
#[derive(Debug, Clone)]
pub struct SpectralNormInit {
    pub n_power_iterations: usize,
    pub eps: R64,
}

impl Default for SpectralNormInit {
    fn default() -> Self {
        Self {
            n_power_iterations: 1,
            eps: r64(1e-12),
        }
    }
}

impl SpectralNormInit {
    /// `dim` is the weight axis treated as the output dimension: 0 for
    /// convolutions, 1 for transposed convolutions.
    pub fn build<'a>(
        self,
        path: impl Borrow<nn::Path<'a>>,
        ws_size: &[i64],
        dim: usize,
    ) -> SpectralNorm {
        let path = path.borrow();
        let Self {
            n_power_iterations,
            eps,
        } = self;
        let rows = ws_size[dim];

        let u = path.zeros_no_train("u", &[rows]);
        tch::no_grad(|| {
            let init = Tensor::randn(&[rows], (Kind::Float, u.device()));
            let init = normalize(&init, eps.raw());
            let mut u = u.shallow_clone();
            u.copy_(&init);
        });

        SpectralNorm {
            u,
            dim: dim as i64,
            n_power_iterations,
            eps: eps.raw(),
        }
    }
}

#[derive(Debug)]
pub struct SpectralNorm {
    u: Tensor,
    dim: i64,
    n_power_iterations: usize,
    eps: f64,
}

impl SpectralNorm {
    /// Returns the weight divided by its largest-singular-value estimate.
    pub fn apply(&self, ws: &Tensor, train: bool) -> Tensor {
        let Self {
            ref u,
            dim,
            n_power_iterations,
            eps,
        } = *self;

        let w_mat = if dim == 0 {
            ws.flatten(1, -1)
        } else {
            ws.transpose(0, dim).flatten(1, -1)
        };

        let v = tch::no_grad(|| {
            let mut u_buf = u.shallow_clone();
            let mut v = normalize(&w_mat.transpose(0, 1).mv(&u_buf), eps);

            if train {
                for _ in 0..n_power_iterations {
                    let u_next = normalize(&w_mat.mv(&v), eps);
                    u_buf.copy_(&u_next);
                    v = normalize(&w_mat.transpose(0, 1).mv(&u_buf), eps);
                }
            }

            v
        });

        let sigma = u.dot(&w_mat.mv(&v));
        ws / sigma
    }
}

fn normalize(xs: &Tensor, eps: f64) -> Tensor {
    xs / xs.norm().clamp_min(eps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_spectral_norm_after_convergence() {
        let vs = nn::VarStore::new(Device::Cpu);
        let ws = Tensor::randn(&[16, 8, 3, 3], (Kind::Float, Device::Cpu));
        let sn = SpectralNormInit {
            n_power_iterations: 50,
            ..Default::default()
        }
        .build(&vs.root(), &ws.size(), 0);

        let normalized = sn.apply(&ws, true);
        let flat = normalized.flatten(1, -1);
        let (_u, s, _v) = flat.svd(false, false);
        let top = f64::from(s.max());
        assert!((top - 1.0).abs() < 1e-3, "top singular value {}", top);
    }

    #[test]
    fn eval_does_not_move_u() {
        let vs = nn::VarStore::new(Device::Cpu);
        let ws = Tensor::randn(&[4, 4, 1, 1], (Kind::Float, Device::Cpu));
        let sn = SpectralNormInit::default().build(&vs.root(), &ws.size(), 0);

        let before = sn.u.copy();
        let _ = sn.apply(&ws, false);
        let drift = f64::from((&sn.u - before).abs().sum(Kind::Float));
        assert_eq!(drift, 0.0);
    }
}
