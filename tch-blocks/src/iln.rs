use crate::common::*;

/// Instance-layer normalization.
///
/// Blends instance statistics (per channel over spatial dims) with layer
/// statistics (over channel and spatial dims) through a learned per-channel
/// gate `rho`, then applies a learned affine transform. `rho` is kept inside
/// a closed interval by [`RhoClipper`], which the training loop invokes after
/// each optimizer step.
#[derive(Debug, Clone)]
pub struct IlnInit {
    pub eps: R64,
}

impl Default for IlnInit {
    fn default() -> Self {
        Self { eps: r64(1.1e-5) }
    }
}

impl IlnInit {
    pub fn build<'a>(self, path: impl Borrow<nn::Path<'a>>, out_dim: i64) -> Iln {
        let path = path.borrow();
        let Self { eps } = self;

        Iln {
            rho: path.var("rho", &[1, out_dim, 1, 1], nn::Init::Const(0.0)),
            gamma: path.var("gamma", &[1, out_dim, 1, 1], nn::Init::Const(1.0)),
            beta: path.var("beta", &[1, out_dim, 1, 1], nn::Init::Const(0.0)),
            eps: eps.raw(),
        }
    }
}

#[derive(Debug)]
pub struct Iln {
    rho: Tensor,
    gamma: Tensor,
    beta: Tensor,
    eps: f64,
}

impl nn::Module for Iln {
    fn forward(&self, xs: &Tensor) -> Tensor {
        let Self {
            ref rho,
            ref gamma,
            ref beta,
            eps,
        } = *self;

        let in_mean = xs.mean_dim(&[2, 3], true, Kind::Float);
        let in_var = xs.var_dim(&[2, 3], true, true);
        let out_in = (xs - in_mean) / (in_var + eps).sqrt();

        let ln_mean = xs.mean_dim(&[1, 2, 3], true, Kind::Float);
        let ln_var = xs.var_dim(&[1, 2, 3], true, true);
        let out_ln = (xs - ln_mean) / (ln_var + eps).sqrt();

        // rho and its complement sum to one
        let inv_rho = -rho + 1.0;
        let out = rho * out_in + inv_rho * out_ln;
        out * gamma + beta
    }
}

impl Iln {
    pub fn clamp_rho(&mut self, clipper: &RhoClipper) {
        clipper.clamp(&mut self.rho);
    }

    pub fn rho(&self) -> &Tensor {
        &self.rho
    }
}

/// Clamps ILN gate parameters into `[clip_min, clip_max]`.
///
/// Invoked by the training loop after the optimizer step touching the gate,
/// never by the layer itself.
#[derive(Debug, Clone, Copy)]
pub struct RhoClipper {
    clip_min: f64,
    clip_max: f64,
}

impl RhoClipper {
    pub fn new(clip_min: f64, clip_max: f64) -> Result<Self> {
        ensure!(
            clip_min < clip_max,
            "invalid rho clip range [{}, {}]",
            clip_min,
            clip_max
        );
        Ok(Self { clip_min, clip_max })
    }

    pub fn clamp(&self, rho: &mut Tensor) {
        tch::no_grad(|| {
            let _ = rho.clamp_(self.clip_min, self.clip_max);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_clip_range_fails() {
        assert!(RhoClipper::new(1.0, 0.0).is_err());
        assert!(RhoClipper::new(0.5, 0.5).is_err());
        assert!(RhoClipper::new(0.0, 1.0).is_ok());
    }

    #[test]
    fn rho_stays_clamped() {
        let vs = nn::VarStore::new(Device::Cpu);
        let mut iln = IlnInit::default().build(&vs.root(), 8);
        let clipper = RhoClipper::new(0.0, 1.0).unwrap();

        // simulate optimizer steps pushing rho out of range
        for step in 0..4 {
            tch::no_grad(|| {
                let mut rho = iln.rho.shallow_clone();
                let _ = rho.fill_((step as f64 - 1.5) * 2.0);
            });
            iln.clamp_rho(&clipper);

            let min = f64::from(iln.rho.min());
            let max = f64::from(iln.rho.max());
            assert!((0.0..=1.0).contains(&min));
            assert!((0.0..=1.0).contains(&max));
        }
    }

    #[test]
    fn gate_zero_matches_layer_norm() {
        let vs = nn::VarStore::new(Device::Cpu);
        let iln = IlnInit::default().build(&vs.root(), 4);

        let xs = Tensor::randn(&[2, 4, 6, 6], (Kind::Float, Device::Cpu));
        let ys = iln.forward(&xs);

        // rho starts at 0, so output is the layer-normalized input
        let ln_mean = xs.mean_dim(&[1, 2, 3], true, Kind::Float);
        let ln_var = xs.var_dim(&[1, 2, 3], true, true);
        let expected = (&xs - ln_mean) / (ln_var + 1.1e-5).sqrt();
        let max_err = f64::from((ys - expected).abs().max());
        approx::assert_abs_diff_eq!(max_err, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn preserves_shape() {
        let vs = nn::VarStore::new(Device::Cpu);
        let iln = IlnInit::default().build(&vs.root(), 16);
        let xs = Tensor::randn(&[3, 16, 10, 12], (Kind::Float, Device::Cpu));
        assert_eq!(iln.forward(&xs).size(), xs.size());
    }
}
