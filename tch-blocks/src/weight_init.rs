use crate::common::*;

/// Weight initialization schemes for convolution-like layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitKind {
    Normal,
    Xavier,
    Kaiming,
    Orthogonal,
}

/// Construction-time weight initializer.
///
/// Dispatches over two layer roles: convolution-like parameters go through
/// [`WeightInit::init_conv`], affine normalization parameters through
/// [`WeightInit::init_norm`]. Parameters outside these roles (e.g. the ILN
/// gate, which is constant-initialized at construction) are left untouched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeightInit {
    pub kind: InitKind,
    pub gain: R64,
}

impl Default for WeightInit {
    fn default() -> Self {
        Self {
            kind: InitKind::Normal,
            gain: r64(2e-2),
        }
    }
}

impl WeightInit {
    /// Initialize a convolution or linear weight, zeroing the bias if present.
    pub fn init_conv(&self, ws: &mut Tensor, bs: Option<&mut Tensor>) {
        let Self { kind, gain } = *self;
        let gain = gain.raw();

        tch::no_grad(|| {
            match kind {
                InitKind::Normal => {
                    let _ = ws.normal_(0.0, gain);
                }
                InitKind::Xavier => {
                    let (fan_in, fan_out) = fans(ws);
                    let std = gain * (2.0 / (fan_in + fan_out) as f64).sqrt();
                    let _ = ws.normal_(0.0, std);
                }
                InitKind::Kaiming => {
                    let (fan_in, _fan_out) = fans(ws);
                    let std = (2.0 / fan_in as f64).sqrt();
                    let _ = ws.normal_(0.0, std);
                }
                InitKind::Orthogonal => {
                    orthogonal_(ws, gain);
                }
            }

            if let Some(bs) = bs {
                let _ = bs.zero_();
            }
        });
    }

    /// Initialize an affine normalization weight around identity scaling.
    pub fn init_norm(&self, ws: &mut Tensor, bs: Option<&mut Tensor>) {
        let gain = self.gain.raw();

        tch::no_grad(|| {
            let _ = ws.normal_(1.0, gain);
            if let Some(bs) = bs {
                let _ = bs.zero_();
            }
        });
    }
}

fn fans(ws: &Tensor) -> (i64, i64) {
    let size = ws.size();
    let receptive: i64 = size[2..].iter().product();
    (size[1] * receptive, size[0] * receptive)
}

/// Fill with a (semi-)orthogonal matrix over the flattened weight.
fn orthogonal_(ws: &mut Tensor, gain: f64) {
    let size = ws.size();
    let rows = size[0];
    let cols: i64 = size[1..].iter().product();

    // QR of a tall matrix; transpose back when the weight is wide.
    let flat = Tensor::randn(&[rows.max(cols), rows.min(cols)], (Kind::Float, ws.device()));
    let (q, r) = flat.linalg_qr("reduced");
    let q = &q * r.diag(0).sign();
    let q = if rows < cols { q.transpose(0, 1) } else { q };

    ws.copy_(&(q * gain).reshape(&size));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthogonal_init_is_orthogonal() {
        let mut ws = Tensor::zeros(&[8, 4, 3, 3], (Kind::Float, Device::Cpu));
        WeightInit {
            kind: InitKind::Orthogonal,
            gain: r64(1.0),
        }
        .init_conv(&mut ws, None);

        // rows of the flattened weight are orthonormal up to fp error
        let flat = ws.flatten(1, -1);
        let gram = flat.matmul(&flat.transpose(0, 1));
        let eye = Tensor::eye(8, (Kind::Float, Device::Cpu));
        let max_err = f64::from((gram - eye).abs().max());
        assert!(max_err < 1e-4, "gram deviates from identity by {}", max_err);
    }

    #[test]
    fn bias_is_zeroed() {
        let mut ws = Tensor::randn(&[4, 4, 3, 3], (Kind::Float, Device::Cpu));
        let mut bs = Tensor::randn(&[4], (Kind::Float, Device::Cpu));
        WeightInit::default().init_conv(&mut ws, Some(&mut bs));
        assert_eq!(f64::from(bs.abs().sum(Kind::Float)), 0.0);
    }

    #[test]
    fn norm_init_centers_at_one() {
        let mut ws = Tensor::zeros(&[256], (Kind::Float, Device::Cpu));
        WeightInit::default().init_norm(&mut ws, None);
        let mean = f64::from(ws.mean(Kind::Float));
        assert!((mean - 1.0).abs() < 0.1);
    }
}
