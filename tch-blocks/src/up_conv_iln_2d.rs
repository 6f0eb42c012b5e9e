use crate::{common::*, Iln, IlnInit, RhoClipper, SpectralNorm, SpectralNormInit, WeightInit};

/// Upsampling stage of the alternate decoder: nearest-neighbor upsample by 2,
/// reflection-padded convolution (optionally spectral-normalized), ILN, ReLU.
#[derive(Debug, Clone)]
pub struct UpConvIln2DInit {
    pub in_c: usize,
    pub out_c: usize,
    pub k: usize,
    pub bias: bool,
    pub spectral: Option<SpectralNormInit>,
    pub iln: IlnInit,
}

impl UpConvIln2DInit {
    pub fn new(in_c: usize, out_c: usize, k: usize) -> Self {
        Self {
            in_c,
            out_c,
            k,
            bias: true,
            spectral: None,
            iln: Default::default(),
        }
    }

    pub fn build<'p, P>(self, path: P) -> UpConvIln2D
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_c,
            out_c,
            k,
            bias,
            spectral,
            iln,
        } = self;

        let conv = nn::conv2d(
            path / "conv",
            in_c as i64,
            out_c as i64,
            k as i64,
            nn::ConvConfig {
                padding: 0,
                bias,
                ..Default::default()
            },
        );
        let sn = spectral.map(|init| init.build(path / "sn", &conv.ws.size(), 0));
        let iln = iln.build(path / "iln", out_c as i64);

        UpConvIln2D {
            conv,
            sn,
            iln,
            p: (k / 2) as i64,
        }
    }
}

#[derive(Debug)]
pub struct UpConvIln2D {
    conv: nn::Conv2D,
    sn: Option<SpectralNorm>,
    iln: Iln,
    p: i64,
}

impl UpConvIln2D {
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let Self {
            ref conv,
            ref sn,
            ref iln,
            p,
        } = *self;

        let size = xs.size();
        let (in_h, in_w) = (size[2], size[3]);

        let xs = xs.upsample_nearest2d(&[in_h * 2, in_w * 2], None, None);
        let xs = xs.reflection_pad2d(&[p, p, p, p]);

        let ws = match sn {
            Some(sn) => sn.apply(&conv.ws, train),
            None => conv.ws.shallow_clone(),
        };
        let xs = xs.conv2d(&ws, conv.bs.as_ref(), &[1, 1], &[0, 0], &[1, 1], 1);

        iln.forward(&xs).relu()
    }

    pub fn clamp_rho(&mut self, clipper: &RhoClipper) {
        self.iln.clamp_rho(clipper);
    }

    pub fn init_weights(&mut self, init: &WeightInit) {
        let Self { conv, .. } = self;
        init.init_conv(&mut conv.ws, conv.bs.as_mut());
    }
}
