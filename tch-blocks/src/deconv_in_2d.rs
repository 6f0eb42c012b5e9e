use crate::{
    common::*, Activation, InstanceNorm, InstanceNormInit, SpectralNorm, SpectralNormInit,
    TensorActivationExt as _, WeightInit,
};

/// A transposed convolution with optional spectral weight normalization,
/// optional instance normalization, and a trailing activation.
#[derive(Debug, Clone)]
pub struct DeconvIn2DInit {
    pub in_c: usize,
    pub out_c: usize,
    pub k: usize,
    pub s: usize,
    pub p: usize,
    pub op: usize,
    pub bias: bool,
    pub spectral: Option<SpectralNormInit>,
    pub instance_norm: Option<InstanceNormInit>,
    pub activation: Activation,
}

impl DeconvIn2DInit {
    pub fn new(in_c: usize, out_c: usize, k: usize) -> Self {
        Self {
            in_c,
            out_c,
            k,
            s: 1,
            p: k / 2,
            op: 0,
            bias: true,
            spectral: None,
            instance_norm: None,
            activation: Activation::Relu,
        }
    }

    pub fn build<'p, P>(self, path: P) -> DeconvIn2D
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_c,
            out_c,
            k,
            s,
            p,
            op,
            bias,
            spectral,
            instance_norm,
            activation,
        } = self;

        let deconv = nn::conv_transpose2d(
            path / "deconv",
            in_c as i64,
            out_c as i64,
            k as i64,
            nn::ConvTransposeConfig {
                stride: s as i64,
                padding: p as i64,
                output_padding: op as i64,
                bias,
                ..Default::default()
            },
        );
        // transposed convolutions carry the output axis at dim 1
        let sn = spectral.map(|init| init.build(path / "sn", &deconv.ws.size(), 1));
        let norm = instance_norm.map(|init| init.build(path / "norm", out_c as i64));

        DeconvIn2D {
            deconv,
            sn,
            norm,
            activation,
            s: s as i64,
            p: p as i64,
            op: op as i64,
        }
    }
}

#[derive(Debug)]
pub struct DeconvIn2D {
    deconv: nn::ConvTranspose2D,
    sn: Option<SpectralNorm>,
    norm: Option<InstanceNorm>,
    activation: Activation,
    s: i64,
    p: i64,
    op: i64,
}

impl DeconvIn2D {
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let Self {
            ref deconv,
            ref sn,
            ref norm,
            activation,
            s,
            p,
            op,
        } = *self;

        let ws = match sn {
            Some(sn) => sn.apply(&deconv.ws, train),
            None => deconv.ws.shallow_clone(),
        };
        let xs = xs.conv_transpose2d(
            &ws,
            deconv.bs.as_ref(),
            &[s, s],
            &[p, p],
            &[op, op],
            1,
            &[1, 1],
        );

        let xs = match norm {
            Some(norm) => norm.forward_t(&xs, train),
            None => xs,
        };

        xs.activation(activation)
    }

    pub fn init_weights(&mut self, init: &WeightInit) {
        let Self { deconv, norm, .. } = self;
        init.init_conv(&mut deconv.ws, deconv.bs.as_mut());
        if let Some(norm) = norm {
            norm.init_weights(init);
        }
    }
}
