use crate::{
    common::*, Activation, InstanceNorm, InstanceNormInit, SpectralNorm, SpectralNormInit,
    TensorActivationExt as _, WeightInit,
};

/// A padded convolution with optional spectral weight normalization,
/// optional instance normalization, and a trailing activation.
///
/// With `reflection_pad` set, the input is reflection-padded by `p` and the
/// convolution itself runs unpadded.
#[derive(Debug, Clone)]
pub struct ConvIn2DInit {
    pub in_c: usize,
    pub out_c: usize,
    pub k: usize,
    pub s: usize,
    pub p: usize,
    pub d: usize,
    pub reflection_pad: bool,
    pub bias: bool,
    pub spectral: Option<SpectralNormInit>,
    pub instance_norm: Option<InstanceNormInit>,
    pub activation: Activation,
}

impl ConvIn2DInit {
    pub fn new(in_c: usize, out_c: usize, k: usize) -> Self {
        Self {
            in_c,
            out_c,
            k,
            s: 1,
            p: k / 2,
            d: 1,
            reflection_pad: false,
            bias: true,
            spectral: None,
            instance_norm: None,
            activation: Activation::Relu,
        }
    }

    pub fn build<'p, P>(self, path: P) -> ConvIn2D
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
            d,
            reflection_pad,
            bias,
            spectral,
            instance_norm,
            activation,
        } = self;

        let conv = nn::conv2d(
            path / "conv",
            in_c as i64,
            out_c as i64,
            k as i64,
            nn::ConvConfig {
                stride: s as i64,
                padding: if reflection_pad { 0 } else { p as i64 },
                dilation: d as i64,
                bias,
                ..Default::default()
            },
        );
        let sn = spectral.map(|init| init.build(path / "sn", &conv.ws.size(), 0));
        let norm = instance_norm.map(|init| init.build(path / "norm", out_c as i64));

        ConvIn2D {
            conv,
            sn,
            norm,
            activation,
            s: s as i64,
            p: p as i64,
            d: d as i64,
            reflection_pad,
        }
    }
}

#[derive(Debug)]
pub struct ConvIn2D {
    conv: nn::Conv2D,
    sn: Option<SpectralNorm>,
    norm: Option<InstanceNorm>,
    activation: Activation,
    s: i64,
    p: i64,
    d: i64,
    reflection_pad: bool,
}

impl ConvIn2D {
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let Self {
            ref conv,
            ref sn,
            ref norm,
            activation,
            s,
            p,
            d,
            reflection_pad,
        } = *self;

        let xs = if reflection_pad {
            xs.reflection_pad2d(&[p, p, p, p])
        } else {
            xs.shallow_clone()
        };

        let ws = match sn {
            Some(sn) => sn.apply(&conv.ws, train),
            None => conv.ws.shallow_clone(),
        };
        let conv_pad = if reflection_pad { 0 } else { p };
        let xs = xs.conv2d(
            &ws,
            conv.bs.as_ref(),
            &[s, s],
            &[conv_pad, conv_pad],
            &[d, d],
            1,
        );

        let xs = match norm {
            Some(norm) => norm.forward_t(&xs, train),
            None => xs,
        };

        xs.activation(activation)
    }

    pub fn init_weights(&mut self, init: &WeightInit) {
        let Self { conv, norm, .. } = self;
        init.init_conv(&mut conv.ws, conv.bs.as_mut());
        if let Some(norm) = norm {
            norm.init_weights(init);
        }
    }
}
