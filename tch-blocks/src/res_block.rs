use crate::{common::*, Activation, ConvIn2D, ConvIn2DInit, SpectralNormInit, WeightInit};

/// Dilated residual block: two reflection-padded convolutions with instance
/// normalization and an identity skip.
///
/// No activation after the residual sum.
#[derive(Debug, Clone)]
pub struct ResBlockInit {
    pub dim: usize,
    pub dilation: usize,
    pub spectral: Option<SpectralNormInit>,
}

impl ResBlockInit {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            dilation: 1,
            spectral: None,
        }
    }

    pub fn build<'p, P>(self, path: P) -> ResBlock
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            dim,
            dilation,
            spectral,
        } = self;

        let conv1 = ConvIn2DInit {
            p: dilation,
            d: dilation,
            reflection_pad: true,
            bias: spectral.is_none(),
            spectral: spectral.clone(),
            instance_norm: Some(Default::default()),
            activation: Activation::Relu,
            ..ConvIn2DInit::new(dim, dim, 3)
        }
        .build(path / "conv1");

        let conv2 = ConvIn2DInit {
            p: 1,
            reflection_pad: true,
            bias: spectral.is_none(),
            spectral,
            instance_norm: Some(Default::default()),
            activation: Activation::Linear,
            ..ConvIn2DInit::new(dim, dim, 3)
        }
        .build(path / "conv2");

        ResBlock { conv1, conv2 }
    }
}

#[derive(Debug)]
pub struct ResBlock {
    conv1: ConvIn2D,
    conv2: ConvIn2D,
}

impl ResBlock {
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let ys = self.conv1.forward_t(xs, train);
        let ys = self.conv2.forward_t(&ys, train);
        xs + ys
    }

    pub fn init_weights(&mut self, init: &WeightInit) {
        self.conv1.init_weights(init);
        self.conv2.init_weights(init);
    }
}
