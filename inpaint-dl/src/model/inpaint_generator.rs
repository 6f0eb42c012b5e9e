use crate::common::*;
use tch_blocks::{
    Activation, ConvIn2D, ConvIn2DInit, DeconvIn2D, DeconvIn2DInit, ResBlock, ResBlockInit,
    WeightInit,
};

#[derive(Debug, Clone)]
pub struct InpaintGeneratorInit {
    pub residual_blocks: usize,
    pub weight_init: Option<WeightInit>,
}

impl Default for InpaintGeneratorInit {
    fn default() -> Self {
        Self {
            residual_blocks: 8,
            weight_init: Some(Default::default()),
        }
    }
}

impl InpaintGeneratorInit {
    pub fn build<'p, P>(self, path: P) -> InpaintGenerator
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            residual_blocks,
            weight_init,
        } = self;

        let encoder = vec![
            ConvIn2DInit {
                p: 3,
                reflection_pad: true,
                instance_norm: Some(Default::default()),
                ..ConvIn2DInit::new(4, 64, 7)
            }
            .build(path / "encoder0"),
            ConvIn2DInit {
                s: 2,
                p: 1,
                instance_norm: Some(Default::default()),
                ..ConvIn2DInit::new(64, 128, 4)
            }
            .build(path / "encoder1"),
            ConvIn2DInit {
                s: 2,
                p: 1,
                instance_norm: Some(Default::default()),
                ..ConvIn2DInit::new(128, 256, 4)
            }
            .build(path / "encoder2"),
        ];

        let middle: Vec<_> = (0..residual_blocks)
            .map(|index| {
                ResBlockInit {
                    dilation: 2,
                    ..ResBlockInit::new(256)
                }
                .build(path / format!("middle{}", index))
            })
            .collect();

        let decoder = vec![
            DeconvIn2DInit {
                s: 2,
                p: 1,
                instance_norm: Some(Default::default()),
                ..DeconvIn2DInit::new(256, 128, 4)
            }
            .build(path / "decoder0"),
            DeconvIn2DInit {
                s: 2,
                p: 1,
                instance_norm: Some(Default::default()),
                ..DeconvIn2DInit::new(128, 64, 4)
            }
            .build(path / "decoder1"),
        ];

        let out = ConvIn2DInit {
            p: 3,
            reflection_pad: true,
            activation: Activation::Linear,
            ..ConvIn2DInit::new(64, 3, 7)
        }
        .build(path / "decoder2");

        let mut generator = InpaintGenerator {
            encoder,
            middle,
            decoder,
            out,
        };
        if let Some(init) = weight_init {
            generator.init_weights(&init);
        }
        generator
    }
}

/// Inpainting generator: synthesizes the full color image.
///
/// Input is `[B, 4, H, W]` (masked RGB + mask channel); output is
/// `[B, 3, H, W]` squashed into `[0, 1]`. The whole image is generated,
/// visible region included, so the decoder learns global context.
#[derive(Debug)]
pub struct InpaintGenerator {
    encoder: Vec<ConvIn2D>,
    middle: Vec<ResBlock>,
    decoder: Vec<DeconvIn2D>,
    out: ConvIn2D,
}

impl InpaintGenerator {
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let mut ys = xs.shallow_clone();
        for conv in &self.encoder {
            ys = conv.forward_t(&ys, train);
        }
        for block in &self.middle {
            ys = block.forward_t(&ys, train);
        }
        for deconv in &self.decoder {
            ys = deconv.forward_t(&ys, train);
        }
        let ys = self.out.forward_t(&ys, train);

        (ys.tanh() + 1.0) / 2.0
    }

    fn init_weights(&mut self, init: &WeightInit) {
        for conv in &mut self.encoder {
            conv.init_weights(init);
        }
        for block in &mut self.middle {
            block.init_weights(init);
        }
        for deconv in &mut self.decoder {
            deconv.init_weights(init);
        }
        self.out.init_weights(init);
    }
}
