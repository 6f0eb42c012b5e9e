use crate::common::*;
use tch_blocks::{
    Activation, ConvIn2D, ConvIn2DInit, DeconvIn2D, DeconvIn2DInit, ResBlock, ResBlockInit,
    RhoClipper, SpectralNormInit, UpConvIln2D, UpConvIln2DInit, WeightInit,
};

/// Which decoder path the edge generator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDecoder {
    /// Transposed-convolution decoder with instance normalization.
    Transposed,
    /// Nearest-upsample decoder with ILN.
    Upsample,
}

#[derive(Debug, Clone)]
pub struct EdgeGeneratorInit {
    pub residual_blocks: usize,
    pub spectral: bool,
    pub weight_init: Option<WeightInit>,
}

impl Default for EdgeGeneratorInit {
    fn default() -> Self {
        Self {
            residual_blocks: 8,
            spectral: true,
            weight_init: Some(Default::default()),
        }
    }
}

impl EdgeGeneratorInit {
    pub fn build<'p, P>(self, path: P) -> EdgeGenerator
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            residual_blocks,
            spectral,
            weight_init,
        } = self;
        let spectral = spectral.then(SpectralNormInit::default);

        let encoder = vec![
            ConvIn2DInit {
                p: 3,
                reflection_pad: true,
                spectral: spectral.clone(),
                ..ConvIn2DInit::new(3, 64, 7)
            }
            .build(path / "encoder0"),
            ConvIn2DInit {
                s: 2,
                p: 1,
                spectral: spectral.clone(),
                instance_norm: Some(Default::default()),
                ..ConvIn2DInit::new(64, 128, 4)
            }
            .build(path / "encoder1"),
            ConvIn2DInit {
                s: 2,
                p: 1,
                spectral: spectral.clone(),
                instance_norm: Some(Default::default()),
                ..ConvIn2DInit::new(128, 256, 4)
            }
            .build(path / "encoder2"),
        ];

        let middle: Vec<_> = (0..residual_blocks)
            .map(|index| {
                ResBlockInit {
                    dilation: 2,
                    spectral: spectral.clone(),
                    ..ResBlockInit::new(256)
                }
                .build(path / format!("middle{}", index))
            })
            .collect();

        let decoder = TransposedDecoder {
            deconv1: DeconvIn2DInit {
                s: 2,
                p: 1,
                spectral: spectral.clone(),
                instance_norm: Some(Default::default()),
                ..DeconvIn2DInit::new(256, 128, 4)
            }
            .build(path / "decoder0"),
            deconv2: DeconvIn2DInit {
                s: 2,
                p: 1,
                spectral: spectral.clone(),
                instance_norm: Some(Default::default()),
                ..DeconvIn2DInit::new(128, 64, 4)
            }
            .build(path / "decoder1"),
            out: out_conv(path / "decoder2"),
        };

        let alter = UpsampleDecoder {
            up1: UpConvIln2DInit {
                spectral: spectral.clone(),
                ..UpConvIln2DInit::new(256, 128, 3)
            }
            .build(path / "alter0"),
            up2: UpConvIln2DInit {
                spectral,
                ..UpConvIln2DInit::new(128, 64, 3)
            }
            .build(path / "alter1"),
            out: out_conv(path / "alter2"),
        };

        let mut generator = EdgeGenerator {
            encoder,
            middle,
            decoder,
            alter,
        };
        if let Some(init) = weight_init {
            generator.init_weights(&init);
        }
        generator
    }
}

fn out_conv<'p, P>(path: P) -> ConvIn2D
where
    P: Borrow<nn::Path<'p>>,
{
    ConvIn2DInit {
        p: 3,
        reflection_pad: true,
        activation: Activation::Linear,
        ..ConvIn2DInit::new(64, 1, 7)
    }
    .build(path)
}

#[derive(Debug)]
struct TransposedDecoder {
    deconv1: DeconvIn2D,
    deconv2: DeconvIn2D,
    out: ConvIn2D,
}

#[derive(Debug)]
struct UpsampleDecoder {
    up1: UpConvIln2D,
    up2: UpConvIln2D,
    out: ConvIn2D,
}

/// Edge generator: hallucinates edges inside the hole.
///
/// Input is `[B, 3, H, W]` (masked grayscale, masked edge, mask). The
/// sigmoid output is added to channel 1 of the input, so known edges pass
/// through at full strength and only the hole is predicted.
#[derive(Debug)]
pub struct EdgeGenerator {
    encoder: Vec<ConvIn2D>,
    middle: Vec<ResBlock>,
    decoder: TransposedDecoder,
    alter: UpsampleDecoder,
}

impl EdgeGenerator {
    pub fn forward_t(&self, xs: &Tensor, decoder: EdgeDecoder, train: bool) -> Tensor {
        let masked_edge = xs.chunk(3, 1).swap_remove(1);

        let mut ys = xs.shallow_clone();
        for conv in &self.encoder {
            ys = conv.forward_t(&ys, train);
        }
        for block in &self.middle {
            ys = block.forward_t(&ys, train);
        }

        let ys = match decoder {
            EdgeDecoder::Transposed => {
                let ys = self.decoder.deconv1.forward_t(&ys, train);
                let ys = self.decoder.deconv2.forward_t(&ys, train);
                self.decoder.out.forward_t(&ys, train)
            }
            EdgeDecoder::Upsample => {
                let ys = self.alter.up1.forward_t(&ys, train);
                let ys = self.alter.up2.forward_t(&ys, train);
                self.alter.out.forward_t(&ys, train)
            }
        };

        ys.sigmoid() + masked_edge
    }

    /// Clamp the ILN gates of the upsample decoder; invoked by the training
    /// loop after each optimizer step.
    pub fn clamp_rho(&mut self, clipper: &RhoClipper) {
        self.alter.up1.clamp_rho(clipper);
        self.alter.up2.clamp_rho(clipper);
    }

    fn init_weights(&mut self, init: &WeightInit) {
        for conv in &mut self.encoder {
            conv.init_weights(init);
        }
        for block in &mut self.middle {
            block.init_weights(init);
        }
        self.decoder.deconv1.init_weights(init);
        self.decoder.deconv2.init_weights(init);
        self.decoder.out.init_weights(init);
        self.alter.up1.init_weights(init);
        self.alter.up2.init_weights(init);
        self.alter.out.init_weights(init);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_decoders_preserve_spatial_size() {
        let vs = nn::VarStore::new(Device::Cpu);
        let generator = EdgeGeneratorInit {
            residual_blocks: 2,
            ..Default::default()
        }
        .build(&vs.root());

        let xs = Tensor::rand(&[2, 3, 32, 32], (Kind::Float, Device::Cpu));
        for decoder in [EdgeDecoder::Transposed, EdgeDecoder::Upsample] {
            let ys = generator.forward_t(&xs, decoder, true);
            assert_eq!(ys.size(), vec![2, 1, 32, 32]);
        }
    }

    #[test]
    fn known_edges_pass_through() {
        let vs = nn::VarStore::new(Device::Cpu);
        let generator = EdgeGeneratorInit {
            residual_blocks: 1,
            ..Default::default()
        }
        .build(&vs.root());

        // channel 1 carries the masked edge map
        let xs = Tensor::zeros(&[1, 3, 16, 16], (Kind::Float, Device::Cpu));
        let mut edge_channel = xs.narrow(1, 1, 1);
        let _ = edge_channel.fill_(1.0);

        let ys = generator.forward_t(&xs, EdgeDecoder::Upsample, false);
        // sigmoid output is nonnegative, so known edges stay >= 1
        let min = f64::from(ys.min());
        assert!(min >= 1.0 - 1e-6, "known edge dropped to {}", min);
    }

    #[test]
    fn rho_clamp_walks_the_upsample_decoder() {
        let vs = nn::VarStore::new(Device::Cpu);
        let mut generator = EdgeGeneratorInit {
            residual_blocks: 1,
            ..Default::default()
        }
        .build(&vs.root());

        let clipper = RhoClipper::new(0.0, 1.0).unwrap();
        generator.clamp_rho(&clipper);
    }
}
