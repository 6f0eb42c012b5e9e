use crate::common::*;
use tch_blocks::{Activation, ConvIn2D, ConvIn2DInit, SpectralNormInit, WeightInit};

#[derive(Debug, Clone)]
pub struct DiscriminatorInit {
    pub in_c: usize,
    pub sigmoid: bool,
    pub spectral: bool,
    pub weight_init: Option<WeightInit>,
}

impl DiscriminatorInit {
    pub fn new(in_c: usize) -> Self {
        Self {
            in_c,
            sigmoid: true,
            spectral: true,
            weight_init: Some(Default::default()),
        }
    }

    pub fn build<'p, P>(self, path: P) -> Discriminator
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_c,
            sigmoid,
            spectral,
            weight_init,
        } = self;
        let spectral = spectral.then(SpectralNormInit::default);

        let stage = |in_c: usize, out_c: usize, s: usize, activation: Activation| ConvIn2DInit {
            s,
            p: 1,
            reflection_pad: true,
            bias: spectral.is_none(),
            spectral: spectral.clone(),
            activation,
            ..ConvIn2DInit::new(in_c, out_c, 4)
        };

        let stages = vec![
            stage(in_c, 64, 2, Activation::LeakyRelu).build(path / "conv1"),
            stage(64, 128, 2, Activation::LeakyRelu).build(path / "conv2"),
            stage(128, 256, 2, Activation::LeakyRelu).build(path / "conv3"),
            stage(256, 512, 2, Activation::LeakyRelu).build(path / "conv4"),
            stage(512, 1, 1, Activation::Linear).build(path / "conv5"),
        ];

        let mut discriminator = Discriminator { stages, sigmoid };
        if let Some(init) = weight_init {
            discriminator.init_weights(&init);
        }
        discriminator
    }
}

/// PatchGAN discriminator shared by the edge and image domains.
///
/// Returns the validity map and all five stage activations; the latter feed
/// the feature-matching loss computed by the training loop.
#[derive(Debug)]
pub struct Discriminator {
    stages: Vec<ConvIn2D>,
    sigmoid: bool,
}

impl Discriminator {
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> (Tensor, Vec<Tensor>) {
        let mut features = vec![];
        let mut ys = xs.shallow_clone();
        for stage in &self.stages {
            ys = stage.forward_t(&ys, train);
            features.push(ys.shallow_clone());
        }

        let output = if self.sigmoid {
            ys.sigmoid()
        } else {
            ys
        };

        (output, features)
    }

    fn init_weights(&mut self, init: &WeightInit) {
        for stage in &mut self.stages {
            stage.init_weights(init);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_validity_map_and_five_features() {
        let vs = nn::VarStore::new(Device::Cpu);
        let discriminator = DiscriminatorInit::new(3).build(&vs.root());

        let xs = Tensor::rand(&[2, 3, 64, 64], (Kind::Float, Device::Cpu));
        let (output, features) = discriminator.forward_t(&xs, true);

        assert_eq!(features.len(), 5);
        // 4 stride-2 stages then a stride-1 stage, kernel 4
        assert_eq!(features[0].size(), vec![2, 64, 32, 32]);
        assert_eq!(features[1].size(), vec![2, 128, 16, 16]);
        assert_eq!(features[2].size(), vec![2, 256, 8, 8]);
        assert_eq!(features[3].size(), vec![2, 512, 4, 4]);
        assert_eq!(features[4].size(), vec![2, 1, 3, 3]);

        // sigmoid validity map
        assert_eq!(output.size(), features[4].size());
        let min = f64::from(output.min());
        let max = f64::from(output.max());
        assert!((0.0..=1.0).contains(&min));
        assert!((0.0..=1.0).contains(&max));
    }

    #[test]
    fn edge_domain_input_channels() {
        let vs = nn::VarStore::new(Device::Cpu);
        let discriminator = DiscriminatorInit::new(2).build(&vs.root());
        let xs = Tensor::rand(&[1, 2, 32, 32], (Kind::Float, Device::Cpu));
        let (output, features) = discriminator.forward_t(&xs, false);
        assert_eq!(features.len(), 5);
        assert_eq!(output.size()[1], 1);
    }
}
