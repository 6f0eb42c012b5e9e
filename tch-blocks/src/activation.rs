use crate::common::*;

/// Activations used by the inpainting blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    /// Leaky ReLU with negative slope 0.2.
    LeakyRelu,
}

impl Activation {
    pub fn forward(&self, xs: &Tensor) -> Tensor {
        match self {
            Self::Linear => xs.shallow_clone(),
            Self::Relu => xs.relu(),
            Self::LeakyRelu => xs.clamp_min(0.0) + xs.clamp_max(0.0) * 0.2,
        }
    }
}

pub trait TensorActivationExt {
    fn activation(&self, act: Activation) -> Tensor;
}

impl TensorActivationExt for Tensor {
    fn activation(&self, act: Activation) -> Tensor {
        act.forward(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaky_relu_slope() {
        let xs = Tensor::of_slice(&[-1.0f32, 0.0, 2.0]);
        let ys = xs.activation(Activation::LeakyRelu);
        let values = Vec::<f32>::from(&ys);
        assert_eq!(values, vec![-0.2, 0.0, 2.0]);
    }
}
