use crate::{common::*, WeightInit};

#[derive(Debug, Clone)]
pub struct InstanceNormInit {
    pub eps: R64,
    pub momentum: R64,
    pub cudnn_enabled: bool,
    pub track_running_stats: bool,
    pub ws_init: Option<nn::Init>,
    pub bs_init: Option<nn::Init>,
}

impl Default for InstanceNormInit {
    fn default() -> Self {
        Self {
            eps: r64(1e-5),
            momentum: r64(0.1),
            track_running_stats: false,
            cudnn_enabled: true,
            ws_init: None,
            bs_init: None,
        }
    }
}

impl InstanceNormInit {
    pub fn build<'a>(self, path: impl Borrow<nn::Path<'a>>, out_dim: i64) -> InstanceNorm {
        let path = path.borrow();
        let Self {
            eps,
            momentum,
            track_running_stats,
            cudnn_enabled,
            ws_init,
            bs_init,
        } = self;

        let ws = ws_init.map(|init| path.var("weight", &[out_dim], init));
        let bs = bs_init.map(|init| path.var("bias", &[out_dim], init));

        InstanceNorm {
            running_mean: path.zeros_no_train("running_mean", &[out_dim]),
            running_var: path.ones_no_train("running_var", &[out_dim]),
            ws,
            bs,
            cudnn_enabled,
            track_running_stats,
            eps: eps.raw(),
            momentum: momentum.raw(),
        }
    }
}

#[derive(Debug)]
pub struct InstanceNorm {
    running_mean: Tensor,
    running_var: Tensor,
    ws: Option<Tensor>,
    bs: Option<Tensor>,
    cudnn_enabled: bool,
    track_running_stats: bool,
    eps: f64,
    momentum: f64,
}

impl nn::ModuleT for InstanceNorm {
    fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        let Self {
            ref running_mean,
            ref running_var,
            ref ws,
            ref bs,
            momentum,
            eps,
            cudnn_enabled,
            track_running_stats,
            ..
        } = *self;

        let output = Tensor::instance_norm(
            input,
            ws.as_ref(),
            bs.as_ref(),
            Some(running_mean),
            Some(running_var),
            !track_running_stats || train,
            momentum,
            eps,
            cudnn_enabled,
        );

        #[cfg(debug_assertions)]
        {
            static SMALL_SCALING_WARN: Once = Once::new();

            let has_small_ws = ws
                .as_ref()
                .map(|ws| bool::from(ws.abs().le(1e-15).any()))
                .unwrap_or(false);

            if has_small_ws {
                SMALL_SCALING_WARN.call_once(|| {
                    warn!(
                        "scaling factor {} is too small",
                        f64::from(ws.as_ref().unwrap().abs().min())
                    );
                });
            }
        }

        output
    }
}

impl InstanceNorm {
    pub fn init_weights(&mut self, init: &WeightInit) {
        let Self { ws, bs, .. } = self;
        if let Some(ws) = ws {
            init.init_norm(ws, bs.as_mut());
        }
    }
}
