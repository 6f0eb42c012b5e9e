use super::utils;
use crate::{common::*, config::MaskPolicy};

/// Synthesizes occlusion masks (255 = hole).
#[derive(Debug, CopyGetters)]
pub struct MaskSynthesizer {
    #[getset(get_copy = "pub")]
    policy: MaskPolicy,
    mask_files: Vec<PathBuf>,
}

impl MaskSynthesizer {
    /// Policies reading the auxiliary collection are validated up front so a
    /// misconfigured pipeline fails at construction, not mid-epoch.
    pub fn new(
        policy: MaskPolicy,
        mask_files: Vec<PathBuf>,
        num_samples: usize,
    ) -> Result<Self> {
        match policy {
            MaskPolicy::External
            | MaskPolicy::ExternalOrRandomBlock
            | MaskPolicy::ExternalRandomMixed => {
                ensure!(
                    !mask_files.is_empty(),
                    "mask policy {} needs a non-empty mask collection",
                    policy.as_ref()
                );
            }
            MaskPolicy::DeterministicExternal => {
                ensure!(
                    mask_files.len() == num_samples,
                    "deterministic masks need one mask per sample, got {} masks for {} samples",
                    mask_files.len(),
                    num_samples
                );
            }
            MaskPolicy::RandomBlock | MaskPolicy::Half => {}
        }

        Ok(Self { policy, mask_files })
    }

    /// Returns a `[H, W]` float mask with values in {0, 255}.
    pub fn synthesize<R>(
        &self,
        height: i64,
        width: i64,
        index: usize,
        rng: &mut R,
    ) -> Result<Tensor>
    where
        R: Rng,
    {
        self.synthesize_as(self.policy, height, width, index, rng)
    }

    fn synthesize_as<R>(
        &self,
        policy: MaskPolicy,
        height: i64,
        width: i64,
        index: usize,
        rng: &mut R,
    ) -> Result<Tensor>
    where
        R: Rng,
    {
        let mask = match policy {
            MaskPolicy::RandomBlock => block_mask(
                height,
                width,
                height / 2,
                width / 2,
                height / 4,
                width / 4,
            ),
            MaskPolicy::Half => {
                let left = rng.gen::<f64>() < 0.5;
                let x = if left { 0 } else { width / 2 };
                block_mask(height, width, height, width / 2, 0, x)
            }
            MaskPolicy::External => {
                let pick = rng.gen_range(0..self.mask_files.len());
                self.load_external(&self.mask_files[pick], height, width, true)?
            }
            MaskPolicy::ExternalOrRandomBlock => {
                let policy = if rng.gen_bool(0.5) {
                    MaskPolicy::RandomBlock
                } else {
                    MaskPolicy::External
                };
                return self.synthesize_as(policy, height, width, index, rng);
            }
            MaskPolicy::ExternalRandomMixed => {
                let policy = match rng.gen_range(0..3) {
                    0 => MaskPolicy::RandomBlock,
                    1 => MaskPolicy::Half,
                    _ => MaskPolicy::External,
                };
                return self.synthesize_as(policy, height, width, index, rng);
            }
            MaskPolicy::DeterministicExternal => {
                let file = self.mask_files.get(index).ok_or_else(|| {
                    format_err!(
                        "mask index {} out of range ({} masks)",
                        index,
                        self.mask_files.len()
                    )
                })?;
                self.load_external(file, height, width, false)?
            }
        };

        Ok(mask)
    }

    fn load_external(
        &self,
        file: &Path,
        height: i64,
        width: i64,
        center_crop: bool,
    ) -> Result<Tensor> {
        let mask = vision::image::load(file)
            .with_context(|| format!("failed to load mask file {}", file.display()))?;
        let mask = utils::resize(&mask, height, width, center_crop)?;
        let mask = utils::rgb_to_gray(&utils::to_float(&mask));

        // threshold due to interpolation
        Ok(mask.gt(0.0).to_kind(Kind::Float) * 255.0)
    }
}

fn block_mask(height: i64, width: i64, mask_h: i64, mask_w: i64, y: i64, x: i64) -> Tensor {
    let mask = Tensor::zeros(&[height, width], (Kind::Float, Device::Cpu));
    let mut hole = mask.narrow(0, y, mask_h).narrow(1, x, mask_w);
    let _ = hole.fill_(255.0);
    mask
}
