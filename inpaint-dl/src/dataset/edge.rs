use super::utils;
use crate::{
    canny,
    common::*,
    config::{EdgeSource, SigmaMode},
};

/// Produces the edge channel for a sample.
#[derive(Debug, CopyGetters)]
pub struct EdgeExtractor {
    #[getset(get_copy = "pub")]
    source: EdgeSource,
    sigma: SigmaMode,
    nms: bool,
    training: bool,
    edge_files: Vec<PathBuf>,
}

impl EdgeExtractor {
    pub fn new(
        source: EdgeSource,
        sigma: SigmaMode,
        nms: bool,
        training: bool,
        edge_files: Vec<PathBuf>,
        num_samples: usize,
    ) -> Result<Self> {
        if source == EdgeSource::External {
            ensure!(
                edge_files.len() == num_samples,
                "external edges need one edge map per sample, got {} for {} samples",
                edge_files.len(),
                num_samples
            );
            if nms {
                ensure!(
                    sigma != SigmaMode::None,
                    "non-max suppression of external edges needs a detector sigma"
                );
            }
        }

        Ok(Self {
            source,
            sigma,
            nms,
            training,
            edge_files,
        })
    }

    /// `gray` is `[H, W]` float in `[0, 1]`; `mask` is `[H, W]` float in
    /// {0, 255}. Returns a `[H, W]` float edge map in `[0, 1]`.
    pub fn extract<R>(&self, gray: &Tensor, index: usize, mask: &Tensor, rng: &mut R) -> Result<Tensor>
    where
        R: Rng,
    {
        match self.source {
            EdgeSource::Canny => self.detect(gray, mask, rng),
            EdgeSource::External => {
                let size = gray.size();
                let (height, width) = (size[0], size[1]);

                let file = self.edge_files.get(index).ok_or_else(|| {
                    format_err!(
                        "edge index {} out of range ({} edge maps)",
                        index,
                        self.edge_files.len()
                    )
                })?;
                let edge = vision::image::load(file)
                    .with_context(|| format!("failed to load edge file {}", file.display()))?;
                let edge = utils::resize(&edge, height, width, true)?;
                let edge = utils::rgb_to_gray(&utils::to_float(&edge));

                if self.nms {
                    let detected = self.detect(gray, mask, rng)?;
                    Ok(edge * detected)
                } else {
                    Ok(edge)
                }
            }
        }
    }

    fn detect<R>(&self, gray: &Tensor, mask: &Tensor, rng: &mut R) -> Result<Tensor>
    where
        R: Rng,
    {
        let sigma = match self.sigma {
            SigmaMode::None => {
                return Ok(Tensor::zeros(&gray.size(), (Kind::Float, gray.device())));
            }
            SigmaMode::Random => rng.gen_range(1..=4) as f64,
            SigmaMode::Fixed(sigma) => sigma.raw(),
        };

        // the detector must not see ground truth inside the hole during
        // training, else the generator learns to copy leaked structure
        let detection_mask = if self.training {
            Some(mask * -1.0 / 255.0 + 1.0)
        } else {
            None
        };

        canny::canny(gray, sigma, detection_mask.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaskPolicy;
    use crate::dataset::MaskSynthesizer;

    #[test]
    fn no_edge_policy_returns_zeros() {
        let extractor =
            EdgeExtractor::new(EdgeSource::Canny, SigmaMode::None, false, true, vec![], 0)
                .unwrap();
        let gray = Tensor::rand(&[32, 32], (Kind::Float, Device::Cpu));
        let mask = Tensor::zeros(&[32, 32], (Kind::Float, Device::Cpu));
        let mut rng = StdRng::seed_from_u64(0);

        let edge = extractor.extract(&gray, 0, &mask, &mut rng).unwrap();
        assert_eq!(edge.size(), vec![32, 32]);
        assert_eq!(f64::from(edge.sum(Kind::Float)), 0.0);
    }

    #[test]
    fn training_masks_hole_edges() {
        // a sharp step hidden entirely inside the hole
        let gray = Tensor::zeros(&[64, 64], (Kind::Float, Device::Cpu));
        let mut right = gray.narrow(1, 32, 32);
        let _ = right.fill_(1.0);

        let synth = MaskSynthesizer::new(MaskPolicy::RandomBlock, vec![], 0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mask = synth.synthesize(64, 64, 0, &mut rng).unwrap();

        let extractor = EdgeExtractor::new(
            EdgeSource::Canny,
            SigmaMode::Fixed(r64(1.0)),
            false,
            true,
            vec![],
            0,
        )
        .unwrap();
        let edge = extractor.extract(&gray, 0, &mask, &mut rng).unwrap();

        // no edge pixels inside the hole
        let hole = edge.narrow(0, 16, 32).narrow(1, 16, 32);
        assert_eq!(f64::from(hole.sum(Kind::Float)), 0.0);

        // evaluation mode sees the full image
        let extractor = EdgeExtractor::new(
            EdgeSource::Canny,
            SigmaMode::Fixed(r64(1.0)),
            false,
            false,
            vec![],
            0,
        )
        .unwrap();
        let edge = extractor.extract(&gray, 0, &mask, &mut rng).unwrap();
        let hole = edge.narrow(0, 16, 32).narrow(1, 16, 32);
        assert!(f64::from(hole.sum(Kind::Float)) > 0.0);
    }

    #[test]
    fn nms_without_sigma_fails_fast() {
        let result = EdgeExtractor::new(
            EdgeSource::External,
            SigmaMode::None,
            true,
            true,
            vec![PathBuf::new()],
            1,
        );
        assert!(result.is_err());
    }
}
