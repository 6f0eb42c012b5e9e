use super::{utils, EdgeExtractor, FileList, MaskSynthesizer};
use crate::{
    common::*,
    config::{DataConfig, MaskPolicy},
};

/// One pipeline sample: spatially aligned float tensors.
///
/// `image` is `[3, H, W]` in `[0, 1]`; `gray` and `edge` are `[1, H, W]` in
/// `[0, 1]`; `mask` is `[1, H, W]` with values in {0, 255}.
#[derive(Debug, TensorLike)]
pub struct SampleRecord {
    pub image: Tensor,
    pub gray: Tensor,
    pub edge: Tensor,
    pub mask: Tensor,
}

/// The face-inpainting dataset.
///
/// `load` touches only index-local state and caller-owned randomness, so it
/// may be called concurrently from prefetch workers.
#[derive(Debug, Getters)]
pub struct InpaintDataset {
    /// Ordered sample image paths.
    #[getset(get = "pub")]
    images: Vec<PathBuf>,
    masks: MaskSynthesizer,
    edges: EdgeExtractor,
    input_size: i64,
    augment: bool,
}

impl InpaintDataset {
    pub fn new(config: &DataConfig) -> Result<Self> {
        let DataConfig {
            ref images,
            ref edges,
            ref masks,
            input_size,
            sigma,
            edge_source,
            mask_policy,
            nms,
            augment,
            evaluation,
            ..
        } = *config;

        let images = images.load()?;
        ensure!(!images.is_empty(), "empty image list");
        let edge_files = edges
            .as_ref()
            .map(FileList::load)
            .transpose()?
            .unwrap_or_default();
        let mask_files = masks
            .as_ref()
            .map(FileList::load)
            .transpose()?
            .unwrap_or_default();

        // evaluation keeps a one-to-one mask/image correspondence
        let mask_policy = if evaluation {
            MaskPolicy::DeterministicExternal
        } else {
            mask_policy
        };

        let masks = MaskSynthesizer::new(mask_policy, mask_files, images.len())?;
        let edges = EdgeExtractor::new(
            edge_source,
            sigma,
            nms,
            !evaluation,
            edge_files,
            images.len(),
        )?;

        info!(
            "loaded {} samples, mask policy {}",
            images.len(),
            masks.policy().as_ref()
        );

        Ok(Self {
            images,
            masks,
            edges,
            input_size: input_size as i64,
            augment,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// File name of the indexed sample.
    pub fn name(&self, index: usize) -> Result<&str> {
        let path = self
            .images
            .get(index)
            .ok_or_else(|| format_err!("sample index {} out of range", index))?;
        path.file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format_err!("invalid file name {}", path.display()))
    }

    pub fn load<R>(&self, index: usize, rng: &mut R) -> Result<SampleRecord>
    where
        R: Rng,
    {
        let path = self.images.get(index).ok_or_else(|| {
            format_err!(
                "sample index {} out of range ({} samples)",
                index,
                self.images.len()
            )
        })?;

        let image = utils::load_image(path)?;
        let image = if self.input_size != 0 {
            utils::resize(&image, self.input_size, self.input_size, true)?
        } else {
            image
        };

        let image = utils::to_float(&image);
        let gray = utils::rgb_to_gray(&image);

        let size = gray.size();
        let (height, width) = (size[0], size[1]);

        let mask = self.masks.synthesize(height, width, index, rng)?;
        let edge = self.edges.extract(&gray, index, &mask, rng)?;

        let mut record = SampleRecord {
            image,
            gray: gray.unsqueeze(0),
            edge: edge.unsqueeze(0),
            mask: mask.unsqueeze(0),
        };

        if self.augment && rng.gen_bool(0.5) {
            record = SampleRecord {
                image: utils::hflip(&record.image),
                gray: utils::hflip(&record.gray),
                edge: utils::hflip(&record.edge),
                mask: utils::hflip(&record.mask),
            };
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EdgeSource, SigmaMode};

    fn white_image_file(name: &str, side: i64) -> PathBuf {
        let dir = std::env::temp_dir().join("inpaint-dl-dataset-test");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join(name);

        let image = Tensor::full(&[3, side, side], 255, (Kind::Uint8, Device::Cpu));
        vision::image::save(&image, &file).unwrap();
        file
    }

    fn white_config(file: PathBuf, input_size: usize) -> DataConfig {
        DataConfig {
            images: FileList::Paths(vec![file]),
            edges: None,
            masks: None,
            input_size,
            sigma: SigmaMode::None,
            edge_source: EdgeSource::Canny,
            mask_policy: MaskPolicy::RandomBlock,
            nms: false,
            augment: false,
            evaluation: false,
            batch_size: NonZeroUsize::new(1).unwrap(),
            seed: Some(0),
        }
    }

    #[test]
    fn white_image_block_mask_no_edges() {
        let file = white_image_file("white256.png", 256);
        let dataset = InpaintDataset::new(&white_config(file, 256)).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let record = dataset.load(0, &mut rng).unwrap();
        assert_eq!(record.image.size(), vec![3, 256, 256]);
        assert_eq!(record.gray.size(), vec![1, 256, 256]);
        assert_eq!(record.edge.size(), vec![1, 256, 256]);
        assert_eq!(record.mask.size(), vec![1, 256, 256]);

        // no edges at all
        assert_eq!(f64::from(record.edge.sum(Kind::Float)), 0.0);

        // a centered 128x128 hole of 255 in a field of 0
        let mask = record.mask.reshape(&[256, 256]);
        assert_eq!(f64::from(mask.sum(Kind::Float)) / 255.0, 128.0 * 128.0);
        let center = mask.narrow(0, 64, 128).narrow(1, 64, 128);
        assert_eq!(f64::from(center.sum(Kind::Float)) / 255.0, 128.0 * 128.0);
    }

    #[test]
    fn configured_size_is_respected() {
        let file = white_image_file("white100.png", 100);
        for size in [32usize, 64] {
            let dataset = InpaintDataset::new(&white_config(file.clone(), size)).unwrap();
            let mut rng = StdRng::seed_from_u64(0);
            let record = dataset.load(0, &mut rng).unwrap();

            let side = size as i64;
            assert_eq!(record.image.size(), vec![3, side, side]);
            assert_eq!(record.gray.size(), vec![1, side, side]);
            assert_eq!(record.edge.size(), vec![1, side, side]);
            assert_eq!(record.mask.size(), vec![1, side, side]);
        }
    }

    #[test]
    fn missing_file_fails_load() {
        let file = white_image_file("white32.png", 32);
        let mut config = white_config(file, 32);
        config.images = FileList::Paths(vec![PathBuf::from("/nonexistent/missing.png")]);

        let dataset = InpaintDataset::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(dataset.load(0, &mut rng).is_err());
    }

    #[test]
    fn evaluation_forces_deterministic_masks() {
        let file = white_image_file("white64.png", 64);
        let mut config = white_config(file, 64);
        config.evaluation = true;

        // no index-aligned mask collection: construction must fail fast
        assert!(InpaintDataset::new(&config).is_err());
    }

    #[test]
    fn sample_names_are_file_names() {
        let file = white_image_file("named.png", 32);
        let dataset = InpaintDataset::new(&white_config(file, 32)).unwrap();
        assert_eq!(dataset.name(0).unwrap(), "named.png");
        assert!(dataset.name(1).is_err());
    }
}
