//! Data pipeline configuration format.

use crate::{common::*, dataset::FileList};

/// The data pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Sample image list.
    pub images: FileList,
    /// Pre-computed edge maps, index-aligned with the image list.
    pub edges: Option<FileList>,
    /// Auxiliary occlusion mask collection.
    pub masks: Option<FileList>,
    /// Square output size; 0 keeps the native resolution.
    pub input_size: usize,
    pub sigma: SigmaMode,
    pub edge_source: EdgeSource,
    pub mask_policy: MaskPolicy,
    /// Intersect external edge maps with a fresh detector pass.
    pub nms: bool,
    /// Random horizontal flips.
    pub augment: bool,
    /// Evaluation mode; forces deterministic per-index masks.
    pub evaluation: bool,
    pub batch_size: NonZeroUsize,
    pub seed: Option<u64>,
}

impl DataConfig {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

/// Edge-detector sigma selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigmaMode {
    /// No detected edges at all.
    None,
    /// Draw sigma uniformly from {1, 2, 3, 4} per sample.
    Random,
    Fixed(R64),
}

/// Where sample edge maps come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EdgeSource {
    Canny,
    External,
}

/// Occlusion mask synthesis policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MaskPolicy {
    /// Centered rectangular hole of half the image extent.
    RandomBlock,
    /// Left or right image half, chosen uniformly.
    Half,
    /// A random mask from the auxiliary collection.
    External,
    /// Coin flip between `RandomBlock` and `External`.
    ExternalOrRandomBlock,
    /// Uniform choice among `RandomBlock`, `Half` and `External`.
    ExternalRandomMixed,
    /// The collection mask at exactly the sample index; evaluation only.
    DeterministicExternal,
}
