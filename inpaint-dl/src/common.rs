pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use getset::{CopyGetters, Getters};
pub use itertools::Itertools as _;
pub use log::{info, warn};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::Borrow,
    fmt::Debug,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};
pub use strum::AsRefStr;
pub use tch::{nn, vision, Device, Kind, Tensor};
pub use tch_tensor_like::TensorLike;
