//! Sample pipeline: file lists, mask synthesis, edge extraction, batching.

mod dataset_;
mod edge;
mod file_list;
mod mask;
mod streaming;
mod utils;

pub use dataset_::*;
pub use edge::*;
pub use file_list::*;
pub use mask::*;
pub use streaming::*;
pub use utils::*;
