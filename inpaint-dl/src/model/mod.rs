//! Generator and discriminator networks.

mod discriminator;
mod edge_generator;
mod inpaint_generator;

pub use discriminator::*;
pub use edge_generator::*;
pub use inpaint_generator::*;
