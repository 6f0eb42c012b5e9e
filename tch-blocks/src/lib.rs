//! Reusable tch building blocks shared by the inpainting networks.

mod activation;
mod common;
mod conv_in_2d;
mod deconv_in_2d;
mod iln;
mod instance_norm;
mod res_block;
mod spectral;
mod up_conv_iln_2d;
mod weight_init;

pub use activation::*;
pub use conv_in_2d::*;
pub use deconv_in_2d::*;
pub use iln::*;
pub use instance_norm::*;
pub use res_block::*;
pub use spectral::*;
pub use up_conv_iln_2d::*;
pub use weight_init::*;
