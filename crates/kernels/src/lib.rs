//! Attention kernel primitives for AttnForge.

pub mod attention;
pub mod config;
pub mod error;
pub mod matmul;
pub mod multihead;
pub mod registry;
pub mod softmax;
pub mod utils;

pub use attention::*;
pub use config::*;
pub use error::*;
pub use matmul::*;
pub use multihead::*;
pub use registry::*;
pub use softmax::*;
pub use utils::*;
