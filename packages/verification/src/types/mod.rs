//! Data types shared by every verification layer.

pub mod citation;
pub mod config;
pub mod findings;
pub mod layer;
pub mod result;

pub use citation::*;
pub use config::*;
pub use findings::*;
pub use layer::*;
pub use result::*;
