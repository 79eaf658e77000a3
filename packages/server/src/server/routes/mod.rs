// HTTP routes
pub mod analysis;
pub mod documents;
pub mod health;
pub mod verify;

pub use analysis::*;
pub use documents::*;
pub use health::*;
pub use verify::*;
