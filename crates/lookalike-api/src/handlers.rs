//! Request handlers.

pub mod health;
pub mod images;
pub mod upload;

pub use health::*;
pub use images::*;
pub use upload::*;
