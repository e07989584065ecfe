pub mod action;
pub mod constants;
pub mod error;
pub mod types;

pub use action::*;
pub use constants::*;
pub use error::VedexError;
pub use types::*;
