//! LeuFX Common Types
//!
//! Shared types for the LeuFX exchange-rate engine: validated currency codes,
//! the static currency registry, monetary amounts and the clock abstraction.

pub mod currency;
pub mod registry;
pub mod monetary;
pub mod error;
pub mod time;

pub use currency::*;
pub use registry::*;
pub use monetary::*;
pub use error::*;
pub use time::*;
