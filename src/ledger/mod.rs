//! Ledger module: read-side projection and statement generation

pub mod projection;
pub mod statements;

pub use projection::*;
pub use statements::*;
