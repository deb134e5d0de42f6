//! Journal module containing the entry store and the fiscal period manager

pub mod entry;
pub mod period;

pub use entry::*;
pub use period::*;
