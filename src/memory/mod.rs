//! Memory accounting: per-space allocation ledgers and process peak memory.

pub mod ledger;
pub mod process;
pub mod space;

pub use ledger::{Allocation, AllocationKey, AllocationLedger, SpaceLedgers};
pub use process::peak_rss_kb;
pub use space::{MemorySpace, NSPACES};
