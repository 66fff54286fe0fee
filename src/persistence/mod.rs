//! Persistence Module
//!
//! AOF (Append-Only File) persistence for durability.

mod aof;

pub use aof::{AofConfig, AofEntry, AofLog, AofSyncMode};

#[cfg(test)]
pub(crate) use aof::WriteFault;
