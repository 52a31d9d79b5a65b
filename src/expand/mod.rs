//! CIDR expansion.
//!
//! [`expand_cidr`] enumerates a single block; the [`aggregator`] module
//! fans several blocks out over worker tasks and collects their results.

pub mod aggregator;

pub use aggregator::*;

use crate::error::{Error, Result};
use crate::models::{BlockLimit, Cidr};
use tracing::debug;

/// Preallocation cap for unlimited blocks; larger blocks grow on demand.
const MAX_PREALLOCATED: u128 = 1 << 24;

/// Expand one CIDR expression into every address it contains.
///
/// Network and broadcast addresses are included. The expression is
/// validated completely before the first address is produced.
pub fn expand_cidr(cidr: &str, limit: BlockLimit) -> Result<Vec<String>> {
    let block: Cidr = cidr.parse()?;

    let size = block.size();
    if !limit.allows(size) {
        return Err(Error::BlockTooLarge {
            cidr: cidr.to_string(),
            size: size.map_or_else(|| "2^128".to_string(), |s| s.to_string()),
            limit: limit.0,
        });
    }

    let capacity = size.map_or(MAX_PREALLOCATED, |s| s.min(MAX_PREALLOCATED));
    let mut addresses = Vec::with_capacity(capacity as usize);
    let mut cursor = block.base();
    loop {
        addresses.push(cursor.to_string());
        match cursor.increment() {
            Some(next) if block.contains(&next) => cursor = next,
            _ => break,
        }
    }

    debug!("Expanded {} into {} addresses", block, addresses.len());
    Ok(addresses)
}
