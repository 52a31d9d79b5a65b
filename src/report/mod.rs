//! Output of expansion results.
//!
//! The CSV writer lives in [`writer`]; this module also renders the
//! per-block summary logged after a run and the dry-run plan.

pub mod writer;

pub use writer::*;

use crate::expand::Expansion;
use crate::models::{BlockLimit, Cidr};

/// Dry-run view of a batch: what each block would expand to.
#[derive(Debug)]
pub struct Plan {
    pub lines: Vec<String>,
    /// Addresses across the blocks that would be expanded; `None` once the
    /// sum no longer fits in a `u128`.
    pub total: Option<u128>,
    /// Blocks that are invalid or over the limit.
    pub rejected: usize,
}

impl Plan {
    pub fn total_display(&self) -> String {
        self.total
            .map_or_else(|| "more than 2^128".to_string(), |t| t.to_string())
    }
}

/// Describe every block without expanding it.
pub fn plan(cidrs: &[String], limit: BlockLimit) -> Plan {
    let mut plan = Plan {
        lines: Vec::new(),
        total: Some(0),
        rejected: 0,
    };

    for cidr in cidrs {
        match cidr.parse::<Cidr>() {
            Ok(block) => {
                let size = block.size();
                let count = size.map_or_else(|| "2^128".to_string(), |s| s.to_string());
                let mut line = format!(
                    "{} -> {} .. {} ({} addresses)",
                    cidr,
                    block.base(),
                    block.last(),
                    count
                );
                if limit.allows(size) {
                    plan.total = plan.total.zip(size).and_then(|(t, s)| t.checked_add(s));
                } else {
                    line.push_str(" exceeds limit");
                    plan.rejected += 1;
                }
                plan.lines.push(line);
            }
            Err(e) => {
                plan.rejected += 1;
                plan.lines.push(format!("{} -> {}", cidr, e));
            }
        }
    }

    plan
}

/// One line per block, in input order: expression, address count, time.
/// Failed blocks are listed with their error.
pub fn summary_lines(expansion: &Expansion) -> Vec<String> {
    let mut rows: Vec<(usize, String)> = expansion
        .blocks
        .iter()
        .map(|b| {
            (
                b.index,
                format!(
                    "{}: {} addresses ({:.1}ms)",
                    b.cidr,
                    b.addresses.len(),
                    b.elapsed.as_secs_f64() * 1000.0
                ),
            )
        })
        .chain(
            expansion
                .failures
                .iter()
                .map(|f| (f.index, format!("{}: failed: {}", f.cidr, f.error))),
        )
        .collect();

    rows.sort_by_key(|(index, _)| *index);
    rows.into_iter().map(|(_, line)| line).collect()
}
