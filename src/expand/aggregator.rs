//! Parallel expansion of several CIDR blocks.
//!
//! Every block gets its own blocking task. Tasks deliver their whole
//! address list on a bounded channel sized to the number of blocks, so a
//! worker never waits on the collector. A supervisor task owns the last
//! sender: it joins every worker and then drops the sender, which closes
//! the channel and ends the collection loop.

use super::expand_cidr;
use crate::error::{Error, Result};
use crate::models::{BlockLimit, ErrorPolicy};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Options for a batch expansion.
#[derive(Debug, Clone, Copy)]
pub struct ExpandOptions {
    /// Per-block address limit.
    pub limit: BlockLimit,
    /// Show a progress bar on stderr while blocks complete.
    pub show_progress: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            limit: BlockLimit::UNLIMITED,
            show_progress: false,
        }
    }
}

/// Addresses produced for one input block.
#[derive(Debug, Clone)]
pub struct ExpandedBlock {
    /// Position of the block in the input.
    pub index: usize,
    /// The expression as supplied.
    pub cidr: String,
    pub addresses: Vec<String>,
    pub elapsed: Duration,
}

/// A block that produced no addresses.
#[derive(Debug)]
pub struct FailedBlock {
    pub index: usize,
    pub cidr: String,
    pub error: Error,
}

type BlockOutcome = std::result::Result<ExpandedBlock, FailedBlock>;

/// Collected result of [`expand_all`].
///
/// `blocks` is in completion order, which is not necessarily input order.
#[derive(Debug, Default)]
pub struct Expansion {
    pub blocks: Vec<ExpandedBlock>,
    pub failures: Vec<FailedBlock>,
}

impl Expansion {
    /// Total number of addresses across all successful blocks.
    pub fn total_addresses(&self) -> usize {
        self.blocks.iter().map(|b| b.addresses.len()).sum()
    }

    /// True when no block failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Concatenate every block's addresses into one list.
    pub fn into_addresses(self) -> Vec<String> {
        let mut all = Vec::with_capacity(self.total_addresses());
        for block in self.blocks {
            all.extend(block.addresses);
        }
        all
    }

    /// Apply `policy` to the failures.
    ///
    /// Under [`ErrorPolicy::Strict`] any failure discards the whole batch and
    /// returns [`Error::BatchFailed`] carrying the failure of the earliest
    /// input. Under [`ErrorPolicy::BestEffort`] the expansion is returned as is.
    pub fn resolve(mut self, policy: ErrorPolicy) -> Result<Self> {
        if self.failures.is_empty() || policy == ErrorPolicy::BestEffort {
            return Ok(self);
        }

        let failed = self.failures.len();
        let total = failed + self.blocks.len();
        self.failures.sort_by_key(|f| f.index);
        let first = self.failures.remove(0).error;

        Err(Error::BatchFailed {
            failed,
            total,
            first: Box::new(first),
        })
    }
}

/// Expand every expression concurrently, one task per expression.
///
/// A failing block is logged from inside its task and recorded in
/// [`Expansion::failures`]; it never cancels the other tasks.
pub async fn expand_all(cidrs: &[String], options: &ExpandOptions) -> Expansion {
    if cidrs.is_empty() {
        return Expansion::default();
    }

    let total = cidrs.len();
    let (tx, mut rx) = mpsc::channel::<BlockOutcome>(total);

    let mut workers = Vec::with_capacity(total);
    for (index, cidr) in cidrs.iter().enumerate() {
        let worker_tx = tx.clone();
        let worker_cidr = cidr.clone();
        let limit = options.limit;
        let handle = tokio::task::spawn_blocking(move || {
            expand_block(index, worker_cidr, limit, worker_tx)
        });
        workers.push((index, cidr.clone(), handle));
    }
    debug!("Dispatched {} expansion tasks", total);

    let supervisor = tokio::spawn(supervise(workers, tx));

    let progress = progress_bar(total, options.show_progress);
    let mut expansion = Expansion::default();

    while let Some(outcome) = rx.recv().await {
        match outcome {
            Ok(block) => {
                progress.set_message(block.cidr.clone());
                expansion.blocks.push(block);
            }
            Err(failure) => expansion.failures.push(failure),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if let Err(e) = supervisor.await {
        error!("Expansion supervisor failed: {}", e);
    }

    info!(
        "Expanded {} of {} blocks into {} addresses",
        expansion.blocks.len(),
        total,
        expansion.total_addresses()
    );

    expansion
}

/// Worker body: expand one block and deliver the outcome.
fn expand_block(index: usize, cidr: String, limit: BlockLimit, tx: mpsc::Sender<BlockOutcome>) {
    let started = Instant::now();

    let outcome = match expand_cidr(&cidr, limit) {
        Ok(addresses) => {
            debug!("{} -> {} addresses", cidr, addresses.len());
            Ok(ExpandedBlock {
                index,
                cidr,
                addresses,
                elapsed: started.elapsed(),
            })
        }
        Err(e) => {
            error!("{}", e);
            Err(FailedBlock {
                index,
                cidr,
                error: e,
            })
        }
    };

    if tx.blocking_send(outcome).is_err() {
        debug!("Collector closed before block {} was delivered", index);
    }
}

/// Join every worker, report the ones that died, then release the last
/// sender so the collector sees the channel close.
async fn supervise(
    workers: Vec<(usize, String, JoinHandle<()>)>,
    tx: mpsc::Sender<BlockOutcome>,
) {
    let (labels, handles): (Vec<_>, Vec<_>) = workers
        .into_iter()
        .map(|(index, cidr, handle)| ((index, cidr), handle))
        .unzip();

    let results = join_all(handles).await;
    let count = results.len();

    for ((index, cidr), result) in labels.into_iter().zip(results) {
        if let Err(e) = result {
            error!("Expansion task for {} did not complete: {}", cidr, e);
            let failure = FailedBlock {
                index,
                cidr: cidr.clone(),
                error: Error::TaskFailed {
                    cidr,
                    details: e.to_string(),
                },
            };
            if tx.send(Err(failure)).await.is_err() {
                debug!("Collector closed before task failure was delivered");
            }
        }
    }

    debug!("All {} expansion tasks finished", count);
    drop(tx);
}

fn progress_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn cidrs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_expand_all_sums_block_sizes() {
        let input = cidrs(&["10.0.1.0/24", "172.16.16.0/20", "192.168.0.0/16"]);
        let expansion = expand_all(&input, &ExpandOptions::default()).await;

        assert!(expansion.is_complete());
        assert_eq!(expansion.blocks.len(), 3);
        assert_eq!(expansion.total_addresses(), 256 + 4096 + 65536);
        assert_eq!(expansion.into_addresses().len(), 256 + 4096 + 65536);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_blocks_are_never_interleaved() {
        let input = cidrs(&["10.0.0.0/22", "10.1.0.0/22", "10.2.0.0/22", "10.3.0.0/22"]);
        let expansion = expand_all(&input, &ExpandOptions::default()).await;
        let all = expansion.into_addresses();

        assert_eq!(all.len(), 4 * 1024);
        for chunk in all.chunks(1024) {
            let prefixes: HashSet<&str> = chunk
                .iter()
                .map(|ip| ip.rsplitn(3, '.').last().unwrap_or(""))
                .collect();
            assert_eq!(prefixes.len(), 1, "block split across chunks");
        }
    }

    #[tokio::test]
    async fn test_blocks_keep_input_index() {
        let input = cidrs(&["10.0.0.0/30", "10.0.0.4/30"]);
        let expansion = expand_all(&input, &ExpandOptions::default()).await;

        for block in &expansion.blocks {
            assert_eq!(block.cidr, input[block.index]);
            assert_eq!(block.addresses.len(), 4);
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_cancel_siblings() {
        let input = cidrs(&["10.0.0.0/24", "172.256.0.0/16", "192.168.0.0/24"]);
        let expansion = expand_all(&input, &ExpandOptions::default()).await;

        assert_eq!(expansion.blocks.len(), 2);
        assert_eq!(expansion.failures.len(), 1);
        assert_eq!(expansion.failures[0].index, 1);
        assert!(matches!(expansion.failures[0].error, Error::InvalidCidrFormat { .. }));
        assert_eq!(expansion.total_addresses(), 512);
    }

    #[tokio::test]
    async fn test_strict_policy_discards_results() {
        let input = cidrs(&["10.0.0.0/24", "10.0.0.0/33", "192.168.1.0/16.0"]);
        let expansion = expand_all(&input, &ExpandOptions::default()).await;

        match expansion.resolve(ErrorPolicy::Strict) {
            Err(Error::BatchFailed {
                failed,
                total,
                first,
            }) => {
                assert_eq!(failed, 2);
                assert_eq!(total, 3);
                assert!(first.to_string().contains("10.0.0.0/33"));
            }
            other => panic!("expected batch failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_best_effort_policy_keeps_successes() {
        let input = cidrs(&["10.0.0.0/24", "10.0.0.0/33"]);
        let expansion = expand_all(&input, &ExpandOptions::default())
            .await
            .resolve(ErrorPolicy::BestEffort)
            .unwrap();

        assert!(!expansion.is_complete());
        assert_eq!(expansion.total_addresses(), 256);
    }

    #[tokio::test]
    async fn test_limit_applies_per_block() {
        let options = ExpandOptions {
            limit: BlockLimit(256),
            show_progress: false,
        };
        let input = cidrs(&["10.0.0.0/24", "10.0.0.0/23"]);
        let expansion = expand_all(&input, &options).await;

        assert_eq!(expansion.total_addresses(), 256);
        assert!(matches!(
            expansion.failures[0].error,
            Error::BlockTooLarge { .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_input_spawns_nothing() {
        let expansion = expand_all(&[], &ExpandOptions::default()).await;

        assert!(expansion.is_complete());
        assert!(expansion.blocks.is_empty());
        assert!(expansion.into_addresses().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_blocks_expand_independently() {
        let input = cidrs(&["10.9.0.0/26", "10.9.0.0/26"]);
        let expansion = expand_all(&input, &ExpandOptions::default()).await;

        assert_eq!(expansion.blocks.len(), 2);
        assert_eq!(expansion.blocks[0].addresses, expansion.blocks[1].addresses);
    }
}
