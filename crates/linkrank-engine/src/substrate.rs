//! Batch-execution substrate
//!
//! A round needs three things from whatever runs it: a map phase applied to
//! every input record independently, a group-by-key barrier followed by one
//! reduce call per key, and round-scoped counters the reduce calls feed.
//! [`LocalSubstrate`] provides them in process on `rayon` workers.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHasher};
use tracing::debug;

use crate::codec::ShuffleRecord;
use crate::error::{ConfigurationError, DecodeError, RoundExecutionError};

/// Named round-scoped counters
///
/// Reduce calls return their own `Counters`; the substrate merges them after
/// the barrier, so merging must stay commutative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    values: BTreeMap<String, u64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, name: &str, by: u64) {
        *self.values.entry(name.to_string()).or_insert(0) += by;
    }

    /// Value of a counter; absent counters read as zero
    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: Counters) {
        for (name, value) in other.values {
            *self.values.entry(name).or_insert(0) += value;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// What a round needs from a batch-execution service
pub trait BatchSubstrate {
    /// Map output held between the two phases
    type Shuffle: Send;

    /// Apply `map_fn` to each input record; `map_fn` emits `(key, record)`
    /// pairs. No ordering is promised across input records.
    fn map_phase<I, R, F>(
        &self,
        round: usize,
        input: &[I],
        map_fn: F,
    ) -> Result<Self::Shuffle, RoundExecutionError>
    where
        I: Sync,
        R: ShuffleRecord,
        F: Fn(&I, &mut dyn FnMut(String, R)) + Sync + Send;

    /// Group the shuffle by key and call `reduce_fn` once per key
    ///
    /// Returns the union of reduce outputs and the merged counters.
    fn group_and_reduce<R, O, F>(
        &self,
        round: usize,
        shuffle: Self::Shuffle,
        reduce_fn: F,
    ) -> Result<(Vec<O>, Counters), RoundExecutionError>
    where
        R: ShuffleRecord,
        O: Send,
        F: Fn(&str, Vec<R>) -> (O, Counters) + Sync + Send;
}

type Bucket = Vec<(String, Vec<u8>)>;

/// Serialized map output of one round, hash-partitioned by key
#[derive(Debug, Default)]
pub struct Emitted {
    partitions: Vec<Bucket>,
}

impl Emitted {
    /// Number of emitted records across all partitions
    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Total serialized payload size
    pub fn byte_size(&self) -> usize {
        self.partitions
            .iter()
            .flat_map(|p| p.iter())
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

fn partition_for(key: &str, partitions: usize) -> usize {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}

fn merge_buckets(mut left: Vec<Bucket>, right: Vec<Bucket>) -> Vec<Bucket> {
    for (l, r) in left.iter_mut().zip(right) {
        l.extend(r);
    }
    left
}

/// In-process substrate running both phases on `rayon`
///
/// Map output goes through the binary record encoding into `partitions`
/// buckets. Each bucket is grouped and reduced independently; keys inside a
/// bucket are reduced in sorted order.
#[derive(Clone)]
pub struct LocalSubstrate {
    partitions: usize,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl LocalSubstrate {
    /// Substrate on the global `rayon` pool
    pub fn new(partitions: usize) -> Result<Self, ConfigurationError> {
        if partitions == 0 {
            return Err(ConfigurationError::InvalidPartitions(partitions));
        }
        Ok(Self {
            partitions,
            pool: None,
        })
    }

    /// Substrate on a dedicated pool of `threads` workers
    pub fn with_threads(partitions: usize, threads: usize) -> Result<Self, ConfigurationError> {
        let mut substrate = Self::new(partitions)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("linkrank-worker-{}", i))
            .build()
            .map_err(|e| ConfigurationError::Invalid(format!("thread pool: {}", e)))?;
        substrate.pool = Some(Arc::new(pool));
        Ok(substrate)
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    fn install<OP, T>(&self, op: OP) -> T
    where
        OP: FnOnce() -> T + Send,
        T: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl Default for LocalSubstrate {
    fn default() -> Self {
        let partitions = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            partitions,
            pool: None,
        }
    }
}

impl BatchSubstrate for LocalSubstrate {
    type Shuffle = Emitted;

    fn map_phase<I, R, F>(
        &self,
        round: usize,
        input: &[I],
        map_fn: F,
    ) -> Result<Emitted, RoundExecutionError>
    where
        I: Sync,
        R: ShuffleRecord,
        F: Fn(&I, &mut dyn FnMut(String, R)) + Sync + Send,
    {
        let partitions = self.partitions;
        let map_fn = &map_fn;

        let buckets = self.install(|| {
            input
                .par_iter()
                .try_fold(
                    || vec![Vec::new(); partitions],
                    |mut buckets: Vec<Bucket>, item| {
                        let mut failure: Option<DecodeError> = None;
                        map_fn(item, &mut |key: String, record: R| {
                            if failure.is_some() {
                                return;
                            }
                            match record.encode() {
                                Ok(bytes) => {
                                    let p = partition_for(&key, partitions);
                                    buckets[p].push((key, bytes));
                                }
                                Err(err) => failure = Some(err),
                            }
                        });
                        match failure {
                            Some(err) => Err(err),
                            None => Ok(buckets),
                        }
                    },
                )
                .try_reduce(
                    || vec![Vec::new(); partitions],
                    |left, right| Ok(merge_buckets(left, right)),
                )
        });

        let emitted = Emitted {
            partitions: buckets.map_err(|e| {
                RoundExecutionError::new(round, format!("shuffle encode failed: {}", e))
            })?,
        };

        debug!(
            "Round {}: map phase emitted {} records ({} bytes) into {} partitions",
            round,
            emitted.len(),
            emitted.byte_size(),
            partitions
        );

        Ok(emitted)
    }

    fn group_and_reduce<R, O, F>(
        &self,
        round: usize,
        shuffle: Emitted,
        reduce_fn: F,
    ) -> Result<(Vec<O>, Counters), RoundExecutionError>
    where
        R: ShuffleRecord,
        O: Send,
        F: Fn(&str, Vec<R>) -> (O, Counters) + Sync + Send,
    {
        let reduce_fn = &reduce_fn;

        let reduced = self.install(|| {
            shuffle
                .partitions
                .into_par_iter()
                .map(|bucket| {
                    let mut groups: FxHashMap<String, Vec<R>> = FxHashMap::default();
                    for (key, bytes) in bucket {
                        let record = R::decode(&bytes)?;
                        groups.entry(key).or_default().push(record);
                    }

                    let mut keyed: Vec<(String, Vec<R>)> = groups.into_iter().collect();
                    keyed.sort_by(|a, b| a.0.cmp(&b.0));

                    let mut outputs = Vec::with_capacity(keyed.len());
                    let mut counters = Counters::new();
                    for (key, records) in keyed {
                        let (output, delta) = reduce_fn(&key, records);
                        outputs.push(output);
                        counters.merge(delta);
                    }
                    Ok::<_, DecodeError>((outputs, counters))
                })
                .try_reduce(
                    || (Vec::new(), Counters::new()),
                    |(mut outputs, mut counters), (more, delta)| {
                        outputs.extend(more);
                        counters.merge(delta);
                        Ok((outputs, counters))
                    },
                )
        });

        let (outputs, counters) = reduced.map_err(|e| {
            RoundExecutionError::new(round, format!("shuffle decode failed: {}", e))
        })?;

        debug!(
            "Round {}: reduce phase produced {} outputs",
            round,
            outputs.len()
        );

        Ok((outputs, counters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{GraphNode, RankRecord};

    fn count_records(substrate: &LocalSubstrate, input: &[GraphNode]) -> Vec<(String, usize)> {
        let shuffle = substrate
            .map_phase::<GraphNode, RankRecord, _>(1, input, |node: &GraphNode, emit: &mut dyn FnMut(String, RankRecord)| {
                emit(node.id.clone(), RankRecord::NodeState(node.clone()));
                for target in &node.out_links {
                    emit(
                        target.clone(),
                        RankRecord::Contribution {
                            id: target.clone(),
                            rank: 1.0,
                        },
                    );
                }
            })
            .unwrap();

        let (mut out, counters) = substrate
            .group_and_reduce::<RankRecord, _, _>(1, shuffle, |key: &str, records: Vec<RankRecord>| {
                let mut delta = Counters::new();
                delta.increment("groups", 1);
                ((key.to_string(), records.len()), delta)
            })
            .unwrap();

        assert_eq!(counters.get("groups") as usize, out.len());
        out.sort();
        out
    }

    fn sample() -> Vec<GraphNode> {
        vec![
            GraphNode::seed("a", vec!["b".to_string(), "c".to_string()]),
            GraphNode::seed("b", vec!["c".to_string()]),
            GraphNode::seed("c", vec![]),
        ]
    }

    #[test]
    fn test_groups_every_key_once() {
        let substrate = LocalSubstrate::new(4).unwrap();
        let out = count_records(&substrate, &sample());
        assert_eq!(
            out,
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 2),
                ("c".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_map_phase_fills_every_partition_slot() {
        let substrate = LocalSubstrate::new(5).unwrap();
        let empty = substrate
            .map_phase::<GraphNode, RankRecord, _>(1, &[], |_: &GraphNode, _: &mut dyn FnMut(String, RankRecord)| {})
            .unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.partition_count(), 5);

        let shuffle = substrate
            .map_phase::<GraphNode, RankRecord, _>(1, &sample(), |node: &GraphNode, emit: &mut dyn FnMut(String, RankRecord)| {
                emit(node.id.clone(), RankRecord::NodeState(node.clone()))
            })
            .unwrap();
        assert!(!shuffle.is_empty());
        assert_eq!(shuffle.len(), 3);
        assert_eq!(shuffle.partition_count(), 5);
    }

    #[test]
    fn test_partition_count_does_not_change_grouping() {
        let one = count_records(&LocalSubstrate::new(1).unwrap(), &sample());
        let many = count_records(&LocalSubstrate::new(7).unwrap(), &sample());
        let pooled = count_records(&LocalSubstrate::with_threads(3, 2).unwrap(), &sample());
        assert_eq!(one, many);
        assert_eq!(one, pooled);
    }

    #[test]
    fn test_zero_partitions_rejected() {
        assert!(matches!(
            LocalSubstrate::new(0),
            Err(ConfigurationError::InvalidPartitions(0))
        ));
    }

    #[test]
    fn test_counters_merge() {
        let mut a = Counters::new();
        a.increment("x", 2);
        let mut b = Counters::new();
        b.increment("x", 3);
        b.increment("y", 1);
        a.merge(b);

        assert_eq!(a.get("x"), 5);
        assert_eq!(a.get("y"), 1);
        assert_eq!(a.get("missing"), 0);
        assert_eq!(a.iter().count(), 2);
    }
}
