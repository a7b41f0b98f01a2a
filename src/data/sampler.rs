use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

use super::model::{CellValue, Dataset};
use crate::error::SampleError;

/// Seed used when none is configured, so repeated runs pick the same rows.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Error)]
pub enum SplitError {
    /// The requested split cannot give every class its share.
    #[error("{0}")]
    Infeasible(String),
    /// The split broke one of its own invariants.
    #[error("{0}")]
    Internal(String),
}

impl From<SplitError> for SampleError {
    fn from(e: SplitError) -> Self {
        match e {
            SplitError::Infeasible(msg) => SampleError::Sampling(msg),
            SplitError::Internal(msg) => SampleError::UnknownSampling(msg),
        }
    }
}

/// A dataset partitioned into a stratified sample and the rows left over.
#[derive(Debug, Clone)]
pub struct StratifiedSplit {
    /// Positions (indices into `Dataset::records`) of the sampled rows, ascending.
    pub sample: Vec<usize>,
    /// Positions of the rows not sampled, ascending.
    pub holdout: Vec<usize>,
    /// Rows taken from each class.
    pub allocation: BTreeMap<CellValue, usize>,
}

/// Stratified sampling without replacement, reproducible for a given seed.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedSampler {
    seed: u64,
}

impl Default for StratifiedSampler {
    fn default() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }
}

impl StratifiedSampler {
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Pick `sample_size` rows so each class of `column` keeps its share of
    /// the table.
    pub fn split(
        &self,
        dataset: &Dataset,
        column: &str,
        sample_size: usize,
    ) -> Result<StratifiedSplit, SplitError> {
        let n = dataset.len();
        if n == 0 {
            return Err(SplitError::Infeasible(
                "cannot sample from an empty dataset".to_string(),
            ));
        }
        if sample_size > n {
            return Err(SplitError::Infeasible(format!(
                "sample size {sample_size} is larger than the {n} available rows"
            )));
        }

        let mut members: BTreeMap<CellValue, Vec<usize>> = BTreeMap::new();
        for (pos, rec) in dataset.records.iter().enumerate() {
            members.entry(rec.get(column).clone()).or_default().push(pos);
        }
        let classes = members.len();
        if sample_size < classes {
            return Err(SplitError::Infeasible(format!(
                "sample size {sample_size} cannot hold one row from each of {classes} classes"
            )));
        }
        // Below the whole table every class must also keep a row back.
        if sample_size < n {
            if let Some((value, rows)) = members.iter().find(|(_, rows)| rows.len() < 2) {
                return Err(SplitError::Infeasible(format!(
                    "class {column}={value} has only {} row, too few to appear in both the sample and the rest",
                    rows.len()
                )));
            }
            if n - sample_size < classes {
                return Err(SplitError::Infeasible(format!(
                    "the {} rows left after sampling cannot hold one row from each of {classes} classes",
                    n - sample_size
                )));
            }
        }

        let sizes: Vec<usize> = members.values().map(Vec::len).collect();
        let quota = allocate(&sizes, sample_size);

        let total: usize = quota.iter().sum();
        if total != sample_size {
            return Err(SplitError::Internal(format!(
                "allocated {total} rows for a sample of {sample_size}"
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut sample = Vec::with_capacity(sample_size);
        let mut holdout = Vec::with_capacity(n - sample_size);
        let mut allocation = BTreeMap::new();

        for ((value, mut rows), take) in members.into_iter().zip(quota) {
            if take > rows.len() {
                return Err(SplitError::Internal(format!(
                    "class {column}={value} has {} rows but {take} were allocated",
                    rows.len()
                )));
            }
            rows.shuffle(&mut rng);
            let rest = rows.split_off(take);
            log::debug!("Class {column}={value}: taking {take}, leaving {}", rest.len());
            sample.extend(rows);
            holdout.extend(rest);
            allocation.insert(value, take);
        }

        sample.sort_unstable();
        holdout.sort_unstable();

        Ok(StratifiedSplit {
            sample,
            holdout,
            allocation,
        })
    }
}

/// Share `total` slots between classes of the given sizes in proportion to
/// their size (largest remainder), then make sure no class gets zero.
/// Unless the whole table is taken, a class never gets more than `size - 1`.
///
/// Requires `sizes.len() <= total <= sizes.iter().sum()`.
fn allocate(sizes: &[usize], total: usize) -> Vec<usize> {
    let n: usize = sizes.iter().sum();
    if n == 0 {
        return vec![0; sizes.len()];
    }
    let caps: Vec<usize> = if total < n {
        sizes.iter().map(|&s| s.saturating_sub(1)).collect()
    } else {
        sizes.to_vec()
    };

    let mut quota: Vec<usize> = sizes.iter().map(|&s| s * total / n).collect();
    let mut left = total - quota.iter().sum::<usize>();

    // Remainders compared exactly as (s * total) mod n.
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = sizes[a] * total % n;
        let rb = sizes[b] * total % n;
        rb.cmp(&ra)
            .then_with(|| sizes[b].cmp(&sizes[a]))
            .then_with(|| a.cmp(&b))
    });
    while left > 0 {
        let before = left;
        for &i in &order {
            if left == 0 {
                break;
            }
            if quota[i] < caps[i] {
                quota[i] += 1;
                left -= 1;
            }
        }
        if left == before {
            break;
        }
    }

    // A class rounded down to nothing borrows one slot from the largest share.
    for i in 0..sizes.len() {
        if quota[i] == 0 && caps[i] > 0 {
            let donor = (0..sizes.len())
                .filter(|&j| quota[j] > 1)
                .max_by(|&a, &b| quota[a].cmp(&quota[b]).then_with(|| b.cmp(&a)));
            if let Some(j) = donor {
                quota[j] -= 1;
                quota[i] += 1;
            }
        }
    }

    quota
}
