//! Host backend
//!
//! Runs the comparator on the rayon thread pool. Work-groups are scheduled
//! in parallel and each one walks its tile, mirroring how the device kernel is
//! laid out, so tiling overshoot is handled by the same bounds check.

use crate::accumulator::{Accumulator, StatisticsCounters};
use crate::comparator::Comparator;
use crate::dispatch::{ComputeBackend, DispatchJob};
use crate::error::Result;
use rayon::prelude::*;

/// Parallel CPU implementation of [`ComputeBackend`]
#[derive(Debug, Default)]
pub struct CpuBackend {
    accumulator: Accumulator,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn execute(&mut self, job: &DispatchJob<'_>) -> Result<StatisticsCounters> {
        let comparator = Comparator::new(job.thresholds, job.layout);
        let cleared = self.accumulator.clear();
        let grid = job.grid;

        (0..grid.workgroup_count()).into_par_iter().for_each(|group| {
            let group_x = (group % grid.groups_x as u64) as u32;
            let group_y = (group / grid.groups_x as u64) as u32;

            for local_y in 0..grid.tile.height {
                for local_x in 0..grid.tile.width {
                    let x = group_x * grid.tile.width + local_x;
                    let y = group_y * grid.tile.height + local_y;
                    comparator.visit(job.reference, job.candidate, x, y, &cleared);
                }
            }
        });

        Ok(cleared.snapshot(job.layout))
    }
}
