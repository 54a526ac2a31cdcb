//! In-process block executor.

use crate::core::error::{ConfigError, DispatchError, DispatchResult};
use crate::core::region::{compute_regions, Region};
use crate::core::types::{Coord, Scalar, Vec3};
use crate::core::volume::Volume;
use crate::dispatch::BlockDispatcher;
use crate::ops::{BlockContext, BlockOp, BlockReport};
use rayon::prelude::*;

/// Runs block jobs in the current process, dividing the image into z slabs.
///
/// Jobs run in waves sized by the memory budget; each wave's read-region
/// copies are staged right before the wave runs and dropped right after,
/// keeping only the write-extent pixels. Since write-back is deferred until
/// every wave has finished, every job still reads the image as it was when
/// the dispatch began, no matter how jobs are scheduled.
pub struct LocalExecutor {
    block_depth: Coord,
    parallel: bool,
    threads: usize,
    memory_limit: usize,
}

/// A planned block job, before its read buffer exists.
#[derive(Debug, Clone, Copy)]
struct JobSpec {
    block_index: usize,
    read: Region,
    write: Region,
}

/// A completed block job, holding only the pixels that survive write-back.
struct FinishedJob<T> {
    block_index: usize,
    output: Volume<T>,
    write_origin: Vec3,
    report: BlockReport,
}

impl LocalExecutor {
    /// Create an executor dividing the image into slabs of `block_depth`
    /// planes (the last slab may be shallower).
    pub fn new(block_depth: Coord) -> Result<Self, ConfigError> {
        if block_depth < 1 {
            return Err(ConfigError::InvalidBlockDepth { depth: block_depth });
        }
        Ok(Self {
            block_depth,
            parallel: true,
            threads: 0,
            memory_limit: 0,
        })
    }

    /// Run block jobs sequentially instead of on the rayon pool.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Size of a private rayon pool (0 = the global pool).
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Soft budget in bytes for concurrently staged job memory
    /// (0 = unlimited). A single job over the budget is an error.
    pub fn memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// The output regions of each block, in dispatch order.
    fn output_regions(&self, dims: Vec3) -> Vec<Region> {
        let mut out = Vec::new();
        let mut z = 0;
        while z < dims.z {
            let depth = self.block_depth.min(dims.z - z);
            out.push(Region::new(Vec3::new(0, 0, z), Vec3::new(dims.x, dims.y, depth)));
            z += depth;
        }
        out
    }

    /// How many jobs may be staged at once under the memory budget.
    fn admission(&self, specs: &[JobSpec], bytes_per_pixel: usize, extra_memory: f64) -> DispatchResult<usize> {
        if self.memory_limit == 0 {
            return Ok(usize::MAX);
        }
        let per_job = specs
            .iter()
            .map(|s| {
                let base = s.read.pixel_count() * bytes_per_pixel;
                base + (base as f64 * extra_memory).ceil() as usize
            })
            .max()
            .unwrap_or(0);
        if per_job > self.memory_limit {
            return Err(DispatchError::OutOfMemory {
                required: per_job,
                limit: self.memory_limit,
            });
        }
        Ok((self.memory_limit / per_job.max(1)).max(1))
    }
}

impl<T: Scalar> BlockDispatcher<T> for LocalExecutor {
    fn dispatch(&self, vol: &mut Volume<T>, op: &dyn BlockOp<T>) -> DispatchResult<Vec<BlockReport>> {
        let dims = vol.dims();
        let margin = op.margin();
        let outputs = self.output_regions(dims);
        log::debug!("dispatching {} over {} block(s)", op.name(), outputs.len());

        // Plan first; skipped blocks keep their slot so reports line up
        // with block order. No buffer is allocated yet.
        let mut reports: Vec<Option<BlockReport>> = vec![None; outputs.len()];
        let mut specs = Vec::new();
        for (block_index, output) in outputs.iter().enumerate() {
            let (read, write) = compute_regions(*output, margin, dims);
            if !op.needs_to_run_block(&read, &write, block_index) {
                reports[block_index] = Some(BlockReport::new());
                continue;
            }
            specs.push(JobSpec {
                block_index,
                read,
                write,
            });
        }

        let in_flight = self.admission(&specs, T::BYTES, op.extra_memory())?;
        let wave_size = if self.parallel { in_flight } else { 1 };
        let pool = if self.parallel && self.threads > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(self.threads)
                    .build()
                    .map_err(|e| {
                        DispatchError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
                    })?,
            )
        } else {
            None
        };

        let run_one = |(spec, mut block): (JobSpec, Volume<T>)| -> DispatchResult<FinishedJob<T>> {
            let ctx = BlockContext {
                block_index: spec.block_index,
                block_origin: spec.read.origin,
                full_dims: dims,
                write_extent: spec.write.local_to(spec.read.origin),
            };
            let report = op.run(&mut block, &ctx).map_err(|error| DispatchError::BlockFailed {
                block_index: spec.block_index,
                error,
            })?;
            // Margins are discarded here; only write-extent pixels survive
            // to the write-back phase.
            Ok(FinishedJob {
                block_index: spec.block_index,
                output: block.extract(ctx.write_extent),
                write_origin: spec.write.origin,
                report,
            })
        };

        let mut finished: Vec<FinishedJob<T>> = Vec::with_capacity(specs.len());
        let mut remaining = specs.as_slice();
        while !remaining.is_empty() {
            let (wave, rest) = remaining.split_at(remaining.len().min(wave_size));
            remaining = rest;

            // Stage this wave's read copies just before it runs; the
            // previous wave's copies are already gone.
            let staged: Vec<(JobSpec, Volume<T>)> =
                wave.iter().map(|s| (*s, vol.extract(s.read))).collect();

            let done = if self.parallel {
                match &pool {
                    Some(pool) => pool.install(|| {
                        staged.into_par_iter().map(run_one).collect::<DispatchResult<Vec<_>>>()
                    })?,
                    None => staged.into_par_iter().map(run_one).collect::<DispatchResult<Vec<_>>>()?,
                }
            } else {
                staged.into_iter().map(run_one).collect::<DispatchResult<Vec<_>>>()?
            };
            finished.extend(done);
        }

        // Hard barrier: write-back starts only after every wave finished.
        for f in finished {
            let size = f.output.dims();
            vol.paste(&f.output, Region::full(size), f.write_origin);
            reports[f.block_index] = Some(f.report);
        }
        Ok(reports.into_iter().map(|r| r.unwrap_or_default()).collect())
    }
}
