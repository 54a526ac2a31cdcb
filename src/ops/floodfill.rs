//! Distributed flood fill via cross-block seed exchange.
//!
//! Blocks cannot see each other's pixels, so a fill that touches a block
//! boundary leaves seed files addressed to the neighboring plane. The outer
//! loop re-dispatches as long as any such file exists, alternating a
//! source/target prefix pair so one iteration's output becomes the next
//! iteration's input. Division is along z only; every boundary face has a
//! z-axis normal.

use crate::core::error::{BlockflowError, BlockflowResult, OpResult, ProtocolError};
use crate::core::region::Region;
use crate::core::types::{Connectivity, Coord, Scalar, Vec3};
use crate::core::volume::Volume;
use crate::dispatch::BlockDispatcher;
use crate::ops::{BlockContext, BlockOp, BlockReport, JobType, PIXELS_CHANGED};
use crate::seeds::{self, SeedPrefixes};

/// One block's share of a distributed flood fill.
///
/// Consumes seed files addressed to this block's z range, fills, and emits
/// seed files for boundary pixels the fill newly painted. Constructed fresh
/// for every outer-loop iteration because the prefix pair swaps between
/// iterations.
#[derive(Debug, Clone)]
pub struct FloodFillBlockOp {
    source_prefix: String,
    target_prefix: String,
    start: Vec3,
    original: f64,
    fill: f64,
    connectivity: Connectivity,
}

impl FloodFillBlockOp {
    /// Build the op for one iteration of the exchange loop.
    pub fn new(
        prefixes: &SeedPrefixes,
        start: Vec3,
        original: f64,
        fill: f64,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            source_prefix: prefixes.source.clone(),
            target_prefix: prefixes.target.clone(),
            start,
            original,
            fill,
            connectivity,
        }
    }

    /// The z addresses of seed files this block would consume.
    fn source_planes(&self, start_z: Coord, end_z: Coord) -> Vec<Coord> {
        let mut planes = vec![start_z, self.start.z, end_z];
        planes.retain(|z| *z >= start_z && *z <= end_z);
        planes.sort_unstable();
        planes.dedup();
        planes
    }

    /// Seeds a newly filled boundary pixel projects onto the neighbor plane.
    ///
    /// 6-connectivity reaches exactly one pixel; 26-connectivity reaches the
    /// 3x3 footprint around it. Footprint points may land outside the image
    /// in x or y; the consuming block drops them.
    fn project(&self, p: Vec3, neighbor_z: Coord, out: &mut Vec<Vec3>) {
        match self.connectivity {
            Connectivity::Nearest => out.push(Vec3::new(p.x, p.y, neighbor_z)),
            Connectivity::All => {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        out.push(Vec3::new(p.x + dx, p.y + dy, neighbor_z));
                    }
                }
            }
        }
    }

    /// Compare one boundary plane against its pre-fill snapshot and collect
    /// the seeds newly filled pixels emit toward `neighbor_z`.
    fn boundary_seeds<T: Scalar>(
        &self,
        block: &Volume<T>,
        snapshot: &[T],
        local_z: Coord,
        global_z: Coord,
        neighbor_z: Coord,
        full_depth: Coord,
    ) -> Vec<Vec3> {
        let mut out = Vec::new();
        if neighbor_z < 0 || neighbor_z >= full_depth {
            return out;
        }
        let dims = block.dims();
        let mut n = 0;
        for y in 0..dims.y {
            for x in 0..dims.x {
                let now = block.get(Vec3::new(x, y, local_z));
                if now != snapshot[n] {
                    self.project(Vec3::new(x, y, global_z), neighbor_z, &mut out);
                }
                n += 1;
            }
        }
        out.sort_unstable_by_key(|p| (p.y, p.x));
        out.dedup();
        out
    }
}

impl<T: Scalar> BlockOp<T> for FloodFillBlockOp {
    fn name(&self) -> &str {
        "floodfillblock"
    }

    fn extra_memory(&self) -> f64 {
        // Fill stack plus two boundary-plane snapshots.
        1.0
    }

    fn job_type(&self) -> JobType {
        JobType::Slow
    }

    fn can_delay(&self) -> bool {
        // The outer loop inspects the seed files and the changed count
        // immediately after each dispatch.
        false
    }

    fn needs_to_run_block(&self, read: &Region, _write: &Region, _block_index: usize) -> bool {
        let start_z = read.origin.z;
        let end_z = read.end().z - 1;
        self.source_planes(start_z, end_z)
            .iter()
            .any(|z| seeds::seed_file_exists(&self.source_prefix, *z))
    }

    fn run(&self, block: &mut Volume<T>, ctx: &BlockContext) -> OpResult<BlockReport> {
        let dims = block.dims();
        // Seed exchange addresses planes by z alone, so a block must span the
        // full x/y extent. Any other shape has a boundary face the protocol
        // cannot describe.
        if ctx.block_origin.x != 0
            || ctx.block_origin.y != 0
            || dims.x != ctx.full_dims.x
            || dims.y != ctx.full_dims.y
        {
            return Err(ProtocolError::UnsupportedFaceNormal {
                block_origin: ctx.block_origin,
            }
            .into());
        }

        let start_z = ctx.block_origin.z;
        let end_z = start_z + dims.z - 1;

        let mut seed_points = Vec::new();
        for z in self.source_planes(start_z, end_z) {
            for p in seeds::read_seeds(&self.source_prefix, z)? {
                seed_points.push(p - ctx.block_origin);
            }
        }
        if seed_points.is_empty() {
            return Ok(BlockReport::with_counter(PIXELS_CHANGED, 0));
        }

        // Boundary planes before filling; with a single plane it serves as
        // both faces.
        let low_before = block.z_plane(0);
        let high_before = if dims.z > 1 {
            Some(block.z_plane(dims.z - 1))
        } else {
            None
        };

        let original = T::from_f64(self.original);
        let fill = T::from_f64(self.fill);
        let changed = crate::kernels::flood_fill(block, &seed_points, original, fill, self.connectivity);

        let full_depth = ctx.full_dims.z;
        let low = self.boundary_seeds(block, &low_before, 0, start_z, start_z - 1, full_depth);
        seeds::merge_seeds(&self.target_prefix, start_z - 1, &low)?;
        let high_before = high_before.as_deref().unwrap_or(&low_before);
        let high = self.boundary_seeds(block, high_before, dims.z - 1, end_z, end_z + 1, full_depth);
        seeds::merge_seeds(&self.target_prefix, end_z + 1, &high)?;

        let mut report = BlockReport::with_counter(PIXELS_CHANGED, changed as i64);
        report.push_message(format!("{} pixels changed", changed));
        Ok(report)
    }
}

/// Outcome of a completed distributed flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOutcome {
    /// Number of dispatch rounds the seed exchange needed.
    pub iterations: usize,
    /// Total pixels painted across all rounds and blocks.
    pub pixels_filled: u64,
}

/// Distributed flood fill from a single start point.
#[derive(Debug, Clone)]
pub struct FloodFill {
    start: Vec3,
    fill_color: f64,
    connectivity: Connectivity,
    max_iterations: usize,
    seed_dir: Option<std::path::PathBuf>,
}

impl FloodFill {
    /// Fill the connected component containing `start` with `fill_color`.
    pub fn new(start: Vec3, fill_color: f64) -> Self {
        Self {
            start,
            fill_color,
            connectivity: Connectivity::Nearest,
            max_iterations: 10_000,
            seed_dir: None,
        }
    }

    /// Neighborhood used by the fill (default 6-connected).
    pub fn connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Safety cap on seed-exchange rounds (default 10000).
    pub fn max_iterations(mut self, cap: usize) -> Self {
        self.max_iterations = cap;
        self
    }

    /// Directory holding the seed files (default: system temp directory).
    pub fn seed_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.seed_dir = Some(dir.into());
        self
    }

    /// Run the fill to completion.
    ///
    /// A start point outside the image, or one already holding the fill
    /// color, completes immediately with zero pixels painted.
    pub fn run<T: Scalar>(
        &self,
        dispatcher: &dyn BlockDispatcher<T>,
        vol: &mut Volume<T>,
    ) -> BlockflowResult<FillOutcome> {
        if !vol.in_bounds(self.start) {
            return Ok(FillOutcome {
                iterations: 0,
                pixels_filled: 0,
            });
        }
        let original = vol.get(self.start).to_f64();
        if original == self.fill_color {
            return Ok(FillOutcome {
                iterations: 0,
                pixels_filled: 0,
            });
        }

        let mut prefixes = match &self.seed_dir {
            Some(dir) => SeedPrefixes::new_in(dir),
            None => SeedPrefixes::temporary(),
        };
        seeds::write_seeds(&prefixes.source, self.start.z, &[self.start])
            .map_err(BlockflowError::Op)?;

        let mut iterations = 0;
        let mut pixels_filled: u64 = 0;
        loop {
            let op = FloodFillBlockOp::new(
                &prefixes,
                self.start,
                original,
                self.fill_color,
                self.connectivity,
            );
            let reports = dispatcher.dispatch(vol, &op)?;
            let round = BlockReport::sum_counter(&reports, PIXELS_CHANGED);
            pixels_filled += round.max(0) as u64;
            iterations += 1;
            log::info!(
                "flood fill round {}: {} pixels filled",
                iterations,
                round
            );

            seeds::remove_seed_files(&prefixes.source).map_err(BlockflowError::Op)?;
            if seeds::list_seed_files(&prefixes.target).is_empty() {
                break;
            }
            if iterations >= self.max_iterations {
                let _ = seeds::remove_seed_files(&prefixes.target);
                return Err(ProtocolError::IterationCapExceeded {
                    cap: self.max_iterations,
                }
                .into());
            }
            prefixes.swap();
        }

        let leaked = seeds::list_seed_files(&prefixes.source).len()
            + seeds::list_seed_files(&prefixes.target).len();
        if leaked > 0 {
            let _ = seeds::remove_seed_files(&prefixes.source);
            let _ = seeds::remove_seed_files(&prefixes.target);
            return Err(ProtocolError::LeakedSeedFiles { count: leaked }.into());
        }

        Ok(FillOutcome {
            iterations,
            pixels_filled,
        })
    }
}
