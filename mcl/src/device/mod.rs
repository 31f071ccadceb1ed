/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! An emulated compute device.
//!
//! A [`Device`] executes _kernels_ over a _grid_ of _blocks_ of _compute
//! units_, in the style of GPU programming models. A kernel is a closure
//! receiving the coordinates of a unit ([`Unit2`] for two-dimensional
//! launches, [`Unit1`] for one-dimensional ones); from the coordinates, the
//! unit computes the position it is responsible for, checks it against the
//! bounds of the data, and processes it.
//!
//! Blocks are distributed over the threads of a Rayon thread pool owned by
//! the device; units within a block are run in order by the same thread, but
//! no ordering is guaranteed between units of different blocks. Kernels must
//! thus write only to locations owned by the unit. Writes go through the
//! [`SyncCell`](sync_cell_slice::SyncCell) views provided by
//! [`DeviceBuffer`].
//!
//! A launch returns only when all units have completed: every launch is a
//! synchronization point between the host and the device, and the output of
//! a launch is fully written before the next launch can read it.
//!
//! Data lives in [device buffers](DeviceBuffer), whose size is accounted
//! against an optional [capacity](Device::capacity). Buffers release their
//! memory when dropped.
//!
//! Launch geometry is configured by a [`LaunchConfig`].

mod buffer;
pub use buffer::*;

pub mod kernels;

use crate::error::{MclError, Result};
use rayon::ThreadPool;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A pair of dimensions.
///
/// In two-dimensional launches over matrices, `x` ranges over rows and `y`
/// over columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dim2 {
    pub x: usize,
    pub y: usize,
}

impl Dim2 {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl From<(usize, usize)> for Dim2 {
    fn from((x, y): (usize, usize)) -> Self {
        Self { x, y }
    }
}

impl From<Dim2> for (usize, usize) {
    fn from(d: Dim2) -> Self {
        (d.x, d.y)
    }
}

/// The coordinates of a compute unit in a two-dimensional launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit2 {
    pub block_idx: Dim2,
    pub thread_idx: Dim2,
    pub block_dim: Dim2,
}

impl Unit2 {
    /// Returns the global position of the unit.
    #[inline(always)]
    pub fn pos(&self) -> (usize, usize) {
        (
            self.thread_idx.x + self.block_dim.x * self.block_idx.x,
            self.thread_idx.y + self.block_dim.y * self.block_idx.y,
        )
    }
}

/// The coordinates of a compute unit in a one-dimensional launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit1 {
    pub block_idx: usize,
    pub thread_idx: usize,
    pub block_dim: usize,
}

impl Unit1 {
    /// Returns the global position of the unit.
    #[inline(always)]
    pub fn pos(&self) -> usize {
        self.thread_idx + self.block_dim * self.block_idx
    }
}

/// Launch geometry.
///
/// Block dimensions are always explicit. Grid dimensions are by default
/// derived from the extent of the data (the smallest grid covering it), but
/// they can be fixed: in that case, launches on data not covered by the grid
/// fail with [`LaunchGeometry`](MclError::LaunchGeometry). Grids larger than
/// needed are fine, as kernels check bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    block_2d: Dim2,
    block_1d: usize,
    grid_2d: Option<Dim2>,
    grid_1d: Option<usize>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            block_2d: Self::DEFAULT_BLOCK_2D,
            block_1d: Self::DEFAULT_BLOCK_1D,
            grid_2d: None,
            grid_1d: None,
        }
    }
}

impl LaunchConfig {
    pub const DEFAULT_BLOCK_2D: Dim2 = Dim2::new(16, 16);
    pub const DEFAULT_BLOCK_1D: usize = 64;

    /// Sets the block dimensions of two-dimensional launches.
    ///
    /// # Panics
    ///
    /// If a dimension is zero.
    pub fn block_2d(mut self, block: impl Into<Dim2>) -> Self {
        let block = block.into();
        assert!(
            block.x > 0 && block.y > 0,
            "Block dimensions must be positive, got {block:?}"
        );
        self.block_2d = block;
        self
    }

    /// Sets the block dimension of one-dimensional launches.
    ///
    /// # Panics
    ///
    /// If `block` is zero.
    pub fn block_1d(mut self, block: usize) -> Self {
        assert!(block > 0, "Block dimension must be positive");
        self.block_1d = block;
        self
    }

    /// Fixes the grid of two-dimensional launches, or reverts to derived
    /// grids if `None`.
    pub fn grid_2d(mut self, grid: Option<Dim2>) -> Self {
        self.grid_2d = grid;
        self
    }

    /// Fixes the grid of one-dimensional launches, or reverts to derived
    /// grids if `None`.
    pub fn grid_1d(mut self, grid: Option<usize>) -> Self {
        self.grid_1d = grid;
        self
    }

    pub fn block_dim_2d(&self) -> Dim2 {
        self.block_2d
    }

    pub fn block_dim_1d(&self) -> usize {
        self.block_1d
    }

    /// Returns the grid of a two-dimensional launch over `extent`.
    pub fn grid_dim_2d(&self, extent: Dim2) -> Result<Dim2> {
        let needed = Dim2::new(
            extent.x.div_ceil(self.block_2d.x),
            extent.y.div_ceil(self.block_2d.y),
        );
        match self.grid_2d {
            None => Ok(needed),
            Some(grid) if grid.x >= needed.x && grid.y >= needed.y => Ok(grid),
            Some(grid) => Err(MclError::LaunchGeometry {
                grid: grid.into(),
                block: self.block_2d.into(),
                extent: extent.into(),
            }),
        }
    }

    /// Returns the grid of a one-dimensional launch over `extent`.
    pub fn grid_dim_1d(&self, extent: usize) -> Result<usize> {
        let needed = extent.div_ceil(self.block_1d);
        match self.grid_1d {
            None => Ok(needed),
            Some(grid) if grid >= needed => Ok(grid),
            Some(grid) => Err(MclError::LaunchGeometry {
                grid: (grid, 1),
                block: (self.block_1d, 1),
                extent: (extent, 1),
            }),
        }
    }
}

/// An emulated compute device.
///
/// See the [module documentation](self).
pub struct Device {
    thread_pool: ThreadPool,
    config: LaunchConfig,
    capacity: Option<usize>,
    allocated: AtomicUsize,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("num_threads", &self.thread_pool.current_num_threads())
            .field("config", &self.config)
            .field("capacity", &self.capacity)
            .field("allocated", &self.allocated.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for Device {
    /// Returns a device using as many threads as Rayon's default.
    fn default() -> Self {
        Self::with_thread_pool(
            rayon::ThreadPoolBuilder::new()
                .build()
                .expect("Cannot build a ThreadPool with default parameters"),
        )
    }
}

impl Device {
    /// Creates a device with the given number of threads.
    ///
    /// # Panics
    ///
    /// If the thread pool cannot be built.
    pub fn new(num_threads: usize) -> Self {
        Self::with_thread_pool(
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()
                .unwrap_or_else(|_| {
                    panic!(
                        "Cannot build a ThreadPool with default parameters and {} threads",
                        num_threads
                    )
                }),
        )
    }

    /// Creates a device running on the given thread pool.
    pub fn with_thread_pool(thread_pool: ThreadPool) -> Self {
        Self {
            thread_pool,
            config: LaunchConfig::default(),
            capacity: None,
            allocated: AtomicUsize::new(0),
        }
    }

    /// Sets the launch geometry.
    pub fn launch_config(&mut self, config: LaunchConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Sets the memory capacity in bytes (`None` for no limit).
    pub fn capacity(&mut self, capacity: Option<usize>) -> &mut Self {
        self.capacity = capacity;
        self
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    pub fn num_threads(&self) -> usize {
        self.thread_pool.current_num_threads()
    }

    /// Returns the number of bytes currently allocated.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    /// Returns the number of bytes that can still be allocated.
    pub fn available(&self) -> usize {
        match self.capacity {
            Some(capacity) => capacity.saturating_sub(self.allocated()),
            None => usize::MAX - self.allocated(),
        }
    }

    /// Accounts for `bytes` more bytes, failing if the capacity would be
    /// exceeded.
    pub(crate) fn reserve(&self, bytes: usize) -> Result<()> {
        let capacity = self.capacity.unwrap_or(usize::MAX);
        self.allocated
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |allocated| {
                allocated
                    .checked_add(bytes)
                    .filter(|&total| total <= capacity)
            })
            .map(|_| ())
            .map_err(|allocated| MclError::DeviceAllocationFailure {
                requested: bytes,
                available: capacity.saturating_sub(allocated),
            })
    }

    pub(crate) fn release(&self, bytes: usize) {
        let previous = self.allocated.fetch_sub(bytes, Ordering::AcqRel);
        debug_assert!(previous >= bytes);
    }

    /// Runs `kernel` on every unit of a two-dimensional grid of blocks.
    ///
    /// Returns when all units have completed.
    pub fn launch_2d<K>(&self, grid: Dim2, block: Dim2, kernel: K)
    where
        K: Fn(Unit2) + Sync,
    {
        log::trace!("Launching 2-D kernel: grid {grid:?}, block {block:?}");
        self.thread_pool.install(|| {
            (0..grid.x * grid.y).into_par_iter().for_each(|b| {
                let block_idx = Dim2::new(b / grid.y, b % grid.y);
                for tx in 0..block.x {
                    for ty in 0..block.y {
                        kernel(Unit2 {
                            block_idx,
                            thread_idx: Dim2::new(tx, ty),
                            block_dim: block,
                        });
                    }
                }
            })
        });
    }

    /// Runs `kernel` on every unit of a one-dimensional grid of blocks.
    ///
    /// Returns when all units have completed.
    pub fn launch_1d<K>(&self, grid: usize, block: usize, kernel: K)
    where
        K: Fn(Unit1) + Sync,
    {
        log::trace!("Launching 1-D kernel: grid {grid}, block {block}");
        self.thread_pool.install(|| {
            (0..grid).into_par_iter().for_each(|block_idx| {
                for thread_idx in 0..block {
                    kernel(Unit1 {
                        block_idx,
                        thread_idx,
                        block_dim: block,
                    });
                }
            })
        });
    }

    /// Runs `kernel` over the elements of a `rows` × `cols` matrix, using the
    /// configured two-dimensional geometry.
    pub fn launch_over_elements<K>(&self, rows: usize, cols: usize, kernel: K) -> Result<()>
    where
        K: Fn(Unit2) + Sync,
    {
        let block = self.config.block_dim_2d();
        let grid = self.config.grid_dim_2d(Dim2::new(rows, cols))?;
        self.launch_2d(grid, block, kernel);
        Ok(())
    }

    /// Runs `kernel` over `n` items (e.g., the columns of a matrix), using
    /// the configured one-dimensional geometry.
    pub fn launch_over_items<K>(&self, n: usize, kernel: K) -> Result<()>
    where
        K: Fn(Unit1) + Sync,
    {
        let block = self.config.block_dim_1d();
        let grid = self.config.grid_dim_1d(n)?;
        self.launch_1d(grid, block, kernel);
        Ok(())
    }
}
