/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::Device;
use crate::error::{MclError, Result};
use crate::matrix::Matrix;
use sync_cell_slice::{SyncCell, SyncSlice};

/// A buffer in device memory.
///
/// The buffer is accounted against the capacity of the device that
/// allocated it, and it is released when dropped, whatever the exit path.
pub struct DeviceBuffer<'d, T> {
    device: &'d Device,
    data: Box<[T]>,
    bytes: usize,
}

impl<T> std::fmt::Debug for DeviceBuffer<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("len", &self.data.len())
            .field("bytes", &self.bytes)
            .finish_non_exhaustive()
    }
}

impl<'d, T: Copy + Default + Send> DeviceBuffer<'d, T> {
    /// Allocates a buffer of `len` default values.
    ///
    /// Fails with
    /// [`DeviceAllocationFailure`](MclError::DeviceAllocationFailure) if the
    /// device capacity would be exceeded or the memory cannot be obtained.
    pub fn alloc(device: &'d Device, len: usize) -> Result<Self> {
        let bytes = len
            .checked_mul(size_of::<T>())
            .ok_or(MclError::DeviceAllocationFailure {
                requested: usize::MAX,
                available: device.available(),
            })?;
        device.reserve(bytes)?;

        let mut data = Vec::new();
        if data.try_reserve_exact(len).is_err() {
            device.release(bytes);
            return Err(MclError::DeviceAllocationFailure {
                requested: bytes,
                available: device.available(),
            });
        }
        data.resize(len, T::default());

        Ok(Self {
            device,
            data: data.into_boxed_slice(),
            bytes,
        })
    }

    /// Allocates a buffer and copies `host` into it.
    pub fn from_host(device: &'d Device, host: &[T]) -> Result<Self> {
        let mut buffer = Self::alloc(device, host.len())?;
        buffer.data.copy_from_slice(host);
        Ok(buffer)
    }

    /// Copies the content of the buffer back to the host.
    pub fn to_host(&self) -> Vec<T> {
        self.data.to_vec()
    }

    /// Allocates a new buffer with the same content.
    pub fn try_clone(&self) -> Result<Self> {
        Self::from_host(self.device, &self.data)
    }
}

impl<T> DeviceBuffer<'_, T> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the size of the buffer in bytes.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Returns a read-only view, for kernels that only read the buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns a view that kernels can write to concurrently.
    ///
    /// Writing through the view is unsafe: no two compute units may write
    /// the same cell, and no unit may read a cell written by another unit in
    /// the same launch.
    pub fn as_cells(&mut self) -> &[SyncCell<T>] {
        self.data.as_sync_slice()
    }
}

impl<T> Drop for DeviceBuffer<'_, T> {
    fn drop(&mut self) {
        self.device.release(self.bytes);
    }
}

/// A dense row-major matrix in device memory.
#[derive(Debug)]
pub struct DeviceMatrix<'d> {
    rows: usize,
    cols: usize,
    buffer: DeviceBuffer<'d, f64>,
}

impl<'d> DeviceMatrix<'d> {
    /// Allocates a zero matrix.
    pub fn alloc(device: &'d Device, rows: usize, cols: usize) -> Result<Self> {
        Ok(Self {
            rows,
            cols,
            buffer: DeviceBuffer::alloc(device, rows * cols)?,
        })
    }

    /// Copies a host matrix to the device.
    pub fn from_host(device: &'d Device, matrix: &Matrix) -> Result<Self> {
        Ok(Self {
            rows: matrix.rows(),
            cols: matrix.cols(),
            buffer: DeviceBuffer::from_host(device, matrix.as_slice())?,
        })
    }

    /// Copies the matrix back to the host.
    pub fn to_host(&self) -> Result<Matrix> {
        Matrix::from_vec(self.rows, self.cols, self.buffer.to_host())
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            buffer: self.buffer.try_clone()?,
        })
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns a read-only view, for kernels that only read the matrix.
    pub fn view(&self) -> MatrixView<'_> {
        MatrixView {
            data: self.buffer.as_slice(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Returns a view that kernels can write to concurrently.
    ///
    /// See [`DeviceBuffer::as_cells`].
    pub fn cells(&mut self) -> MatrixCells<'_, f64> {
        MatrixCells {
            rows: self.rows,
            cols: self.cols,
            data: self.buffer.as_cells(),
        }
    }
}

/// A read-only view of a device matrix.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a> {
    data: &'a [f64],
    pub rows: usize,
    pub cols: usize,
}

impl MatrixView<'_> {
    #[inline(always)]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[x * self.cols + y]
    }
}

/// A writable view of a device matrix or of a per-element device buffer.
#[derive(Clone, Copy)]
pub struct MatrixCells<'a, T> {
    data: &'a [SyncCell<T>],
    pub rows: usize,
    pub cols: usize,
}

impl<'a, T: Copy> MatrixCells<'a, T> {
    /// Wraps a buffer with `rows` · `cols` elements.
    ///
    /// # Panics
    ///
    /// If the buffer has the wrong length.
    pub fn new(buffer: &'a mut DeviceBuffer<'_, T>, rows: usize, cols: usize) -> Self {
        assert_eq!(buffer.len(), rows * cols);
        Self {
            data: buffer.as_cells(),
            rows,
            cols,
        }
    }

    /// Reads the element at (`x`, `y`).
    ///
    /// # Safety
    ///
    /// No other unit may be writing the element.
    #[inline(always)]
    pub unsafe fn get(&self, x: usize, y: usize) -> T {
        unsafe { self.data[x * self.cols + y].get() }
    }

    /// Writes the element at (`x`, `y`).
    ///
    /// # Safety
    ///
    /// No other unit may be accessing the element.
    #[inline(always)]
    pub unsafe fn set(&self, x: usize, y: usize, value: T) {
        unsafe { self.data[x * self.cols + y].set(value) }
    }
}
