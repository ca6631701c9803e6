//! N-dimensional arrays: inspection, in-place processing, custom ownership and
//! runtime specialization on element type.

use std::fmt;

use ndshare_exchange::{
    BufferDescriptor, DType, DeviceKind, DispatchKey, DispatchTable, Dispatched, Error, Exchange,
    Inspection, MemoryOrder, Result, ReturnPolicy, ViewSpec, allocate_owned, export, wrap_vec,
};

/// Describes an array without touching its elements.
pub fn inspect(desc: &BufferDescriptor<'_>) -> Inspection {
    let inspection = desc.inspect();
    log::info!("{inspection}");
    inspection
}

/// Doubles the brightness of an `[height, width, 3]` RGB image in CPU memory,
/// saturating at 255.
pub fn process(desc: &mut BufferDescriptor<'_>) -> Result<()> {
    let spec = ViewSpec::new()
        .shape(&[None, None, Some(3)])
        .device(DeviceKind::Cpu);
    desc.typed_view_mut::<u8>(&spec)?
        .map_inplace(|v| v.saturating_mul(2));
    Ok(())
}

/// A 4x4 `f32` matrix stored inline, zero on construction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Matrix4f {
    m: [[f32; 4]; 4],
}

impl Matrix4f {
    pub fn new() -> Matrix4f {
        Matrix4f::default()
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.m[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.m[row][col] = value;
    }

    /// A row-major `[4, 4]` descriptor over the matrix's own storage.
    ///
    /// Writes through the descriptor land in the matrix; the borrow keeps the
    /// matrix alive for as long as the descriptor exists.
    pub fn view(&mut self) -> Result<BufferDescriptor<'_>> {
        BufferDescriptor::describe(self.m.as_flattened_mut(), &[4, 4], None, MemoryOrder::RowMajor)
    }
}

/// An owned `rows x cols` array holding `0, 1, ..., rows * cols - 1`.
pub fn create_2d(rows: usize, cols: usize, policy: ReturnPolicy) -> Result<BufferDescriptor<'static>> {
    let (mut desc, _token) = allocate_owned(&[rows, cols], DType::Float32)?;
    desc.any_layout_view_mut::<f32>(2)?
        .fill_with(|idx| (idx[0] * cols + idx[1]) as f32);
    export(desc, policy)
}

/// Two arrays carved from a single allocation: `0..5` increasing and `9..=0`
/// decreasing. The allocation is released when both are dropped.
pub fn return_multiple(
    policy: ReturnPolicy,
) -> Result<(BufferDescriptor<'static>, BufferDescriptor<'static>)> {
    const INCREASING: usize = 5;
    const DECREASING: usize = 10;

    let token = Exchange::default().allocate_region((INCREASING + DECREASING) * 4)?;
    let mut increasing = token.carve(DType::Float32, 0, &[INCREASING])?;
    let mut decreasing = token.carve(DType::Float32, INCREASING * 4, &[DECREASING])?;
    increasing
        .vector_view_mut::<f32>()?
        .fill_with(|i| i as f32);
    decreasing
        .vector_view_mut::<f32>()?
        .fill_with(|i| (DECREASING - 1 - i) as f32);
    log::debug!("return_multiple: token {} holds {} views", token.id(), token.view_count());

    Ok((export(increasing, policy)?, export(decreasing, policy)?))
}

/// The vector `[1, 2, 3]` with shape `(3,)`.
pub fn return_vec3(policy: ReturnPolicy) -> Result<BufferDescriptor<'static>> {
    let (desc, _token) = wrap_vec(vec![1.0f32, 2.0, 3.0], &[3])?;
    export(desc, policy)
}

/// Fills a row-major `f32` matrix in CPU memory with `i * j` through the
/// fixed-rank matrix view.
pub fn fill_array_optimized(desc: &mut BufferDescriptor<'_>) -> Result<()> {
    ViewSpec::matrix(MemoryOrder::RowMajor)
        .device(DeviceKind::Cpu)
        .check(DType::Float32, desc)?;
    desc.matrix_view_mut::<f32>(MemoryOrder::RowMajor)?
        .fill_with(|i, j| (i * j) as f32);
    Ok(())
}

/// Same result as [`fill_array_optimized`], going through the generic strided
/// view and per-element indexing.
pub fn fill_array_regular(desc: &mut BufferDescriptor<'_>) -> Result<()> {
    let spec = ViewSpec::matrix(MemoryOrder::RowMajor).device(DeviceKind::Cpu);
    let mut view = desc.typed_view_mut::<f32>(&spec)?;
    let (rows, cols) = (view.shape()[0], view.shape()[1]);
    for i in 0..rows {
        for j in 0..cols {
            view.set(&[i, j], (i * j) as f32);
        }
    }
    Ok(())
}

/// Which handler [`fill_array_specialized`] picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specialization {
    Float32Matrix,
    Int32Matrix,
    Unsupported(DispatchKey),
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Specialization::Float32Matrix => f.write_str("Used specialized 2D float view"),
            Specialization::Int32Matrix => f.write_str("Used specialized 2D int32 view"),
            Specialization::Unsupported(_) => f.write_str("Unsupported array type or dimension"),
        }
    }
}

/// Fills a row-major CPU array according to its runtime element type:
/// `f32` matrices get `i * j + 0.5`, `i32` matrices get `i + j`. Any other
/// element type or rank is left untouched.
pub fn fill_array_specialized(desc: &mut BufferDescriptor<'_>) -> Result<Specialization> {
    if desc.device().kind != DeviceKind::Cpu {
        return Err(Error::unsupported_device(desc.device().to_string()));
    }
    if !desc.is_row_major() {
        return Err(Error::layout_mismatch(
            MemoryOrder::RowMajor.name(),
            desc.order().name(),
        ));
    }

    let mut table = DispatchTable::new()
        .on::<f32, _>(2, |mut view| {
            view.fill_with(|idx| (idx[0] * idx[1]) as f32 + 0.5);
            Specialization::Float32Matrix
        })
        .on::<i32, _>(2, |mut view| {
            view.fill_with(|idx| (idx[0] + idx[1]) as i32);
            Specialization::Int32Matrix
        });
    let outcome = match table.dispatch(desc)? {
        Dispatched::Matched { value, .. } => value,
        Dispatched::NoMatch { key } => Specialization::Unsupported(key),
    };
    log::info!("{outcome}");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use ndshare_exchange::ErrorKind;

    use super::*;

    #[test]
    fn test_process_saturates() {
        let mut pixels = [10u8, 100, 200, 0, 127, 128];
        let mut desc =
            BufferDescriptor::describe(&mut pixels, &[1, 2, 3], None, MemoryOrder::RowMajor)
                .unwrap();
        process(&mut desc).unwrap();
        drop(desc);
        assert_eq!(pixels, [20, 200, 255, 0, 254, 255]);
    }

    #[test]
    fn test_process_requires_three_channels() {
        let mut pixels = [0u8; 8];
        let mut desc =
            BufferDescriptor::describe(&mut pixels, &[2, 2, 2], None, MemoryOrder::RowMajor)
                .unwrap();
        let err = process(&mut desc).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidShape { .. }));
    }

    #[test]
    fn test_matrix4f_view_writes_through() {
        let mut matrix = Matrix4f::new();
        let mut view = matrix.view().unwrap();
        assert_eq!(view.shape(), &[4, 4]);
        view.matrix_view_mut::<f32>(MemoryOrder::RowMajor)
            .unwrap()
            .set(1, 2, 7.5);
        drop(view);
        assert_eq!(matrix.get(1, 2), 7.5);
        assert_eq!(matrix.get(2, 1), 0.0);
    }

    #[test]
    fn test_return_multiple_share_one_token() {
        let (inc, dec) = return_multiple(ReturnPolicy::TakeOwnership).unwrap();
        assert_eq!(
            inc.vector_view::<f32>().unwrap().to_vec(),
            vec![0.0, 1.0, 2.0, 3.0, 4.0]
        );
        assert_eq!(
            dec.vector_view::<f32>().unwrap().to_vec(),
            (0..10).rev().map(|v| v as f32).collect::<Vec<_>>()
        );
        let (a, b) = (inc.owner().unwrap(), dec.owner().unwrap());
        assert!(a.ptr_eq(b));
        assert_eq!(a.view_count(), 2);
    }

    #[test]
    fn test_specialized_outcome_messages() {
        let mut data = [0u16; 4];
        let mut desc =
            BufferDescriptor::describe(&mut data, &[2, 2], None, MemoryOrder::RowMajor).unwrap();
        let outcome = fill_array_specialized(&mut desc).unwrap();
        assert_eq!(outcome.to_string(), "Unsupported array type or dimension");
        drop(desc);
        assert_eq!(data, [0; 4]);
    }
}
