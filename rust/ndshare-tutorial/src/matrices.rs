//! Dense `f32` matrices and vectors.
//!
//! Functions taking a descriptor borrow the caller's memory and never copy it. A
//! function that needs a particular memory order rejects any other order with a
//! layout mismatch rather than converting behind the caller's back.

use ndshare_exchange::{
    BufferDescriptor, DType, Error, MemoryOrder, Result, ReturnPolicy, allocate_owned_ordered,
    export,
};

/// A `rows x cols` column-major matrix holding 1, 2, 3, ... down each column.
pub fn colmajor(rows: usize, cols: usize, policy: ReturnPolicy) -> Result<BufferDescriptor<'static>> {
    let (mut desc, _token) =
        allocate_owned_ordered(&[rows, cols], DType::Float32, MemoryOrder::ColumnMajor)?;
    let mut m = desc.matrix_view_mut::<f32>(MemoryOrder::ColumnMajor)?;
    m.fill_with(|r, c| (c * rows + r + 1) as f32);
    drop(m);
    export(desc, policy)
}

/// A `rows x cols` row-major matrix holding 1, 2, 3, ... along each row.
pub fn rowmajor(rows: usize, cols: usize, policy: ReturnPolicy) -> Result<BufferDescriptor<'static>> {
    let (mut desc, _token) =
        allocate_owned_ordered(&[rows, cols], DType::Float32, MemoryOrder::RowMajor)?;
    let mut m = desc.matrix_view_mut::<f32>(MemoryOrder::RowMajor)?;
    m.fill_with(|r, c| (r * cols + c + 1) as f32);
    drop(m);
    export(desc, policy)
}

/// Accepts only column-major `f32` matrices; returns `(rows, cols)`.
pub fn colmajor_only(desc: &BufferDescriptor<'_>) -> Result<(usize, usize)> {
    let m = desc.matrix_view::<f32>(MemoryOrder::ColumnMajor)?;
    log::info!("column-major matrix {}x{}", m.rows(), m.cols());
    Ok((m.rows(), m.cols()))
}

/// Accepts only row-major `f32` matrices; returns `(rows, cols)`.
pub fn rowmajor_only(desc: &BufferDescriptor<'_>) -> Result<(usize, usize)> {
    let m = desc.matrix_view::<f32>(MemoryOrder::RowMajor)?;
    log::info!("row-major matrix {}x{}", m.rows(), m.cols());
    Ok((m.rows(), m.cols()))
}

/// Accepts an `f32` matrix in any memory order without copying.
pub fn dref(desc: &BufferDescriptor<'_>) -> Result<(usize, usize)> {
    let m = desc.matrix_view::<f32>(MemoryOrder::Any)?;
    log::info!("matrix {}x{}", m.rows(), m.cols());
    Ok((m.rows(), m.cols()))
}

/// Sets element `(0, 0)` of a column-major matrix to 99 in place.
pub fn modify(desc: &mut BufferDescriptor<'_>) -> Result<f32> {
    let mut m = desc.matrix_view_mut::<f32>(MemoryOrder::ColumnMajor)?;
    if m.rows() == 0 || m.cols() == 0 {
        return Err(Error::invalid_shape(
            "a non-empty matrix",
            format!("{}x{}", m.rows(), m.cols()),
        ));
    }
    m.set(0, 0, 99.0);
    log::info!("modified matrix[0,0] = {:.1}", m.at(0, 0));
    Ok(m.at(0, 0))
}

/// Elementwise sum of two matrices, returned as a new column-major matrix.
///
/// The operands may be stored in any order; they are read in place.
pub fn sum(
    a: &BufferDescriptor<'_>,
    b: &BufferDescriptor<'_>,
    policy: ReturnPolicy,
) -> Result<BufferDescriptor<'static>> {
    let a = a.matrix_view::<f32>(MemoryOrder::Any)?;
    let b = b.matrix_view::<f32>(MemoryOrder::Any)?;
    if (a.rows(), a.cols()) != (b.rows(), b.cols()) {
        return Err(Error::invalid_shape(
            format!("{}x{}", a.rows(), a.cols()),
            format!("{}x{}", b.rows(), b.cols()),
        ));
    }
    let (mut desc, _token) = allocate_owned_ordered(
        &[a.rows(), a.cols()],
        DType::Float32,
        MemoryOrder::ColumnMajor,
    )?;
    let mut out = desc.matrix_view_mut::<f32>(MemoryOrder::ColumnMajor)?;
    out.fill_with(|r, c| a.at(r, c) + b.at(r, c));
    drop(out);
    export(desc, policy)
}

/// A vector holding `1, 2, ..., size`.
pub fn vector(size: usize, policy: ReturnPolicy) -> Result<BufferDescriptor<'static>> {
    let (mut desc, _token) = allocate_owned_ordered(&[size], DType::Float32, MemoryOrder::RowMajor)?;
    let mut v = desc.vector_view_mut::<f32>()?;
    v.fill_with(|i| (i + 1) as f32);
    drop(v);
    export(desc, policy)
}

/// Sets element 0 of a non-empty vector to 99 in place. Returns the new first
/// element, or `None` for an empty vector.
pub fn vector_modify(desc: &mut BufferDescriptor<'_>) -> Result<Option<f32>> {
    let mut v = desc.vector_view_mut::<f32>()?;
    if v.is_empty() {
        return Ok(None);
    }
    v.set(0, 99.0);
    log::info!("modified vector[0] = {:.1}", v.at(0));
    Ok(Some(v.at(0)))
}

/// Doubles every element of a one-dimensional `f32` array in place.
pub fn map_vector(desc: &mut BufferDescriptor<'_>) -> Result<()> {
    require_ndim(desc, 1)?;
    desc.vector_view_mut::<f32>()?.map_inplace(|x| x * 2.0);
    Ok(())
}

/// Doubles every element of a two-dimensional `f32` array in place.
pub fn map_matrix(desc: &mut BufferDescriptor<'_>) -> Result<()> {
    require_ndim(desc, 2)?;
    desc.matrix_view_mut::<f32>(MemoryOrder::Any)?
        .map_inplace(|x| x * 2.0);
    Ok(())
}

fn require_ndim(desc: &BufferDescriptor<'_>, ndim: usize) -> Result<()> {
    if desc.ndim() == ndim {
        Ok(())
    } else {
        Err(Error::invalid_shape(
            format!("a {ndim}D array"),
            format!("a {}D array", desc.ndim()),
        ))
    }
}
