//! Element type tags and their mapping to Rust scalar types.

use std::{fmt, str::FromStr};

use ndshare_common::error::Error;
use serde::{Deserialize, Serialize};

/// Element type of an array buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
}

/// Type code of a [`DType`], numbered as in DLPack (`kDLInt`, `kDLUInt`,
/// `kDLFloat`, `kDLBool`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DTypeCode {
    Int = 0,
    UInt = 1,
    Float = 2,
    Bool = 6,
}

impl DType {
    pub const ALL: [DType; 12] = [
        DType::Bool,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
        DType::Float16,
        DType::Float32,
        DType::Float64,
    ];

    pub fn code(self) -> DTypeCode {
        match self {
            DType::Bool => DTypeCode::Bool,
            DType::Int8 | DType::Int16 | DType::Int32 | DType::Int64 => DTypeCode::Int,
            DType::UInt8 | DType::UInt16 | DType::UInt32 | DType::UInt64 => DTypeCode::UInt,
            DType::Float16 | DType::Float32 | DType::Float64 => DTypeCode::Float,
        }
    }

    /// Width of one lane in bits.
    pub const fn bits(self) -> u8 {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 => 8,
            DType::Int16 | DType::UInt16 | DType::Float16 => 16,
            DType::Int32 | DType::UInt32 | DType::Float32 => 32,
            DType::Int64 | DType::UInt64 | DType::Float64 => 64,
        }
    }

    /// Number of lanes per element. Vector element types are not supported.
    pub fn lanes(self) -> u16 {
        1
    }

    /// Size of one element in bytes.
    #[inline]
    pub const fn size(self) -> usize {
        self.bits() as usize / 8
    }

    /// Required alignment of element addresses in bytes.
    #[inline]
    pub fn alignment(self) -> usize {
        self.size()
    }

    pub fn is_float(self) -> bool {
        self.code() == DTypeCode::Float
    }

    pub fn is_integer(self) -> bool {
        matches!(self.code(), DTypeCode::Int | DTypeCode::UInt)
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float16 => "float16",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    /// Resolves a DLPack-style `(code, bits, lanes)` triple.
    pub fn from_parts(code: DTypeCode, bits: u8, lanes: u16) -> Option<DType> {
        if lanes != 1 {
            return None;
        }
        DType::ALL
            .into_iter()
            .find(|dtype| dtype.code() == code && dtype.bits() == bits)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::ALL
            .into_iter()
            .find(|dtype| dtype.name() == s)
            .ok_or_else(|| Error::invalid_arg("dtype", format!("unknown element type '{s}'")))
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A Rust scalar type that can be read from and written to array memory.
///
/// The `bytemuck::Pod` bound makes every bit pattern of the element size a valid
/// value, so elements are read straight out of foreign memory. Views step through
/// memory in units of `size_of::<T>()` after checking only `T::DTYPE`, so the trait
/// is sealed: the implementations below are the only ones, and each is checked at
/// compile time to have exactly `DTYPE.size()` bytes.
///
/// ```compile_fail
/// use ndshare_exchange::{DType, Element};
///
/// #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
/// #[repr(transparent)]
/// struct Wide([u64; 4]);
///
/// impl Element for Wide {
///     const DTYPE: DType = DType::UInt8;
/// }
/// ```
pub trait Element: sealed::Sealed + bytemuck::Pod + Send + Sync + 'static {
    const DTYPE: DType;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Element for $ty {
                const DTYPE: DType = {
                    assert!(std::mem::size_of::<$ty>() == DType::$dtype.size());
                    DType::$dtype
                };
            }
        )*
    };
}

impl_element! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    half::f16 => Float16,
    f32 => Float32,
    f64 => Float64,
}
