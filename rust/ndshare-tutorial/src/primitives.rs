//! Plain value types crossing the boundary by value, and a vector crossing it by
//! reference.

use std::{fmt, ops::Index};

use ndshare_exchange::{BufferDescriptor, Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    name: String,
    value: i32,
}

impl Data {
    pub fn new(name: impl Into<String>, value: i32) -> Data {
        Data {
            name: name.into(),
            value,
        }
    }

    /// A `Data` with the given name and a value of zero.
    pub fn from_name(name: impl Into<String>) -> Data {
        Data::new(name, 0)
    }

    pub fn from_values(name: impl Into<String>, value: i32) -> Data {
        Data::new(name, value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn set_value(&mut self, value: i32) {
        self.value = value;
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Data(name={}, value={})", self.name, self.value)
    }
}

/// A growable `f64` vector handed out by reference: callers mutate the native
/// storage instead of receiving converted copies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoubleVector(Vec<f64>);

impl DoubleVector {
    pub fn new(values: Vec<f64>) -> DoubleVector {
        DoubleVector(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<f64> {
        self.0.get(i).copied()
    }

    pub fn push(&mut self, value: f64) {
        self.0.push(value);
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// A one-dimensional descriptor over the vector's storage, without copying.
    pub fn descriptor(&mut self) -> BufferDescriptor<'_> {
        BufferDescriptor::from_slice(&mut self.0)
    }
}

impl From<Vec<f64>> for DoubleVector {
    fn from(values: Vec<f64>) -> Self {
        DoubleVector(values)
    }
}

impl FromIterator<f64> for DoubleVector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        DoubleVector(iter.into_iter().collect())
    }
}

impl Index<usize> for DoubleVector {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

/// `a[i] -= b[i]` for every element.
pub fn subtract_inplace(a: &mut DoubleVector, b: &DoubleVector) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::invalid_shape(
            format!("{} elements", a.len()),
            format!("{} elements", b.len()),
        ));
    }
    a.0.iter_mut().zip(&b.0).for_each(|(x, y)| *x -= y);
    Ok(())
}
