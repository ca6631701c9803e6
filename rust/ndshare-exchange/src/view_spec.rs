//! Static requirements a function places on an incoming array.

use ndshare_common::{Result, error::Error};

use crate::{
    descriptor::BufferDescriptor,
    device::DeviceKind,
    dtype::DType,
    layout::MemoryOrder,
};

/// Rank, extent, memory order and device constraints for a typed view.
///
/// A default spec accepts any host-accessible array. Requirements are checked in a
/// fixed order: device, element type, rank and extents, memory order.
///
/// ```
/// use ndshare_exchange::{MemoryOrder, ViewSpec};
///
/// // A row-major matrix with exactly three columns.
/// let spec = ViewSpec::new()
///     .shape(&[None, Some(3)])
///     .order(MemoryOrder::RowMajor);
/// assert_eq!(spec.required_ndim(), Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSpec {
    ndim: Option<usize>,
    extents: Option<Vec<Option<usize>>>,
    order: MemoryOrder,
    device: Option<DeviceKind>,
}

impl ViewSpec {
    pub fn new() -> ViewSpec {
        ViewSpec {
            order: MemoryOrder::Any,
            ..Default::default()
        }
    }

    /// Rank-2 array in the given order.
    pub fn matrix(order: MemoryOrder) -> ViewSpec {
        ViewSpec::new().ndim(2).order(order)
    }

    /// Rank-1 array with any stride.
    pub fn vector() -> ViewSpec {
        ViewSpec::new().ndim(1)
    }

    pub fn ndim(mut self, ndim: usize) -> ViewSpec {
        self.ndim = Some(ndim);
        self.extents = None;
        self
    }

    /// Requires rank `extents.len()`; `Some(n)` entries pin the extent of that
    /// dimension, `None` entries accept any extent.
    pub fn shape(mut self, extents: &[Option<usize>]) -> ViewSpec {
        self.ndim = Some(extents.len());
        self.extents = Some(extents.to_vec());
        self
    }

    pub fn fixed_shape(self, extents: &[usize]) -> ViewSpec {
        let extents = extents.iter().copied().map(Some).collect::<Vec<_>>();
        self.shape(&extents)
    }

    pub fn order(mut self, order: MemoryOrder) -> ViewSpec {
        self.order = order;
        self
    }

    pub fn device(mut self, kind: DeviceKind) -> ViewSpec {
        self.device = Some(kind);
        self
    }

    pub fn required_ndim(&self) -> Option<usize> {
        self.ndim
    }

    pub fn required_order(&self) -> MemoryOrder {
        self.order
    }

    /// Checks `desc` against these requirements for element type `dtype`.
    pub fn check(&self, dtype: DType, desc: &BufferDescriptor<'_>) -> Result<()> {
        let device = desc.device();
        if !device.is_host_accessible() {
            return Err(Error::unsupported_device(device.to_string()));
        }
        if let Some(kind) = self.device {
            if device.kind != kind {
                return Err(Error::unsupported_device(format!(
                    "{device} (expected {})",
                    kind.name()
                )));
            }
        }

        if desc.dtype() != dtype {
            return Err(Error::type_mismatch(dtype.name(), desc.dtype().name()));
        }

        if let Some(ndim) = self.ndim {
            if desc.ndim() != ndim {
                return Err(Error::invalid_shape(
                    format!("{ndim} dimensions"),
                    format!("{} dimensions", desc.ndim()),
                ));
            }
        }
        if let Some(extents) = &self.extents {
            for (dim, (required, &actual)) in extents.iter().zip(desc.shape()).enumerate() {
                if let Some(required) = *required {
                    if required != actual {
                        return Err(Error::invalid_shape(
                            format!("extent {required} in dimension {dim}"),
                            format!("extent {actual}"),
                        ));
                    }
                }
            }
        }

        if !self.order.is_satisfied_by(desc.shape(), desc.strides()) {
            return Err(Error::layout_mismatch(
                self.order.name(),
                format!("{} (strides {:?})", desc.order(), desc.strides()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndshare_common::error::ErrorKind;

    use super::*;
    use crate::device::Device;

    #[test]
    fn test_check_order_of_requirements() {
        let mut data = [0f32; 12];
        let desc =
            BufferDescriptor::describe(&mut data, &[3, 4], None, MemoryOrder::RowMajor).unwrap();

        // Element type is reported before rank.
        let err = ViewSpec::new().ndim(3).check(DType::Int32, &desc).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));

        // Rank is reported before order.
        let err = ViewSpec::new()
            .ndim(1)
            .order(MemoryOrder::ColumnMajor)
            .check(DType::Float32, &desc)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidShape { .. }));

        let err = ViewSpec::matrix(MemoryOrder::ColumnMajor)
            .check(DType::Float32, &desc)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LayoutMismatch { .. }));

        ViewSpec::matrix(MemoryOrder::RowMajor)
            .check(DType::Float32, &desc)
            .unwrap();
    }

    #[test]
    fn test_fixed_extents() {
        let mut data = [0u8; 24];
        let desc = BufferDescriptor::describe(&mut data, &[2, 4, 3], None, MemoryOrder::Any)
            .unwrap();
        let rgb = ViewSpec::new().shape(&[None, None, Some(3)]);
        rgb.check(DType::UInt8, &desc).unwrap();

        let err = ViewSpec::new()
            .fixed_shape(&[2, 4, 4])
            .check(DType::UInt8, &desc)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidShape { .. }));
    }

    #[test]
    fn test_device_requirement() {
        let mut data = [0f64; 4];
        let desc = BufferDescriptor::from_slice(&mut data);
        ViewSpec::vector()
            .device(DeviceKind::Cpu)
            .check(DType::Float64, &desc)
            .unwrap();
        let err = ViewSpec::vector()
            .device(DeviceKind::CudaHost)
            .check(DType::Float64, &desc)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnsupportedDevice { .. }));
        assert_eq!(desc.device(), Device::CPU);
    }
}
