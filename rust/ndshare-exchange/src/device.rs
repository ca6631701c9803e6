//! Device/location tags for array memory.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of memory an array lives in, numbered as DLPack device types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Cpu,
    Cuda,
    CudaHost,
    Vulkan,
    Metal,
    Rocm,
    RocmHost,
}

impl DeviceKind {
    pub fn code(self) -> i32 {
        match self {
            DeviceKind::Cpu => 1,
            DeviceKind::Cuda => 2,
            DeviceKind::CudaHost => 3,
            DeviceKind::Vulkan => 7,
            DeviceKind::Metal => 8,
            DeviceKind::Rocm => 10,
            DeviceKind::RocmHost => 11,
        }
    }

    pub fn from_code(code: i32) -> Option<DeviceKind> {
        match code {
            1 => Some(DeviceKind::Cpu),
            2 => Some(DeviceKind::Cuda),
            3 => Some(DeviceKind::CudaHost),
            7 => Some(DeviceKind::Vulkan),
            8 => Some(DeviceKind::Metal),
            10 => Some(DeviceKind::Rocm),
            11 => Some(DeviceKind::RocmHost),
            _ => None,
        }
    }

    /// Returns `true` if the CPU may dereference pointers into this kind of memory.
    pub fn is_host_accessible(self) -> bool {
        matches!(
            self,
            DeviceKind::Cpu | DeviceKind::CudaHost | DeviceKind::RocmHost
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::Cuda => "cuda",
            DeviceKind::CudaHost => "cuda_host",
            DeviceKind::Vulkan => "vulkan",
            DeviceKind::Metal => "metal",
            DeviceKind::Rocm => "rocm",
            DeviceKind::RocmHost => "rocm_host",
        }
    }
}

/// A device kind together with the device ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    pub kind: DeviceKind,
    pub id: i32,
}

impl Device {
    pub const CPU: Device = Device {
        kind: DeviceKind::Cpu,
        id: 0,
    };

    pub fn new(kind: DeviceKind, id: i32) -> Device {
        Device { kind, id }
    }

    #[inline]
    pub fn is_host_accessible(&self) -> bool {
        self.kind.is_host_accessible()
    }
}

impl Default for Device {
    fn default() -> Self {
        Device::CPU
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.name(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        for kind in [
            DeviceKind::Cpu,
            DeviceKind::Cuda,
            DeviceKind::CudaHost,
            DeviceKind::Vulkan,
            DeviceKind::Metal,
            DeviceKind::Rocm,
            DeviceKind::RocmHost,
        ] {
            assert_eq!(DeviceKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(DeviceKind::from_code(4), None);
    }

    #[test]
    fn test_host_access() {
        assert!(Device::CPU.is_host_accessible());
        assert!(Device::new(DeviceKind::CudaHost, 1).is_host_accessible());
        assert!(!Device::new(DeviceKind::Cuda, 0).is_host_accessible());
        assert_eq!(Device::new(DeviceKind::Cuda, 3).to_string(), "cuda:3");
    }
}
