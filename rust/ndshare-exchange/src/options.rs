//! Allocation settings of an [`Exchange`](crate::Exchange).

use ndshare_common::{Result, error::Error, verify_arg};
use serde::{Deserialize, Serialize};

use crate::layout::MemoryOrder;

/// Largest supported buffer alignment (a page).
pub const MAX_ALIGNMENT: usize = 4096;

/// Settings applied to buffers allocated by an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeOptions {
    /// Alignment of allocated buffers in bytes. A power of two, at most
    /// [`MAX_ALIGNMENT`].
    pub alignment: usize,
    /// Upper bound on a single allocation in bytes.
    pub max_allocation_bytes: Option<usize>,
    /// Order of allocated arrays when the caller does not ask for one.
    pub default_order: MemoryOrder,
}

impl Default for ExchangeOptions {
    fn default() -> Self {
        ExchangeOptions {
            alignment: 64,
            max_allocation_bytes: None,
            default_order: MemoryOrder::RowMajor,
        }
    }
}

impl ExchangeOptions {
    pub fn validate(&self) -> Result<()> {
        verify_arg!(alignment, self.alignment.is_power_of_two());
        verify_arg!(alignment, self.alignment <= MAX_ALIGNMENT);
        if self.default_order == MemoryOrder::Any {
            return Err(Error::invalid_arg(
                "default_order",
                "allocations need a contiguous order",
            ));
        }
        Ok(())
    }

    /// Parses options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<ExchangeOptions> {
        let options: ExchangeOptions = serde_json::from_str(json)
            .map_err(|e| Error::invalid_arg("options", e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::invalid_arg("options", e.to_string()))
    }

    /// Checks an allocation of `size` bytes against the configured limit.
    pub fn check_allocation(&self, size: usize) -> Result<()> {
        match self.max_allocation_bytes {
            Some(limit) if size > limit => Err(Error::allocation(
                size,
                format!("exceeds the configured limit of {limit} bytes"),
            )),
            _ => Ok(()),
        }
    }
}
