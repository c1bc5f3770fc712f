//! Where transform output tensors live.

use candle_core::Device;
use serde::Deserialize;
use tracing::{debug, info};

/// Requested placement for image tensors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePreference {
    /// Always the CPU.
    #[default]
    Cpu,
    /// Metal or CUDA when compiled in and a device opens, else the CPU.
    Auto,
}

/// Resolves `preference` to a device.
///
/// Batches can only be stacked on one device, so every item of a dataset
/// should come from the same resolved preference.
#[must_use]
pub fn select_device(preference: DevicePreference) -> Device {
    match preference {
        DevicePreference::Cpu => {
            debug!("Placing image tensors on CPU (requested)");
            Device::Cpu
        }
        DevicePreference::Auto => accelerator().unwrap_or_else(|| {
            info!("No accelerator available, placing image tensors on CPU");
            Device::Cpu
        }),
    }
}

/// First accelerator that opens, in Metal then CUDA order.
fn accelerator() -> Option<Device> {
    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            info!("Placing image tensors on Metal device");
            return Some(device);
        }
    }

    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            info!("Placing image tensors on CUDA device");
            return Some(device);
        }
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_preference_is_always_cpu() {
        assert!(select_device(DevicePreference::Cpu).is_cpu());
    }

    #[test]
    #[cfg(not(any(feature = "metal", feature = "cuda")))]
    fn test_auto_without_accelerators_falls_back_to_cpu() {
        assert!(accelerator().is_none());
        assert!(select_device(DevicePreference::Auto).is_cpu());
    }

    #[test]
    fn test_preference_names() {
        #[derive(Deserialize)]
        struct Holder {
            device: DevicePreference,
        }
        let parsed: Holder = serde_json::from_str(r#"{"device": "auto"}"#).unwrap();
        assert_eq!(parsed.device, DevicePreference::Auto);
        assert!(serde_json::from_str::<Holder>(r#"{"device": "gpu"}"#).is_err());
    }
}
