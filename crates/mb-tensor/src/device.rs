use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::backend::ComputeBackend;
use crate::cpu::CpuBackend;
use crate::error::{Result, TensorError};
use crate::stream::StreamBackend;

/// An execution device, chosen once per process by [`probe_device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    /// The host CPU.
    Cpu,
    /// A CUDA device with the given ordinal.
    Cuda { ordinal: usize },
}

impl Device {
    pub fn is_accelerator(&self) -> bool {
        !matches!(self, Device::Cpu)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda { ordinal } => write!(f, "cuda:{}", ordinal),
        }
    }
}

/// Which device the caller would like to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Use an accelerator if one is present, the host otherwise.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl FromStr for DevicePreference {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "cpu" | "host" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            other => Err(TensorError::Other(format!(
                "unknown device preference '{}' (expected auto, cpu or cuda)",
                other
            ))),
        }
    }
}

/// Returns true if a CUDA device can be opened in this process.
pub fn accelerator_available() -> bool {
    #[cfg(feature = "cuda")]
    {
        crate::cuda::is_cuda_available()
    }
    #[cfg(not(feature = "cuda"))]
    {
        false
    }
}

/// Resolve a preference into a concrete device.
///
/// An absent accelerator is not an error: the host is used instead.
pub fn probe_device(preference: DevicePreference) -> Device {
    let device = match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Auto | DevicePreference::Cuda => {
            if accelerator_available() {
                Device::Cuda { ordinal: 0 }
            } else {
                if preference == DevicePreference::Cuda {
                    warn!("CUDA requested but no device is available, falling back to cpu");
                }
                Device::Cpu
            }
        }
    };
    info!(%device, ?preference, "device selected");
    device
}

/// The backend that defines ground truth.
pub fn reference_backend() -> Box<dyn ComputeBackend> {
    Box::new(CpuBackend::new())
}

/// The accelerator-capable backend for `device`.
///
/// If the device cannot be initialized the host stream backend is returned.
pub fn accelerated_backend(device: Device) -> Result<Box<dyn ComputeBackend>> {
    match device {
        Device::Cpu => Ok(Box::new(StreamBackend::new()?)),
        #[cfg(feature = "cuda")]
        Device::Cuda { ordinal } => match crate::cuda::CudaBackend::new(ordinal) {
            Ok(backend) => Ok(Box::new(backend)),
            Err(e) => {
                warn!(error = %e, "CUDA backend unavailable, falling back to host stream");
                Ok(Box::new(StreamBackend::new()?))
            }
        },
        #[cfg(not(feature = "cuda"))]
        Device::Cuda { ordinal } => {
            let e = TensorError::DeviceUnavailable(format!(
                "cuda:{} requested but built without the `cuda` feature",
                ordinal
            ));
            warn!(error = %e, "falling back to host stream");
            Ok(Box::new(StreamBackend::new()?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preference() {
        assert_eq!("auto".parse::<DevicePreference>().unwrap(), DevicePreference::Auto);
        assert_eq!(" CPU ".parse::<DevicePreference>().unwrap(), DevicePreference::Cpu);
        assert_eq!("cuda".parse::<DevicePreference>().unwrap(), DevicePreference::Cuda);
        assert!("tpu".parse::<DevicePreference>().is_err());
    }

    #[test]
    fn test_cpu_preference_is_honoured() {
        assert_eq!(probe_device(DevicePreference::Cpu), Device::Cpu);
    }

    #[test]
    fn test_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Cuda { ordinal: 1 }.to_string(), "cuda:1");
        assert!(Device::Cuda { ordinal: 0 }.is_accelerator());
    }

    #[test]
    fn test_host_accelerated_backend() {
        let backend = accelerated_backend(Device::Cpu).unwrap();
        assert_eq!(backend.name(), "stream");
        assert_eq!(backend.device(), Device::Cpu);
        assert!(backend.is_asynchronous());
    }

    #[test]
    fn test_missing_accelerator_falls_back_to_host() {
        if accelerator_available() {
            return;
        }
        assert_eq!(probe_device(DevicePreference::Auto), Device::Cpu);
        assert_eq!(probe_device(DevicePreference::Cuda), Device::Cpu);
        let backend = accelerated_backend(Device::Cuda { ordinal: 0 }).unwrap();
        assert_eq!(backend.device(), Device::Cpu);
        assert_eq!(backend.name(), "stream");
    }
}
