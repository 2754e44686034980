//! Device probing must never abort the process, whichever features are
//! enabled and whether or not a driver is installed.

use mb_tensor::device::accelerator_available;
use mb_tensor::{accelerated_backend, probe_device, Device, DevicePreference, Matrix, Shape};

#[test]
fn probe_agrees_with_availability() {
    let available = accelerator_available();
    for preference in [DevicePreference::Auto, DevicePreference::Cuda] {
        let device = probe_device(preference);
        assert_eq!(device.is_accelerator(), available, "{:?}", preference);
    }
    assert_eq!(probe_device(DevicePreference::Cpu), Device::Cpu);
}

#[test]
fn probed_device_yields_a_working_backend() {
    let device = probe_device(DevicePreference::Auto);
    let mut backend = accelerated_backend(device).unwrap();
    let a = Matrix::ones(Shape::square(3));
    let c = backend.multiply(&a, &Matrix::identity(3)).unwrap();
    assert_eq!(c, a);
}

#[test]
fn unavailable_cuda_device_falls_back_to_host() {
    if accelerator_available() {
        return;
    }
    let backend = accelerated_backend(Device::Cuda { ordinal: 0 }).unwrap();
    assert_eq!(backend.device(), Device::Cpu);
}

#[cfg(feature = "cuda")]
#[test]
fn missing_driver_reports_device_unavailable() {
    use mb_tensor::cuda::cuda_libraries_present;
    use mb_tensor::{CudaBackend, TensorError};

    if cuda_libraries_present() {
        return;
    }
    assert!(!accelerator_available());
    assert_eq!(probe_device(DevicePreference::Auto), Device::Cpu);
    assert!(matches!(
        CudaBackend::new(0),
        Err(TensorError::DeviceUnavailable(_))
    ));
}
