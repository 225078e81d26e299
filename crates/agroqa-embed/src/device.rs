use candle_core::Device;
use tracing::info;

pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            info!("device: metal");
            return dev;
        }
    }
    #[cfg(feature = "cuda")]
    {
        if let Ok(dev) = Device::new_cuda(0) {
            info!("device: cuda");
            return dev;
        }
    }
    info!("device: cpu");
    Device::Cpu
}
