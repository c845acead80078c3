use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Failed to persist frame: {0}")]
    Persist(#[from] std::io::Error),
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
}

impl CaptureError {
    /// 设备打不开时终止进程，其余错误只跳过本轮
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptureError::DeviceUnavailable(_))
    }
}
