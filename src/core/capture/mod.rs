//! 画面采集 - 每轮打开设备、抓取一帧、落盘、释放设备

pub mod camera;
pub mod error;
pub mod frame;
pub mod still;

pub use camera::{list_cameras, CameraInfo, FfmpegCamera};
pub use error::CaptureError;
pub use frame::{Frame, FrameInfo};
pub use still::StillImageSource;

#[derive(Debug)]
pub enum CaptureOutcome {
    Captured(Frame),
    /// 设备已打开但没读到帧，本轮跳过 OCR
    NoFrame,
}

pub trait FrameSource {
    fn capture(&mut self) -> Result<CaptureOutcome, CaptureError>;
}
