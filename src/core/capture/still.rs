use super::error::CaptureError;
use super::frame::Frame;
use super::{CaptureOutcome, FrameSource};
use log::{info, warn};
use std::path::PathBuf;

/// 摄像头关闭时使用：每轮重新读取已经在磁盘上的图片
pub struct StillImageSource {
    path: PathBuf,
    frame_counter: u64,
}

impl StillImageSource {
    pub fn new(path: PathBuf) -> Self {
        info!("🖼️ StillImageSource: reading {:?}", path);
        Self {
            path,
            frame_counter: 0,
        }
    }
}

impl FrameSource for StillImageSource {
    fn capture(&mut self) -> Result<CaptureOutcome, CaptureError> {
        match image::open(&self.path) {
            Ok(image) => {
                self.frame_counter += 1;
                Ok(CaptureOutcome::Captured(Frame::new(
                    image,
                    self.path.clone(),
                    self.frame_counter,
                )))
            }
            Err(e) => {
                warn!("⚠️ Cannot read {:?}: {}", self.path, e);
                Ok(CaptureOutcome::NoFrame)
            }
        }
    }
}
