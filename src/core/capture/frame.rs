use super::error::CaptureError;
use image::DynamicImage;
use std::path::PathBuf;
use std::time::SystemTime;

/// 帧数据结构
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: DynamicImage,
    /// 落盘位置，每轮覆盖
    pub path: PathBuf,
    pub frame_number: u64,
    pub captured_at: SystemTime,
}

impl Frame {
    pub fn new(image: DynamicImage, path: PathBuf, frame_number: u64) -> Self {
        Self {
            image,
            path,
            frame_number,
            captured_at: SystemTime::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel_count(&self) -> usize {
        (self.width() * self.height()) as usize
    }

    /// Overwrites whatever image is already at `path`.
    pub fn persist(&self) -> Result<(), CaptureError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.image.save(&self.path)?;
        Ok(())
    }
}

/// 帧元数据（轻量级，用于日志和周期报告）
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub frame_number: u64,
    pub path: PathBuf,
}

impl FrameInfo {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            frame_number: frame.frame_number,
            path: frame.path.clone(),
        }
    }
}
