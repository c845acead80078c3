//! 摄像头采集 - 通过 ffmpeg 单次抓帧
//!
//! 设备只在 ffmpeg 子进程存活期间被占用，`capture` 返回前子进程已退出。

use super::error::CaptureError;
use super::frame::Frame;
use super::{CaptureOutcome, FrameSource};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraInfo {
    pub index: u32,
    pub device: String,
    /// 驱动上报的设备名
    pub name: Option<String>,
}

pub struct FfmpegCamera {
    index: u32,
    output_path: PathBuf,
    ffmpeg: Option<PathBuf>,
    frame_counter: u64,
}

impl FfmpegCamera {
    pub fn new(index: u32, output_path: PathBuf, ffmpeg: Option<PathBuf>) -> Self {
        info!("📷 FfmpegCamera: device {} -> {:?}", device_path(index), output_path);
        Self {
            index,
            output_path,
            ffmpeg,
            frame_counter: 0,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    fn resolve_ffmpeg(&self) -> Result<PathBuf, CaptureError> {
        match &self.ffmpeg {
            Some(path) => Ok(path.clone()),
            None => which::which("ffmpeg").map_err(|e| {
                CaptureError::DeviceUnavailable(format!("ffmpeg not found in PATH: {}", e))
            }),
        }
    }

    fn open_device(&self) -> Result<PathBuf, CaptureError> {
        if cfg!(not(any(target_os = "linux", target_os = "macos"))) {
            return Err(CaptureError::DeviceUnavailable(
                "camera capture is only supported on Linux and macOS".to_string(),
            ));
        }
        let device = device_path(self.index);
        if cfg!(target_os = "linux") && !Path::new(&device).exists() {
            return Err(CaptureError::DeviceUnavailable(format!("cannot open {}", device)));
        }
        self.resolve_ffmpeg()
    }

    fn command_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if cfg!(target_os = "macos") {
            args.extend(["-f", "avfoundation", "-framerate", "30"].map(String::from));
        } else {
            args.extend(["-f", "v4l2"].map(String::from));
        }
        args.push("-i".to_string());
        args.push(device_path(self.index));

        args.extend(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"].map(String::from));
        args
    }

    /// `Ok(None)` 表示设备忙或断开，没有拿到帧
    fn grab(&self, ffmpeg: &Path) -> Result<Option<image::DynamicImage>, CaptureError> {
        let output = Command::new(ffmpeg)
            .args(self.command_args())
            .output()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("{}: {}", ffmpeg.display(), e)))?;

        if !output.status.success() {
            warn!(
                "⚠️ ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }
        if output.stdout.is_empty() {
            warn!("⚠️ ffmpeg produced no frame");
            return Ok(None);
        }

        match image::load_from_memory(&output.stdout) {
            Ok(image) => Ok(Some(image)),
            Err(e) => {
                warn!("⚠️ Failed to decode captured frame: {}", e);
                Ok(None)
            }
        }
    }
}

impl FrameSource for FfmpegCamera {
    fn capture(&mut self) -> Result<CaptureOutcome, CaptureError> {
        let ffmpeg = self.open_device()?;

        let image = match self.grab(&ffmpeg)? {
            Some(image) => image,
            None => return Ok(CaptureOutcome::NoFrame),
        };

        self.frame_counter += 1;
        let frame = Frame::new(image, self.output_path.clone(), self.frame_counter);
        frame.persist()?;
        debug!(
            "Frame {} saved to {:?} ({}x{})",
            frame.frame_number,
            frame.path,
            frame.width(),
            frame.height()
        );

        Ok(CaptureOutcome::Captured(frame))
    }
}

fn device_path(index: u32) -> String {
    if cfg!(target_os = "macos") {
        index.to_string()
    } else {
        format!("/dev/video{}", index)
    }
}

/// Enumerates contiguous device indexes starting at 0, stopping at the first gap.
pub fn list_cameras() -> Vec<CameraInfo> {
    if !cfg!(target_os = "linux") {
        warn!("Camera enumeration is only supported on Linux");
        return Vec::new();
    }

    let mut cameras = Vec::new();
    for index in 0u32.. {
        let device = device_path(index);
        if !Path::new(&device).exists() {
            break;
        }
        let name = std::fs::read_to_string(format!("/sys/class/video4linux/video{}/name", index))
            .ok()
            .map(|s| s.trim().to_string());
        info!("📷 Camera {}: {} ({})", index, device, name.as_deref().unwrap_or("unknown"));
        cameras.push(CameraInfo {
            index,
            device,
            name,
        });
    }
    cameras
}
