//! 配置 - JSON5 文件 + 环境变量覆盖

use crate::core::ocr::{select_variants, KeywordSet, PipelineVariant, ThresholdParams};
use image::ImageFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// webhook 地址属于密钥，优先从环境变量读取
pub const WEBHOOK_ENV: &str = "UN_MUTE_WEBHOOK";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Missing required setting: {0}")]
    MissingField(String),
    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub detection: DetectionConfig,
    pub ocr: OcrConfig,
    pub actuator: ActuatorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    /// false 时不打开摄像头，直接识别 `image_path` 上已有的图片
    pub enabled: bool,
    pub image_path: PathBuf,
    pub poll_interval_secs: u64,
    /// None = 在 PATH 中查找
    pub ffmpeg_path: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            enabled: true,
            image_path: PathBuf::from("images/picture.png"),
            poll_interval_secs: 5,
            ffmpeg_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// 逗号分隔的关键字列表
    pub keywords: String,
    pub block_size: u32,
    pub c: i32,
    /// 为空时启用全部变体
    pub variants: Vec<String>,
    /// 0 = 按 CPU 核数
    pub workers: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let params = ThresholdParams::default();
        Self {
            keywords: String::new(),
            block_size: params.block_size,
            c: params.c,
            variants: Vec::new(),
            workers: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract_path: Option<PathBuf>,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub mute_url: Option<String>,
    /// None = 与 mute_url 相同
    pub unmute_url: Option<String>,
    pub timeout_secs: f64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            mute_url: None,
            unmute_url: None,
            timeout_secs: 5.0,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads the file, applies environment overrides and validates everything.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(WEBHOOK_ENV).filter(|u| !u.is_empty()) {
            self.actuator.mute_url = Some(url);
        }
    }

    /// 只校验检测相关的配置（`detect` 子命令不需要 webhook）
    pub fn validate_detection(&self) -> Result<(), ConfigError> {
        if self.keywords().is_empty() {
            return Err(ConfigError::MissingField("detection.keywords".to_string()));
        }
        let block_size = self.detection.block_size;
        if block_size < 3 || block_size % 2 == 0 {
            return Err(ConfigError::InvalidValue {
                field: "detection.block_size".to_string(),
                value: block_size.to_string(),
            });
        }
        self.variants()?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_detection()?;

        match self.actuator.mute_url.as_deref() {
            Some(url) if !url.is_empty() => {}
            _ => {
                return Err(ConfigError::MissingField(format!(
                    "actuator.mute_url (or {})",
                    WEBHOOK_ENV
                )))
            }
        }
        let timeout = self.actuator.timeout_secs;
        if timeout <= 0.0 || Duration::try_from_secs_f64(timeout).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "actuator.timeout_secs".to_string(),
                value: timeout.to_string(),
            });
        }
        self.validate_image_path()?;
        if self.camera.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "camera.poll_interval_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// 摄像头模式下每轮按扩展名编码落盘，关闭时按扩展名解码
    fn validate_image_path(&self) -> Result<(), ConfigError> {
        let path = &self.camera.image_path;
        let supported = ImageFormat::from_path(path).is_ok_and(|format| {
            if self.camera.enabled {
                format.writing_enabled()
            } else {
                format.reading_enabled()
            }
        });
        if !supported {
            return Err(ConfigError::InvalidValue {
                field: "camera.image_path".to_string(),
                value: path.display().to_string(),
            });
        }
        Ok(())
    }

    pub fn keywords(&self) -> KeywordSet {
        KeywordSet::parse(&self.detection.keywords)
    }

    pub fn threshold_params(&self) -> ThresholdParams {
        ThresholdParams {
            block_size: self.detection.block_size,
            c: self.detection.c,
        }
    }

    pub fn variants(&self) -> Result<Vec<PipelineVariant>, ConfigError> {
        select_variants(&self.detection.variants).map_err(|name| ConfigError::InvalidValue {
            field: "detection.variants".to_string(),
            value: name,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.camera.poll_interval_secs)
    }

    /// Falls back to the default timeout when the value is out of range; `validate` rejects those.
    pub fn actuator_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.actuator.timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(ActuatorConfig::default().timeout_secs))
    }
}
