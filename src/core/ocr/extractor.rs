//! Tesseract OCR 封装

use super::error::OcrError;
use image::{DynamicImage, ImageFormat};
use log::{debug, error};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// 大小写拉丁字母 + 数字，过滤符号噪声
pub const ALNUM_CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// OCR 引擎对文字版面的假设
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    SingleLine,
    UniformBlock,
    SparseText,
}

impl RecognitionMode {
    /// Tesseract page segmentation mode
    pub fn psm(&self) -> u8 {
        match self {
            RecognitionMode::SingleLine => 7,
            RecognitionMode::UniformBlock => 6,
            RecognitionMode::SparseText => 11,
        }
    }
}

pub trait TextExtractor: Send + Sync {
    /// Returns the raw recognized text, line breaks included.
    fn extract(
        &self,
        image: &DynamicImage,
        mode: RecognitionMode,
        charset: &str,
    ) -> Result<String, OcrError>;
}

pub struct TesseractExtractor {
    binary: PathBuf,
    language: String,
}

impl TesseractExtractor {
    /// 在 PATH 中查找 tesseract
    pub fn new(language: &str) -> Result<Self, OcrError> {
        let binary = which::which("tesseract").map_err(|e| {
            error!("❌ tesseract not found in PATH: {}", e);
            OcrError::EngineUnavailable(format!("tesseract not found in PATH: {}", e))
        })?;
        Ok(Self::with_binary(binary, language))
    }

    pub fn with_binary(binary: impl Into<PathBuf>, language: &str) -> Self {
        Self {
            binary: binary.into(),
            language: language.to_string(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command_args(&self, mode: RecognitionMode, charset: &str) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
            "--psm".to_string(),
            mode.psm().to_string(),
            "-c".to_string(),
            format!("tessedit_char_whitelist={}", charset),
        ]
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract(
        &self,
        image: &DynamicImage,
        mode: RecognitionMode,
        charset: &str,
    ) -> Result<String, OcrError> {
        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;

        let mut child = Command::new(&self.binary)
            .args(self.command_args(mode, charset))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                OcrError::EngineUnavailable(format!("{}: {}", self.binary.display(), e))
            })?;

        // tesseract 读完 stdin 才开始识别，先写完再等待输出。
        // 写入失败（引擎提前退出）也必须回收子进程
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(png.get_ref()),
            None => Ok(()),
        };
        let output = child.wait_with_output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(OcrError::Engine(format!(
                "psm {} exited with {}: {}",
                mode.psm(),
                output.status,
                stderr
            )));
        }
        written?;

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        debug!("tesseract psm {} -> {:?}", mode.psm(), text);
        Ok(text)
    }
}

type ExtractFn = dyn Fn(RecognitionMode) -> Result<String, OcrError> + Send + Sync;

/// 测试用：按识别模式返回预设文本
pub struct MockTextExtractor {
    pattern: Box<ExtractFn>,
}

impl MockTextExtractor {
    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(RecognitionMode) -> Result<String, OcrError> + Send + Sync + 'static,
    {
        Self {
            pattern: Box::new(pattern),
        }
    }

    pub fn with_fixed_text(text: &str) -> Self {
        let text = text.to_string();
        Self::with_pattern(move |_| Ok(text.clone()))
    }

    pub fn failing() -> Self {
        Self::with_pattern(|_| Err(OcrError::Engine("mock failure".to_string())))
    }
}

impl TextExtractor for MockTextExtractor {
    fn extract(
        &self,
        _image: &DynamicImage,
        mode: RecognitionMode,
        _charset: &str,
    ) -> Result<String, OcrError> {
        (self.pattern)(mode)
    }
}
