use super::extractor::{RecognitionMode, ALNUM_CHARSET};
use super::preprocess::Preprocessor;

/// 一条检测管线：预处理方式 + 识别模式 + 字符白名单
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineVariant {
    pub name: &'static str,
    pub preprocessor: Preprocessor,
    pub mode: RecognitionMode,
    pub charset: &'static str,
}

impl PipelineVariant {
    pub const fn new(name: &'static str, preprocessor: Preprocessor, mode: RecognitionMode) -> Self {
        Self {
            name,
            preprocessor,
            mode,
            charset: ALNUM_CHARSET,
        }
    }
}

/// Banner-style overlays are short, so the raw variants try single line and
/// sparse text layouts on top of the three thresholded block variants.
pub const DEFAULT_VARIANTS: [PipelineVariant; 5] = [
    PipelineVariant::new("otsu-block", Preprocessor::Otsu, RecognitionMode::UniformBlock),
    PipelineVariant::new("mean-block", Preprocessor::AdaptiveMean, RecognitionMode::UniformBlock),
    PipelineVariant::new(
        "gaussian-block",
        Preprocessor::AdaptiveGaussian,
        RecognitionMode::UniformBlock,
    ),
    PipelineVariant::new("raw-line", Preprocessor::Raw, RecognitionMode::SingleLine),
    PipelineVariant::new("raw-sparse", Preprocessor::Raw, RecognitionMode::SparseText),
];

/// 按名称挑选变体；空列表表示全部。返回第一个未知名称作为错误
pub fn select_variants(names: &[String]) -> Result<Vec<PipelineVariant>, String> {
    if names.is_empty() {
        return Ok(DEFAULT_VARIANTS.to_vec());
    }

    names
        .iter()
        .map(|name| {
            DEFAULT_VARIANTS
                .iter()
                .find(|v| v.name == name.as_str())
                .copied()
                .ok_or_else(|| name.clone())
        })
        .collect()
}
