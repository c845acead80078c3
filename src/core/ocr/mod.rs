//! OCR 检测管线 - 判断画面中是否出现指定关键字
//!
//! 核心策略：
//! 1. 多种预处理 - Otsu / 自适应均值 / 自适应高斯 / 原图
//! 2. 多种识别模式 - 单行、整块、稀疏文本
//! 3. 并行执行 - 所有变体同时跑，任一命中即为命中

pub mod detector;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod preprocess;

pub use detector::{normalize, DetectionOutcome, ExtractionResult, KeywordSet, ParallelDetector};
pub use error::OcrError;
pub use extractor::{MockTextExtractor, RecognitionMode, TesseractExtractor, TextExtractor, ALNUM_CHARSET};
pub use pipeline::{select_variants, PipelineVariant, DEFAULT_VARIANTS};
pub use preprocess::{Preprocessor, ThresholdParams};
