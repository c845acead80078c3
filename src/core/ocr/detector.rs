use super::error::OcrError;
use super::extractor::TextExtractor;
use super::pipeline::PipelineVariant;
use super::preprocess::ThresholdParams;
use crate::core::capture::Frame;
use image::DynamicImage;
use log::{debug, info, warn};
use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// 去掉首尾空白，并把所有换行（`\r\n` / `\n` / `\r`）替换为单个空格
pub fn normalize(text: &str) -> String {
    let trimmed = text.trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut chars = trimmed.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// 关键字集合，大小写敏感的子串匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    /// Empty keywords are dropped, since they would match every frame.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.is_empty())
                .collect(),
        }
    }

    /// 逗号分隔，不做 trim
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// First keyword (in configured order) contained in `normalized`.
    pub fn find_in(&self, normalized: &str) -> Option<&str> {
        self.iter().find(|k| normalized.contains(k))
    }

    pub fn match_text(&self, text: &str) -> Option<&str> {
        self.find_in(&normalize(text))
    }
}

#[derive(Debug)]
pub struct ExtractionResult {
    pub variant: &'static str,
    pub text: Result<String, OcrError>,
    pub elapsed: Duration,
}

impl ExtractionResult {
    pub fn matched<'k>(&self, keywords: &'k KeywordSet) -> Option<&'k str> {
        self.text
            .as_ref()
            .ok()
            .and_then(|text| keywords.match_text(text))
    }
}

#[derive(Debug)]
pub struct DetectionOutcome {
    pub detected: bool,
    pub keyword: Option<String>,
    pub variant: Option<&'static str>,
    /// 按完成顺序排列
    pub results: Vec<ExtractionResult>,
}

impl DetectionOutcome {
    /// First positive result wins. `results` must already be complete.
    pub fn aggregate(results: Vec<ExtractionResult>, keywords: &KeywordSet) -> Self {
        let hit = results
            .iter()
            .find_map(|r| r.matched(keywords).map(|k| (k.to_string(), r.variant)));

        match hit {
            Some((keyword, variant)) => Self {
                detected: true,
                keyword: Some(keyword),
                variant: Some(variant),
                results,
            },
            None => Self {
                detected: false,
                keyword: None,
                variant: None,
                results,
            },
        }
    }

    /// 所有变体都报错：引擎本身不可用，结果不能当作"未检测到"
    pub fn all_failed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.text.is_err())
    }
}

/// 并行检测器：所有变体同时在独立线程池中执行
pub struct ParallelDetector {
    variants: Vec<PipelineVariant>,
    keywords: KeywordSet,
    params: ThresholdParams,
    extractor: Box<dyn TextExtractor>,
    pool: rayon::ThreadPool,
}

impl ParallelDetector {
    /// `workers == 0` sizes the pool from the CPU count, capped at the number of variants.
    pub fn new(
        variants: Vec<PipelineVariant>,
        keywords: KeywordSet,
        params: ThresholdParams,
        extractor: Box<dyn TextExtractor>,
        workers: usize,
    ) -> Result<Self, OcrError> {
        let threads = if workers == 0 {
            num_cpus::get().min(variants.len()).max(1)
        } else {
            workers
        };
        debug!("Using {} threads for OCR variants", threads);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("ocr-worker-{}", i))
            .build()
            .map_err(|e| OcrError::WorkerPool(e.to_string()))?;

        Ok(Self {
            variants,
            keywords,
            params,
            extractor,
            pool,
        })
    }

    pub fn variants(&self) -> &[PipelineVariant] {
        &self.variants
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn detect(&self, frame_path: &Path) -> Result<bool, OcrError> {
        Ok(self.detect_path(frame_path)?.detected)
    }

    pub fn detect_path(&self, frame_path: &Path) -> Result<DetectionOutcome, OcrError> {
        let image = image::open(frame_path)?;
        Ok(self.detect_image(&image))
    }

    pub fn detect_frame(&self, frame: &Frame) -> DetectionOutcome {
        self.detect_image(&frame.image)
    }

    pub fn detect_image(&self, image: &DynamicImage) -> DetectionOutcome {
        let results = self.run_variants(image);

        for result in &results {
            match &result.text {
                Ok(text) => info!(
                    "🔍 {}: {:?} ({:.3}s)",
                    result.variant,
                    text.trim(),
                    result.elapsed.as_secs_f64()
                ),
                Err(e) => warn!(
                    "⚠️ {} failed after {:.3}s: {}",
                    result.variant,
                    result.elapsed.as_secs_f64(),
                    e
                ),
            }
        }

        let outcome = DetectionOutcome::aggregate(results, &self.keywords);
        if let (Some(keyword), Some(variant)) = (&outcome.keyword, outcome.variant) {
            info!("✅ Keyword {:?} found by {}", keyword, variant);
        }
        outcome
    }

    /// Runs every variant and joins them all; results arrive in completion order.
    fn run_variants(&self, image: &DynamicImage) -> Vec<ExtractionResult> {
        let (tx, rx) = mpsc::channel();

        self.pool.scope(|s| {
            for variant in &self.variants {
                let tx = tx.clone();
                s.spawn(move |_| {
                    let started = Instant::now();
                    let prepared = variant.preprocessor.apply(image, &self.params);
                    let text = self.extractor.extract(&prepared, variant.mode, variant.charset);
                    let _ = tx.send(ExtractionResult {
                        variant: variant.name,
                        text,
                        elapsed: started.elapsed(),
                    });
                });
            }
        });
        drop(tx);

        rx.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ocr::extractor::{MockTextExtractor, RecognitionMode};
    use crate::core::ocr::pipeline::DEFAULT_VARIANTS;

    fn keywords() -> KeywordSet {
        KeywordSet::parse("skip,Sponsored,Ad")
    }

    fn detector_with(extractor: MockTextExtractor) -> ParallelDetector {
        ParallelDetector::new(
            DEFAULT_VARIANTS.to_vec(),
            keywords(),
            ThresholdParams::default(),
            Box::new(extractor),
            2,
        )
        .unwrap()
    }

    fn test_image() -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(32, 16, |x, y| {
            image::Rgb([(x * 8) as u8, (y * 16) as u8, 128])
        }))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Sponsored\ncontent  "), "Sponsored content");
        assert_eq!(normalize("a\r\nb\rc\nd"), "a b c d");
        assert_eq!(normalize("\n\nab\n\n"), "ab");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "  Sponsored\ncontent  ",
            "a\r\n\r\nb",
            " x \n y ",
            "\r\n",
            "plain",
            "tab\tand\nnewline\t",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_keyword_set_parse() {
        let set = KeywordSet::parse("skip,,Sponsored, Ad");
        assert_eq!(set.len(), 3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["skip", "Sponsored", " Ad"]);
        assert!(KeywordSet::parse(",,").is_empty());
    }

    #[test]
    fn test_match_is_case_sensitive_substring() {
        let set = keywords();
        assert_eq!(set.match_text("SkipAdNow"), Some("Ad"));
        assert_eq!(set.match_text("skipping"), Some("skip"));
        assert_eq!(set.match_text("SPONSORED"), None);
        assert_eq!(set.match_text("Spon\nsored"), None);
    }

    #[test]
    fn test_match_iff_keyword_in_normalized_text() {
        let texts = ["  Sponsored\ncontent  ", "hello world", "Ad\n", "sk\nip", "xxskipxx"];
        let sets = [keywords(), KeywordSet::parse("world"), KeywordSet::parse("ip,Sp")];

        for text in texts {
            for set in &sets {
                let expected = set.iter().any(|k| normalize(text).contains(k));
                assert_eq!(set.match_text(text).is_some(), expected, "{:?}", text);
            }
        }
    }

    #[test]
    fn test_detect_sponsored_banner() {
        let detector = detector_with(MockTextExtractor::with_fixed_text("  Sponsored\ncontent  "));
        let outcome = detector.detect_image(&test_image());

        assert!(outcome.detected);
        assert_eq!(outcome.keyword.as_deref(), Some("Sponsored"));
        assert!(outcome.variant.is_some());
        assert_eq!(outcome.results.len(), DEFAULT_VARIANTS.len());
    }

    #[test]
    fn test_detect_no_keyword() {
        let detector = detector_with(MockTextExtractor::with_fixed_text("hello world"));
        let outcome = detector.detect_image(&test_image());

        assert!(!outcome.detected);
        assert!(outcome.keyword.is_none());
        assert!(outcome.variant.is_none());
        assert_eq!(outcome.results.len(), DEFAULT_VARIANTS.len());
    }

    #[test]
    fn test_single_matching_variant_wins() {
        let detector = detector_with(MockTextExtractor::with_pattern(|mode| match mode {
            RecognitionMode::SparseText => Ok("skip\n".to_string()),
            _ => Ok("nothing here".to_string()),
        }));
        let outcome = detector.detect_image(&test_image());

        assert!(outcome.detected);
        assert_eq!(outcome.variant, Some("raw-sparse"));
        assert_eq!(outcome.keyword.as_deref(), Some("skip"));
    }

    #[test]
    fn test_failed_variants_count_as_no_match() {
        let detector = detector_with(MockTextExtractor::failing());
        let outcome = detector.detect_image(&test_image());

        assert!(!outcome.detected);
        assert_eq!(outcome.results.len(), DEFAULT_VARIANTS.len());
        assert!(outcome.results.iter().all(|r| r.text.is_err()));
        assert!(outcome.all_failed());
    }

    #[test]
    fn test_failure_does_not_hide_other_match() {
        let detector = detector_with(MockTextExtractor::with_pattern(|mode| match mode {
            RecognitionMode::SingleLine => Ok("Ad".to_string()),
            _ => Err(OcrError::Engine("boom".to_string())),
        }));
        let outcome = detector.detect_image(&test_image());

        assert!(outcome.detected);
        assert_eq!(outcome.variant, Some("raw-line"));
        assert!(!outcome.all_failed());
    }

    #[test]
    fn test_boolean_is_deterministic() {
        let detector = detector_with(MockTextExtractor::with_pattern(|mode| match mode {
            RecognitionMode::UniformBlock => Ok("Sponsored".to_string()),
            _ => Ok("skip".to_string()),
        }));
        let image = test_image();

        for _ in 0..5 {
            let outcome = detector.detect_image(&image);
            assert!(outcome.detected);
            assert!(matches!(outcome.keyword.as_deref(), Some("Sponsored") | Some("skip")));
        }
    }

    #[test]
    fn test_variants_run_concurrently() {
        use std::collections::HashSet;
        use std::sync::{Arc, Barrier};

        // 每个变体都要等到所有变体同时到达才能返回，串行执行会卡死
        let barrier = Arc::new(Barrier::new(DEFAULT_VARIANTS.len()));
        let extractor = MockTextExtractor::with_pattern(move |_| {
            barrier.wait();
            Ok("hello world".to_string())
        });
        let detector = ParallelDetector::new(
            DEFAULT_VARIANTS.to_vec(),
            keywords(),
            ThresholdParams::default(),
            Box::new(extractor),
            DEFAULT_VARIANTS.len(),
        )
        .unwrap();

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let outcome = detector.detect_image(&test_image());
            let _ = tx.send(outcome);
        });
        let outcome = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("variants did not run concurrently");

        assert!(!outcome.detected);
        let names: HashSet<&str> = outcome.results.iter().map(|r| r.variant).collect();
        let expected: HashSet<&str> = DEFAULT_VARIANTS.iter().map(|v| v.name).collect();
        assert_eq!(outcome.results.len(), DEFAULT_VARIANTS.len());
        assert_eq!(names, expected);
    }

    #[test]
    fn test_detect_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("picture.png");
        test_image().save(&path).unwrap();

        let detector = detector_with(MockTextExtractor::with_fixed_text("Ad"));
        assert!(detector.detect(&path).unwrap());

        let missing = dir.path().join("missing.png");
        assert!(detector.detect_path(&missing).is_err());
    }

    #[test]
    fn test_zero_workers_uses_cpu_count() {
        let detector = ParallelDetector::new(
            DEFAULT_VARIANTS.to_vec(),
            keywords(),
            ThresholdParams::default(),
            Box::new(MockTextExtractor::with_fixed_text("")),
            0,
        )
        .unwrap();
        assert!(detector.pool.current_num_threads() >= 1);
        assert_eq!(detector.variants().len(), 5);
    }
}
