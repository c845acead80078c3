//! 图像预处理 - 灰度 + 降噪 + 二值化
//!
//! 阈值化与 OpenCV 的行为保持一致：灰度权重 299/587/114，
//! 5x5 高斯核 `[1 4 6 4 1] / 16`，自适应阈值使用 replicate 边界。

use image::{DynamicImage, GrayImage, Luma};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preprocessor {
    /// 不做处理，原图直接送 OCR
    Raw,
    Otsu,
    AdaptiveMean,
    AdaptiveGaussian,
}

impl Preprocessor {
    pub fn name(&self) -> &'static str {
        match self {
            Preprocessor::Raw => "raw",
            Preprocessor::Otsu => "otsu",
            Preprocessor::AdaptiveMean => "adaptive-mean",
            Preprocessor::AdaptiveGaussian => "adaptive-gaussian",
        }
    }

    pub fn apply(&self, image: &DynamicImage, params: &ThresholdParams) -> DynamicImage {
        let binary = match self {
            Preprocessor::Raw => return image.clone(),
            Preprocessor::Otsu => otsu_threshold(&blurred_gray(image)),
            Preprocessor::AdaptiveMean => {
                adaptive_mean_threshold(&blurred_gray(image), params.block_size, params.c)
            }
            Preprocessor::AdaptiveGaussian => {
                adaptive_gaussian_threshold(&blurred_gray(image), params.block_size, params.c)
            }
        };
        DynamicImage::ImageLuma8(binary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdParams {
    /// 邻域窗口边长，必须为奇数
    pub block_size: u32,
    /// 从邻域均值中减去的常数
    pub c: i32,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            block_size: 11,
            c: 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Border {
    Replicate,
    Reflect101,
}

impl Border {
    fn index(self, i: isize, len: usize) -> usize {
        let last = len as isize - 1;
        match self {
            Border::Replicate => i.clamp(0, last) as usize,
            Border::Reflect101 => {
                if last <= 0 {
                    return 0;
                }
                let mut i = i;
                while i < 0 || i > last {
                    i = if i < 0 { -i } else { 2 * last - i };
                }
                i as usize
            }
        }
    }
}

pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let r = p[0] as u32;
        let g = p[1] as u32;
        let b = p[2] as u32;
        Luma([((r * 299 + g * 587 + b * 114 + 500) / 1000) as u8])
    })
}

fn blurred_gray(image: &DynamicImage) -> GrayImage {
    gaussian_blur_5x5(&to_grayscale(image))
}

/// 1D 高斯核。size <= 7 时使用 OpenCV 的固定核（sigma = 0）
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    match size {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
        _ => {
            let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
            let center = (size as f32 - 1.0) / 2.0;
            let weights: Vec<f32> = (0..size)
                .map(|i| {
                    let d = i as f32 - center;
                    (-(d * d) / (2.0 * sigma * sigma)).exp()
                })
                .collect();
            let sum: f32 = weights.iter().sum();
            weights.into_iter().map(|w| w / sum).collect()
        }
    }
}

fn separable_filter(gray: &GrayImage, kernel: &[f32], border: Border) -> Vec<f32> {
    let w = gray.width() as usize;
    let h = gray.height() as usize;
    let src = gray.as_raw();
    let radius = (kernel.len() / 2) as isize;

    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = border.index(x as isize + k as isize - radius, w);
                acc += row[sx] as f32 * weight;
            }
            horizontal[y * w + x] = acc;
        }
    }

    let mut out = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = border.index(y as isize + k as isize - radius, h);
                acc += horizontal[sy * w + x] * weight;
            }
            out[y * w + x] = acc;
        }
    }
    out
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

pub fn gaussian_blur_5x5(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let blurred = separable_filter(gray, &gaussian_kernel(5), Border::Reflect101);
    GrayImage::from_fn(w, h, |x, y| Luma([to_u8(blurred[(y * w + x) as usize])]))
}

/// `pixel > level` 记为白色，其余为黑色
pub fn global_threshold(gray: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([if gray.get_pixel(x, y)[0] > level { 255 } else { 0 }])
    })
}

pub fn otsu_threshold(gray: &GrayImage) -> GrayImage {
    if gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }
    let level = imageproc::contrast::otsu_level(gray);
    global_threshold(gray, level)
}

pub fn adaptive_mean_threshold(gray: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let size = block_size.max(3) | 1;
    let kernel = vec![1.0 / size as f32; size as usize];
    adaptive_threshold(gray, &kernel, c)
}

pub fn adaptive_gaussian_threshold(gray: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let size = block_size.max(3) | 1;
    adaptive_threshold(gray, &gaussian_kernel(size), c)
}

fn adaptive_threshold(gray: &GrayImage, kernel: &[f32], c: i32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let local = separable_filter(gray, kernel, Border::Replicate);

    GrayImage::from_fn(w, h, |x, y| {
        let mean = to_u8(local[(y * w + x) as usize]) as i32;
        let src = gray.get_pixel(x, y)[0] as i32;
        Luma([if src - mean > -c { 255 } else { 0 }])
    })
}
