pub mod capture;
pub mod mute;
pub mod ocr;
