//! 轮询主循环：采集 → 并行 OCR → 静音状态机

use crate::core::capture::{CaptureError, CaptureOutcome, FrameInfo, FrameSource};
use crate::core::mute::{Actuator, MuteController, MuteState, TransitionOutcome};
use crate::core::ocr::{DetectionOutcome, ParallelDetector};
use log::{debug, info, warn};
use std::thread;
use std::time::Duration;

#[derive(Debug)]
pub enum SkipReason {
    NoFrame,
    /// 非致命的采集错误（例如落盘失败）
    CaptureFailed(CaptureError),
    /// 所有 OCR 变体都失败，本轮不改变静音状态
    OcrFailed(DetectionOutcome),
}

#[derive(Debug)]
pub enum CycleReport {
    Skipped(SkipReason),
    Completed {
        frame: FrameInfo,
        outcome: DetectionOutcome,
        transition: TransitionOutcome,
    },
}

/// 广告静音监视器
///
/// 每轮阻塞执行，轮与轮之间不重叠；静音状态由内部的 `MuteController` 独占。
pub struct Monitor<S: FrameSource, A: Actuator> {
    source: S,
    detector: ParallelDetector,
    controller: MuteController<A>,
    interval: Duration,
    cycles: u64,
}

impl<S: FrameSource, A: Actuator> Monitor<S, A> {
    pub fn new(source: S, detector: ParallelDetector, actuator: A, interval: Duration) -> Self {
        info!(
            "🎬 Monitor: created ({} variants, {} keywords, every {:?})",
            detector.variants().len(),
            detector.keywords().len(),
            interval
        );
        Self {
            source,
            detector,
            controller: MuteController::new(actuator),
            interval,
            cycles: 0,
        }
    }

    pub fn state(&self) -> MuteState {
        self.controller.state()
    }

    pub fn controller(&self) -> &MuteController<A> {
        &self.controller
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// One capture → detect → transition pass. Only fatal capture errors are returned.
    pub fn run_cycle(&mut self) -> Result<CycleReport, CaptureError> {
        self.cycles += 1;

        let frame = match self.source.capture() {
            Ok(CaptureOutcome::Captured(frame)) => frame,
            Ok(CaptureOutcome::NoFrame) => {
                warn!("⏭️ Cycle {}: no frame read, skipping", self.cycles);
                return Ok(CycleReport::Skipped(SkipReason::NoFrame));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("⏭️ Cycle {}: {}, skipping", self.cycles, e);
                return Ok(CycleReport::Skipped(SkipReason::CaptureFailed(e)));
            }
        };

        let outcome = self.detector.detect_frame(&frame);
        if outcome.all_failed() {
            warn!(
                "⏭️ Cycle {}: all {} OCR variants failed, skipping",
                self.cycles,
                outcome.results.len()
            );
            return Ok(CycleReport::Skipped(SkipReason::OcrFailed(outcome)));
        }
        let transition = self.controller.apply(outcome.detected);
        debug!(
            "Cycle {} done: detected={} state={:?}",
            self.cycles,
            outcome.detected,
            self.controller.state()
        );

        Ok(CycleReport::Completed {
            frame: FrameInfo::from_frame(&frame),
            outcome,
            transition,
        })
    }

    /// Runs `count` cycles back to back, sleeping the poll interval between them.
    pub fn run_cycles(&mut self, count: u64) -> Result<Vec<CycleReport>, CaptureError> {
        let mut reports = Vec::with_capacity(count as usize);
        for i in 0..count {
            if i > 0 {
                thread::sleep(self.interval);
            }
            reports.push(self.run_cycle()?);
        }
        Ok(reports)
    }

    /// Polls forever. Returns only when the capture device becomes unavailable.
    pub fn run(&mut self) -> Result<(), CaptureError> {
        loop {
            self.run_cycle()?;
            thread::sleep(self.interval);
        }
    }
}

impl<S: FrameSource, A: Actuator> Drop for Monitor<S, A> {
    fn drop(&mut self) {
        info!(
            "🗑️ Monitor: released after {} cycles ({} transitions)",
            self.cycles,
            self.controller.committed_count()
        );
    }
}
