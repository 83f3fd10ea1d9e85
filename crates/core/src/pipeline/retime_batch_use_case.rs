use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::probe_duration_use_case::ProbeDurationUseCase;
use crate::pipeline::retime_clip_use_case::{RetimeClipUseCase, RetimeReport, RetimeRequest};
use crate::shared::batch_config::BatchConfig;
use crate::shared::clip_error::ClipError;
use crate::shared::clip_pair::{display_name, ClipPair};

const BANNER_WIDTH: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    MissingSubject,
    MissingReference,
}

#[derive(Debug)]
pub enum SlotStatus {
    Completed {
        target_duration: f64,
        report: RetimeReport,
    },
    Skipped(SkipReason),
    Failed(ClipError),
}

/// Result for one slot of one page.
#[derive(Debug)]
pub struct SlotOutcome {
    pub page: u32,
    pub slot: u32,
    pub flip: bool,
    pub pair: ClipPair,
    pub status: SlotStatus,
}

/// Everything a batch run did, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<SlotOutcome>,
    /// Pages whose directory did not exist.
    pub missing_pages: Vec<u32>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, SlotStatus::Completed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, SlotStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, SlotStatus::Failed(_)))
    }

    pub fn outcome(&self, page: u32, slot: u32) -> Option<&SlotOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.page == page && o.slot == slot)
    }

    /// One-line tally for the closing banner.
    pub fn tally(&self) -> String {
        let mut line = format!(
            "{} completed, {} skipped, {} failed",
            self.completed(),
            self.skipped(),
            self.failed()
        );
        if !self.missing_pages.is_empty() {
            let pages: Vec<String> = self.missing_pages.iter().map(u32::to_string).collect();
            line.push_str(&format!(" (missing pages: {})", pages.join(", ")));
        }
        line
    }

    fn count(&self, pred: impl Fn(&SlotStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Walks every page and slot in the config, matching each subject clip to
/// its reference's duration.
///
/// Per-slot problems are recorded in the report and never stop the run.
pub struct RetimeBatchUseCase {
    config: BatchConfig,
    probe: ProbeDurationUseCase,
    retime: RetimeClipUseCase,
}

impl RetimeBatchUseCase {
    pub fn new(
        config: BatchConfig,
        probe: ProbeDurationUseCase,
        retime: RetimeClipUseCase,
    ) -> Self {
        Self {
            config,
            probe,
            retime,
        }
    }

    pub fn execute(&mut self, logger: &mut dyn PipelineLogger) -> BatchReport {
        let mut report = BatchReport::default();

        for page in self.config.pages.clone() {
            let page_dir = self.config.page_dir(page);
            if !page_dir.is_dir() {
                logger.warn(&format!(
                    "Warning: {} does not exist, skipping...",
                    page_dir.display()
                ));
                report.missing_pages.push(page);
                continue;
            }

            let flip = self.config.flip_for(page);
            logger.info(&"=".repeat(BANNER_WIDTH));
            logger.info(&format!(
                "Processing page{page}: {}",
                if flip { "WITH FLIP" } else { "NO FLIP" }
            ));
            logger.info(&"=".repeat(BANNER_WIDTH));

            for slot in self.config.slots.clone() {
                let pair = ClipPair::for_slot(&page_dir, slot, &self.config.extension);
                let status = self.process_slot(&pair, flip, logger);
                report.outcomes.push(SlotOutcome {
                    page,
                    slot,
                    flip,
                    pair,
                    status,
                });
            }
        }

        report
    }

    fn process_slot(
        &mut self,
        pair: &ClipPair,
        flip: bool,
        logger: &mut dyn PipelineLogger,
    ) -> SlotStatus {
        if !pair.subject.exists() {
            logger.warn(&format!(
                "Warning: {} not found, skipping...",
                pair.subject.display()
            ));
            return SlotStatus::Skipped(SkipReason::MissingSubject);
        }
        if !pair.reference.exists() {
            logger.warn(&format!(
                "Warning: {} not found, skipping...",
                pair.reference.display()
            ));
            return SlotStatus::Skipped(SkipReason::MissingReference);
        }

        logger.info(&format!("\nProcessing {}:", display_name(&pair.subject)));

        match self.retime_pair(pair, flip, logger) {
            Ok((target_duration, report)) => {
                logger.info(&format!(
                    "  Saved to: {} ({} frames at {:.2} fps)",
                    display_name(&pair.output),
                    report.frames_written,
                    report.frame_rate
                ));
                SlotStatus::Completed {
                    target_duration,
                    report,
                }
            }
            Err(e) => {
                logger.error(&format!(
                    "  Error processing {}: {e}",
                    display_name(&pair.subject)
                ));
                SlotStatus::Failed(e)
            }
        }
    }

    fn retime_pair(
        &mut self,
        pair: &ClipPair,
        flip: bool,
        logger: &mut dyn PipelineLogger,
    ) -> Result<(f64, RetimeReport), ClipError> {
        let target_duration = self.probe.execute(&pair.reference)?;
        logger.info(&format!(
            "  Target duration from {}: {target_duration:.2}s",
            display_name(&pair.reference)
        ));

        let request = RetimeRequest {
            source: &pair.subject,
            output: &pair.output,
            target_duration,
            flip,
        };
        let report = self.retime.execute(&request, logger)?;
        Ok((target_duration, report))
    }
}
