//! Batch processing of scanned sheets
//!
//! Decodes and scores many sheets with one configuration and answer key.
//! A failing sheet yields a failed outcome and never stops the others.
//! Outcomes always come back in input order, whether the batch ran
//! sequentially or on the rayon thread pool.

use std::fmt;
use std::time::Instant;

use image::RgbImage;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{BatchConfig, ScannerConfig};
use crate::form::{DecodedForm, FormDecoder, FormLayout};
use crate::scoring::{score, AnswerKey, ScoreResult};
use crate::Result;

/// A named scan read against the batch's shared template
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub scan: RgbImage,
}

impl Sheet {
    pub fn new(name: impl Into<String>, scan: RgbImage) -> Self {
        Self {
            name: name.into(),
            scan,
        }
    }
}

/// A named scan carrying its own template
#[derive(Debug, Clone)]
pub struct SheetJob {
    pub name: String,
    pub template: RgbImage,
    pub scan: RgbImage,
}

impl SheetJob {
    pub fn new(name: impl Into<String>, template: RgbImage, scan: RgbImage) -> Self {
        Self {
            name: name.into(),
            template,
            scan,
        }
    }
}

/// Decoded and scored sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredSheet {
    pub name: String,
    pub form: DecodedForm,
    pub score: ScoreResult,
}

impl fmt::Display for ScoredSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File: {}", self.name)?;
        writeln!(f, "Student number: {}", self.form.student_number)?;
        writeln!(f, "Exam type: {}", self.form.exam_type)?;
        writeln!(f, "Group: {}", self.form.group)?;
        writeln!(f, "Semester: {}", self.form.semester)?;
        writeln!(f, "Answers: {}", self.form.answers)?;
        writeln!(f, "Correct: {}", self.score.correct)?;
        writeln!(f, "Wrong: {}", self.score.wrong)?;
        write!(f, "Blank: {}", self.score.blank)
    }
}

/// Result of one sheet of a batch
#[derive(Debug, Clone)]
pub struct SheetOutcome {
    /// Position of the sheet in the batch input
    pub index: usize,
    pub name: String,
    pub result: Result<ScoredSheet>,
}

impl SheetOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Serializable view of the outcome
    pub fn report(&self) -> SheetReport<'_> {
        match &self.result {
            Ok(sheet) => SheetReport {
                name: &self.name,
                status: "ok",
                form: Some(&sheet.form),
                score: Some(sheet.score),
                error: None,
            },
            Err(e) => SheetReport {
                name: &self.name,
                status: "failed",
                form: None,
                score: None,
                error: Some(e.to_string()),
            },
        }
    }
}

impl fmt::Display for SheetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(sheet) => sheet.fmt(f),
            Err(e) => write!(f, "File: {}\nError: {}", self.name, e),
        }
    }
}

/// JSON shape of a [`SheetOutcome`]
#[derive(Debug, Serialize)]
pub struct SheetReport<'a> {
    pub name: &'a str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<&'a DecodedForm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch processor with sequential or parallel fan-out
#[derive(Debug, Clone, Default)]
pub struct BatchProcessor {
    decoder: FormDecoder,
    config: BatchConfig,
}

impl BatchProcessor {
    /// Create a processor from a validated configuration
    pub fn new(config: &ScannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            decoder: FormDecoder::new(config),
            config: config.batch.clone(),
        })
    }

    /// Read every sheet against one template
    ///
    /// The template is analysed once. If that fails, every sheet reports the
    /// same failure.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for errors that are not confined to one sheet,
    /// such as an answer key that does not fit the answer grid.
    pub fn run(
        &self,
        template: &RgbImage,
        sheets: &[Sheet],
        key: &AnswerKey,
    ) -> Result<Vec<SheetOutcome>> {
        let start = Instant::now();
        let layout = self.decoder.analyze_template(template);
        if let Err(e) = &layout {
            warn!(error = %e, "template analysis failed");
        }

        let results = self.fan_out(sheets, |sheet| {
            let layout = layout.as_ref().map_err(Clone::clone)?;
            self.read_sheet(layout, &sheet.name, &sheet.scan, key)
        });
        let outcomes = collect_outcomes(sheets.iter().map(|s| s.name.as_str()), results)?;
        summarize(&outcomes, start);
        Ok(outcomes)
    }

    /// Read jobs that each bring their own template
    ///
    /// # Errors
    ///
    /// Same as [`BatchProcessor::run`].
    pub fn run_jobs(&self, jobs: &[SheetJob], key: &AnswerKey) -> Result<Vec<SheetOutcome>> {
        let start = Instant::now();
        let results = self.fan_out(jobs, |job| {
            let layout = self.decoder.analyze_template(&job.template)?;
            self.read_sheet(&layout, &job.name, &job.scan, key)
        });
        let outcomes = collect_outcomes(jobs.iter().map(|j| j.name.as_str()), results)?;
        summarize(&outcomes, start);
        Ok(outcomes)
    }

    fn read_sheet(
        &self,
        layout: &FormLayout,
        name: &str,
        scan: &RgbImage,
        key: &AnswerKey,
    ) -> Result<ScoredSheet> {
        let form = self.decoder.read(layout, scan)?;
        let score = score(&form.answers, form.group, key)?;
        debug!(sheet = name, %score, "scored sheet");
        Ok(ScoredSheet {
            name: name.to_string(),
            form,
            score,
        })
    }

    /// Apply `process` to every item, in parallel for large enough batches
    fn fan_out<T, F>(&self, items: &[T], process: F) -> Vec<Result<ScoredSheet>>
    where
        T: Sync,
        F: Fn(&T) -> Result<ScoredSheet> + Sync,
    {
        if self.config.parallel && items.len() >= self.config.min_parallel_sheets {
            debug!(sheets = items.len(), "processing batch in parallel");
            items.par_iter().map(&process).collect()
        } else {
            items.iter().map(&process).collect()
        }
    }
}

/// Pair results with their names, failing on the first batch-fatal error
fn collect_outcomes<'a>(
    names: impl Iterator<Item = &'a str>,
    results: Vec<Result<ScoredSheet>>,
) -> Result<Vec<SheetOutcome>> {
    names
        .zip(results)
        .enumerate()
        .map(|(index, (name, result))| match result {
            Err(e) if !e.is_sheet_error() => Err(e),
            result => {
                if let Err(e) = &result {
                    warn!(sheet = name, error = %e, "sheet failed");
                }
                Ok(SheetOutcome {
                    index,
                    name: name.to_string(),
                    result,
                })
            }
        })
        .collect()
}

fn summarize(outcomes: &[SheetOutcome], start: Instant) {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    info!(
        sheets = outcomes.len(),
        succeeded,
        failed = outcomes.len() - succeeded,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "batch complete"
    );
}
