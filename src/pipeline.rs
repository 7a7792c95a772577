//! Ordered composition of filters and adjustments.
//!
//! A [`Pipeline`] is built once from the caller's operations and validated in
//! full before any pixel is touched: unknown names, malformed numbers, bad
//! parameters and kernels that cannot be built are all reported by
//! [`Pipeline::new`] / [`Pipeline::from_requests`]. A pipeline that exists is
//! one that can run.
//!
//! ```text
//! Loaded ──▶ Stage 1 ──▶ Stage 2 ──▶ … ──▶ Stage n ──▶ Clamped
//! ```
//!
//! Each stage consumes the previous buffer read-only and produces a new one.
//! Intermediate buffers keep their extended range; [`Pipeline::run`] clamps
//! into `[0, 255]` exactly once, after the last stage. Stages run in the
//! order given; layering is order-dependent in general.

use crate::adjust;
use crate::buffer::{BufferError, PixelBuffer};
use crate::convolve::{self, EdgeOptions};
use crate::kernel::{self, Kernel, KernelError};
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Filter '{0}' not supported.")]
    UnknownFilter(String),
    #[error("Adjustment type '{0}' not supported.")]
    UnknownAdjustment(String),
    #[error("{operation}: '{value}' is not a number")]
    InvalidNumber { operation: String, value: String },
    #[error("{operation}: {reason}")]
    InvalidParameter { operation: String, reason: String },
    #[error("invalid kernel: {0}")]
    Kernel(#[from] KernelError),
    #[error("buffer access failed: {0}")]
    Buffer(#[from] BufferError),
}

/// Coarse classification of pipeline failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad user input: unknown names, non-numeric values.
    Input,
    /// Well-formed input that describes an impossible pipeline.
    Validation,
    /// Internal buffer defect; never expected in correct operation.
    Bounds,
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownFilter(_) | Self::UnknownAdjustment(_) | Self::InvalidNumber { .. } => {
                ErrorClass::Input
            }
            Self::InvalidParameter { .. } | Self::Kernel(_) => ErrorClass::Validation,
            Self::Buffer(_) => ErrorClass::Bounds,
        }
    }
}

// ============================================================================
// Operations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Blur,
    Sharpen,
    Edge,
}

impl FilterKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Blur => "blur",
            Self::Sharpen => "sharpen",
            Self::Edge => "edge",
        }
    }
}

impl FromStr for FilterKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blur" => Ok(Self::Blur),
            "sharpen" => Ok(Self::Sharpen),
            "edge" | "edge_detection" => Ok(Self::Edge),
            other => Err(PipelineError::UnknownFilter(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentKind {
    Brightness,
    Contrast,
    Saturation,
}

impl AdjustmentKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
        }
    }
}

impl FromStr for AdjustmentKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brightness" => Ok(Self::Brightness),
            "contrast" => Ok(Self::Contrast),
            "saturation" => Ok(Self::Saturation),
            other => Err(PipelineError::UnknownAdjustment(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Filter {
    pub kind: FilterKind,
    pub strength: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustment {
    pub kind: AdjustmentKind,
    pub value: f32,
}

/// One validated pipeline step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    Filter(Filter),
    Adjustment(Adjustment),
}

impl Operation {
    pub fn filter(kind: FilterKind, strength: f32) -> Self {
        Self::Filter(Filter { kind, strength })
    }

    pub fn adjustment(kind: AdjustmentKind, value: f32) -> Self {
        Self::Adjustment(Adjustment { kind, value })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Filter(f) => f.kind.name(),
            Self::Adjustment(a) => a.kind.name(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(filter) => {
                write!(f, "{} (strength {})", filter.kind.name(), filter.strength)
            }
            Self::Adjustment(adj) => write!(f, "{} ({:+})", adj.kind.name(), adj.value),
        }
    }
}

/// An operation as the user typed it, before names and numbers are checked.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    Filter {
        name: String,
        strength: Option<f32>,
    },
    Adjustment {
        name: String,
        value: String,
    },
}

impl OperationRequest {
    fn resolve(&self, default_strength: f32) -> Result<Operation, PipelineError> {
        match self {
            Self::Filter { name, strength } => {
                let kind: FilterKind = name.parse()?;
                Ok(Operation::filter(kind, strength.unwrap_or(default_strength)))
            }
            Self::Adjustment { name, value } => {
                let kind: AdjustmentKind = name.parse()?;
                let value: f32 = value.trim().parse().map_err(|_| PipelineError::InvalidNumber {
                    operation: kind.name().to_string(),
                    value: value.clone(),
                })?;
                Ok(Operation::adjustment(kind, value))
            }
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Settings every pipeline is built with, resolved once from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Strength used for filters given without one.
    pub default_strength: f32,
    /// Largest accepted box-blur radius; bounds kernel size and run time.
    pub max_blur_radius: usize,
    pub edge: EdgeOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            default_strength: 1.0,
            max_blur_radius: 50,
            edge: EdgeOptions::default(),
        }
    }
}

/// Progress report for one completed stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageEvent {
    /// 1-based position in the pipeline.
    pub index: usize,
    pub total: usize,
    pub operation: Operation,
    /// Side length of the kernel, for convolution stages.
    pub kernel_size: Option<usize>,
    /// Smallest and largest sample after the stage, before clamping.
    pub range: (f32, f32),
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
enum Stage {
    Convolve(Kernel),
    Edge { strength: f32 },
    Adjust(Adjustment),
}

impl Stage {
    fn kernel_size(&self) -> Option<usize> {
        match self {
            Self::Convolve(k) => Some(k.size()),
            Self::Edge { .. } => Some(3),
            Self::Adjust(_) => None,
        }
    }
}

/// A validated, ready-to-run sequence of operations.
#[derive(Debug, Clone)]
pub struct Pipeline {
    operations: Vec<Operation>,
    stages: Vec<Stage>,
    edge: EdgeOptions,
}

impl Pipeline {
    /// Validate `operations` and prepare their kernels.
    pub fn new(operations: Vec<Operation>, options: &PipelineOptions) -> Result<Self, PipelineError> {
        let stages = operations
            .iter()
            .map(|op| prepare_stage(op, options))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            operations,
            stages,
            edge: options.edge,
        })
    }

    /// Resolve user requests (names, raw numbers) and validate the result.
    pub fn from_requests(
        requests: &[OperationRequest],
        options: &PipelineOptions,
    ) -> Result<Self, PipelineError> {
        let operations = requests
            .iter()
            .map(|r| r.resolve(options.default_strength))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(operations, options)
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Run every stage in order and return the unclamped result.
    ///
    /// One [`StageEvent`] is sent per completed stage when `events` is given;
    /// a closed receiver is ignored.
    pub fn apply(
        &self,
        input: &PixelBuffer,
        events: Option<&Sender<StageEvent>>,
    ) -> Result<PixelBuffer, PipelineError> {
        let total = self.stages.len();
        let mut current = input.clone();

        for (i, (stage, operation)) in self.stages.iter().zip(&self.operations).enumerate() {
            log::debug!("stage {}/{}: {}", i + 1, total, operation);
            let started = Instant::now();
            let next = self.run_stage(stage, &current);
            check_shape(&current, &next)?;

            if let Some(tx) = events {
                let _ = tx.send(StageEvent {
                    index: i + 1,
                    total,
                    operation: *operation,
                    kernel_size: stage.kernel_size(),
                    range: next.sample_range(),
                    elapsed: started.elapsed(),
                });
            }
            current = next;
        }

        Ok(current)
    }

    /// Run every stage, then clamp once into `[0, 255]`.
    pub fn run(
        &self,
        input: &PixelBuffer,
        events: Option<Sender<StageEvent>>,
    ) -> Result<PixelBuffer, PipelineError> {
        let result = self.apply(input, events.as_ref())?;
        Ok(result.clamp())
    }

    fn run_stage(&self, stage: &Stage, input: &PixelBuffer) -> PixelBuffer {
        match stage {
            Stage::Convolve(kernel) => convolve::convolve(input, kernel),
            Stage::Edge { strength } => convolve::sobel(input, *strength, self.edge),
            Stage::Adjust(adj) => match adj.kind {
                AdjustmentKind::Brightness => adjust::brightness(input, adj.value),
                AdjustmentKind::Contrast => adjust::contrast(input, adj.value),
                AdjustmentKind::Saturation => adjust::saturation(input, adj.value),
            },
        }
    }
}

fn invalid(operation: &Operation, reason: impl Into<String>) -> PipelineError {
    PipelineError::InvalidParameter {
        operation: operation.name().to_string(),
        reason: reason.into(),
    }
}

fn prepare_stage(operation: &Operation, options: &PipelineOptions) -> Result<Stage, PipelineError> {
    match operation {
        Operation::Filter(filter) => {
            let strength = filter.strength;
            if !strength.is_finite() {
                return Err(invalid(operation, "strength must be a finite number"));
            }
            if strength < 0.0 {
                return Err(invalid(
                    operation,
                    format!("strength must not be negative, got {strength}"),
                ));
            }
            match filter.kind {
                FilterKind::Blur => {
                    let radius = kernel::box_blur_radius(strength);
                    if radius > options.max_blur_radius {
                        return Err(invalid(
                            operation,
                            format!(
                                "blur radius {radius} exceeds the maximum of {}",
                                options.max_blur_radius
                            ),
                        ));
                    }
                    Ok(Stage::Convolve(kernel::box_blur(strength)?))
                }
                FilterKind::Sharpen => Ok(Stage::Convolve(kernel::sharpen(strength)?)),
                FilterKind::Edge => Ok(Stage::Edge { strength }),
            }
        }
        Operation::Adjustment(adj) => {
            if !adj.value.is_finite() {
                return Err(invalid(operation, "value must be a finite number"));
            }
            let needs_non_negative =
                matches!(adj.kind, AdjustmentKind::Contrast | AdjustmentKind::Saturation);
            if needs_non_negative && adj.value < 0.0 {
                return Err(invalid(
                    operation,
                    format!("value must not be negative, got {}", adj.value),
                ));
            }
            Ok(Stage::Adjust(*adj))
        }
    }
}

fn check_shape(input: &PixelBuffer, output: &PixelBuffer) -> Result<(), BufferError> {
    if output.samples().len() != input.samples().len()
        || output.width() != input.width()
        || output.height() != input.height()
    {
        return Err(BufferError::SampleCount {
            expected: input.samples().len(),
            actual: output.samples().len(),
        });
    }
    Ok(())
}
