//! One editing run: decode, layer, then save and/or display.
//!
//! ```text
//! decode(input) → Pipeline::run → encode(output)?  → display?
//! ```
//!
//! The backend is a parameter so the whole flow, including the display
//! policy, runs against the recording mock in tests. Nothing is written if
//! decoding or any stage fails, and nothing is displayed if saving fails.

use crate::buffer::PixelBuffer;
use crate::config::DisplayPolicy;
use crate::imaging::{BackendError, ImageBackend};
use crate::pipeline::{Pipeline, PipelineError, StageEvent};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Where the input comes from and where the result goes.
#[derive(Debug, Clone, Copy)]
pub struct EditJob<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    pub display: DisplayPolicy,
    /// `--display` was passed.
    pub force_display: bool,
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    /// Clamped result.
    pub result: PixelBuffer,
    pub saved: Option<PathBuf>,
    pub displayed: bool,
}

/// Run `pipeline` over the image at `job.input` and deliver the result.
///
/// Stage progress goes to `events` when given.
pub fn edit(
    backend: &impl ImageBackend,
    pipeline: &Pipeline,
    job: &EditJob<'_>,
    events: Option<Sender<StageEvent>>,
) -> Result<EditOutcome, EditError> {
    let input = backend.decode(job.input)?;
    log::debug!(
        "decoded {} ({}x{} {})",
        job.input.display(),
        input.width(),
        input.height(),
        input.layout()
    );
    let result = pipeline.run(&input, events)?;

    if let Some(path) = job.output {
        backend.encode(&result, path)?;
    }

    let displayed = job
        .display
        .should_display(job.output.is_some(), job.force_display);
    if displayed {
        backend.display(&result)?;
    }

    Ok(EditOutcome {
        result,
        saved: job.output.map(Path::to_path_buf),
        displayed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ChannelLayout;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::pipeline::{AdjustmentKind, Operation, PipelineOptions};
    use crate::test_helpers::*;
    use std::sync::mpsc;

    fn brighten() -> Pipeline {
        Pipeline::new(
            vec![Operation::adjustment(AdjustmentKind::Brightness, 50.0)],
            &PipelineOptions::default(),
        )
        .unwrap()
    }

    fn backend() -> MockBackend {
        MockBackend::with_buffers(vec![uniform(4, 4, ChannelLayout::Gray, 100.0)])
    }

    fn job<'a>(output: Option<&'a Path>, display: DisplayPolicy, force: bool) -> EditJob<'a> {
        EditJob {
            input: Path::new("/in.png"),
            output,
            display,
            force_display: force,
        }
    }

    fn encode_op() -> RecordedOp {
        RecordedOp::Encode {
            path: "/out.png".into(),
            width: 4,
            height: 4,
            layout: ChannelLayout::Gray,
        }
    }

    fn display_op() -> RecordedOp {
        RecordedOp::Display {
            width: 4,
            height: 4,
        }
    }

    #[test]
    fn output_only_encodes() {
        let backend = backend();
        let out = Path::new("/out.png");
        let outcome = edit(
            &backend,
            &brighten(),
            &job(Some(out), DisplayPolicy::Auto, false),
            None,
        )
        .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Decode("/in.png".into()), encode_op()]
        );
        assert_eq!(outcome.saved.as_deref(), Some(out));
        assert!(!outcome.displayed);
        assert_all_close(&outcome.result, 150.0);
    }

    #[test]
    fn forced_display_after_save() {
        let backend = backend();
        let outcome = edit(
            &backend,
            &brighten(),
            &job(Some(Path::new("/out.png")), DisplayPolicy::Auto, true),
            None,
        )
        .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Decode("/in.png".into()),
                encode_op(),
                display_op()
            ]
        );
        assert!(outcome.displayed);
    }

    #[test]
    fn no_output_displays() {
        let backend = backend();
        let outcome = edit(&backend, &brighten(), &job(None, DisplayPolicy::Auto, false), None)
            .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Decode("/in.png".into()), display_op()]
        );
        assert_eq!(outcome.saved, None);
        assert!(outcome.displayed);
    }

    #[test]
    fn never_policy_without_output_does_nothing_visible() {
        let backend = backend();
        let outcome = edit(&backend, &brighten(), &job(None, DisplayPolicy::Never, false), None)
            .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Decode("/in.png".into())]
        );
        assert!(!outcome.displayed);
    }

    #[test]
    fn always_policy_displays_after_save() {
        let backend = backend();
        edit(
            &backend,
            &brighten(),
            &job(Some(Path::new("/out.png")), DisplayPolicy::Always, false),
            None,
        )
        .unwrap();

        assert_eq!(backend.get_operations().last(), Some(&display_op()));
    }

    #[test]
    fn decode_failure_writes_nothing() {
        let backend = MockBackend::default();
        let err = edit(
            &backend,
            &brighten(),
            &job(Some(Path::new("/out.png")), DisplayPolicy::Always, true),
            None,
        )
        .unwrap_err();

        assert!(matches!(err, EditError::Backend(BackendError::Open(_))));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Decode("/in.png".into())]
        );
    }

    #[test]
    fn encode_failure_skips_display() {
        let backend = MockBackend {
            fail_encode: true,
            ..backend()
        };
        let err = edit(
            &backend,
            &brighten(),
            &job(Some(Path::new("/out.png")), DisplayPolicy::Always, true),
            None,
        )
        .unwrap_err();

        assert!(matches!(err, EditError::Backend(BackendError::Save(_))));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Decode("/in.png".into())]
        );
    }

    #[test]
    fn stage_events_reach_the_channel() {
        let backend = backend();
        let (tx, rx) = mpsc::channel();
        edit(
            &backend,
            &brighten(),
            &job(None, DisplayPolicy::Never, false),
            Some(tx),
        )
        .unwrap();

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].operation.name(), "brightness");
    }
}
