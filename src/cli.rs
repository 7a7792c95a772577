//! Command-line surface.
//!
//! `clap` collects each repeated flag into its own list, which loses the
//! interleaving of `--filter` and `--adjust`. Layering is order-dependent, so
//! [`ordered_requests`] rebuilds the typed order from argument indices:
//!
//! ```text
//! --filter blur --strength 2 --adjust brightness -30 --filter edge
//!   1. blur (strength 2)
//!   2. brightness -30
//!   3. edge (default strength)
//! ```
//!
//! A `--strength` attaches to the nearest `--filter` before it. A strength
//! with no filter before it, or a second strength for the same filter, is an
//! error rather than a silent reassignment.

use crate::pipeline::OperationRequest;
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("--strength {0} must follow a --filter")]
    StrengthWithoutFilter(f32),
    #[error("filter '{filter}' was given more than one --strength")]
    DuplicateStrength { filter: String },
    #[error(transparent)]
    Clap(#[from] clap::Error),
}

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "image-layers")]
#[command(version)]
#[command(about = "Layer convolution filters and color adjustments over an image")]
#[command(long_about = "\
Layer convolution filters and color adjustments over an image

Operations run in the order they appear on the command line. Each one
consumes the previous result; values are clamped to 0..255 only once, after
the last operation.

Filters (strength defaults to filters.default_strength):
  blur       box blur, radius grows with strength
  sharpen    unsharp kernel, centre weight grows with strength
  edge       Sobel gradient magnitude scaled by strength

Adjustments:
  brightness N    add N to every color sample (negative darkens)
  contrast F      stretch around 128 (0 = flat gray, 1 = unchanged)
  saturation F    blend with luminance (0 = grayscale, 1 = unchanged)

Most orderings change the result, but not all: at default strength
'--filter sharpen --filter blur' and '--filter blur --filter sharpen' give
the same image, because both are small symmetric kernels. A blur with
--strength 2 or more, or edge detection, does depend on its position.

Example:
  image-layers --image in.png --filter blur --strength 2 \\
      --adjust contrast 1.3 --filter sharpen --output out.png

Run 'image-layers --print-config' for a documented config.toml.")]
pub struct Cli {
    /// Image to edit
    #[arg(long, required_unless_present = "print_config")]
    pub image: Option<PathBuf>,

    /// Filter to apply: blur, sharpen or edge (repeatable)
    #[arg(long, value_name = "NAME")]
    pub filter: Vec<String>,

    /// Strength for the preceding --filter
    #[arg(long, value_name = "VALUE", allow_negative_numbers = true)]
    pub strength: Vec<f32>,

    /// Adjustment to apply: brightness, contrast or saturation (repeatable)
    #[arg(
        long,
        num_args = 2,
        value_names = ["NAME", "VALUE"],
        allow_negative_numbers = true
    )]
    pub adjust: Vec<String>,

    /// Save the result to this path; the format follows the extension
    #[arg(long, visible_alias = "save", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Display the result, even when saving it
    #[arg(long)]
    pub display: bool,

    /// Configuration file (TOML) merged over the stock defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print a stock config.toml with all options documented and exit
    #[arg(long)]
    pub print_config: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// A parsed command line: flags plus the operations in typed order.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub cli: Cli,
    pub requests: Vec<OperationRequest>,
}

impl Invocation {
    /// Parse from the process arguments. Usage errors exit through clap.
    pub fn from_env() -> Result<Self, CliError> {
        let matches = Cli::command().get_matches();
        Self::from_matches(&matches)
    }

    /// Parse from an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Cli::command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, CliError> {
        Ok(Self {
            cli: Cli::from_arg_matches(matches)?,
            requests: ordered_requests(matches)?,
        })
    }
}

/// Rebuild the pipeline order from the positions of `--filter`, `--adjust`
/// and `--strength` on the command line.
pub fn ordered_requests(matches: &ArgMatches) -> Result<Vec<OperationRequest>, CliError> {
    let mut positioned: Vec<(usize, OperationRequest)> = Vec::new();

    if let (Some(names), Some(indices)) = (
        matches.get_many::<String>("filter"),
        matches.indices_of("filter"),
    ) {
        for (name, index) in names.zip(indices) {
            positioned.push((
                index,
                OperationRequest::Filter {
                    name: name.clone(),
                    strength: None,
                },
            ));
        }
    }

    if let (Some(occurrences), Some(indices)) = (
        matches.get_occurrences::<String>("adjust"),
        matches.indices_of("adjust"),
    ) {
        // Two indices per occurrence; the first marks its position.
        for (values, index) in occurrences.zip(indices.step_by(2)) {
            let values: Vec<&String> = values.collect();
            let [name, value] = values[..] else {
                continue;
            };
            positioned.push((
                index,
                OperationRequest::Adjustment {
                    name: name.clone(),
                    value: value.clone(),
                },
            ));
        }
    }

    positioned.sort_by_key(|(index, _)| *index);

    if let (Some(strengths), Some(indices)) = (
        matches.get_many::<f32>("strength"),
        matches.indices_of("strength"),
    ) {
        for (&value, index) in strengths.zip(indices) {
            attach_strength(&mut positioned, index, value)?;
        }
    }

    Ok(positioned.into_iter().map(|(_, request)| request).collect())
}

fn attach_strength(
    positioned: &mut [(usize, OperationRequest)],
    at: usize,
    value: f32,
) -> Result<(), CliError> {
    let target = positioned
        .iter_mut()
        .rev()
        .filter(|(index, _)| *index < at)
        .find_map(|(_, request)| match request {
            OperationRequest::Filter { name, strength } => Some((name, strength)),
            OperationRequest::Adjustment { .. } => None,
        });

    match target {
        None => Err(CliError::StrengthWithoutFilter(value)),
        Some((name, strength)) if strength.is_some() => Err(CliError::DuplicateStrength {
            filter: name.clone(),
        }),
        Some((_, strength)) => {
            *strength = Some(value);
            Ok(())
        }
    }
}
