use image_layers::cli::Invocation;
use image_layers::edit::{EditError, EditJob, edit};
use image_layers::imaging::RustBackend;
use image_layers::pipeline::{Pipeline, PipelineError};
use image_layers::{config, output};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let pipeline_err = e.downcast_ref::<PipelineError>().or_else(|| {
                match e.downcast_ref::<EditError>() {
                    Some(EditError::Pipeline(err)) => Some(err),
                    _ => None,
                }
            });
            if let Some(err) = pipeline_err {
                log::debug!("{:?} error: {:?}", err.class(), err);
            }
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Invocation { cli, requests } = Invocation::from_env()?;
    init_logger(cli.verbose);

    if cli.print_config {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(cli.config.as_deref())?;
    init_thread_pool(&config.processing);

    // Every operation is checked before the image is touched.
    let pipeline = Pipeline::from_requests(&requests, &config.pipeline_options())?;

    let Some(image) = cli.image.as_deref() else {
        return Err("--image is required".into());
    };
    output::print_plan(image, &pipeline);

    let backend = RustBackend::with_viewer(config.output.viewer.clone());
    let job = EditJob {
        input: image,
        output: cli.output.as_deref(),
        display: config.output.display,
        force_display: cli.display,
    };

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_stage_event(&event) {
                println!("{}", line);
            }
        }
    });
    let outcome = edit(&backend, &pipeline, &job, Some(tx));
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let outcome = outcome?;

    output::print_result(outcome.saved.as_deref(), outcome.displayed, &outcome.result);
    Ok(())
}

/// Route `log` records to stderr. `RUST_LOG` wins over `--verbose`.
fn init_logger(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    log::debug!("using {} worker threads", threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
