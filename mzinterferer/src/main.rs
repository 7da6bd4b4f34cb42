use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::CommandFactory;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mzinterferer::MZInterferer;

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn configure_log(log_file: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer()
        .compact()
        .with_timer(fmt::time::ChronoLocal::rfc_3339())
        .with_writer(io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        );

    match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(fs::File::create(path)?);
            let file_layer = fmt::layer()
                .with_ansi(false)
                .with_timer(fmt::time::ChronoLocal::rfc_3339())
                .with_writer(writer)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(tracing::Level::DEBUG.into())
                        .from_env_lossy(),
                );
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer).init();
            Ok(None)
        }
    }
}

fn main() -> ExitCode {
    let matches = MZInterferer::command().get_matches();

    let mut sources = Figment::new().merge(Toml::file("mzinterferer.toml"));
    let config_file = matches
        .get_one::<PathBuf>("config_file")
        .cloned()
        .or_else(|| sources.extract_inner::<PathBuf>("config_file").ok());
    if let Some(path) = config_file {
        sources = sources.merge(Toml::file_exact(path));
    }
    sources = sources.merge(Env::prefixed("MZINTERFERER_"));

    let driver = match MZInterferer::configure(&matches, sources) {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("Failed to read configuration: {e}");
            return ExitCode::from(2);
        }
    };

    let _guard = match configure_log(driver.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to open log file: {e}");
            return ExitCode::from(2);
        }
    };

    match driver.main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
