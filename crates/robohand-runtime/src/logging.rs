//! Structured logging and optional trace export.
//!
//! Call [`init_tracing`] once at process startup.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `ROBOHAND_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//! | `ROBOHAND_LOG_FILE` | Also append plain-text logs to this file. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector base URL (e.g. `http://localhost:4318`). |
//!
//! With an OTLP endpoint set, spans such as the transport's `open` are
//! exported over OTLP/HTTP.
//!
//! # Example
//!
//! ```rust,no_run
//! // Hold the guard for the entire lifetime of the process.
//! let _guard = robohand_runtime::logging::init_tracing("robohand");
//! ```

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting JSON output.
pub const LOG_FORMAT_VAR: &str = "ROBOHAND_LOG_FORMAT";

/// Environment variable naming an extra log file.
pub const LOG_FILE_VAR: &str = "ROBOHAND_LOG_FILE";

/// Install the global `tracing` subscriber.
///
/// Logs go to stderr so they never mix with the menu and finger display on
/// stdout, and to [`LOG_FILE_VAR`] when it names a writable file.  The
/// returned [`TracerProviderGuard`] must be held until exit; dropping it
/// flushes pending spans and file lines.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var(LOG_FORMAT_VAR).as_deref() == Ok("json");
    let provider = build_provider(service_name);
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("robohand")));

    let (file_writer, file_guard) = match std::env::var(LOG_FILE_VAR) {
        Ok(path) => match open_log_file(Path::new(&path)) {
            Ok((writer, guard)) => (Some(writer), Some(guard)),
            Err(e) => {
                eprintln!("[robohand] cannot open log file {path}: {e}");
                (None, None)
            }
        },
        Err(_) => (None, None),
    };
    let file_layer = file_writer.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
    });

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer)
        .with(file_layer);
    let init = if use_json {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).compact())
            .try_init()
    };
    if let Err(e) = init {
        eprintln!("[robohand] tracing already initialised: {e}");
    }

    TracerProviderGuard {
        provider,
        _file: file_guard,
    }
}

/// Shuts the OTel [`SdkTracerProvider`] down on drop, flushing pending spans.
/// Also flushes the log file writer, if any.
pub struct TracerProviderGuard {
    provider: Option<SdkTracerProvider>,
    _file: Option<WorkerGuard>,
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("[robohand] OpenTelemetry provider shutdown error: {e}");
            }
        }
    }
}

/// Open `path` for appending behind a background writer thread.
fn open_log_file(path: &Path) -> io::Result<(NonBlocking, WorkerGuard)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(tracing_appender::non_blocking(file))
}

/// Build a provider when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
///
/// Returns `None` when the variable is absent or the exporter cannot be
/// built; the caller then logs to the console only.
fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[robohand] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            // Synchronous export: session loops run on plain threads with no
            // async runtime to host a batch exporter.
            .with_simple_exporter(exporter)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_provider_returns_none_without_endpoint() {
        // SAFETY: single-threaded test; no other thread reads this env-var.
        unsafe { std::env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT") };
        assert!(build_provider("test-service").is_none());
    }

    #[test]
    fn guard_without_provider_drops_cleanly() {
        drop(TracerProviderGuard {
            provider: None,
            _file: None,
        });
    }

    #[test]
    fn log_file_receives_plain_lines() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("robohand.log");
        let (writer, guard) = open_log_file(&path).expect("open log file");

        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(bpm = 72, "heart rate updated");
        });
        drop(guard);

        let text = std::fs::read_to_string(&path).expect("read log file");
        assert!(text.contains("heart rate updated"));
        assert!(text.contains("bpm=72"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn log_file_in_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        assert!(open_log_file(&dir.path().join("absent").join("robohand.log")).is_err());
    }
}
