//! Provides utilities to initialize logging and OpenTelemetry tracing.
use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable name for the OTLP collector endpoint.
pub const OTLP_URL_ENVVAR: &str = "BRIDGE_RELAYER_OTLP_URL";

/// Environment variable name for the service label, which is appended to the
/// whoami string.
pub const SVC_LABEL_ENVVAR: &str = "BRIDGE_RELAYER_SVC_LABEL";

/// The filter directive used when neither `RUST_LOG` nor an explicit level is provided.
pub const DEFAULT_LOG_DIRECTIVE: &str = "info";

/// Prefix of the log files written when file logging is enabled.
pub const LOG_FILE_PREFIX: &str = "relayer";

/// Configuration for the logger.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// The whoami string, which is used to identify the service in logs.
    whoami: String,

    /// The default filter directive, overridden by `RUST_LOG` when set.
    directive: String,

    /// Whether to color the stdout output.
    ansi: bool,

    /// Whether to print the name of the logger (the event target).
    with_target: bool,

    /// The directory to write a plain-text copy of the logs into.
    log_dir: Option<PathBuf>,

    /// The OpenTelemetry URL for exporting traces.
    otel_url: Option<String>,
}

impl LoggerConfig {
    /// Creates a new empty instance with whoami set.
    pub fn new(whoami: String) -> Self {
        Self {
            whoami,
            directive: DEFAULT_LOG_DIRECTIVE.to_string(),
            ansi: true,
            with_target: false,
            log_dir: None,
            otel_url: None,
        }
    }

    /// Creates a new instance with the whoami string set to the provided
    /// string.
    pub fn with_base_name(s: &str) -> Self {
        Self::new(get_whoami_string(s))
    }

    /// Sets the default filter directive.
    ///
    /// Accepts both `EnvFilter` syntax (`info,p2p=trace`) and the `target:LEVEL` pair syntax
    /// (`*:INFO,p2p:TRACE`), see [`to_env_filter_directive`].
    pub fn set_level(&mut self, level: &str) {
        self.directive = to_env_filter_directive(level);
    }

    /// Disables ANSI colors on the stdout output.
    pub fn disable_ansi(&mut self) {
        self.ansi = false;
    }

    /// Prints the logger name (event target) on every line.
    pub fn enable_logger_name(&mut self) {
        self.with_target = true;
    }

    /// Saves a copy of every log line into a file under `dir`.
    pub fn save_to_dir(&mut self, dir: impl Into<PathBuf>) {
        self.log_dir = Some(dir.into());
    }

    /// Sets the opentelemetry URL to the provided string.
    pub fn set_otlp_url(&mut self, url: String) {
        self.otel_url = Some(url);
    }

    /// The filter directive that will be used if `RUST_LOG` is not set.
    pub fn directive(&self) -> &str {
        &self.directive
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(bridge-relayer)")
    }
}

/// Initializes the logging subsystem with the provided config.
///
/// Fails if the log file cannot be created or the OTLP exporter cannot be built. The exporter
/// connects lazily through tonic, so this must run inside a tokio runtime when an OTLP url is set.
pub fn init(config: LoggerConfig) -> io::Result<()> {
    let filt = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&config.directive)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
    });

    let log_file = env::var("LOG_FILE").is_ok_and(|v| v == "1");
    let log_line_num = env::var("LOG_LINE_NUM").is_ok_and(|v| v == "1");

    // Stdout logging.
    let stdout_sub = tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .with_file(log_file)
        .with_line_number(log_line_num);

    // Plain-text file output.
    let file_sub = match &config.log_dir {
        Some(dir) => {
            let file = create_log_file(dir)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    // OpenTelemetry output.
    let otel_sub = match &config.otel_url {
        Some(otel_url) => {
            let resource = Resource::builder()
                .with_attribute(KeyValue::new("service.name", config.whoami.clone()))
                .build();

            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(otel_url)
                .build()
                .map_err(io::Error::other)?;

            let tp = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                .with_resource(resource)
                .with_batch_exporter(exporter)
                .build();

            let tracer = tp.tracer("bridge-relayer");
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filt)
        .with(stdout_sub)
        .with(file_sub)
        .with(otel_sub)
        .init();

    info!(whoami = %config.whoami, "logging started");

    Ok(())
}

fn create_log_file(dir: &Path) -> io::Result<fs::File> {
    fs::create_dir_all(dir)?;

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(format!("{LOG_FILE_PREFIX}-{ts}.log")))
}

/// Converts a `target:LEVEL` list into an [`EnvFilter`] directive.
///
/// `*` stands for the default level. Inputs already in `EnvFilter` syntax are returned lowercased.
pub fn to_env_filter_directive(level: &str) -> String {
    level
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once(':') {
            Some(("*", lvl)) | Some(("", lvl)) => lvl.to_lowercase(),
            Some((target, lvl)) => format!("{target}={}", lvl.to_lowercase()),
            None => part.to_lowercase(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Gets the OTLP URL from the standard envvar.
pub fn get_otlp_url_from_env() -> Option<String> {
    env::var(OTLP_URL_ENVVAR).ok().filter(|url| !url.is_empty())
}

/// Gets the service label from the standard envvar, which should be included
/// in the whoami string.
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// Computes a standard whoami string.
pub fn get_whoami_string(base: &str) -> String {
    match get_service_label_from_env() {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}
