use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use color_eyre::Result;
use color_eyre::eyre::Context;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. The terminal belongs to the UI, so log lines
/// only go to `log_file`; spans are also exported when an OTLP endpoint is given.
pub fn init_tracing(
    service_name: &str,
    otlp_endpoint: Option<&str>,
    tracing_level: &str,
    log_file: Option<&Path>,
) -> Result<Option<SdkTracerProvider>> {
    let resource = Resource::builder()
        .with_attributes(vec![KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_NAME,
            service_name.to_string(),
        )])
        .build();

    let (telemetry_layer, tracer_provider) = if let Some(endpoint) = otlp_endpoint {
        // OTLP over gRPC (Tonic)
        let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .wrap_err("Failed to create OTLP span exporter")?;

        let tracer_provider = SdkTracerProvider::builder()
            .with_batch_exporter(otlp_exporter)
            .with_resource(resource)
            .build();

        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        let tracer = tracer_provider.tracer(service_name.to_string());

        (
            Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Some(tracer_provider),
        )
    } else {
        (None, None)
    };

    let fmt_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .wrap_err(format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err(format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let filter_layer =
        EnvFilter::try_new(tracing_level).wrap_err("Failed to create tracing filter")?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(telemetry_layer)
        .init();

    Ok(tracer_provider)
}
