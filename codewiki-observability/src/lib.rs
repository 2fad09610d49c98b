// Copyright 2025 Codewiki Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Tracing/OpenTelemetry bootstrap shared by the server and CLI binaries.

pub mod config;
pub mod genai_conventions;
pub mod tracer;

pub use config::ObservabilityConfig;
pub use tracer::{init_tracer, shutdown_tracer, OtelConfig, SamplerConfig};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the process-wide `tracing` subscriber: an env-filtered fmt layer always,
/// plus an OTLP export layer when `OTEL_SDK_DISABLED` isn't set.
///
/// `default_filter` is used when `RUST_LOG`/`OTEL_LOG_LEVEL` aren't set, e.g.
/// `"codewiki_server=info,tower_http=info"`.
pub fn init_logging(default_filter: &str) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());

    let observability = ObservabilityConfig::from_env();
    if observability.otel_sdk_disabled {
        registry.init();
        return Ok(());
    }

    let otel_config = OtelConfig {
        otlp_endpoint: observability.otel_exporter_otlp_endpoint.clone(),
        service_name: observability.otel_service_name.clone(),
        capture_message_content: observability.capture_message_content,
        sampler: SamplerConfig::TraceIdRatio(observability.sampling_rate),
        ..OtelConfig::default()
    };

    match init_tracer(otel_config) {
        Ok(tracer) => {
            registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();
        }
        Err(err) => {
            registry.init();
            tracing::warn!(error = %err, "OTLP exporter unavailable, logging without tracing export");
        }
    }
    Ok(())
}
