use anyhow::Result;
use tracing_indicatif::IndicatifLayer;
use tracing_indicatif::style::ProgressStyle;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Count-based bar for the download phase.
pub fn progress_bar_style() -> Result<ProgressStyle> {
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {msg} [{wide_bar:.cyan/blue}] {pos}/{len} ({per_sec}, {eta})",
    )?;
    Ok(style.progress_chars("#>-"))
}

pub fn spinner_style(template: &str) -> Result<ProgressStyle> {
    let style = ProgressStyle::with_template(&format!("{{spinner:.green}} {template}"))?;
    Ok(style)
}

/// Installs the global subscriber: plain messages on stderr, progress bars
/// rendered from instrumented spans. `RUST_LOG` overrides the default
/// `info` filter.
pub fn initialize_logging() {
    let indicatif_layer = IndicatifLayer::new();
    let fmt_layer = fmt::layer()
        .with_writer(indicatif_layer.get_stderr_writer())
        .with_target(false)
        .with_level(false)
        .without_time();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt_layer)
        .with(indicatif_layer)
        .init();
}
