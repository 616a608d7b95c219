use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Longest slice of raw judge text echoed into a log line.
pub const RAW_TEXT_LOG_LIMIT: usize = 240;

/// Helper macro for logging elapsed time at trace level.
///
/// Usage:
/// ```rust,ignore
/// let start = Instant::now();
/// // ... some work ...
/// trace_time!(start, "compute_metrics");
/// // Or with additional fields:
/// trace_time!(start, "compute_metrics", rows = table.len());
/// ```
#[macro_export]
macro_rules! trace_time {
    ($start:expr, $name:expr) => {
        tracing::trace!(elapsed = ?$start.elapsed(), $name);
    };
    ($start:expr, $name:expr $(, $field:ident = $value:expr)*) => {
        tracing::trace!(elapsed = ?$start.elapsed(), $($field = $value),*, $name);
    };
}

/// Shorten raw judge output for diagnostics, respecting char boundaries.
pub fn truncate_for_log(text: &str) -> String {
    if text.len() <= RAW_TEXT_LOG_LIMIT {
        return text.to_string();
    }
    let mut end = RAW_TEXT_LOG_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Initialize structured logging based on CLI arguments
pub fn init_tracing(
    verbose: bool,
    log_level: Option<&str>,
    log_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let level = match (verbose, log_level) {
        (true, None) => "cife=debug,cife_core=debug",
        (false, None) => "cife=warn,cife_core=warn",
        (_, Some(level)) => return init_with_level(level, log_json),
    };

    init_with_level(level, log_json)
}

fn init_with_level(level: &str, log_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    // CIFE_LOG overrides the CLI-derived level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("CIFE_LOG"))
        .unwrap_or_else(|_| {
            EnvFilter::new(if level.contains('=') {
                level.to_string()
            } else {
                format!("cife={},cife_core={}", level, level)
            })
        });

    let registry = tracing_subscriber::registry().with(filter);

    if log_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_text_unchanged() {
        assert_eq!(truncate_for_log("abc"), "abc");
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let text = "é".repeat(RAW_TEXT_LOG_LIMIT);
        let out = truncate_for_log(&text);
        assert!(out.ends_with("..."));
        assert!(out.len() <= RAW_TEXT_LOG_LIMIT + 3);
    }
}
