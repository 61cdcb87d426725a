use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset, blank or does not parse.
pub const DEFAULT_DIRECTIVES: &str = "info,realworld_server=debug,actix_web=info";

/// Filter directives to install and where they came from.
fn select_directives(rust_log: Option<&str>) -> (EnvFilter, &'static str) {
    match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => match EnvFilter::try_new(directives) {
            Ok(filter) => (filter, "RUST_LOG"),
            Err(_) => (EnvFilter::new(DEFAULT_DIRECTIVES), "default (RUST_LOG invalid)"),
        },
        None => (EnvFilter::new(DEFAULT_DIRECTIVES), "default"),
    }
}

pub fn init_logging() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let (filter, source) = select_directives(rust_log.as_deref());
    let directives = filter.to_string();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))?;

    tracing::debug!("Log filter from {}: {}", source, directives);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_blank_uses_defaults() {
        let (filter, source) = select_directives(None);
        assert_eq!(source, "default");
        assert!(filter.to_string().contains("realworld_server=debug"));

        let (_, source) = select_directives(Some("   "));
        assert_eq!(source, "default");
    }

    #[test]
    fn rust_log_wins_when_valid() {
        let (filter, source) = select_directives(Some("warn,actix_web=debug"));
        assert_eq!(source, "RUST_LOG");
        assert!(filter.to_string().contains("actix_web=debug"));
    }

    #[test]
    fn invalid_rust_log_falls_back() {
        let (filter, source) = select_directives(Some("realworld_server=loud"));
        assert_eq!(source, "default (RUST_LOG invalid)");
        assert!(filter.to_string().contains("realworld_server=debug"));
    }
}
