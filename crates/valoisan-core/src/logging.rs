//! Log filter resolution.
//!
//! The extension's builds read three switches: `LOG_VERBOSE` turns on
//! debug output, `LOG_INFO` set to anything but `1`/`true` silences info,
//! and `GIT_TAGS` names the release in every line. The binary maps them
//! onto a `tracing` filter; `RUST_LOG`, when present, overrides all of it.

use valoisan_platform::env::Environment;

pub const LOG_VERBOSE: &str = "LOG_VERBOSE";
pub const LOG_INFO: &str = "LOG_INFO";
pub const GIT_TAGS: &str = "GIT_TAGS";

/// The filter to use when `RUST_LOG` is unset.
pub fn default_filter(env: &dyn Environment, verbose: bool) -> &'static str {
    if verbose || env.flag(LOG_VERBOSE) {
        "debug"
    } else if env.get_var(LOG_INFO).is_some() && !env.flag(LOG_INFO) {
        "warn"
    } else {
        "info"
    }
}

/// Release label attached to log output.
pub fn release_label(env: &dyn Environment) -> String {
    env.get_var(GIT_TAGS)
        .filter(|tags| !tags.is_empty())
        .unwrap_or_else(|| "dev".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use valoisan_platform::browser::MemoryEnvironment;

    #[test]
    fn info_by_default() {
        assert_eq!(default_filter(&MemoryEnvironment::new(), false), "info");
    }

    #[test]
    fn verbose_from_flag_or_env() {
        assert_eq!(default_filter(&MemoryEnvironment::new(), true), "debug");
        let env = MemoryEnvironment::new().with_var(LOG_VERBOSE, "true");
        assert_eq!(default_filter(&env, false), "debug");
        let env = MemoryEnvironment::new().with_var(LOG_VERBOSE, "0");
        assert_eq!(default_filter(&env, false), "info");
    }

    #[test]
    fn log_info_off_silences_info() {
        let env = MemoryEnvironment::new().with_var(LOG_INFO, "0");
        assert_eq!(default_filter(&env, false), "warn");
        let env = MemoryEnvironment::new().with_var(LOG_INFO, "1");
        assert_eq!(default_filter(&env, false), "info");
    }

    #[test]
    fn release_label_defaults_to_dev() {
        assert_eq!(release_label(&MemoryEnvironment::new()), "dev");
        let env = MemoryEnvironment::new().with_var(GIT_TAGS, "v1.4.0");
        assert_eq!(release_label(&env), "v1.4.0");
    }
}
