//! Environment variable abstraction and native implementation.
//!
//! Used for config discovery (`VALOISAN_CONFIG`) and the logging flags
//! (`LOG_VERBOSE`, `LOG_INFO`). The in-memory implementation lives in
//! [`crate::browser::MemoryEnvironment`].

/// Platform-agnostic environment variable access.
pub trait Environment: Send + Sync {
    /// Get the value of an environment variable, or `None` if it is not set.
    fn get_var(&self, name: &str) -> Option<String>;

    /// Whether a flag variable is set to `1` or `true`.
    fn flag(&self, name: &str) -> bool {
        matches!(self.get_var(name).as_deref(), Some("1") | Some("true"))
    }
}

/// Native environment implementation using [`std::env`].
#[cfg(feature = "native")]
pub struct NativeEnvironment;

#[cfg(feature = "native")]
impl Environment for NativeEnvironment {
    fn get_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

#[cfg(all(test, feature = "native"))]
mod tests {
    use super::*;

    #[test]
    fn test_get_var_existing() {
        let env = NativeEnvironment;
        // PATH is universally available on all platforms
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    fn test_get_var_missing() {
        let env = NativeEnvironment;
        assert!(env.get_var("VALOISAN_DEFINITELY_NOT_SET_12345").is_none());
        assert!(!env.flag("VALOISAN_DEFINITELY_NOT_SET_12345"));
    }

    struct Fixed(&'static str);

    impl Environment for Fixed {
        fn get_var(&self, _name: &str) -> Option<String> {
            Some(self.0.to_owned())
        }
    }

    #[test]
    fn test_flag_values() {
        assert!(Fixed("1").flag("X"));
        assert!(Fixed("true").flag("X"));
        assert!(!Fixed("0").flag("X"));
        assert!(!Fixed("yes").flag("X"));
    }
}
