use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for tiercache
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_CACHE_HOME/tiercache or fallback
    pub fn cache_dir() -> PathBuf {
        env::var("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".cache"))
                    .unwrap_or_else(|| PathBuf::from(".cache"))
            })
            .join("tiercache")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_dir_ends_with_crate_name() {
        assert!(XdgPaths::cache_dir().ends_with("tiercache"));
    }
}
