use log::LevelFilter;
use std::time::Duration;

/// Storage key holding the on/off preference.
pub const ENABLED_KEY: &str = "unicoderEnabled";

/// Hostname the content script is allowed to run on.
pub const TARGET_HOST: &str = "github.com";

/// Class added to every converted line.
pub const MARKER_CLASS: &str = "unicoder-converted";

/// Selectors for the three kinds of rendered code line: blob view cells,
/// React file lines and diff text cells.
pub const CANDIDATE_SELECTORS: [&str; 3] =
    [".blob-code-inner", ".react-file-line", ".diff-text-inner"];

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub enabled_key: String,
    pub selectors: Vec<String>,
    pub marker_class: String,
    pub debounce: Duration,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: TARGET_HOST.to_string(),
            enabled_key: ENABLED_KEY.to_string(),
            selectors: CANDIDATE_SELECTORS.iter().map(|s| s.to_string()).collect(),
            marker_class: MARKER_CLASS.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            log_level: if cfg!(debug_assertions) {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
        }
    }
}

impl Config {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Selector list usable with `querySelectorAll`, `matches` and
    /// `querySelector` in a single call.
    pub fn candidate_selector(&self) -> String {
        self.selectors.join(", ")
    }

    /// Whether the page's hostname is the one the engine is allowed on.
    pub fn is_target_host(&self, hostname: &str) -> bool {
        hostname == self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_default_selectors() {
        assert_eq!(
            Config::default().candidate_selector(),
            ".blob-code-inner, .react-file-line, .diff-text-inner"
        );
    }

    #[test]
    fn only_exact_host_is_targeted() {
        let config = Config::default();
        assert!(config.is_target_host("github.com"));
        assert!(!config.is_target_host("gist.github.com"));
        assert!(!config.is_target_host("github.com.evil.example"));
        assert!(!config.is_target_host("gitlab.com"));
    }

    #[test]
    fn overrides_debounce() {
        let config = Config::default().with_debounce(Duration::from_millis(5));
        assert_eq!(config.debounce, Duration::from_millis(5));
        assert_eq!(Config::default().debounce, DEFAULT_DEBOUNCE);
    }
}
