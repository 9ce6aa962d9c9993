use std::path::Path;

use serde::{Deserialize, Serialize};

/// Root engine configuration. Loaded from environment variables with the
/// prefix `WEBPROBE__` and an optional TOML config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_enabled_suites")]
    pub enabled_suites: Vec<String>,
    #[serde(default = "default_report_formats")]
    pub report_formats: Vec<String>,
    #[serde(default = "default_auto_test")]
    pub auto_test: bool,
    #[serde(default = "default_stop_on_failure")]
    pub stop_on_failure: bool,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub ci: CiConfig,
}

/// Delays and timeouts used by the interaction engine, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_wait_for_element_timeout_ms")]
    pub wait_for_element_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,
    #[serde(default = "default_click_settle_ms")]
    pub click_settle_ms: u64,
    #[serde(default = "default_pointer_event_gap_ms")]
    pub pointer_event_gap_ms: u64,
    #[serde(default = "default_typing_char_delay_ms")]
    pub typing_char_delay_ms: u64,
    #[serde(default = "default_focus_settle_ms")]
    pub focus_settle_ms: u64,
    #[serde(default = "default_submit_settle_ms")]
    pub submit_settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_trigger_patterns")]
    pub trigger_patterns: Vec<String>,
}

// Default functions
fn default_enabled_suites() -> Vec<String> {
    vec!["basicFormValidation".to_string(), "userInteraction".to_string()]
}
fn default_report_formats() -> Vec<String> {
    vec!["json".to_string(), "junit".to_string(), "html".to_string()]
}
fn default_auto_test() -> bool {
    true
}
fn default_stop_on_failure() -> bool {
    true
}
fn default_wait_for_element_timeout_ms() -> u64 {
    5000
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_scroll_settle_ms() -> u64 {
    200
}
fn default_click_settle_ms() -> u64 {
    100
}
fn default_pointer_event_gap_ms() -> u64 {
    10
}
fn default_typing_char_delay_ms() -> u64 {
    20
}
fn default_focus_settle_ms() -> u64 {
    50
}
fn default_submit_settle_ms() -> u64 {
    100
}
fn default_environment() -> String {
    "development".to_string()
}
fn default_trigger_patterns() -> Vec<String> {
    ["localhost", "staging.", "dev.", "test."]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            wait_for_element_timeout_ms: default_wait_for_element_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            scroll_settle_ms: default_scroll_settle_ms(),
            click_settle_ms: default_click_settle_ms(),
            pointer_event_gap_ms: default_pointer_event_gap_ms(),
            typing_char_delay_ms: default_typing_char_delay_ms(),
            focus_settle_ms: default_focus_settle_ms(),
            submit_settle_ms: default_submit_settle_ms(),
        }
    }
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            trigger_patterns: default_trigger_patterns(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled_suites: default_enabled_suites(),
            report_formats: default_report_formats(),
            auto_test: default_auto_test(),
            stop_on_failure: default_stop_on_failure(),
            timing: TimingConfig::default(),
            ci: CiConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let builder = builder.add_source(
            config::Environment::with_prefix("WEBPROBE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("enabled_suites")
                .with_list_parse_key("report_formats")
                .with_list_parse_key("ci.trigger_patterns"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.stop_on_failure);
        assert!(config.auto_test);
        assert_eq!(config.timing.wait_for_element_timeout_ms, 5000);
        assert_eq!(config.timing.poll_interval_ms, 100);
        assert_eq!(config.timing.scroll_settle_ms, 200);
        assert_eq!(config.report_formats, vec!["json", "junit", "html"]);
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: EngineConfig = serde_json::from_value(serde_json::json!({
            "stop_on_failure": false,
            "timing": { "poll_interval_ms": 25 }
        }))
        .unwrap();
        assert!(!config.stop_on_failure);
        assert_eq!(config.timing.poll_interval_ms, 25);
        assert_eq!(config.timing.typing_char_delay_ms, 20);
        assert_eq!(config.ci.environment, "development");
    }
}
