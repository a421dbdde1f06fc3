use std::env;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub fabric_model: String,
    pub device: Option<String>,
    pub output_pretty: bool,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        let device = get_env("DEVICE", "");
        Self {
            fabric_model: get_env("FABRIC_MODEL", "fabric.json"),
            device: (!device.is_empty()).then_some(device),
            output_pretty: parse_bool(&get_env("OUTPUT_PRETTY", "true")).unwrap_or(true),
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
