// Runtime configuration shared by the application and interface layers

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_token: Option<String>,
    pub request_timeout_seconds: u64,
    pub io_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    pub dedup_window_ms: i64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3240".to_string(),
            api_token: None,
            webhook_url: None,
            webhook_token: None,
            request_timeout_seconds: 15,
            io_timeout_seconds: 10,
            poll_interval_seconds: 30,
            dedup_window_ms: crate::services::DUPLICATE_THRESHOLD_MS,
        }
    }
}
