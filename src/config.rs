use crate::error::LiveError;

#[derive(Debug, Clone)]
pub struct Config {
    // 网络配置
    pub ws_url: &'static str,
    pub speech_url: &'static str,
    pub api_key_env: &'static str,

    // Live 会话参数
    pub live_model: &'static str,
    pub live_voice: &'static str,
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    pub block_size: usize,
    pub send_queue_depth: usize,
    pub event_queue_depth: usize,

    // 一次性 TTS 参数
    pub speech_model: &'static str,
    pub speech_voice: &'static str,

    // ALSA 设备
    pub capture_device: &'static str,
    pub playback_device: &'static str,
    pub playback_period_size: usize,

    pub log_level: &'static str,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            ws_url: env!("WS_URL"),
            speech_url: env!("SPEECH_URL"),
            api_key_env: env!("API_KEY_ENV"),

            live_model: env!("LIVE_MODEL"),
            live_voice: env!("LIVE_VOICE"),
            input_sample_rate: env!("INPUT_SAMPLE_RATE")
                .parse()
                .map_err(|_| "Failed to parse INPUT_SAMPLE_RATE")?,
            output_sample_rate: env!("OUTPUT_SAMPLE_RATE")
                .parse()
                .map_err(|_| "Failed to parse OUTPUT_SAMPLE_RATE")?,
            block_size: env!("BLOCK_SIZE")
                .parse()
                .map_err(|_| "Failed to parse BLOCK_SIZE")?,
            send_queue_depth: env!("SEND_QUEUE_DEPTH")
                .parse()
                .map_err(|_| "Failed to parse SEND_QUEUE_DEPTH")?,
            event_queue_depth: env!("EVENT_QUEUE_DEPTH")
                .parse()
                .map_err(|_| "Failed to parse EVENT_QUEUE_DEPTH")?,

            speech_model: env!("SPEECH_MODEL"),
            speech_voice: env!("SPEECH_VOICE"),

            capture_device: env!("CAPTURE_DEVICE"),
            playback_device: env!("PLAYBACK_DEVICE"),
            playback_period_size: env!("PLAYBACK_PERIOD_SIZE")
                .parse()
                .map_err(|_| "Failed to parse PLAYBACK_PERIOD_SIZE")?,

            log_level: env!("LOG_LEVEL"),
        })
    }

    /// API key is the only runtime setting; it never gets baked into the binary.
    pub fn api_key(&self) -> Result<String, LiveError> {
        match std::env::var(self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(LiveError::MissingApiKey(self.api_key_env)),
        }
    }

    pub fn max_log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_time_values_parse() {
        let config = Config::new().expect("config.toml values");
        assert_eq!(config.input_sample_rate, 16000);
        assert_eq!(config.output_sample_rate, 24000);
        assert_eq!(config.block_size, 4096);
        assert!(config.ws_url.starts_with("wss://"));
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let mut config = Config::new().expect("config.toml values");
        config.log_level = "chatty";
        assert_eq!(config.max_log_level(), tracing::Level::INFO);
        config.log_level = "debug";
        assert_eq!(config.max_log_level(), tracing::Level::DEBUG);
    }
}
