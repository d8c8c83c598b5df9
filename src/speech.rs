use reqwest::Client;

use crate::config::Config;
use crate::error::{LiveError, Result};
use crate::protocol::{GenerateContentRequest, GenerateContentResponse};

/// Endpoint for a model's generateContent call.
pub fn generate_content_url(config: &Config) -> String {
    format!(
        "{}/{}:generateContent",
        config.speech_url.trim_end_matches('/'),
        config.speech_model
    )
}

/// One request, one response: returns the base64 PCM audio for `text`.
pub async fn generate_speech(client: &Client, config: &Config, text: &str) -> Result<String> {
    let api_key = config.api_key()?;
    let url = generate_content_url(config);
    let body = GenerateContentRequest::speech(text, config.speech_voice);

    tracing::debug!(%url, chars = text.len(), "requesting speech");

    let response = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| LiveError::Speech(format!("Request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(LiveError::Speech(format!(
            "HTTP Error: {}",
            response.status()
        )));
    }

    let parsed: GenerateContentResponse = response
        .json()
        .await
        .map_err(|e| LiveError::Speech(format!("JSON parse error: {e}")))?;

    parsed
        .first_audio()
        .ok_or_else(|| LiveError::Speech("No audio generated".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_model() {
        let config = Config::new().unwrap();
        let url = generate_content_url(&config);
        assert!(url.starts_with(config.speech_url));
        assert!(url.ends_with(&format!("/{}:generateContent", config.speech_model)));
        assert!(!url.contains("//gemini"));
    }
}
