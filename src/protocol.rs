//! JSON messages exchanged with the Gemini Live and generateContent APIs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audio::EncodedChunk;
use crate::channel::ChannelEvent;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

impl GenerationConfig {
    /// Audio-only responses spoken with a prebuilt voice.
    pub fn audio(voice: &str) -> Self {
        Self {
            response_modalities: vec!["AUDIO".to_string()],
            speech_config: SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.to_string(),
                    },
                },
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

// ======================== Live API ========================

/// First message on a live socket.
#[derive(Serialize, Debug)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
}

impl SetupMessage {
    pub fn new(model: &str, voice: &str) -> Self {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        Self {
            setup: Setup {
                model,
                generation_config: GenerationConfig::audio(voice),
            },
        }
    }
}

/// Microphone audio pushed into a live session.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<EncodedChunk>,
}

impl From<EncodedChunk> for RealtimeInputMessage {
    fn from(chunk: EncodedChunk) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![chunk],
            },
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<Value>,
    pub server_content: Option<ServerContent>,
    pub go_away: Option<Value>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub turn_complete: bool,
}

impl ServerMessage {
    /// Channel events carried by this message, in delivery order.
    pub fn into_events(self) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        let Some(content) = self.server_content else {
            return events;
        };
        if content.interrupted {
            events.push(ChannelEvent::Interrupted);
        }
        if let Some(turn) = content.model_turn {
            events.extend(
                turn.parts
                    .into_iter()
                    .filter_map(|part| part.inline_data)
                    .filter(|blob| !blob.data.is_empty())
                    .map(|blob| ChannelEvent::Audio(blob.data)),
            );
        }
        if content.turn_complete {
            events.push(ChannelEvent::TurnComplete);
        }
        events
    }
}

// ======================== generateContent (TTS) ========================

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    pub fn speech(text: &str, voice: &str) -> Self {
        Self {
            contents: vec![Content {
                role: None,
                parts: vec![Part {
                    text: Some(text.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: GenerationConfig::audio(voice),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Audio payload of the first part of the first candidate.
    pub fn first_audio(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .inline_data
            .map(|blob| blob.data)
            .filter(|data| !data.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setup_message_shape() {
        let msg = SetupMessage::new("gemini-live", "Zephyr");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "setup": {
                    "model": "models/gemini-live",
                    "generationConfig": {
                        "responseModalities": ["AUDIO"],
                        "speechConfig": {
                            "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Zephyr"}}
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn realtime_input_wraps_chunk() {
        let chunk = EncodedChunk {
            mime_type: "audio/pcm;rate=16000".to_string(),
            data: "AAA=".to_string(),
        };
        let value = serde_json::to_value(RealtimeInputMessage::from(chunk)).unwrap();
        assert_eq!(
            value,
            json!({
                "realtimeInput": {
                    "mediaChunks": [{"mimeType": "audio/pcm;rate=16000", "data": "AAA="}]
                }
            })
        );
    }

    #[test]
    fn server_content_yields_events_in_order() {
        let raw = json!({
            "serverContent": {
                "modelTurn": {"parts": [
                    {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AQI="}},
                    {"text": "hi"},
                    {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AwQ="}}
                ]},
                "turnComplete": true
            }
        });
        let msg: ServerMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(
            msg.into_events(),
            vec![
                ChannelEvent::Audio("AQI=".to_string()),
                ChannelEvent::Audio("AwQ=".to_string()),
                ChannelEvent::TurnComplete,
            ]
        );
    }

    #[test]
    fn interruption_and_setup_complete_parse() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"serverContent":{"interrupted":true}}"#).unwrap();
        assert_eq!(msg.into_events(), vec![ChannelEvent::Interrupted]);

        let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete":{}}"#).unwrap();
        assert!(msg.setup_complete.is_some());
        assert!(msg.into_events().is_empty());
    }

    #[test]
    fn speech_request_and_response() {
        let value = serde_json::to_value(GenerateContentRequest::speech("hello", "Kore")).unwrap();
        assert_eq!(value["contents"][0]["parts"][0], json!({"text": "hello"}));
        assert_eq!(
            value["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Kore"
        );

        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AAAA"}}
            ]}}]
        }))
        .unwrap();
        assert_eq!(resp.first_audio().as_deref(), Some("AAAA"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.first_audio(), None);
    }
}
