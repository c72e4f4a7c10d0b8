//! Chat wire protocol: request body and the named-frame event stream.
//!
//! The stream is `text/event-stream`-shaped: each frame is an `event:`
//! line plus one or more `data:` lines carrying JSON, terminated by a
//! blank line. A turn is zero or more `phase` frames followed by exactly
//! one `result` or `error`.

use serde::{Deserialize, Serialize};

use super::transcript::{Message, Role};

/// `statusSignal` value announcing the website-scrape offer.
pub const STATUS_SCRAPING_OFFERED: &str = "website_scraping_offered";

/// Request body for a chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
    pub locale: String,
}

/// One message as it crosses the wire. The transcript's `ai` role is
/// relabeled `assistant` here; everything else passes through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn from_transcript(message: &Message) -> Self {
        let role = match message.role {
            Role::Ai => "assistant",
            Role::User => "user",
            Role::System => "system",
        };
        Self {
            role: role.to_string(),
            content: message.content.clone(),
        }
    }
}

/// Payload of the terminal `result` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub ai_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_choices: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_multiple: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_signal: Option<String>,
}

impl ResultPayload {
    pub fn text(ai_message: impl Into<String>) -> Self {
        Self {
            ai_message: ai_message.into(),
            multiple_choices: None,
            allow_multiple: None,
            status_signal: None,
        }
    }
}

/// One decoded frame of the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Phase { name: String },
    Result(ResultPayload),
    Error { message: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result(_) | Self::Error { .. })
    }

    /// Encode as one wire frame, trailing blank line included.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let (name, data) = match self {
            Self::Phase { name } => {
                ("phase", serde_json::to_string(&PhasePayload { name: name.clone() })?)
            }
            Self::Result(payload) => ("result", serde_json::to_string(payload)?),
            Self::Error { message } => (
                "error",
                serde_json::to_string(&ErrorPayload {
                    message: message.clone(),
                })?,
            ),
        };
        Ok(format!("event: {name}\ndata: {data}\n\n"))
    }

    /// Decode a frame from its event name and concatenated data lines.
    pub fn decode(event: &str, data: &str) -> Result<Self, crate::error::ChatError> {
        let malformed =
            |e: serde_json::Error| crate::error::ChatError::Frame(format!("{event}: {e}"));
        match event {
            "phase" => {
                let payload: PhasePayload = serde_json::from_str(data).map_err(malformed)?;
                Ok(Self::Phase { name: payload.name })
            }
            "result" => {
                let payload: ResultPayload = serde_json::from_str(data).map_err(malformed)?;
                Ok(Self::Result(payload))
            }
            "error" => {
                let payload: ErrorPayload = serde_json::from_str(data).map_err(malformed)?;
                Ok(Self::Error {
                    message: payload.message,
                })
            }
            other => Err(crate::error::ChatError::Frame(format!(
                "unknown event name: {other}"
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PhasePayload {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorPayload {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_role_is_relabeled_assistant() {
        let wire = WireMessage::from_transcript(&Message::ai("hello"));
        assert_eq!(wire.role, "assistant");
        let wire = WireMessage::from_transcript(&Message::user("hi"));
        assert_eq!(wire.role, "user");
    }

    #[test]
    fn result_payload_uses_camel_case_wire_names() {
        let payload = ResultPayload {
            ai_message: "hi".to_string(),
            multiple_choices: Some(vec!["a".to_string()]),
            allow_multiple: Some(false),
            status_signal: Some(STATUS_SCRAPING_OFFERED.to_string()),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["aiMessage"], "hi");
        assert_eq!(json["multipleChoices"][0], "a");
        assert_eq!(json["allowMultiple"], false);
        assert_eq!(json["statusSignal"], STATUS_SCRAPING_OFFERED);
    }

    #[test]
    fn optional_result_fields_are_omitted_not_null() {
        let json = serde_json::to_string(&ResultPayload::text("hi")).unwrap();
        assert!(!json.contains("multipleChoices"));
        assert!(!json.contains("statusSignal"));
    }

    #[test]
    fn encode_decode_round_trip() {
        let event = StreamEvent::Result(ResultPayload::text("done"));
        let frame = event.encode().unwrap();
        assert!(frame.starts_with("event: result\ndata: "));
        assert!(frame.ends_with("\n\n"));

        let data = frame
            .lines()
            .find_map(|l| l.strip_prefix("data: "))
            .unwrap();
        assert_eq!(StreamEvent::decode("result", data).unwrap(), event);
    }

    #[test]
    fn unknown_event_name_is_rejected() {
        assert!(StreamEvent::decode("progress", "{}").is_err());
    }
}
