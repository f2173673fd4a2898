use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted chat message. Immutable once written; the broadcast path
/// serializes the record it just stored rather than re-reading it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub profile_id: Uuid,
    pub text: String,
    pub media_file_ids: Vec<Uuid>,
}

impl Message {
    pub fn public(&self) -> MessagePublic {
        MessagePublic {
            id: self.id,
            text: self.text.clone(),
        }
    }
}

/// The wire representation broadcast to chat participants and returned by
/// the message endpoints.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagePublic {
    pub id: Uuid,
    pub text: String,
}

/// Why an inbound frame was rejected. Rejected frames are dropped without a
/// reply; the connection stays attached.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed chat payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A validated inbound chat payload. `profile_id` is required; text and
/// attachments default to empty. Sender membership in the chat is not
/// checked before fan-out.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    pub profile_id: Uuid,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub media_file_ids: Vec<Uuid>,
}

impl InboundMessage {
    pub fn parse(data: &[u8]) -> Result<InboundMessage, PayloadError> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_payload() {
        let profile_id = Uuid::now_v7();
        let media_id = Uuid::now_v7();
        let data = serde_json::json!({
            "profile_id": profile_id,
            "text": "hi",
            "media_file_ids": [media_id],
        });

        let parsed = InboundMessage::parse(data.to_string().as_bytes()).unwrap();
        assert_eq!(parsed.profile_id, profile_id);
        assert_eq!(parsed.text, "hi");
        assert_eq!(parsed.media_file_ids, vec![media_id]);
    }

    #[test]
    fn text_and_media_default_when_absent() {
        let data = serde_json::json!({ "profile_id": Uuid::now_v7() });

        let parsed = InboundMessage::parse(data.to_string().as_bytes()).unwrap();
        assert_eq!(parsed.text, "");
        assert!(parsed.media_file_ids.is_empty());
    }

    #[test]
    fn missing_or_malformed_profile_id_is_rejected() {
        assert!(InboundMessage::parse(br#"{"text": "hi"}"#).is_err());
        assert!(InboundMessage::parse(br#"{"profile_id": "not-a-uuid"}"#).is_err());
        assert!(InboundMessage::parse(b"not json at all").is_err());
    }

    #[test]
    fn bad_media_ids_are_rejected() {
        let data = serde_json::json!({
            "profile_id": Uuid::now_v7(),
            "media_file_ids": ["nope"],
        });
        assert!(InboundMessage::parse(data.to_string().as_bytes()).is_err());
    }
}
