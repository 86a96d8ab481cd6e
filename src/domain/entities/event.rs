use serde::{Deserialize, Serialize};

/// Event delivered by a live connection, tagged by its `type` field
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum InboundEvent {
    #[serde(rename = "message")]
    Message {
        #[serde(rename = "threadID", default)]
        thread_id: Option<String>,
        #[serde(rename = "senderID", default)]
        sender_id: Option<String>,
        #[serde(default)]
        body: Option<String>,
    },

    #[serde(rename = "message_reaction")]
    Reaction {
        #[serde(rename = "threadID", default)]
        thread_id: Option<String>,
        #[serde(rename = "userID", default)]
        user_id: Option<String>,
        #[serde(default)]
        reaction: Option<String>,
    },

    #[serde(rename = "presence")]
    Presence {
        #[serde(rename = "userID", default)]
        user_id: Option<String>,
        #[serde(default)]
        statuses: serde_json::Value,
    },

    #[serde(other)]
    Unknown,
}

impl InboundEvent {
    pub fn message(
        thread_id: impl Into<String>,
        sender_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        InboundEvent::Message {
            thread_id: Some(thread_id.into()),
            sender_id: Some(sender_id.into()),
            body: Some(body.into()),
        }
    }

    pub fn reaction(
        thread_id: impl Into<String>,
        user_id: impl Into<String>,
        reaction: impl Into<String>,
    ) -> Self {
        InboundEvent::Reaction {
            thread_id: Some(thread_id.into()),
            user_id: Some(user_id.into()),
            reaction: Some(reaction.into()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Message { .. } => "message",
            InboundEvent::Reaction { .. } => "message_reaction",
            InboundEvent::Presence { .. } => "presence",
            InboundEvent::Unknown => "unknown",
        }
    }
}

/// A text message that carried everything needed for routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub thread_id: String,
    pub sender_id: String,
    pub body: String,
}

impl MessageEvent {
    pub fn new(
        thread_id: impl Into<String>,
        sender_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            sender_id: sender_id.into(),
            body: body.into(),
        }
    }

    /// Messages sent in the sender's own thread (direct chat with the bot)
    pub fn is_self_thread(&self) -> bool {
        self.thread_id == self.sender_id
    }
}
