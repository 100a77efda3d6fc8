// Protobuf wire types for the WebSocket transport.
// Package layout mirrors the schema packages:
//   chathub.chat -> proto::chat
//   chathub.ws   -> proto::ws
// Field tags are part of the wire contract; never renumber.

pub mod chat {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Action {
        #[prost(uint64, tag = "1")]
        pub index: u64,
        #[prost(string, tag = "2")]
        pub username: String,
        #[prost(enumeration = "ActionType", tag = "3")]
        pub action_type: i32,
        #[prost(string, tag = "4")]
        pub payload: String,
        /// Epoch seconds
        #[prost(double, tag = "5")]
        pub time: f64,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ActionType {
        Connect = 0,
        Disconnect = 1,
        SendMessage = 2,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Status {
        #[prost(bool, tag = "1")]
        pub is_ok: bool,
        #[prost(string, tag = "2")]
        pub error_message: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ConnectRequest {
        #[prost(string, tag = "1")]
        pub username: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ConnectResponse {
        #[prost(string, tag = "1")]
        pub user_token: String,
        #[prost(message, optional, tag = "2")]
        pub status: Option<Status>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct DisconnectRequest {
        #[prost(string, tag = "1")]
        pub user_token: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SendMessageRequest {
        #[prost(string, tag = "1")]
        pub user_token: String,
        #[prost(string, tag = "2")]
        pub text: String,
    }
}

pub mod ws {
    /// Every WebSocket frame carries exactly one Envelope.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Envelope {
        /// Echoed back on responses; empty on server-pushed events.
        #[prost(string, tag = "1")]
        pub request_id: String,
        #[prost(oneof = "envelope::Payload", tags = "10, 11, 12, 13, 14, 20, 99")]
        pub payload: Option<envelope::Payload>,
    }

    pub mod envelope {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Payload {
            #[prost(message, tag = "10")]
            ConnectRequest(super::super::chat::ConnectRequest),
            #[prost(message, tag = "11")]
            ConnectResponse(super::super::chat::ConnectResponse),
            #[prost(message, tag = "12")]
            DisconnectRequest(super::super::chat::DisconnectRequest),
            #[prost(message, tag = "13")]
            SendMessageRequest(super::super::chat::SendMessageRequest),
            #[prost(message, tag = "14")]
            StatusResponse(super::super::chat::Status),
            #[prost(message, tag = "20")]
            ActionEvent(super::super::chat::Action),
            #[prost(message, tag = "99")]
            Error(super::ErrorResponse),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ErrorResponse {
        #[prost(uint32, tag = "1")]
        pub code: u32,
        #[prost(string, tag = "2")]
        pub message: String,
        #[prost(string, tag = "3")]
        pub request_id: String,
    }
}

use crate::chat::{ActionKind, ChatError};

impl From<ActionKind> for chat::ActionType {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Connect => Self::Connect,
            ActionKind::Disconnect => Self::Disconnect,
            ActionKind::Message => Self::SendMessage,
        }
    }
}

impl From<&crate::chat::Action> for chat::Action {
    fn from(action: &crate::chat::Action) -> Self {
        Self {
            index: action.index,
            username: action.username.clone(),
            action_type: chat::ActionType::from(action.kind) as i32,
            payload: action.payload.clone(),
            time: action.epoch_seconds(),
        }
    }
}

impl<T> From<&Result<T, ChatError>> for chat::Status {
    fn from(result: &Result<T, ChatError>) -> Self {
        match result {
            Ok(_) => Self {
                is_ok: true,
                error_message: String::new(),
            },
            Err(e) => Self {
                is_ok: false,
                error_message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prost::Message;

    #[test]
    fn test_action_event_envelope_decodes() {
        let action = crate::chat::Action {
            index: 3,
            username: "alice".to_string(),
            kind: ActionKind::Message,
            payload: "hi".to_string(),
            recorded_at: Utc::now(),
        };
        let envelope = ws::Envelope {
            request_id: String::new(),
            payload: Some(ws::envelope::Payload::ActionEvent((&action).into())),
        };

        let decoded = ws::Envelope::decode(envelope.encode_to_vec().as_slice()).unwrap();
        match decoded.payload {
            Some(ws::envelope::Payload::ActionEvent(event)) => {
                assert_eq!(event.index, 3);
                assert_eq!(event.action_type(), chat::ActionType::SendMessage);
                assert_eq!(event.payload, "hi");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_status_from_result() {
        let ok: Result<(), ChatError> = Ok(());
        assert!(chat::Status::from(&ok).is_ok);

        let err: Result<(), ChatError> = Err(ChatError::InvalidToken);
        let status = chat::Status::from(&err);
        assert!(!status.is_ok);
        assert_eq!(status.error_message, "Token is not valid.");
    }
}
