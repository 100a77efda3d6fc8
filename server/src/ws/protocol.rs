use axum::extract::ws::Message;
use prost::Message as ProstMessage;
use tokio::sync::mpsc;

use crate::proto::chat::{ConnectResponse, Status};
use crate::proto::ws::{envelope::Payload, Envelope, ErrorResponse};
use crate::state::AppState;

/// Handle an incoming binary (protobuf) message.
/// Decodes the Envelope, dispatches based on payload type, sends response.
pub async fn handle_binary_message(data: &[u8], tx: &mpsc::Sender<Message>, state: &AppState) {
    let envelope = match Envelope::decode(data) {
        Ok(env) => env,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode protobuf Envelope");
            send_error(tx, "", 400, "Invalid protobuf message").await;
            return;
        }
    };

    let request_id = envelope.request_id;

    match envelope.payload {
        Some(payload) => dispatch_payload(payload, &request_id, tx, state).await,
        None => send_error(tx, &request_id, 400, "Empty payload").await,
    }
}

/// Dispatch a decoded payload to the chat service.
async fn dispatch_payload(
    payload: Payload,
    request_id: &str,
    tx: &mpsc::Sender<Message>,
    state: &AppState,
) {
    let response = match payload {
        Payload::ConnectRequest(req) => {
            let result = state.chat.connect(&req.username);
            Payload::ConnectResponse(ConnectResponse {
                status: Some(Status::from(&result)),
                user_token: result.unwrap_or_default(),
            })
        }
        Payload::DisconnectRequest(req) => {
            let result = state.chat.disconnect(&req.user_token);
            Payload::StatusResponse(Status::from(&result))
        }
        Payload::SendMessageRequest(req) => {
            let result = state.chat.send_message(&req.user_token, &req.text);
            Payload::StatusResponse(Status::from(&result))
        }
        _ => {
            tracing::debug!(request_id = %request_id, "Unexpected payload type from client");
            send_error(tx, request_id, 400, "Payload type not accepted from clients").await;
            return;
        }
    };

    let envelope = Envelope {
        request_id: request_id.to_string(),
        payload: Some(response),
    };
    send_envelope(tx, &envelope).await;
}

/// Encode and send an Envelope as a binary WebSocket message.
async fn send_envelope(tx: &mpsc::Sender<Message>, envelope: &Envelope) {
    let _ = tx
        .send(Message::Binary(envelope.encode_to_vec().into()))
        .await;
}

/// Send an error response envelope.
async fn send_error(tx: &mpsc::Sender<Message>, request_id: &str, code: u32, message: &str) {
    let envelope = Envelope {
        request_id: request_id.to_string(),
        payload: Some(Payload::Error(ErrorResponse {
            code,
            message: message.to_string(),
            request_id: request_id.to_string(),
        })),
    };
    send_envelope(tx, &envelope).await;
}
