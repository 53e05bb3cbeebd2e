use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::services::conversation;
use crate::state::AppState;

// ── Verification handshake (GET) ──

#[derive(Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let expected = &state.config.whatsapp_verify_token;
    let subscribe = params.mode.as_deref() == Some("subscribe");
    let token_ok = !expected.is_empty() && params.verify_token.as_deref() == Some(expected.as_str());

    if subscribe && token_ok {
        tracing::info!("webhook verified");
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        tracing::warn!("webhook verification rejected");
        StatusCode::FORBIDDEN.into_response()
    }
}

// ── Message delivery (POST) ──

#[derive(Deserialize)]
pub struct WebhookPayload {
    object: Option<String>,
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Deserialize)]
struct Change {
    #[serde(default)]
    value: ChangeValue,
}

#[derive(Deserialize, Default)]
struct ChangeValue {
    #[serde(default)]
    messages: Vec<IncomingMessage>,
}

#[derive(Deserialize)]
struct IncomingMessage {
    from: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<TextBody>,
}

#[derive(Deserialize)]
struct TextBody {
    body: String,
}

pub async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Validate the payload signature (skip if app secret is empty — dev mode)
    if !state.config.whatsapp_app_secret.is_empty() {
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !validate_signature(&state.config.whatsapp_app_secret, signature, &body) {
            tracing::warn!("invalid webhook signature");
            return (StatusCode::FORBIDDEN, "Invalid signature").into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable webhook payload");
            return (StatusCode::BAD_REQUEST, "Bad payload").into_response();
        }
    };

    if payload.object.as_deref() != Some("whatsapp_business_account") {
        return (StatusCode::OK, "OK").into_response();
    }

    for message in payload
        .entry
        .iter()
        .flat_map(|e| &e.changes)
        .flat_map(|c| &c.value.messages)
    {
        // Non-text messages (media, reactions) arrive as empty text, same
        // as the channel contract for unsupported message types.
        let text = if message.kind.as_deref() == Some("text") {
            message.text.as_ref().map(|t| t.body.as_str()).unwrap_or("")
        } else {
            ""
        };

        tracing::info!(from = %message.from, "incoming WhatsApp message");

        match conversation::process_message(&state, &message.from, text).await {
            Ok(reply) => {
                if let Err(e) = state.messaging.send_message(&message.from, &reply).await {
                    tracing::error!(error = %e, "failed to send reply");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, from = %message.from, "turn processing failed");
                let fallback = "Sorry, I'm having trouble right now. Please try again in a moment.";
                let _ = state.messaging.send_message(&message.from, fallback).await;
            }
        }
    }

    (StatusCode::OK, "OK").into_response()
}

fn validate_signature(app_secret: &str, signature: &str, body: &[u8]) -> bool {
    let Some(hex_sig) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let mut mac = match Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    let expected = hex_encode(&mac.finalize().into_bytes());

    expected == hex_sig.to_lowercase()
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_parsing() {
        let raw = r#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "123",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messages": [{
                            "from": "15551110000",
                            "id": "wamid.1",
                            "type": "text",
                            "text": { "body": "hello" }
                        }]
                    }
                }]
            }]
        }"#;

        let payload: WebhookPayload = serde_json::from_str(raw).unwrap();
        let message = &payload.entry[0].changes[0].value.messages[0];
        assert_eq!(message.from, "15551110000");
        assert_eq!(message.text.as_ref().unwrap().body, "hello");
    }

    #[test]
    fn test_status_only_payload_has_no_messages() {
        let raw = r#"{
            "object": "whatsapp_business_account",
            "entry": [{"changes": [{"value": {"statuses": [{"status": "delivered"}]}}]}]
        }"#;

        let payload: WebhookPayload = serde_json::from_str(raw).unwrap();
        assert!(payload.entry[0].changes[0].value.messages.is_empty());
    }

    #[test]
    fn test_signature_validation() {
        let secret = "app-secret";
        let body = b"{\"object\":\"whatsapp_business_account\"}";

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let good = format!("sha256={}", hex_encode(&mac.finalize().into_bytes()));

        assert!(validate_signature(secret, &good, body));
        assert!(!validate_signature(secret, "sha256=deadbeef", body));
        assert!(!validate_signature(secret, "no-prefix", body));
        assert!(!validate_signature("wrong-secret", &good, body));
    }
}
