use serde::Deserialize;
use serde_json::Value;

use crate::error::PushError;

/// Handshake sent by the server in the `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: Option<u64>,
    #[serde(default)]
    pub ping_timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenHandshake),
    Close,
    Ping,
    Pong,
    Noop,
    /// Socket.IO namespace connect (`40`).
    Connect,
    /// Socket.IO namespace disconnect (`41`).
    Disconnect,
    /// Socket.IO event (`42`): event name plus its arguments.
    Event { name: String, args: Vec<Value> },
    ConnectError(String),
    /// Valid framing the dashboard has no use for (acks, binary, upgrade).
    Unsupported(String),
}

impl Packet {
    #[must_use]
    pub fn event(name: &str, payload: impl Into<Value>) -> Self {
        Self::Event {
            name: name.to_string(),
            args: vec![payload.into()],
        }
    }

    /// Text frame for this packet.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open(_) => "0".to_string(),
            Self::Close => "1".to_string(),
            Self::Ping => "2".to_string(),
            Self::Pong => "3".to_string(),
            Self::Noop => "6".to_string(),
            Self::Connect => "40".to_string(),
            Self::Disconnect => "41".to_string(),
            Self::Event { name, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                format!("42{}", Value::Array(items))
            }
            Self::ConnectError(message) => format!("44{}", serde_json::json!({ "message": message })),
            Self::Unsupported(raw) => raw.clone(),
        }
    }

    /// Parses one text frame.
    ///
    /// # Errors
    ///
    /// Returns `PushError::Protocol` for empty frames, unknown packet types and
    /// malformed JSON payloads.
    pub fn decode(frame: &str) -> Result<Self, PushError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or_else(|| PushError::Protocol(frame.to_string()))?;
        let rest = chars.as_str();

        match kind {
            '0' => serde_json::from_str(rest)
                .map(Self::Open)
                .map_err(|_| PushError::Protocol(frame.to_string())),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => decode_socket_packet(rest, frame),
            '5' => Ok(Self::Unsupported(frame.to_string())),
            '6' => Ok(Self::Noop),
            _ => Err(PushError::Protocol(frame.to_string())),
        }
    }
}

fn decode_socket_packet(body: &str, frame: &str) -> Result<Packet, PushError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or_else(|| PushError::Protocol(frame.to_string()))?;
    let payload = strip_ack_id(strip_namespace(chars.as_str()));

    match kind {
        '0' => Ok(Packet::Connect),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(payload, frame),
        '4' => {
            let message = serde_json::from_str::<Value>(payload)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| payload.to_string());
            Ok(Packet::ConnectError(message))
        }
        '3' | '5' | '6' => Ok(Packet::Unsupported(frame.to_string())),
        _ => Err(PushError::Protocol(frame.to_string())),
    }
}

fn strip_namespace(payload: &str) -> &str {
    if !payload.starts_with('/') {
        return payload;
    }
    payload.split_once(',').map_or("", |(_, rest)| rest)
}

fn strip_ack_id(payload: &str) -> &str {
    payload.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_event(payload: &str, frame: &str) -> Result<Packet, PushError> {
    let protocol = || PushError::Protocol(frame.to_string());
    let Value::Array(mut items) = serde_json::from_str::<Value>(payload).map_err(|_| protocol())?
    else {
        return Err(protocol());
    };
    if items.is_empty() {
        return Err(protocol());
    }
    let Value::String(name) = items.remove(0) else {
        return Err(protocol());
    };
    Ok(Packet::Event { name, args: items })
}
