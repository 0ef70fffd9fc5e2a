/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Content-Length framed JSON-RPC envelopes for the stdio transport.

use anyhow::{Context, Result};
use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};

/// The JSON-RPC version string carried on every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// A request sent to (or received from) the server.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RequestMessage {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A response to a request, carrying either a result or an error.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseMessage {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

/// A notification: a method call with no id and no response.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationMessage {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Request ids may be numbers or strings on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

/// The error object of a failed response.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

/// Serializes `message` and prepends its `Content-Length` header.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(message).context("Failed to serialize protocol message")?;
    let mut framed = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// Splits one complete framed message off the front of `buffer`.
///
/// Returns `Ok(None)` until a full header and body have arrived; errors on
/// malformed headers.
pub fn decode(buffer: &mut BytesMut) -> Result<Option<String>> {
    let Some(header_end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
        return Ok(None);
    };

    let headers =
        std::str::from_utf8(&buffer[..header_end]).context("Protocol headers are not UTF-8")?;

    let mut content_length = None;
    for line in headers.lines() {
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            content_length = Some(
                value
                    .trim()
                    .parse::<usize>()
                    .context("Invalid Content-Length value")?,
            );
        }
    }

    let content_length = content_length.context("Missing Content-Length header")?;

    if buffer.len() < header_end + 4 + content_length {
        return Ok(None);
    }

    buffer.advance(header_end + 4);
    let body = buffer.split_to(content_length);
    String::from_utf8(body.to_vec())
        .context("Protocol body is not UTF-8")
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn frame(body: &str) -> BytesMut {
        BytesMut::from(format!("Content-Length: {}\r\n\r\n{}", body.len(), body).as_str())
    }

    #[test]
    fn decode_complete_message() -> Result<()> {
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#;
        let mut buffer = frame(body);

        assert_eq!(decode(&mut buffer)?, Some(body.to_string()));
        assert!(buffer.is_empty());
        Ok(())
    }

    #[test]
    fn decode_waits_for_full_body() -> Result<()> {
        let mut buffer = BytesMut::from("Content-Length: 64\r\n\r\n{\"partial\":");
        assert_eq!(decode(&mut buffer)?, None);

        // Nothing consumed while incomplete.
        assert!(buffer.starts_with(b"Content-Length"));
        Ok(())
    }

    #[test]
    fn decode_waits_for_header_terminator() -> Result<()> {
        let mut buffer = BytesMut::from("Content-Length: 10\r\n");
        assert_eq!(decode(&mut buffer)?, None);
        Ok(())
    }

    #[test]
    fn decode_back_to_back_messages() -> Result<()> {
        let first = r#"{"jsonrpc":"2.0","id":1}"#;
        let second = r#"{"jsonrpc":"2.0","id":2}"#;
        let mut buffer = frame(first);
        buffer.extend_from_slice(&frame(second));

        assert_eq!(decode(&mut buffer)?, Some(first.to_string()));
        assert_eq!(decode(&mut buffer)?, Some(second.to_string()));
        assert!(buffer.is_empty());
        Ok(())
    }

    #[test]
    fn decode_header_is_case_insensitive() -> Result<()> {
        let body = r#"{"ok":true}"#;
        let mut buffer =
            BytesMut::from(format!("content-length: {}\r\n\r\n{}", body.len(), body).as_str());
        assert_eq!(decode(&mut buffer)?, Some(body.to_string()));
        Ok(())
    }

    #[test]
    fn decode_rejects_missing_content_length() {
        let mut buffer = BytesMut::from("Content-Type: application/json\r\n\r\n{}");
        assert!(decode(&mut buffer).is_err());
    }

    #[test]
    fn encode_round_trips_through_decode() -> Result<()> {
        let notification = NotificationMessage {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: "initialized".to_string(),
            params: serde_json::json!({}),
        };

        let mut buffer = BytesMut::from(encode(&notification)?.as_slice());
        let raw = decode(&mut buffer)?.unwrap_or_default();
        let parsed: NotificationMessage = serde_json::from_str(&raw)?;
        assert_eq!(parsed.method, "initialized");
        Ok(())
    }

    #[test]
    fn request_id_accepts_numbers_and_strings() -> Result<()> {
        let numeric: RequestMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"method":"shutdown"}"#)?;
        assert_eq!(numeric.id, RequestId::Number(7));

        let string: RequestMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"a-1","method":"shutdown"}"#)?;
        assert_eq!(string.id, RequestId::String("a-1".to_string()));
        Ok(())
    }

    #[test]
    fn response_error_deserializes() -> Result<()> {
        let response: ResponseMessage = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"not found"}}"#,
        )?;
        assert!(response.result.is_none());
        let error = response.error.map(|e| e.code);
        assert_eq!(error, Some(-32601));
        Ok(())
    }
}
