// Response envelope handling
// Normalizes backend response/error envelopes into payload or classified error

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{
    ApiError, NetworkErrorKind, FORBIDDEN_FALLBACK_MESSAGE, GENERIC_FALLBACK_MESSAGE,
};

/// Backend response envelope.
///
/// Every enveloped response carries `{status, code, message, data}` where
/// `status` is the backend's own status, distinct from the transport
/// status: the backend reports failures inside nominally-200 responses.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub status: Option<u16>,
    pub code: Option<i64>,
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Unwrapped response payload handed to callers.
///
/// `Json` is the envelope's inner `data`; `Raw` is a non-enveloped body
/// (e.g. a media stream) passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Raw(Bytes),
}

impl Payload {
    /// The inner JSON value, or `Value::Null` for raw payloads.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Raw(_) => Value::Null,
        }
    }

    /// The payload bytes: raw bodies as-is, JSON re-serialized.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Payload::Json(value) => Bytes::from(value.to_string()),
            Payload::Raw(bytes) => bytes,
        }
    }
}

fn in_success_range(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Unwrap a transport-successful (2xx) response body.
///
/// If the body is a JSON object carrying an embedded `status`, the
/// envelope wins: a success-range status yields the inner `data`, any
/// other status is classified as an error even though the transport said
/// 200. Bodies without an envelope pass through unmodified.
pub fn unwrap_body(body: Bytes) -> Result<Payload, ApiError> {
    let parsed: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        // Not JSON at all: raw payload (binary stream, plain text)
        Err(_) => return Ok(Payload::Raw(body)),
    };

    let has_embedded_status = parsed
        .as_object()
        .map(|obj| obj.contains_key("status"))
        .unwrap_or(false);

    if !has_embedded_status {
        return Ok(Payload::Json(parsed));
    }

    let envelope: Envelope = match serde_json::from_value(parsed) {
        Ok(envelope) => envelope,
        Err(err) => {
            return Err(ApiError::Network {
                kind: NetworkErrorKind::Decode,
                message: format!("Malformed response envelope: {}", err),
            })
        }
    };

    match envelope.status {
        Some(status) if in_success_range(status) => Ok(Payload::Json(envelope.data)),
        Some(status) => Err(classify_status(status, envelope.code, envelope.message)),
        // "status" key present but null; treat as non-enveloped
        None => Ok(Payload::Json(envelope.data)),
    }
}

/// Classify a transport-level failure (non-2xx status).
///
/// The transport status decides the kind; the body is still parsed
/// best-effort so a backend-supplied message and code survive.
pub fn classify_transport_failure(status: u16, body: &[u8]) -> ApiError {
    let envelope: Option<Envelope> = serde_json::from_slice(body).ok();
    let (code, message) = match envelope {
        Some(envelope) => (envelope.code, envelope.message),
        None => (None, None),
    };
    classify_status(status, code, message)
}

/// Map a status code plus optional envelope fields to a classified error.
/// The message is never left empty.
pub fn classify_status(status: u16, code: Option<i64>, message: Option<String>) -> ApiError {
    let supplied = message.filter(|m| !m.trim().is_empty());

    match status {
        401 => ApiError::Unauthenticated {
            status,
            code,
            message: supplied.unwrap_or_else(|| "Authentication required".to_string()),
        },
        403 => ApiError::Forbidden {
            status,
            code,
            message: supplied.unwrap_or_else(|| FORBIDDEN_FALLBACK_MESSAGE.to_string()),
        },
        404 => ApiError::NotFound {
            status,
            code,
            message: supplied.unwrap_or_else(|| "The requested resource was not found".to_string()),
        },
        400 => ApiError::Validation {
            status,
            code,
            message: supplied.unwrap_or_else(|| "The request was invalid".to_string()),
        },
        _ => ApiError::Unknown {
            status,
            code,
            message: supplied.unwrap_or_else(|| GENERIC_FALLBACK_MESSAGE.to_string()),
        },
    }
}

/// Classify a reqwest transport error (no response was produced).
pub fn classify_reqwest_error(err: &reqwest::Error) -> ApiError {
    let kind = if err.is_timeout() {
        NetworkErrorKind::Timeout
    } else if err.is_connect() {
        NetworkErrorKind::Connect
    } else if err.is_body() || err.is_decode() {
        NetworkErrorKind::Decode
    } else {
        NetworkErrorKind::Other
    };

    ApiError::Network {
        kind,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Bytes {
        Bytes::from(value.to_string())
    }

    #[test]
    fn test_unwrap_success_envelope() {
        let payload = unwrap_body(body(json!({
            "status": 200,
            "code": 0,
            "message": "ok",
            "data": {"id": 42, "title": "Launch day"}
        })))
        .unwrap();

        assert_eq!(
            payload,
            Payload::Json(json!({"id": 42, "title": "Launch day"}))
        );
    }

    #[test]
    fn test_embedded_error_beats_transport_success() {
        // Transport said 200; the envelope says 403. The envelope wins.
        let err = unwrap_body(body(json!({
            "status": 403,
            "code": 20001,
            "message": "Editors only",
            "data": null
        })))
        .unwrap_err();

        assert_eq!(
            err,
            ApiError::Forbidden {
                status: 403,
                code: Some(20001),
                message: "Editors only".to_string(),
            }
        );
    }

    #[test]
    fn test_embedded_unauthenticated() {
        let err = unwrap_body(body(json!({
            "status": 401,
            "code": 10002,
            "message": "Token expired",
            "data": null
        })))
        .unwrap_err();

        assert!(matches!(err, ApiError::Unauthenticated { status: 401, .. }));
    }

    #[test]
    fn test_non_json_body_passes_through() {
        let raw = Bytes::from_static(b"\x00\x01binary-audio-frames\x02");
        let payload = unwrap_body(raw.clone()).unwrap();
        assert_eq!(payload, Payload::Raw(raw));
    }

    #[test]
    fn test_json_without_envelope_passes_through() {
        let payload = unwrap_body(body(json!({"id": 7, "name": "tech"}))).unwrap();
        assert_eq!(payload, Payload::Json(json!({"id": 7, "name": "tech"})));
    }

    #[test]
    fn test_transport_status_mapping() {
        assert!(matches!(
            classify_transport_failure(401, b""),
            ApiError::Unauthenticated { .. }
        ));
        assert!(matches!(
            classify_transport_failure(403, b""),
            ApiError::Forbidden { .. }
        ));
        assert!(matches!(
            classify_transport_failure(404, b""),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            classify_transport_failure(400, b""),
            ApiError::Validation { .. }
        ));
        assert!(matches!(
            classify_transport_failure(500, b""),
            ApiError::Unknown { status: 500, .. }
        ));
    }

    #[test]
    fn test_transport_failure_keeps_envelope_fields() {
        let err = classify_transport_failure(
            404,
            json!({"status": 404, "code": 30404, "message": "No such article", "data": null})
                .to_string()
                .as_bytes(),
        );
        assert_eq!(
            err,
            ApiError::NotFound {
                status: 404,
                code: Some(30404),
                message: "No such article".to_string(),
            }
        );
    }

    #[test]
    fn test_forbidden_fallback_message() {
        // Backend omitted the message; callers still get readable text.
        let err = classify_status(403, None, Some("   ".to_string()));
        assert_eq!(err.message(), FORBIDDEN_FALLBACK_MESSAGE);

        let err = classify_status(403, None, None);
        assert_eq!(err.message(), FORBIDDEN_FALLBACK_MESSAGE);
    }

    #[test]
    fn test_messages_never_empty() {
        for status in [400u16, 401, 403, 404, 418, 500] {
            let err = classify_status(status, None, None);
            assert!(!err.message().is_empty(), "status {} gave empty message", status);
        }
    }

    #[test]
    fn test_payload_accessors() {
        let json_payload = Payload::Json(json!({"a": 1}));
        assert_eq!(json_payload.into_json(), json!({"a": 1}));

        let raw = Payload::Raw(Bytes::from_static(b"abc"));
        assert_eq!(raw.clone().into_json(), Value::Null);
        assert_eq!(raw.into_bytes(), Bytes::from_static(b"abc"));
    }
}
