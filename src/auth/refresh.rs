// Token refresh call
// The one backend call exempt from auth interception

use chrono::{Duration, Utc};

use super::types::{Credential, RefreshRequest, RefreshResponse};
use crate::client::{CredentialMode, Transport};
use crate::error::{ApiError, NetworkErrorKind};
use crate::request::RequestDescriptor;

/// Safety margin subtracted from the advertised token lifetime so the
/// credential is replaced before the backend starts rejecting it.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Execute the backend refresh call and parse the new credential.
///
/// The request is flagged as a refresh call: it carries no bearer header
/// (the stale token travels in the body) and a 401 from it is terminal
/// rather than another refresh trigger. Escalation on failure (clearing
/// the store, redirecting to login) belongs to the coordinator, not here.
pub(crate) async fn refresh_session(transport: &Transport) -> Result<Credential, ApiError> {
    let stale = transport
        .store()
        .get()
        .map(|credential| credential.token)
        .unwrap_or_default();

    let body = serde_json::to_value(RefreshRequest { token: stale }).map_err(|err| {
        ApiError::Network {
            kind: NetworkErrorKind::Decode,
            message: format!("Failed to encode refresh request: {}", err),
        }
    })?;

    let descriptor =
        RequestDescriptor::refresh_call(transport.config().refresh_path.clone(), body);

    tracing::debug!(request_id = %descriptor.id(), "requesting new session token");

    let payload = transport
        .dispatch(&descriptor, CredentialMode::Anonymous)
        .await?;

    let response: RefreshResponse =
        serde_json::from_value(payload.into_json()).map_err(|err| ApiError::Network {
            kind: NetworkErrorKind::Decode,
            message: format!("Malformed refresh response: {}", err),
        })?;

    if response.token.is_empty() {
        return Err(ApiError::Network {
            kind: NetworkErrorKind::Decode,
            message: "Refresh response did not contain a token".to_string(),
        });
    }

    let expires_at = response
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs as i64 - EXPIRY_BUFFER_SECS));

    Ok(Credential {
        token: response.token,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{CredentialStore, MemoryCredentialStore};
    use crate::config::ClientConfig;
    use serde_json::json;
    use std::sync::Arc;

    fn transport(base_url: &str, store: Arc<MemoryCredentialStore>) -> Transport {
        let mut config = ClientConfig::new(base_url);
        config.api_prefix = String::new();
        Transport::new(config, store as Arc<dyn CredentialStore>).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_success_parses_credential() {
        let mut server = mockito::Server::new_async().await;
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("t1")));

        let mock = server
            .mock("POST", "/auth/refresh")
            .match_header("authorization", mockito::Matcher::Missing)
            .match_body(mockito::Matcher::Json(json!({"token": "t1"})))
            .with_status(200)
            .with_body(
                json!({
                    "status": 200,
                    "code": 0,
                    "message": "ok",
                    "data": {"token": "t2", "expiresIn": 3600}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let transport = transport(&server.url(), store);
        let credential = refresh_session(&transport).await.unwrap();

        assert_eq!(credential.token, "t2");
        let expires_at = credential.expires_at.unwrap();
        let lifetime = (expires_at - Utc::now()).num_seconds();
        // 3600 advertised minus the 60 s buffer
        assert!((3500..=3540).contains(&lifetime), "lifetime was {}", lifetime);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_rejection_is_unauthenticated() {
        let mut server = mockito::Server::new_async().await;
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("t1")));

        server
            .mock("POST", "/auth/refresh")
            .with_status(401)
            .with_body(
                json!({
                    "status": 401,
                    "code": 10002,
                    "message": "Refresh token rejected",
                    "data": null
                })
                .to_string(),
            )
            .create_async()
            .await;

        let transport = transport(&server.url(), store);
        let err = refresh_session(&transport).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_refresh_with_malformed_data_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let store = Arc::new(MemoryCredentialStore::new());

        server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_body(
                json!({
                    "status": 200,
                    "code": 0,
                    "message": "ok",
                    "data": {"unexpected": true}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let transport = transport(&server.url(), store);
        let err = refresh_session(&transport).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Network {
                kind: NetworkErrorKind::Decode,
                ..
            }
        ));
    }
}
