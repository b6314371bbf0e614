// API client
// Request pipeline: credential attachment, dispatch, auth-failure recovery

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;

use crate::auth::coordinator::RefreshCoordinator;
use crate::auth::refresh;
use crate::auth::store::CredentialStore;
use crate::auth::types::Credential;
use crate::config::ClientConfig;
use crate::endpoints::is_anonymous_tolerant;
use crate::envelope::{self, Payload};
use crate::error::{ApiError, NetworkErrorKind, Result, FORBIDDEN_FALLBACK_MESSAGE};
use crate::navigation::SessionNavigator;
use crate::request::RequestDescriptor;

/// How a dispatch attempt obtains its credential.
pub(crate) enum CredentialMode {
    /// Read whatever the store currently holds (normal first attempt).
    FromStore,
    /// Use a specific credential (the retry after a successful refresh).
    Explicit(Credential),
    /// Send no credential (anonymous retry on a public endpoint).
    Anonymous,
}

/// Owns the pooled HTTP connection and performs one attempt:
/// attach credential, send, unwrap the envelope. No retry logic here.
pub(crate) struct Transport {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
}

impl Transport {
    pub(crate) fn new(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            config,
            store,
        })
    }

    pub(crate) fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) async fn dispatch(
        &self,
        descriptor: &RequestDescriptor,
        credential: CredentialMode,
    ) -> Result<Payload> {
        let url = self.config.endpoint_url(descriptor.path());

        let mut builder = self
            .http
            .request(descriptor.method().clone(), &url)
            .headers(descriptor.headers().clone());

        if !descriptor.query_params().is_empty() {
            builder = builder.query(descriptor.query_params());
        }
        if let Some(body) = descriptor.body() {
            builder = builder.json(body);
        }

        // Refresh calls are never credentialed
        if !descriptor.is_refresh_call() {
            let credential = match credential {
                CredentialMode::FromStore => self.store.get(),
                CredentialMode::Explicit(credential) => Some(credential),
                CredentialMode::Anonymous => None,
            };
            if let Some(credential) = credential {
                match HeaderValue::from_str(&format!("Bearer {}", credential.token)) {
                    Ok(value) => builder = builder.header(AUTHORIZATION, value),
                    Err(_) => tracing::warn!(
                        request_id = %descriptor.id(),
                        "stored token is not a valid header value; sending anonymously"
                    ),
                }
            }
        }

        tracing::debug!(
            request_id = %descriptor.id(),
            method = %descriptor.method(),
            path = descriptor.path(),
            retried = descriptor.retried(),
            "dispatching request"
        );

        let response = builder
            .send()
            .await
            .map_err(|err| envelope::classify_reqwest_error(&err))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| envelope::classify_reqwest_error(&err))?;

        if !status.is_success() {
            tracing::debug!(
                request_id = %descriptor.id(),
                status = status.as_u16(),
                "received error response"
            );
            return Err(envelope::classify_transport_failure(status.as_u16(), &body));
        }

        envelope::unwrap_body(body)
    }
}

/// Authenticated API client for the content platform backend.
///
/// The single entry point is [`send`](Self::send): callers hand it a
/// [`RequestDescriptor`] and receive either the unwrapped payload or a
/// classified error. Credential attachment, envelope unwrapping, token
/// refresh coordination, retries, and forced logout are invisible to
/// them.
pub struct ApiClient {
    transport: Transport,
    coordinator: RefreshCoordinator,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn SessionNavigator>,
}

impl ApiClient {
    /// Create a client over the given configuration and collaborators.
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn SessionNavigator>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let transport = Transport::new(config, store.clone())?;
        let coordinator = RefreshCoordinator::new(store.clone(), navigator.clone());

        Ok(Self {
            transport,
            coordinator,
            store,
            navigator,
        })
    }

    /// Create a client with an in-memory store and no-op navigator.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(base_url: impl Into<String>) -> anyhow::Result<Self> {
        use crate::auth::store::MemoryCredentialStore;
        use crate::navigation::NoopNavigator;

        Self::new(
            ClientConfig::new(base_url),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(NoopNavigator),
        )
    }

    /// Send a request and return its unwrapped payload.
    ///
    /// Recovery policy on failure:
    /// - `Unauthenticated` triggers at most one retry, either anonymous
    ///   (public endpoints) or after a coordinated token refresh;
    /// - `Forbidden` is surfaced immediately with a guaranteed message;
    /// - everything else propagates unchanged.
    pub async fn send(&self, descriptor: RequestDescriptor) -> Result<Payload> {
        match self
            .transport
            .dispatch(&descriptor, CredentialMode::FromStore)
            .await
        {
            Ok(payload) => Ok(payload),
            Err(err @ ApiError::Unauthenticated { .. }) => {
                self.recover_unauthenticated(descriptor, err).await
            }
            Err(err) => Err(ensure_forbidden_message(err)),
        }
    }

    /// [`send`](Self::send), deserializing the JSON payload into `T`.
    pub async fn send_as<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T> {
        let payload = self.send(descriptor).await?;
        serde_json::from_value(payload.into_json()).map_err(|err| ApiError::Network {
            kind: NetworkErrorKind::Decode,
            message: format!("Failed to decode response payload: {}", err),
        })
    }

    async fn recover_unauthenticated(
        &self,
        descriptor: RequestDescriptor,
        err: ApiError,
    ) -> Result<Payload> {
        // The refresh call rejecting its own credentials is terminal:
        // recovering would recurse into another refresh.
        if descriptor.is_refresh_call() {
            tracing::error!(
                request_id = %descriptor.id(),
                "refresh call itself was rejected; ending session"
            );
            self.store.clear();
            self.navigator.redirect_to_login();
            return Err(err);
        }

        // At most one retry per logical request
        if descriptor.retried() {
            tracing::warn!(
                request_id = %descriptor.id(),
                "credential rejected after retry; giving up"
            );
            return Err(err);
        }

        // An expired token on a public endpoint is not a session problem:
        // drop the credential and try again, no refresh involved.
        if is_anonymous_tolerant(descriptor.path()) {
            tracing::debug!(
                request_id = %descriptor.id(),
                path = descriptor.path(),
                "public endpoint rejected the credential; retrying anonymously"
            );
            return self.retry(descriptor, CredentialMode::Anonymous).await;
        }

        tracing::warn!(
            request_id = %descriptor.id(),
            path = descriptor.path(),
            "credential rejected; coordinating token refresh"
        );

        match self
            .coordinator
            .refresh(refresh::refresh_session(&self.transport))
            .await
        {
            Ok(credential) => {
                self.retry(descriptor, CredentialMode::Explicit(credential))
                    .await
            }
            Err(refresh_err) => {
                // Refresh failed; public endpoints still get their
                // anonymous attempt instead of inheriting the failure.
                if is_anonymous_tolerant(descriptor.path()) {
                    self.retry(descriptor, CredentialMode::Anonymous).await
                } else {
                    Err(refresh_err)
                }
            }
        }
    }

    /// Resend once with `retried` marked. Whatever comes back is final.
    async fn retry(
        &self,
        descriptor: RequestDescriptor,
        credential: CredentialMode,
    ) -> Result<Payload> {
        let descriptor = descriptor.into_retry();
        self.transport
            .dispatch(&descriptor, credential)
            .await
            .map_err(ensure_forbidden_message)
    }
}

/// Forbidden errors must always carry readable text, even when the
/// backend sent none.
fn ensure_forbidden_message(err: ApiError) -> ApiError {
    match err {
        ApiError::Forbidden {
            status,
            code,
            message,
        } => {
            let message = if message.trim().is_empty() {
                FORBIDDEN_FALLBACK_MESSAGE.to_string()
            } else {
                message
            };
            ApiError::Forbidden {
                status,
                code,
                message,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;
    use crate::navigation::NoopNavigator;
    use serde_json::json;

    fn client_against(server: &mockito::Server) -> ApiClient {
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("t1")));
        let mut config = ClientConfig::new(server.url());
        config.api_prefix = String::new();
        ApiClient::new(
            config,
            store as Arc<dyn CredentialStore>,
            Arc::new(NoopNavigator),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_attaches_bearer_and_unwraps() {
        let mut server = mockito::Server::new_async().await;
        let client = client_against(&server);

        let mock = server
            .mock("GET", "/users/me")
            .match_header("authorization", "Bearer t1")
            .with_status(200)
            .with_body(
                json!({
                    "status": 200,
                    "code": 0,
                    "message": "ok",
                    "data": {"id": 9, "role": "editor"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let payload = client.send(RequestDescriptor::get("/users/me")).await.unwrap();
        assert_eq!(payload.into_json(), json!({"id": 9, "role": "editor"}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_without_credential_is_anonymous() {
        let mut server = mockito::Server::new_async().await;
        let store = Arc::new(MemoryCredentialStore::new());
        let mut config = ClientConfig::new(server.url());
        config.api_prefix = String::new();
        let client = ApiClient::new(
            config,
            store as Arc<dyn CredentialStore>,
            Arc::new(NoopNavigator),
        )
        .unwrap();

        let mock = server
            .mock("GET", "/news")
            .match_header("authorization", mockito::Matcher::Missing)
            .with_status(200)
            .with_body(
                json!({"status": 200, "code": 0, "message": "ok", "data": []}).to_string(),
            )
            .create_async()
            .await;

        let payload = client.send(RequestDescriptor::get("/news")).await.unwrap();
        assert_eq!(payload.into_json(), json!([]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_as_decodes_payload() {
        #[derive(serde::Deserialize)]
        struct Profile {
            id: i64,
            role: String,
        }

        let mut server = mockito::Server::new_async().await;
        let client = client_against(&server);

        server
            .mock("GET", "/users/me")
            .with_status(200)
            .with_body(
                json!({
                    "status": 200,
                    "code": 0,
                    "message": "ok",
                    "data": {"id": 9, "role": "editor"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let profile: Profile = client
            .send_as(RequestDescriptor::get("/users/me"))
            .await
            .unwrap();
        assert_eq!(profile.id, 9);
        assert_eq!(profile.role, "editor");
    }

    #[test]
    fn test_ensure_forbidden_message_rewrites_empty() {
        let err = ensure_forbidden_message(ApiError::Forbidden {
            status: 403,
            code: None,
            message: "  ".to_string(),
        });
        assert_eq!(err.message(), FORBIDDEN_FALLBACK_MESSAGE);

        let err = ensure_forbidden_message(ApiError::Forbidden {
            status: 403,
            code: None,
            message: "Editors only".to_string(),
        });
        assert_eq!(err.message(), "Editors only");
    }
}
