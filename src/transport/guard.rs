//! HTTP boundary for the session lifecycle.
//!
//! `TransportGuard` attaches identity and session headers to every outgoing
//! request and inspects every incoming response. A 401 anywhere triggers
//! the registered unauthorized hook (session invalidation) and a
//! redirect-to-login signal toward the router collaborator; the error still
//! propagates to the original caller.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::REQUEST_TIMEOUT_SECS;
use crate::error::AuthError;
use crate::identity::DeviceIdentity;

/// Header carrying the stable device identifier
const DEVICE_ID_HEADER: &str = "Device-Id";

/// Header echoing the server-issued anti-forgery token
const CSRF_HEADER: &str = "X-CSRF-Token";

/// Signal raised toward the external router when the session is
/// invalidated out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    RedirectToLogin,
}

/// Hook invoked on an observed 401. Returns `true` if a live session was
/// invalidated by this call, `false` if there was nothing left to clear.
pub(crate) type UnauthorizedHook = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Clone)]
struct SessionHeaders {
    access_token: String,
    csrf_token: String,
}

pub struct TransportGuard {
    client: Client,
    identity: Arc<DeviceIdentity>,
    session: RwLock<Option<SessionHeaders>>,
    hook: Mutex<Option<UnauthorizedHook>>,
    nav_tx: mpsc::UnboundedSender<NavigationEvent>,
}

impl TransportGuard {
    pub(crate) fn new(
        identity: Arc<DeviceIdentity>,
        nav_tx: mpsc::UnboundedSender<NavigationEvent>,
    ) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            identity,
            session: RwLock::new(None),
            hook: Mutex::new(None),
            nav_tx,
        })
    }

    /// Register the response-inspection hook. Called once by the session
    /// manager at construction.
    pub(crate) fn set_unauthorized_hook(&self, hook: UnauthorizedHook) {
        *self.hook.lock().unwrap() = Some(hook);
    }

    /// Bind the current credential pair to outgoing requests.
    pub(crate) fn set_session_headers(&self, access_token: &str, csrf_token: &str) {
        *self.session.write().unwrap() = Some(SessionHeaders {
            access_token: access_token.to_string(),
            csrf_token: csrf_token.to_string(),
        });
    }

    pub(crate) fn clear_session_headers(&self) {
        *self.session.write().unwrap() = None;
    }

    fn headers(&self) -> Result<header::HeaderMap, AuthError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            DEVICE_ID_HEADER,
            header::HeaderValue::from_str(&self.identity.id())?,
        );
        if let Some(ref session) = *self.session.read().unwrap() {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", session.access_token))?,
            );
            headers.insert(CSRF_HEADER, header::HeaderValue::from_str(&session.csrf_token)?);
        }
        Ok(headers)
    }

    /// Start a request with the identity and session headers attached.
    /// External collaborators route their ordinary API calls through this
    /// so their responses are inspected too.
    pub fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, AuthError> {
        Ok(self.client.request(method, url).headers(self.headers()?))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AuthError> {
        let response = self.execute(self.request(Method::GET, url)?).await?;
        response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, AuthError> {
        let request = self.request(Method::POST, url)?.json(body);
        let response = self.execute(request).await?;
        response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    /// POST with an explicit bearer credential instead of the session's
    /// access token. The refresh call authenticates with the refresh token.
    pub(crate) async fn post_json_with_bearer<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        bearer: &str,
    ) -> Result<T, AuthError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            DEVICE_ID_HEADER,
            header::HeaderValue::from_str(&self.identity.id())?,
        );
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );
        let request = self.client.post(url).headers(headers).json(body);
        let response = self.execute(request).await?;
        response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    /// Send a request and inspect the response. Every response funnels
    /// through here so a 401 from any call site reaches the hook.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, AuthError> {
        let response = request.send().await?;
        self.inspect(response).await
    }

    async fn inspect(&self, response: Response) -> Result<Response, AuthError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(url = %response.url(), "unauthorized response observed");
            self.notify_unauthorized();
            return Err(AuthError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::from_status(status, &body));
        }
        Ok(response)
    }

    /// Invoke the unauthorized hook and, if it invalidated a live session,
    /// raise exactly one redirect-to-login signal.
    fn notify_unauthorized(&self) {
        let hook = self.hook.lock().unwrap().clone();
        let Some(hook) = hook else {
            return;
        };
        if hook() {
            debug!("session invalidated, signalling redirect to login");
            // Only fails if the router dropped its receiver
            let _ = self.nav_tx.send(NavigationEvent::RedirectToLogin);
        }
    }
}
