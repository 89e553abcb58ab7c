//! LTI 1.3 OIDC login and launch endpoints.
//!
//! The login leg answers the platform's third-party-initiated login with a
//! redirect to the platform's authorization endpoint, remembering the state
//! and nonce it sent. The launch leg receives the signed id_token, consumes
//! that state, validates the token and hands the user a session cookie.
//! A failure at any step ends the attempt; the user restarts from the LMS.

use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::header::{HOST, LOCATION};
use axum::http::{HeaderMap, HeaderName, StatusCode, Uri};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use url::Url;

use lti_launch_auth::{generate_nonce, generate_state, IdTokenValidator, StateData};
use lti_launch_store::{LaunchIdentity, Store};

use crate::auth::session_cookie;
use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Path of the launch callback on this service.
pub const LAUNCH_PATH: &str = "/lti/launch";

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// A 302 redirect, optionally setting cookies.
pub type Found = (StatusCode, CookieJar, [(HeaderName, String); 1]);

fn found(location: String, jar: CookieJar) -> Found {
    (StatusCode::FOUND, jar, [(LOCATION, location)])
}

/// Parameters of a third-party-initiated login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    /// Platform issuer.
    pub iss: Option<String>,
    /// Opaque user hint to echo back to the platform.
    pub login_hint: Option<String>,
    /// Where the platform wants the user to end up.
    pub target_link_uri: Option<String>,
    /// Tool registration the platform is launching.
    pub client_id: Option<String>,
    /// Opaque message hint to echo back to the platform.
    pub lti_message_hint: Option<String>,
}

impl LoginParams {
    /// Fill unset or empty values from `fallback`. Query parameters take
    /// precedence over form fields.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        fn pick(primary: Option<String>, fallback: Option<String>) -> Option<String> {
            primary.filter(|v| !v.is_empty()).or(fallback)
        }

        Self {
            iss: pick(self.iss, fallback.iss),
            login_hint: pick(self.login_hint, fallback.login_hint),
            target_link_uri: pick(self.target_link_uri, fallback.target_link_uri),
            client_id: pick(self.client_id, fallback.client_id),
            lti_message_hint: pick(self.lti_message_hint, fallback.lti_message_hint),
        }
    }
}

/// Parameters of the launch form post.
#[derive(Debug, Default, Deserialize)]
pub struct LaunchParams {
    /// Signed id_token from the platform.
    pub id_token: Option<String>,
    /// State issued at login.
    pub state: Option<String>,
}

fn required<'a>(value: Option<&'a String>, name: &str) -> Result<&'a str, ApiError> {
    value
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing {name} parameter")))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// The client-side value of an `X-Forwarded-*` header. Each proxy in a chain
/// appends its own entry, so the first one is the client's.
fn forwarded<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    header_str(headers, name)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// The scheme the client used to reach us.
fn request_scheme<'a>(headers: &'a HeaderMap, config: &GatewayConfig) -> &'a str {
    forwarded(headers, X_FORWARDED_PROTO)
        .unwrap_or(if config.tls_terminated { "https" } else { "http" })
}

/// Whether the client reached us over TLS.
pub(crate) fn is_secure(headers: &HeaderMap, config: &GatewayConfig) -> bool {
    request_scheme(headers, config).eq_ignore_ascii_case("https")
}

/// Reconstruct this service's launch callback URL from the incoming request.
#[must_use]
pub fn launch_url(headers: &HeaderMap, uri: &Uri, config: &GatewayConfig) -> String {
    let host = forwarded(headers, X_FORWARDED_HOST)
        .or_else(|| header_str(headers, HOST.as_str()))
        .or_else(|| uri.authority().map(axum::http::uri::Authority::as_str))
        .unwrap_or("localhost");

    format!(
        "{}://{host}{LAUNCH_PATH}",
        request_scheme(headers, config)
    )
}

/// Parameters of the authorization redirect.
pub struct AuthRequest<'a> {
    /// Tool client ID at the platform.
    pub client_id: &'a str,
    /// Launch callback URL.
    pub redirect_uri: &'a str,
    /// Echoed login hint.
    pub login_hint: &'a str,
    /// Freshly generated state.
    pub state: &'a str,
    /// Freshly generated nonce.
    pub nonce: &'a str,
    /// Echoed message hint, if any.
    pub lti_message_hint: Option<&'a str>,
}

/// Build the platform authorization URL for an OIDC implicit-flow request.
///
/// Parameters already present on the endpoint are kept unless this request
/// sets them.
///
/// # Errors
///
/// Returns an error if the platform's authorization endpoint is not a URL.
pub fn authorization_url(auth_endpoint: &str, request: &AuthRequest<'_>) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(auth_endpoint)?;

    let mut params = vec![
        ("scope", "openid"),
        ("response_type", "id_token"),
        ("client_id", request.client_id),
        ("redirect_uri", request.redirect_uri),
        ("login_hint", request.login_hint),
        ("state", request.state),
        ("response_mode", "form_post"),
        ("nonce", request.nonce),
        ("prompt", "none"),
    ];
    if let Some(hint) = request.lti_message_hint.filter(|h| !h.is_empty()) {
        params.push(("lti_message_hint", hint));
    }

    let existing: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !params.iter().any(|(name, _)| *name == key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in &existing {
            query.append_pair(key, value);
        }
        for (key, value) in &params {
            query.append_pair(key, value);
        }
    }

    Ok(url)
}

/// `GET /lti/login`
pub async fn login_get<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<LoginParams>,
) -> Result<Found, ApiError>
where
    S: Store + 'static,
    V: IdTokenValidator + 'static,
{
    initiate_login(&state, &headers, &uri, params)
}

/// `POST /lti/login`
pub async fn login_post<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<LoginParams>,
    form: Option<Form<LoginParams>>,
) -> Result<Found, ApiError>
where
    S: Store + 'static,
    V: IdTokenValidator + 'static,
{
    let form = form.map(|Form(f)| f).unwrap_or_default();
    initiate_login(&state, &headers, &uri, query.or(form))
}

fn initiate_login<S, V>(
    state: &GatewayState<S, V>,
    headers: &HeaderMap,
    uri: &Uri,
    params: LoginParams,
) -> Result<Found, ApiError>
where
    S: Store,
    V: IdTokenValidator,
{
    let iss = required(params.iss.as_ref(), "iss")?;
    let login_hint = required(params.login_hint.as_ref(), "login_hint")?;
    let target_link_uri = required(params.target_link_uri.as_ref(), "target_link_uri")?;

    let Some(platform) = state.store.find_platform_by_issuer(iss)? else {
        tracing::warn!(issuer = %iss, "Login from unknown platform issuer");
        return Err(ApiError::bad_request("unknown platform issuer"));
    };

    if let Some(client_id) = params.client_id.as_deref().filter(|c| !c.is_empty()) {
        if client_id != platform.client_id {
            tracing::warn!(
                issuer = %iss,
                client_id = %client_id,
                "Login client_id does not match registered platform"
            );
            return Err(ApiError::bad_request("client_id mismatch"));
        }
    }

    let login_state = generate_state();
    let nonce = generate_nonce();
    let redirect_uri = launch_url(headers, uri, &state.config);

    let url = authorization_url(
        &platform.auth_endpoint,
        &AuthRequest {
            client_id: &platform.client_id,
            redirect_uri: &redirect_uri,
            login_hint,
            state: &login_state,
            nonce: &nonce,
            lti_message_hint: params.lti_message_hint.as_deref(),
        },
    )
    .map_err(|e| {
        tracing::error!(issuer = %platform.issuer, error = %e, "Platform auth endpoint is not a URL");
        ApiError::Internal("invalid auth endpoint".to_string())
    })?;

    state.states.store(
        login_state,
        StateData {
            nonce,
            target_link_uri: target_link_uri.to_string(),
            client_id: platform.client_id.clone(),
        },
    );

    tracing::info!(issuer = %platform.issuer, "LTI login initiated");

    Ok(found(url.into(), CookieJar::new()))
}

/// `POST /lti/launch`
pub async fn launch<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    headers: HeaderMap,
    form: Option<Form<LaunchParams>>,
) -> Result<Found, ApiError>
where
    S: Store + 'static,
    V: IdTokenValidator + 'static,
{
    let params = form.map(|Form(f)| f).unwrap_or_default();

    let id_token = params
        .id_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing id_token"))?;
    let login_state = params
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing state"))?;

    let Some(pending) = state.states.get_and_consume(&login_state) else {
        tracing::warn!("Launch with unknown, replayed or expired state");
        return Err(ApiError::bad_request("invalid or expired state"));
    };

    let Some(platform) = state.store.find_platform_by_client_id(&pending.client_id)? else {
        tracing::warn!(client_id = %pending.client_id, "Platform vanished between login and launch");
        return Err(ApiError::bad_request("platform not found"));
    };

    let claims = state
        .validator
        .validate(&id_token, &platform, &pending.nonce)
        .await
        .map_err(|e| {
            tracing::warn!(issuer = %platform.issuer, error = %e, "id_token rejected");
            ApiError::token_validation(&e)
        })?;

    let identity = LaunchIdentity {
        platform_issuer: platform.issuer.clone(),
        external_user_id: claims.sub.clone(),
        display_name: claims.name.clone().unwrap_or_default(),
        email: claims.email.clone().unwrap_or_default(),
    };
    let user = state.store.find_or_create_user(&identity).map_err(|e| {
        tracing::error!(error = %e, "Failed to find or create launch user");
        ApiError::Internal("failed to process user".to_string())
    })?;

    let role = claims.role();
    let token = state
        .sessions
        .create_token(&user.user_id, &claims.sub, claims.context_id(), role)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to sign session");
            ApiError::Internal("failed to create session".to_string())
        })?;

    let cookie = session_cookie(
        token,
        state.sessions.max_age().as_secs(),
        is_secure(&headers, &state.config),
    );

    tracing::info!(
        issuer = %platform.issuer,
        user_id = %user.user_id,
        role = %role,
        "LTI launch established session"
    );

    Ok(found(
        redirect_target(&pending, &state.config),
        CookieJar::new().add(cookie),
    ))
}

fn redirect_target(pending: &StateData, config: &GatewayConfig) -> String {
    if pending.target_link_uri.is_empty() {
        config.frontend_url.clone()
    } else {
        pending.target_link_uri.clone()
    }
}
