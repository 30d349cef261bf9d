//! Voice platform endpoints: token exchange and credential lookup.

use axum::{
    Form, Json,
    extract::{FromRequest, Request, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use secrecy::ExposeSecret;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};
use crate::services::{ClientCredentials, LinkError};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Token endpoint body fields.
///
/// Not `Debug`: carries the client secret and the linking code.
#[derive(Default, Deserialize)]
struct TokenRequestBody {
    grant_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_code")]
    code: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl TokenRequestBody {
    /// Collect form pairs. A repeated `code` is kept as an unredeemable
    /// empty code; any other repeated field is a malformed request.
    fn from_pairs(pairs: Vec<(String, String)>) -> std::result::Result<Self, LinkError> {
        let mut body = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "grant_type" => &mut body.grant_type,
                "client_id" => &mut body.client_id,
                "client_secret" => &mut body.client_secret,
                "code" => {
                    body.code = Some(if body.code.is_some() { String::new() } else { value });
                    continue;
                }
                _ => continue,
            };
            if slot.replace(value).is_some() {
                return Err(LinkError::InvalidRequest(format!("duplicate field `{key}`")));
            }
        }
        Ok(body)
    }
}

/// Accept any JSON value for `code`. Non-strings keep their JSON text and
/// fail redemption like any other unknown code.
fn lenient_code<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(code)) => Some(code),
        Some(other) => Some(other.to_string()),
    })
}

/// A token request, from a form or JSON body plus optional HTTP Basic auth.
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub credentials: ClientCredentials,
}

/// Client credentials from `Authorization: Basic`, if present.
///
/// Both halves are form-urlencoded before base64 encoding.
fn basic_credentials(headers: &HeaderMap) -> Option<ClientCredentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = String::from_utf8(BASE64_STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (id, secret) = decoded.split_once(':')?;

    Some(ClientCredentials {
        client_id: Some(urlencoding::decode(id).ok()?.into_owned()),
        client_secret: Some(urlencoding::decode(secret).ok()?.into_owned()),
    })
}

/// Bearer token from `Authorization: Bearer`, if present.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

impl<S> FromRequest<S> for TokenRequest
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let basic = basic_credentials(req.headers());

        let body = if is_json(req.headers()) {
            Json::<TokenRequestBody>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|e| LinkError::InvalidRequest(e.body_text()))?
        } else {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| LinkError::InvalidRequest(e.body_text()))?;
            TokenRequestBody::from_pairs(pairs)?
        };

        let credentials = basic.unwrap_or(ClientCredentials {
            client_id: body.client_id,
            client_secret: body.client_secret,
        });

        Ok(Self {
            grant_type: body.grant_type,
            code: body.code,
            credentials,
        })
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Successful token response.
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Credential lookup response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialLookupResponse {
    pub shop_identifier: String,
    pub shop_credential_secret: String,
}

fn no_store(body: impl Serialize) -> Response {
    let mut response = Json(body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

// =============================================================================
// Handlers
// =============================================================================

/// Exchange a linking code for a bearer token.
///
/// The client is authenticated before the code is touched.
///
/// # Route
///
/// `POST /token`
pub async fn token(State(state): State<AppState>, request: TokenRequest) -> Result<Response> {
    let client_id = request.credentials.authenticate(&state.config().voice)?;

    let issued = state
        .tokens()
        .issue_token(
            request.grant_type.as_deref().unwrap_or_default(),
            request.code.as_deref(),
            &client_id,
        )
        .await?;

    Ok(no_store(TokenResponse {
        access_token: issued.token.expose_secret().to_string(),
        token_type: "Bearer",
        expires_in: issued.expires_in,
    }))
}

/// Resolve a bearer token to the linked storefront credential.
///
/// # Route
///
/// `GET /credential-lookup`
pub async fn credential_lookup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    let credential = state
        .tokens()
        .lookup_credential(bearer_token(&headers))
        .await?;

    Ok(no_store(CredentialLookupResponse {
        shop_identifier: credential.shop().to_string(),
        shop_credential_secret: credential.access_token().expose_secret().to_string(),
    }))
}
