use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::AUTHORIZATION;
use http::{HeaderMap, StatusCode};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use super::context::AuthContext;
use crate::http_server::envelope;

const BEARER: &str = "Bearer";

/// Claim keys holding the caller's groups, in lookup order.
const GROUP_CLAIMS: [&str; 2] = ["groups", "cognito:groups"];

/// Normalized group names taken from a token, in token order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    groups: Vec<String>,
}

impl ClaimSet {
    pub fn new(groups: Vec<String>) -> Self {
        Self { groups }
    }

    /// Parse the `Authorization` header into a claim set.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ClaimsError> {
        let token = bearer_token(headers)?;
        let claims = decode_claims(token)?;
        Self::from_claims(&claims)
    }

    /// Read the group claim from decoded token claims.
    ///
    /// `groups` wins over `cognito:groups`; a null value counts as absent. The
    /// value may be a single string or a list of strings. One leading `/` is
    /// stripped from every group.
    pub fn from_claims(claims: &Map<String, Value>) -> Result<Self, ClaimsError> {
        let value = GROUP_CLAIMS
            .iter()
            .find_map(|key| claims.get(*key).filter(|v| !v.is_null()))
            .ok_or(ClaimsError::MissingGroups)?;

        let raw: Vec<&str> = match value {
            Value::String(group) => vec![group.as_str()],
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().ok_or(ClaimsError::InvalidGroupsFormat))
                .collect::<Result<_, _>>()?,
            _ => return Err(ClaimsError::InvalidGroupsFormat),
        };

        let groups: Vec<String> = raw
            .into_iter()
            .map(|group| group.strip_prefix('/').unwrap_or(group).to_string())
            .collect();
        if groups.is_empty() {
            return Err(ClaimsError::MissingGroups);
        }

        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// First group equal to `name`, byte for byte.
    pub fn find(&self, name: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|group| group.as_str() == name)
            .map(String::as_str)
    }
}

/// Split `Bearer <token>` out of the request headers.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ClaimsError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(ClaimsError::MissingHeader)?
        .to_str()
        .map_err(|_| ClaimsError::MalformedHeader)?;

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if *scheme == BEARER => Ok(*token),
        _ => Err(ClaimsError::MalformedHeader),
    }
}

/// Decode a JWT payload without checking its signature, expiry or audience.
fn decode_claims(token: &str) -> Result<Map<String, Value>, ClaimsError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<Map<String, Value>>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| ClaimsError::MalformedToken(e.to_string()))
}

/// Route layer: parse the caller's groups and attach an [`AuthContext`].
pub async fn middleware(mut request: Request, next: Next) -> Result<Response, ClaimsError> {
    let claims = ClaimSet::from_headers(request.headers()).inspect_err(|e| {
        tracing::warn!(path = %request.uri().path(), "rejected request: {}", e);
    })?;

    tracing::debug!(groups = ?claims.groups(), "token claims accepted");
    request.extensions_mut().insert(AuthContext::new(claims));
    Ok(next.run(request).await)
}

#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("token carries no groups")]
    MissingGroups,
    #[error("token groups must be a string or a list of strings")]
    InvalidGroupsFormat,
}

impl ClaimsError {
    pub fn status(&self) -> StatusCode {
        match self {
            ClaimsError::MissingHeader
            | ClaimsError::MalformedHeader
            | ClaimsError::MalformedToken(_) => StatusCode::UNAUTHORIZED,
            ClaimsError::MissingGroups | ClaimsError::InvalidGroupsFormat => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ClaimsError {
    fn into_response(self) -> Response {
        envelope::failure(self.status(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("claims must be an object"),
        }
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn signed(payload: Value) -> String {
        encode(
            &Header::default(),
            &payload,
            &EncodingKey::from_secret(b"someone-elses-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_string_and_list_groups_normalize_identically() {
        let single = ClaimSet::from_claims(&claims(json!({"groups": "/teamA"}))).unwrap();
        let list = ClaimSet::from_claims(&claims(json!({"groups": ["teamA"]}))).unwrap();
        assert_eq!(single, list);
        assert_eq!(single.groups(), ["teamA".to_string()]);
    }

    #[test]
    fn test_only_one_leading_slash_is_stripped() {
        let set = ClaimSet::from_claims(&claims(json!({"groups": ["//a", "b/", "/c/d"]}))).unwrap();
        assert_eq!(set.groups(), ["/a", "b/", "c/d"]);
    }

    #[test]
    fn test_cognito_groups_fallback() {
        let set =
            ClaimSet::from_claims(&claims(json!({"cognito:groups": ["/ops", "dev"]}))).unwrap();
        assert_eq!(set.groups(), ["ops", "dev"]);

        let null_groups =
            ClaimSet::from_claims(&claims(json!({"groups": null, "cognito:groups": "ops"})))
                .unwrap();
        assert_eq!(null_groups.groups(), ["ops"]);

        let preferred =
            ClaimSet::from_claims(&claims(json!({"groups": "a", "cognito:groups": "b"}))).unwrap();
        assert_eq!(preferred.groups(), ["a"]);
    }

    #[test]
    fn test_missing_or_invalid_groups() {
        assert!(matches!(
            ClaimSet::from_claims(&claims(json!({"sub": "u1"}))),
            Err(ClaimsError::MissingGroups)
        ));
        assert!(matches!(
            ClaimSet::from_claims(&claims(json!({"groups": []}))),
            Err(ClaimsError::MissingGroups)
        ));
        assert!(matches!(
            ClaimSet::from_claims(&claims(json!({"groups": ["a", 1]}))),
            Err(ClaimsError::InvalidGroupsFormat)
        ));
        assert!(matches!(
            ClaimSet::from_claims(&claims(json!({"groups": {"a": true}}))),
            Err(ClaimsError::InvalidGroupsFormat)
        ));
        assert!(matches!(
            ClaimSet::from_claims(&claims(json!({"groups": 7}))),
            Err(ClaimsError::InvalidGroupsFormat)
        ));
    }

    #[test]
    fn test_header_shape() {
        assert!(matches!(
            ClaimSet::from_headers(&HeaderMap::new()),
            Err(ClaimsError::MissingHeader)
        ));
        for value in ["Bearer", "Basic abc", "Bearer a b", "bearer abc", "Bearer  abc"] {
            assert!(
                matches!(
                    ClaimSet::from_headers(&headers(value)),
                    Err(ClaimsError::MalformedHeader)
                ),
                "{value}"
            );
        }
        assert!(matches!(
            ClaimSet::from_headers(&headers("Bearer not-a-jwt")),
            Err(ClaimsError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_signature_and_expiry_are_not_checked() {
        let token = signed(json!({"groups": ["teamA"], "exp": 1, "aud": "elsewhere"}));
        let set = ClaimSet::from_headers(&headers(&format!("Bearer {}", token))).unwrap();
        assert_eq!(set.groups(), ["teamA"]);

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"groups":"/teamB"}"#);
        let forged = format!("{}.{}.c2lnbmF0dXJl", header, payload);
        let set = ClaimSet::from_headers(&headers(&format!("Bearer {}", forged))).unwrap();
        assert_eq!(set.groups(), ["teamB"]);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ClaimsError::MissingHeader.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ClaimsError::MalformedToken(String::new()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ClaimsError::MissingGroups.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ClaimsError::InvalidGroupsFormat.status(),
            StatusCode::FORBIDDEN
        );
    }
}
