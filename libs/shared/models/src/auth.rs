use serde::{Deserialize, Serialize};

/// Claims carried by the HS256 bearer tokens this service accepts. Only the
/// fields the middleware acts on are modelled; anything else in the payload
/// is ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub aud: Option<String>,
}

/// Acting identity injected by the auth middleware. The scheduling core
/// trusts the caller-supplied doctor/patient ids and never authorizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}
