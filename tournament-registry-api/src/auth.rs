use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The credentials of a login request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
}

/// A pair of two tokens. The `auth_token` is used to make requests, the
/// `refresh_token` only to obtain a new pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub auth_token: Token,
    pub refresh_token: Token,
}

/// The body of a refresh request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefreshToken {
    pub refresh_token: String,
}

/// The registered claims carried by every token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the admin id)
    pub sub: u64,
    /// Issued at
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Not before time
    pub nbf: u64,
}

impl Claims {
    /// Creates new `Claims` for `sub` with all time claims zeroed. The
    /// issuer fills them in when encoding.
    #[inline]
    pub fn new(sub: u64) -> Self {
        Self {
            sub,
            iat: 0,
            exp: 0,
            nbf: 0,
        }
    }
}

/// An encoded token together with its decoded [`Claims`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token {
    token: String,
    #[serde(skip)]
    claims: Claims,
}

impl Token {
    /// Parses a `Token` from its encoded form, extracting the claims from
    /// the payload segment. The signature is **not** verified here; that is
    /// the server's job.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] if the token has no payload segment or the
    /// payload is not valid claims JSON.
    pub fn new<T>(token: T) -> Result<Self, TokenError>
    where
        T: ToString,
    {
        let token = token.to_string();

        let mut segments = token.split('.');
        let payload = segments
            .nth(1)
            .ok_or(TokenError::InvalidToken)?;

        let payload = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)?;
        let claims = serde_json::from_slice(&payload)?;

        Ok(Self { token, claims })
    }

    /// Creates a `Token` from an already decoded pair. The caller guarantees
    /// that `claims` are the claims encoded in `token`.
    #[inline]
    pub fn from_parts(token: String, claims: Claims) -> Self {
        Self { token, claims }
    }

    /// Returns the encoded token.
    #[inline]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[inline]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    #[inline]
    pub fn into_token(self) -> String {
        self.token
    }

    #[inline]
    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

impl AsRef<str> for Token {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.token
    }
}

impl Display for Token {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl PartialEq for Token {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::{Claims, Token};

    #[test]
    fn test_token_parse_claims() {
        let claims = Claims {
            sub: 3,
            iat: 1,
            exp: 2,
            nbf: 1,
        };

        let payload = base64::encode_config(
            serde_json::to_vec(&claims).unwrap(),
            base64::URL_SAFE_NO_PAD,
        );
        let encoded = format!("header.{}.signature", payload);

        let token = Token::new(&encoded).unwrap();
        assert_eq!(token.claims(), &claims);
        assert_eq!(token.token(), encoded);
    }

    #[test]
    fn test_token_parse_rejects_garbage() {
        Token::new("no-segments").unwrap_err();
        Token::new("a.b.c").unwrap_err();
    }
}
