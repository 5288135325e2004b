//! Request authentication.
//!
//! Credentials travel in the `Authorization` header as
//! `<Method> <base64(content)>`:
//!
//! - `Basic base64(user:password)` for [`BasicAuth`]
//! - `Bearer base64(token)` for [`TokenAuth`]
//!
//! [`IpAuth`] ignores the header and trusts a fixed set of caller addresses.
//! [`AnyAuth`] accepts a request if any of its providers does.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use thiserror::Error;

/// What a provider gets to look at
#[derive(Debug, Clone, Copy)]
pub struct AuthContext<'a> {
    /// Raw `Authorization` header, if present
    pub authorization: Option<&'a str>,
    /// Address of the calling client
    pub peer: IpAddr,
}

/// Authentication errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No usable credentials in the request
    #[error("Authentication required: {0}")]
    Missing(String),

    /// Credentials present but not accepted
    #[error("Authentication failed: {0}")]
    Invalid(String),
}

impl AuthError {
    /// Create a missing credentials error
    pub fn missing(message: impl Into<String>) -> Self {
        Self::Missing(message.into())
    }

    /// Create an invalid credentials error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Unified authentication provider trait
pub trait AuthProvider: Send + Sync {
    /// Check the request described by `ctx`
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the caller is authenticated
    /// * `Err(AuthError)` otherwise
    fn check(&self, ctx: &AuthContext<'_>) -> Result<(), AuthError>;
}

/// Split and decode an `Authorization` header into `(method, content)`
fn decode_header<'a>(ctx: &AuthContext<'a>) -> Result<(&'a str, String), AuthError> {
    let header = ctx
        .authorization
        .ok_or_else(|| AuthError::missing("no Authorization header"))?;
    let (method, encoded) = header
        .split_once(' ')
        .ok_or_else(|| AuthError::invalid("malformed Authorization header"))?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::invalid("Authorization content is not valid base64"))?;
    let content = String::from_utf8(decoded)
        .map_err(|_| AuthError::invalid("Authorization content is not valid UTF-8"))?;
    Ok((method, content))
}

/// Username/password authentication
#[derive(Debug, Clone, Default)]
pub struct BasicAuth {
    users: HashMap<String, String>,
}

impl BasicAuth {
    /// Create from a user -> password map
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }
}

impl AuthProvider for BasicAuth {
    fn check(&self, ctx: &AuthContext<'_>) -> Result<(), AuthError> {
        let (method, content) = decode_header(ctx)?;
        if method != "Basic" {
            return Err(AuthError::invalid(format!("unsupported method '{}'", method)));
        }
        let (user, pass) = content
            .split_once(':')
            .filter(|(user, pass)| !user.is_empty() && !pass.is_empty())
            .ok_or_else(|| AuthError::invalid("expected user:password"))?;
        match self.users.get(user) {
            Some(expected) if expected == pass => Ok(()),
            _ => Err(AuthError::invalid(format!("bad credentials for user '{}'", user))),
        }
    }
}

/// Bearer token authentication
#[derive(Debug, Clone, Default)]
pub struct TokenAuth {
    tokens: HashSet<String>,
}

impl TokenAuth {
    /// Create from a list of accepted tokens; empty tokens are ignored
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }
}

impl AuthProvider for TokenAuth {
    fn check(&self, ctx: &AuthContext<'_>) -> Result<(), AuthError> {
        let (method, token) = decode_header(ctx)?;
        if method != "Bearer" {
            return Err(AuthError::invalid(format!("unsupported method '{}'", method)));
        }
        if self.tokens.contains(&token) {
            Ok(())
        } else {
            Err(AuthError::invalid("unknown token"))
        }
    }
}

/// Caller address allowlist
#[derive(Debug, Clone, Default)]
pub struct IpAuth {
    allowed: HashSet<IpAddr>,
}

impl IpAuth {
    /// Create from the admin addresses
    pub fn new(allowed: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            allowed: allowed.into_iter().map(|ip| ip.to_canonical()).collect(),
        }
    }
}

impl AuthProvider for IpAuth {
    fn check(&self, ctx: &AuthContext<'_>) -> Result<(), AuthError> {
        if self.allowed.contains(&ctx.peer.to_canonical()) {
            Ok(())
        } else {
            Err(AuthError::invalid(format!("{} is not an admin address", ctx.peer)))
        }
    }
}

/// Accepts a request if any inner provider accepts it
#[derive(Default)]
pub struct AnyAuth {
    providers: Vec<Box<dyn AuthProvider>>,
}

impl AnyAuth {
    /// Create an empty combinator, which rejects everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider
    pub fn with(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl AuthProvider for AnyAuth {
    fn check(&self, ctx: &AuthContext<'_>) -> Result<(), AuthError> {
        let mut last = AuthError::missing("no authentication configured");
        for provider in &self.providers {
            match provider.check(ctx) {
                Ok(()) => return Ok(()),
                Err(e) => last = e,
            }
        }
        Err(last)
    }
}
