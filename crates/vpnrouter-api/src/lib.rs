// # vpnrouter-api
//
// HTTP surface of the router, speaking a small JSON:API dialect
// (`application/vnd.api+json`).
//
// ## Endpoints
//
// - `GET  /api/tables`: routing tables a client may pick
// - `GET  /api/routes`: every known host with its current table, sorted by hostname
// - `POST /api/routes`: change the table of one IP
// - `GET  /*`: static web UI, if a directory is configured
//
// ## Authorization
//
// A client may always change the route of its own IP. Changing any other IP
// goes through the configured [`AuthProvider`].

pub mod auth;
pub mod error;
pub mod server;

pub use auth::{AnyAuth, AuthContext, AuthError, AuthProvider, BasicAuth, IpAuth, TokenAuth};
pub use error::ApiError;
pub use server::{ApiState, JSON_API_CONTENT_TYPE, create_router};
