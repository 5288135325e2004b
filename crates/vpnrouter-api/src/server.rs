//! axum router and request handlers.

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};
use vpnrouter_core::{Error, Route, Router, TableDef};

use crate::auth::{AuthContext, AuthProvider};
use crate::error::ApiError;

/// Content type of every API response
pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Shared handler state
pub struct ApiState {
    router: Arc<dyn Router>,
    auth: Arc<dyn AuthProvider>,
    tables: Vec<TableDef>,
}

impl ApiState {
    /// Create the state served by [`create_router`]
    pub fn new(router: Arc<dyn Router>, auth: Arc<dyn AuthProvider>, tables: Vec<TableDef>) -> Self {
        Self {
            router,
            auth,
            tables,
        }
    }
}

/// Build the HTTP application
///
/// # Parameters
///
/// * `state` - Router, auth provider and table list
/// * `web_dir` - Directory with the web UI, served for every non-API path
///
/// Handlers read the caller address from `ConnectInfo<SocketAddr>`, so the
/// app must be served with `into_make_service_with_connect_info`.
pub fn create_router(state: ApiState, web_dir: Option<PathBuf>) -> axum::Router {
    let app = axum::Router::new()
        .route("/api/tables", get(get_tables))
        .route("/api/routes", get(get_routes).post(set_route))
        .with_state(Arc::new(state));

    match web_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}

/// JSON body sent with the JSON:API content type
struct JsonApi<T>(T);

impl<T: Serialize> IntoResponse for JsonApi<T> {
    fn into_response(self) -> Response {
        let mut response = axum::Json(self.0).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_API_CONTENT_TYPE),
        );
        response
    }
}

#[derive(Serialize)]
struct Data<T> {
    data: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct RouteView {
    ip: String,
    table: String,
    hostname: String,
    mac: String,
}

impl From<Route> for RouteView {
    fn from(route: Route) -> Self {
        Self {
            ip: route.ip,
            table: route.table,
            hostname: route.lease.name,
            mac: route.lease.mac,
        }
    }
}

#[derive(Serialize)]
struct RoutesResponse {
    #[serde(rename = "request-ip")]
    request_ip: String,
    data: Vec<RouteView>,
}

#[derive(Deserialize)]
struct SetRouteRequest {
    data: RouteChange,
}

#[derive(Deserialize)]
struct RouteChange {
    #[serde(alias = "IP")]
    ip: String,
    #[serde(alias = "Table")]
    table: String,
}

/// Caller IP, with IPv4-mapped IPv6 addresses unwrapped
fn peer_ip(peer: SocketAddr) -> IpAddr {
    peer.ip().to_canonical()
}

async fn get_tables(State(state): State<Arc<ApiState>>) -> JsonApi<Data<Vec<TableDef>>> {
    JsonApi(Data {
        data: state.tables.clone(),
    })
}

async fn get_routes(
    State(state): State<Arc<ApiState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Result<JsonApi<RoutesResponse>, ApiError> {
    let routes = state.router.routes().await.map_err(|e| {
        error!("Failed to fetch routes: {}", e);
        ApiError::internal("Unable to fetch routes")
    })?;

    let mut data: Vec<RouteView> = routes.into_iter().map(RouteView::from).collect();
    data.sort_by(|a, b| a.hostname.cmp(&b.hostname));

    Ok(JsonApi(RoutesResponse {
        request_ip: peer_ip(peer).to_string(),
        data,
    }))
}

async fn set_route(
    State(state): State<Arc<ApiState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<JsonApi<Data<RouteView>>, ApiError> {
    let request: SetRouteRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!("Rejecting route change body: {}", e);
        ApiError::bad_request("Unable to process request")
    })?;
    let change = request.data;
    let caller = peer_ip(peer);

    if change.ip != caller.to_string() {
        let ctx = AuthContext {
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok()),
            peer: caller,
        };
        if let Err(e) = state.auth.check(&ctx) {
            warn!(caller = %caller, ip = %change.ip, "Route change rejected: {}", e);
            return Err(ApiError::unauthorized("Invalid authorization"));
        }
    }

    state
        .router
        .set_route(&change.ip, &change.table)
        .await
        .map_err(|e| match e {
            Error::InvalidInput(_) => {
                debug!("Rejecting route change: {}", e);
                ApiError::bad_request("Unable to process request")
            }
            e => {
                error!(ip = %change.ip, table = %change.table, "Failed to set route: {}", e);
                ApiError::internal("Could not process request")
            }
        })?;

    let routes = state.router.routes().await.map_err(|e| {
        error!("Failed to fetch routes after change: {}", e);
        ApiError::internal("Could not get routes")
    })?;

    let route = routes
        .into_iter()
        .find(|route| route.ip == change.ip)
        .ok_or_else(|| ApiError::not_found("Route not found"))?;

    info!(caller = %caller, ip = %change.ip, table = %route.table, "Route changed");
    Ok(JsonApi(Data {
        data: RouteView::from(route),
    }))
}
