use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use jsgate_core::delivery::{AssetKind, DeliveryRequest};
use tracing::info;

use crate::AppState;

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(ip) = headers.get("cf-connecting-ip") {
        return ip.to_str().ok().map(|s| s.trim().to_string());
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Forwarded headers are client-controlled unless a proxy rewrites them, so
/// they only count behind a trusted proxy.
fn get_client_ip(headers: &HeaderMap, peer: SocketAddr, trusted_proxy: bool) -> String {
    trusted_proxy
        .then(|| forwarded_ip(headers))
        .flatten()
        .unwrap_or_else(|| peer.ip().to_string())
}

/// `GET /api/js/{project_slug}/{script_file}`. Always 200; denials get the
/// noop or secondary body.
pub async fn serve_script(
    Path((project_slug, file)): Path<(String, String)>,
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    deliver(&state, AssetKind::Script, project_slug, file, peer, &headers).await
}

/// `GET /api/js/popunder/{project_slug}/{campaign_file}`. Same contract as
/// scripts; denials always get the noop body.
pub async fn serve_popunder(
    Path((project_slug, file)): Path<(String, String)>,
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    deliver(&state, AssetKind::Popunder, project_slug, file, peer, &headers).await
}

async fn deliver(
    state: &AppState,
    kind: AssetKind,
    project_slug: String,
    file: String,
    peer: SocketAddr,
    headers: &HeaderMap,
) -> Response {
    let req = DeliveryRequest {
        kind,
        project_slug,
        file,
        origin: header_value(headers, header::ORIGIN),
        referer: header_value(headers, header::REFERER),
        client_ip: Some(get_client_ip(headers, peer, state.config.trusted_proxy)),
        user_agent: header_value(headers, header::USER_AGENT),
    };

    let outcome = state.pipeline.run(&req).await;
    if let Some(access) = outcome.access {
        state.recorder.spawn_record(access);
    }

    let res = outcome.response;
    info!(
        "Delivery {:?} {}/{} -> {} (domain: {:?})",
        req.kind,
        req.project_slug,
        req.file,
        if res.allowed { "served" } else { "noop" },
        res.matched_domain
    );

    let [(cache_name, cache_value), (vary_name, vary_value)] = res.headers();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE.as_str(), res.content_type()),
            (cache_name, cache_value),
            (vary_name, vary_value),
        ],
        res.body,
    )
        .into_response()
}
