use crate::app_state::AppState;
use crate::claim::Credentials;
use crate::error::StreamError;
use crate::resource::ResourceKind;
use crate::streamer::StreamRequest;
use axum::body::Body;
use axum::extract::{Extension, Path as AxumPath, Query};
use axum::http::{HeaderMap, Response, header};
use std::collections::HashMap;

pub async fn serve_video(
    Extension(state): Extension<AppState>,
    AxumPath(path): AxumPath<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response<Body>, StreamError> {
    serve(ResourceKind::Video, &state, &path, &query, &headers).await
}

pub async fn serve_thumbnail(
    Extension(state): Extension<AppState>,
    AxumPath(path): AxumPath<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response<Body>, StreamError> {
    serve(ResourceKind::Thumbnail, &state, &path, &query, &headers).await
}

pub async fn serve_preview(
    Extension(state): Extension<AppState>,
    AxumPath(path): AxumPath<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response<Body>, StreamError> {
    serve(ResourceKind::Preview, &state, &path, &query, &headers).await
}

pub async fn health() -> &'static str {
    "OK"
}

async fn serve(
    kind: ResourceKind,
    state: &AppState,
    path: &str,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
) -> Result<Response<Body>, StreamError> {
    let session = session_token(headers, &state.session_cookie_name);
    let resource = query.get(&*state.video_token_name).map(String::as_str);

    state
        .streamer
        .stream(StreamRequest {
            kind,
            path,
            credentials: Credentials { session, resource },
            range: headers.get(header::RANGE),
        })
        .await
}

/// Session token from the named cookie, else from `Authorization: Bearer`
fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        let (scheme, token) = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .split_once(' ')?;
        // Scheme names are case-insensitive
        scheme
            .eq_ignore_ascii_case("Bearer")
            .then(|| token.trim())
            .filter(|token| !token.is_empty())
    })
}
