use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    error::AppError,
    session::{SESSION_COOKIE, SessionStore},
};

/// 受保护路由的会话校验：读取会话 Cookie，从 Redis 取出身份快照，
/// 放进 request extensions 供后续 handler 使用
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session_id = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AppError::NotLoggedIn)?;

    let session_user = SessionStore::fetch(&state.redis, &session_id)
        .await?
        .ok_or(AppError::NotLoggedIn)?;

    request.extensions_mut().insert(session_user);
    Ok(next.run(request).await)
}
