use axum::{
    Json,
    extract::{Extension, State},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::{
    AppState,
    error::AppError,
    response::{ApiResponse, empty_to_api_response, success_to_api_response},
    routes::user::model::{NewUser, User},
    session::{SESSION_COOKIE, SessionStore, SessionUser},
};

use super::model::{LoginRequest, LoginResponse, RegisterRequest};

fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .build()
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    // 简单校验
    if req.username.trim().is_empty() {
        return Err(AppError::EmptyField("用户名"));
    }
    if req.password.trim().is_empty() {
        return Err(AppError::EmptyField("密码"));
    }
    if req.email.trim().is_empty() {
        return Err(AppError::EmptyField("邮箱"));
    }

    let user = User::create(
        &state.pool,
        NewUser {
            username: req.username,
            password: req.password,
            email: req.email,
            real_name: req.real_name,
            phone_number: req.phone_number,
        },
    )
    .await?;

    Ok(success_to_api_response("注册成功", user))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::EmptyField("用户名"));
    }
    if req.password.trim().is_empty() {
        return Err(AppError::EmptyField("密码"));
    }

    // username 字段也接受邮箱
    let user = User::authenticate(&state.pool, &req.username, &req.password).await?;

    let session_id = SessionStore::establish(
        &state.redis,
        state.config.session_expiration_secs,
        &user,
    )
    .await?;

    tracing::info!("User {} logged in", user.username);

    let jar = jar.add(session_cookie(session_id.clone()));
    Ok((
        jar,
        success_to_api_response("登录成功", LoginResponse { user, session_id }),
    ))
}

/// 登出永远成功：没有会话、会话已过期都按成功处理
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<()>>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let session_id = cookie.value().to_string();
        if let Err(e) = SessionStore::terminate(&state.redis, &session_id).await {
            tracing::warn!("Failed to terminate session on logout: {:?}", e);
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    (jar, empty_to_api_response("登出成功"))
}

/// 当前用户信息。鉴权走会话快照，返回的数据按 id 回查数据库
#[axum::debug_handler]
pub async fn current_user(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = User::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(success_to_api_response("获取用户信息成功", user))
}

/// 登录状态查询，会话可有可无，永远成功
#[axum::debug_handler]
pub async fn login_status(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Json<ApiResponse<bool>> {
    let logged_in = match jar.get(SESSION_COOKIE) {
        Some(cookie) => match SessionStore::fetch(&state.redis, cookie.value()).await {
            Ok(session) => session.is_some(),
            Err(e) => {
                tracing::warn!("Failed to read session for status check: {:?}", e);
                false
            }
        },
        None => false,
    };

    if logged_in {
        success_to_api_response("已登录", true)
    } else {
        success_to_api_response("未登录", false)
    }
}
