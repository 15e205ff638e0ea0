use axum::{
    Json,
    extract::{Extension, Path, State},
};

use crate::{
    AppState,
    error::AppError,
    response::{ApiResponse, empty_to_api_response, success_to_api_response},
    session::SessionUser,
};

use super::model::{ChangePasswordRequest, Role, UpdateUserRequest, User};

// 鉴权判断基于会话快照，不回查数据库

fn can_modify(caller: &SessionUser, target_id: i64) -> bool {
    caller.user_id == target_id || caller.role == Role::Admin
}

fn can_delete(caller: &SessionUser) -> bool {
    caller.role == Role::Admin
}

fn can_change_password(caller: &SessionUser, target_id: i64) -> bool {
    caller.user_id == target_id
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(_session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    let users = User::list_all(&state.pool).await?;
    Ok(success_to_api_response("获取用户列表成功", users))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(_session): Extension<SessionUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = User::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    Ok(success_to_api_response("获取用户信息成功", user))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    // 本人或管理员
    if !can_modify(&session, id) {
        return Err(AppError::Forbidden("无权限修改其他用户信息"));
    }

    let user = User::update(&state.pool, id, req).await?;
    Ok(success_to_api_response("更新用户信息成功", user))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    // 仅管理员
    if !can_delete(&session) {
        return Err(AppError::Forbidden("需要管理员权限"));
    }

    User::delete(&state.pool, id).await?;
    Ok(empty_to_api_response("删除用户成功"))
}

#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    // 仅本人，管理员也不能替别人改密码
    if !can_change_password(&session, id) {
        return Err(AppError::Forbidden("只能修改自己的密码"));
    }

    let (old_password, new_password) = match (&req.old_password, &req.new_password) {
        (Some(old), Some(new)) if !old.is_empty() && !new.is_empty() => (old, new),
        _ => return Err(AppError::EmptyField("密码")),
    };

    User::change_password(&state.pool, id, old_password, new_password).await?;
    Ok(empty_to_api_response("密码修改成功"))
}

/// 个人资料。数据按会话里缓存的 id 回查数据库
#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = User::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    Ok(success_to_api_response("获取个人资料成功", user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user_id: i64, role: Role) -> SessionUser {
        SessionUser {
            user_id,
            username: format!("user{}", user_id),
            role,
            created_at: 0,
            expires_at: 0,
        }
    }

    #[test]
    fn update_allowed_for_self_or_admin() {
        assert!(can_modify(&session(1, Role::User), 1));
        assert!(!can_modify(&session(1, Role::User), 2));
        assert!(can_modify(&session(1, Role::Admin), 2));
    }

    #[test]
    fn delete_is_admin_only() {
        assert!(!can_delete(&session(1, Role::User)));
        assert!(can_delete(&session(1, Role::Admin)));
    }

    #[test]
    fn password_change_is_self_only_even_for_admins() {
        assert!(can_change_password(&session(1, Role::User), 1));
        assert!(!can_change_password(&session(1, Role::User), 2));
        assert!(!can_change_password(&session(1, Role::Admin), 2));
    }
}
