use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::response::ApiResponse;

/// 业务错误的扁平分类。除 Internal 外一律按 400 返回，
/// 客户端只通过 message 文本区分失败原因。
#[derive(Debug)]
pub enum AppError {
    EmptyField(&'static str),
    DuplicateUsername,
    DuplicateEmail,
    UserNotFound,
    InvalidCredentials,
    Forbidden(&'static str),
    NotLoggedIn,
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AppError::EmptyField(field) => format!("{}不能为空", field),
            AppError::DuplicateUsername => "用户名已存在".to_string(),
            AppError::DuplicateEmail => "邮箱已存在".to_string(),
            AppError::UserNotFound => "用户不存在".to_string(),
            AppError::InvalidCredentials => "密码错误".to_string(),
            AppError::Forbidden(msg) => msg.to_string(),
            AppError::NotLoggedIn => "请先登录".to_string(),
            AppError::Internal(_) => "服务器内部错误".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            tracing::error!("Internal error: {}", detail);
        }

        let body = Json(ApiResponse::<()>::error(self.message()));
        (self.status(), body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(format!("database error: {}", e))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::Internal(format!("session store error: {}", e))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("password hash error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_bad_request() {
        for err in [
            AppError::EmptyField("用户名"),
            AppError::DuplicateUsername,
            AppError::DuplicateEmail,
            AppError::UserNotFound,
            AppError::InvalidCredentials,
            AppError::Forbidden("需要管理员权限"),
            AppError::NotLoggedIn,
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_match_api_contract() {
        assert_eq!(AppError::EmptyField("邮箱").message(), "邮箱不能为空");
        assert_eq!(AppError::DuplicateUsername.message(), "用户名已存在");
        assert_eq!(AppError::NotLoggedIn.message(), "请先登录");
        // 内部错误细节不透给客户端
        assert_eq!(
            AppError::Internal("connection refused".into()).message(),
            "服务器内部错误"
        );
    }

    #[tokio::test]
    async fn response_body_is_the_envelope() {
        let resp = AppError::UserNotFound.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "用户不存在");
        assert!(json.get("data").is_none());
    }
}
