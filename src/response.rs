use axum::Json;
use serde::{Deserialize, Serialize};

/// 统一响应结构：所有接口都返回这个信封
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn success_empty(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            message,
            data: None,
        }
    }
}

pub fn success_to_api_response<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(message, data))
}

pub fn empty_to_api_response(message: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse::success_empty(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_carries_data() {
        let resp = ApiResponse::success("登录成功", 42);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "登录成功");
        assert_eq!(json["data"], 42);
    }

    #[test]
    fn empty_success_omits_data_field() {
        let resp = ApiResponse::<()>::success_empty("登出成功");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn error_envelope_has_no_data() {
        let resp = ApiResponse::<()>::error("用户不存在".to_string());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "用户不存在");
        assert!(json.get("data").is_none());
    }
}
