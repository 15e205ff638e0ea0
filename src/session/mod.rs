use std::sync::Arc;

use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::user::model::{Role, User};

/// 会话 Cookie 名
pub const SESSION_COOKIE: &str = "session_id";

/// 会话中缓存的身份快照。
/// 鉴权判断用这个快照；需要最新数据的接口按 user_id 回查数据库。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub created_at: i64, // Unix timestamp
    pub expires_at: i64, // Unix timestamp
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

/// 会话存取操作（Redis）
pub struct SessionStore;

impl SessionStore {
    /// 登录成功后建立会话，返回会话ID
    pub async fn establish(
        redis: &Arc<RedisClient>,
        ttl: u64,
        user: &User,
    ) -> Result<String, AppError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let session_id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        let snapshot = SessionUser {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            created_at: now,
            expires_at: now + ttl as i64,
        };

        let json = serde_json::to_string(&snapshot)
            .map_err(|e| AppError::Internal(format!("session serialize error: {}", e)))?;
        let _: () = conn.set_ex(session_key(&session_id), json, ttl).await?;

        tracing::debug!("Established session for user {}", user.id);
        Ok(session_id)
    }

    /// 读取会话快照；会话不存在或已过期时返回 None
    pub async fn fetch(
        redis: &Arc<RedisClient>,
        session_id: &str,
    ) -> Result<Option<SessionUser>, AppError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let result: Option<String> = conn.get(session_key(session_id)).await?;
        match result {
            Some(json) => {
                let snapshot = serde_json::from_str(&json)
                    .map_err(|e| AppError::Internal(format!("session deserialize error: {}", e)))?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// 销毁会话。对不存在的会话也成功返回（幂等）
    pub async fn terminate(redis: &Arc<RedisClient>, session_id: &str) -> Result<(), AppError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let _: () = conn.del(session_key(session_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_keys_are_namespaced() {
        assert_eq!(
            session_key("3f2a"),
            "session:3f2a".to_string()
        );
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = SessionUser {
            user_id: 7,
            username: "alice".to_string(),
            role: Role::Admin,
            created_at: 1_700_000_000,
            expires_at: 1_700_086_400,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: SessionUser = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_id, 7);
        assert_eq!(back.username, "alice");
        assert_eq!(back.role, Role::Admin);
    }
}
