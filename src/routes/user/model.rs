use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;
use crate::utils::{hash_password, verify_password};

/// 用户角色。注册时固定为 USER，公开接口不允许修改
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub real_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 注册时落库的字段，password 为明文，入库前散列
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub real_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub real_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// 唯一索引冲突映射回业务错误。
/// 预检查和插入之间的竞态由数据库唯一索引兜底。
fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        match db.constraint() {
            Some("users_username_key") => return AppError::DuplicateUsername,
            Some("users_email_key") => return AppError::DuplicateEmail,
            _ => {}
        }
    }
    e.into()
}

impl User {
    /// 注册新用户，角色固定为 USER
    pub async fn create(pool: &PgPool, new: NewUser) -> Result<Self, AppError> {
        if new.username.trim().is_empty() {
            return Err(AppError::EmptyField("用户名"));
        }
        if new.password.trim().is_empty() {
            return Err(AppError::EmptyField("密码"));
        }
        if new.email.trim().is_empty() {
            return Err(AppError::EmptyField("邮箱"));
        }

        if Self::exists_by_username(pool, &new.username).await? {
            return Err(AppError::DuplicateUsername);
        }
        if Self::exists_by_email(pool, &new.email).await? {
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = hash_password(&new.password)?;

        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, real_name, phone_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, password_hash, real_name, phone_number,
                      role, created_at, updated_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&password_hash)
        .bind(&new.real_name)
        .bind(&new.phone_number)
        .fetch_one(pool)
        .await;

        match result {
            Ok(user) => {
                tracing::info!("Registered user {} ({})", user.username, user.id);
                Ok(user)
            }
            Err(e) => Err(map_unique_violation(e)),
        }
    }

    /// 登录校验：按用户名或邮箱查找，再做散列比对
    pub async fn authenticate(
        pool: &PgPool,
        username_or_email: &str,
        password: &str,
    ) -> Result<Self, AppError> {
        let user = Self::find_by_username_or_email(pool, username_or_email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, real_name, phone_number,
                   role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, real_name, phone_number,
                   role, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, real_name, phone_number,
                   role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username_or_email(
        pool: &PgPool,
        username_or_email: &str,
    ) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, real_name, phone_number,
                   role, created_at, updated_at
            FROM users
            WHERE username = $1 OR email = $1
            "#,
        )
        .bind(username_or_email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// 全量列表，按插入顺序（id）返回
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, real_name, phone_number,
                   role, created_at, updated_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// 更新资料。None 的字段保持不变；用户名和角色不经过这条路径
    pub async fn update(
        pool: &PgPool,
        id: i64,
        req: UpdateUserRequest,
    ) -> Result<Self, AppError> {
        let current = Self::find_by_id(pool, id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if let Some(email) = &req.email {
            if *email != current.email && Self::email_taken_by_other(pool, email, id).await? {
                return Err(AppError::DuplicateEmail);
            }
        }

        let result = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($1, email),
                real_name = COALESCE($2, real_name),
                phone_number = COALESCE($3, phone_number),
                updated_at = now()
            WHERE id = $4
            RETURNING id, username, email, password_hash, real_name, phone_number,
                      role, created_at, updated_at
            "#,
        )
        .bind(&req.email)
        .bind(&req.real_name)
        .bind(&req.phone_number)
        .bind(id)
        .fetch_one(pool)
        .await;

        result.map_err(map_unique_violation)
    }

    /// 修改密码：先比对旧密码，再写入新散列
    pub async fn change_password(
        pool: &PgPool,
        id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = Self::find_by_id(pool, id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !verify_password(old_password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let password_hash = hash_password(new_password)?;
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, updated_at = now()
            WHERE id = $2
            "#,
        )
        .bind(&password_hash)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// 物理删除
    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound);
        }

        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    async fn exists_by_username(pool: &PgPool, username: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(pool)
                .await?;
        Ok(exists)
    }

    async fn exists_by_email(pool: &PgPool, email: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(pool)
                .await?;
        Ok(exists)
    }

    async fn email_taken_by_other(pool: &PgPool, email: &str, id: i64) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2)",
        )
        .bind(email)
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            real_name: Some("Alice".to_string()),
            phone_number: None,
            role: Role::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn serialized_user_never_exposes_password() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["username"], "alice");
        assert_eq!(json["realName"], "Alice");
        assert_eq!(json["phoneNumber"], serde_json::Value::Null);
        assert_eq!(json["role"], "USER");
    }

    #[test]
    fn role_uses_uppercase_wire_form() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn omitted_update_fields_deserialize_as_none() {
        let req: UpdateUserRequest =
            serde_json::from_str(r#"{"email": "b@x.com"}"#).unwrap();
        assert_eq!(req.email.as_deref(), Some("b@x.com"));
        assert!(req.real_name.is_none());
        assert!(req.phone_number.is_none());
    }

    #[test]
    fn change_password_request_uses_camel_case() {
        let req: ChangePasswordRequest =
            serde_json::from_str(r#"{"oldPassword": "pw1", "newPassword": "pw2"}"#).unwrap();
        assert_eq!(req.old_password.as_deref(), Some("pw1"));
        assert_eq!(req.new_password.as_deref(), Some("pw2"));
    }
}
