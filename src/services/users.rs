//! Authentication and principal management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        CreateUser, Group, GroupDetails, GroupForm, UpdateUser, User, UserClaims, UserRow,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Check credentials and issue a JWT carrying the effective permissions
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let row = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !verify_password(&row, password)? {
            return Err(AppError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        let user = self.repository.users.get_by_id(row.id).await?;
        let token = self.create_token_for_user(&user).await?;
        tracing::info!("User {} logged in", user.username);
        Ok((token, user))
    }

    async fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let permissions = self.repository.users.effective_permissions(user.id).await?;

        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            is_superuser: user.is_superuser,
            permissions,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Decode a bearer token issued by [`authenticate`](Self::authenticate)
    pub fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))
    }

    // =========================================================================
    // USERS
    // =========================================================================

    pub async fn list_users(&self, limit: i64, offset: i64) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.list(limit, offset).await
    }

    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn create_user(&self, user: &CreateUser) -> AppResult<User> {
        user.validate()?;
        let hash = hash_password(&user.password)?;
        let created = self.repository.users.create(user, &hash).await?;
        tracing::info!("User {} created", created.username);
        Ok(created)
    }

    pub async fn update_user(&self, id: i32, user: &UpdateUser) -> AppResult<User> {
        user.validate()?;
        let hash = user.password.as_deref().map(hash_password).transpose()?;
        self.repository
            .users
            .update(id, user, hash.as_deref())
            .await
    }

    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!("User {} deleted", id);
        Ok(())
    }

    // =========================================================================
    // GROUPS
    // =========================================================================

    pub async fn list_groups(&self) -> AppResult<Vec<Group>> {
        self.repository.users.list_groups().await
    }

    pub async fn get_group(&self, id: i32) -> AppResult<GroupDetails> {
        let group = self.repository.users.get_group(id).await?;
        let permissions = self.repository.users.group_permissions(id).await?;
        Ok(GroupDetails {
            id: group.id,
            name: group.name,
            permissions,
        })
    }

    pub async fn create_group(&self, form: &GroupForm) -> AppResult<GroupDetails> {
        form.validate()?;
        let group = self.repository.users.create_group(form).await?;
        tracing::info!("Group {} created", group.name);
        self.get_group(group.id).await
    }

    pub async fn update_group(&self, id: i32, form: &GroupForm) -> AppResult<GroupDetails> {
        form.validate()?;
        self.repository.users.update_group(id, form).await?;
        self.get_group(id).await
    }

    pub async fn delete_group(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete_group(id).await?;
        tracing::info!("Group {} deleted", id);
        Ok(())
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Users without a stored hash cannot log in
fn verify_password(user: &UserRow, password: &str) -> AppResult<bool> {
    let Some(ref hash) = user.password else {
        return Ok(false);
    };
    let parsed = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(password: Option<String>) -> UserRow {
        UserRow {
            id: 1,
            username: "marian".to_string(),
            password,
            email: None,
            first_name: None,
            last_name: None,
            is_staff: true,
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&row(Some(hash.clone())), "s3cret").unwrap());
        assert!(!verify_password(&row(Some(hash)), "wrong").unwrap());
    }

    #[test]
    fn test_user_without_password_cannot_log_in() {
        assert!(!verify_password(&row(None), "anything").unwrap());
    }
}
