//! User, group and access-policy types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;

/// Permission held by librarians: renew loans and see every copy on loan
pub const CAN_MARK_RETURNED: &str = "catalog.can_mark_returned";

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub password: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl UserRow {
    pub fn into_user(self, groups: Vec<Group>) -> User {
        User {
            id: self.id,
            username: self.username,
            password: self.password,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
            is_active: self.is_active,
            date_joined: self.date_joined,
            groups,
        }
    }
}

/// Full user model
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Group {
    pub id: i32,
    pub name: String,
}

/// Group with the permission codenames granted to its members
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupDetails {
    pub id: i32,
    pub name: String,
    pub permissions: Vec<String>,
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 150, message = "Username must be 1 to 150 characters"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub group_ids: Vec<i32>,
}

/// Update user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 150, message = "Username must be 1 to 150 characters"))]
    pub username: Option<String>,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    /// Replaces the user's groups when present
    pub group_ids: Option<Vec<i32>>,
}

impl UpdateUser {
    /// Whether the update changes what the user may do
    pub fn touches_privileges(&self) -> bool {
        self.is_staff.is_some() || self.is_active.is_some() || self.group_ids.is_some()
    }
}

/// Create/update group request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GroupForm {
    #[validate(length(min = 1, max = 150, message = "Group name must be 1 to 150 characters"))]
    pub name: String,
    /// Permission codenames, e.g. `catalog.can_mark_returned`
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// User listing query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub is_superuser: bool,
    /// Effective permissions: direct grants plus those of the user's groups
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Superusers hold every permission
    pub fn has_perm(&self, permission: &str) -> bool {
        self.is_superuser || self.permissions.iter().any(|p| p == permission)
    }

    pub fn require_permission(&self, permission: &str) -> Result<(), AppError> {
        if self.has_perm(permission) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Permission {} required",
                permission
            )))
        }
    }

    pub fn require_librarian(&self) -> Result<(), AppError> {
        self.require_permission(CAN_MARK_RETURNED)
    }

    /// Creating principals and granting rights is reserved to superusers
    pub fn require_superuser(&self) -> Result<(), AppError> {
        if self.is_superuser {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Insufficient rights to manage users and groups".to_string(),
            ))
        }
    }

    /// Users may edit their own profile; anything else, or any change of
    /// staff flag, activity or groups, needs a superuser
    pub fn require_write_user(&self, user_id: i32, update: &UpdateUser) -> Result<(), AppError> {
        if user_id == self.user_id && !update.touches_privileges() {
            Ok(())
        } else {
            self.require_superuser()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(permissions: &[&str], is_superuser: bool) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "marian".to_string(),
            user_id: 5,
            is_superuser,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_librarian_permission() {
        assert!(claims(&[CAN_MARK_RETURNED], false).require_librarian().is_ok());
        assert!(matches!(
            claims(&[], false).require_librarian(),
            Err(AppError::Authorization(_))
        ));
        assert!(claims(&[], true).require_librarian().is_ok());
    }

    fn update() -> UpdateUser {
        UpdateUser {
            username: None,
            password: None,
            email: Some("marian@example.org".to_string()),
            first_name: None,
            last_name: None,
            is_staff: None,
            is_active: None,
            group_ids: None,
        }
    }

    #[test]
    fn test_user_writes_need_superuser() {
        let reader = claims(&[CAN_MARK_RETURNED], false);
        assert!(reader.require_write_user(5, &update()).is_ok());
        assert!(matches!(
            reader.require_write_user(6, &update()),
            Err(AppError::Authorization(_))
        ));

        let mut promote = update();
        promote.group_ids = Some(vec![1]);
        assert!(matches!(
            reader.require_write_user(5, &promote),
            Err(AppError::Authorization(_))
        ));
        let mut staff = update();
        staff.is_staff = Some(true);
        assert!(reader.require_write_user(5, &staff).is_err());

        let admin = claims(&[], true);
        assert!(admin.require_superuser().is_ok());
        assert!(admin.require_write_user(6, &promote).is_ok());
        assert!(reader.require_superuser().is_err());
    }

    #[test]
    fn test_token_round_trip_keeps_permissions() {
        let original = claims(&[CAN_MARK_RETURNED], false);
        let token = original.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 5);
        assert!(parsed.has_perm(CAN_MARK_RETURNED));

        assert!(UserClaims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_create_user_validation() {
        let user = CreateUser {
            username: "marian".to_string(),
            password: "pw".to_string(),
            email: Some("not-an-email".to_string()),
            first_name: None,
            last_name: None,
            is_staff: false,
            group_ids: vec![],
        };
        let errors = user.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("email"));
    }
}
