//! Users and groups repository

use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, Group, GroupForm, UpdateUser, User, UserRow},
};

use super::is_unique_violation;

const USER_COLUMNS: &str = "id, username, password, email, first_name, last_name, \
                            is_staff, is_superuser, is_active, date_joined";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        let groups = self.groups_of(id).await?;
        Ok(row.into_user(groups))
    }

    /// Active user by username (case-insensitive), for authentication
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1) AND is_active",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Users, most recently joined first
    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<(Vec<User>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY date_joined DESC, id DESC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            let groups = self.groups_of(row.id).await?;
            users.push(row.into_user(groups));
        }
        Ok((users, total))
    }

    /// Insert a user whose password is already hashed
    pub async fn create(&self, user: &CreateUser, password_hash: &str) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, password, email, first_name, last_name, is_staff)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(password_hash)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_staff)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| username_conflict(e, &user.username))?;

        Self::set_groups(&mut tx, id, &user.group_ids).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Update the provided fields; `password_hash` replaces the stored hash
    pub async fn update(
        &self,
        id: i32,
        user: &UpdateUser,
        password_hash: Option<&str>,
    ) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE users SET
                username = COALESCE($1, username),
                password = COALESCE($2, password),
                email = COALESCE($3, email),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                is_staff = COALESCE($6, is_staff),
                is_active = COALESCE($7, is_active)
            WHERE id = $8
            "#,
        )
        .bind(&user.username)
        .bind(password_hash)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_staff)
        .bind(user.is_active)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| username_conflict(e, user.username.as_deref().unwrap_or_default()))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        if let Some(ref group_ids) = user.group_ids {
            sqlx::query("DELETE FROM user_groups WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::set_groups(&mut tx, id, group_ids).await?;
        }
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Delete a user; copies they borrowed keep existing without a borrower
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    /// Direct permissions of the user plus those of their groups
    pub async fn effective_permissions(&self, user_id: i32) -> AppResult<Vec<String>> {
        let permissions: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT codename FROM user_permissions WHERE user_id = $1
            UNION
            SELECT gp.codename
            FROM group_permissions gp
            JOIN user_groups ug ON ug.group_id = gp.group_id
            WHERE ug.user_id = $1
            ORDER BY 1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }

    async fn groups_of(&self, user_id: i32) -> AppResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.name
            FROM auth_groups g
            JOIN user_groups ug ON ug.group_id = g.id
            WHERE ug.user_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn set_groups(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i32,
        group_ids: &[i32],
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_groups (user_id, group_id)
            SELECT $1, g.id FROM auth_groups g WHERE g.id = ANY($2::int4[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(group_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // =========================================================================
    // GROUPS
    // =========================================================================

    pub async fn list_groups(&self) -> AppResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>("SELECT id, name FROM auth_groups ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(groups)
    }

    pub async fn get_group(&self, id: i32) -> AppResult<Group> {
        sqlx::query_as::<_, Group>("SELECT id, name FROM auth_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group with id {} not found", id)))
    }

    pub async fn group_permissions(&self, group_id: i32) -> AppResult<Vec<String>> {
        let permissions: Vec<String> = sqlx::query_scalar(
            "SELECT codename FROM group_permissions WHERE group_id = $1 ORDER BY codename",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }

    pub async fn create_group(&self, form: &GroupForm) -> AppResult<Group> {
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(
            "INSERT INTO auth_groups (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&form.name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| group_conflict(e, &form.name))?;

        Self::set_group_permissions(&mut tx, group.id, &form.permissions).await?;
        tx.commit().await?;

        Ok(group)
    }

    pub async fn update_group(&self, id: i32, form: &GroupForm) -> AppResult<Group> {
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(
            "UPDATE auth_groups SET name = $1 WHERE id = $2 RETURNING id, name",
        )
        .bind(&form.name)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| group_conflict(e, &form.name))?
        .ok_or_else(|| AppError::NotFound(format!("Group with id {} not found", id)))?;

        sqlx::query("DELETE FROM group_permissions WHERE group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::set_group_permissions(&mut tx, id, &form.permissions).await?;
        tx.commit().await?;

        Ok(group)
    }

    pub async fn delete_group(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM auth_groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Group with id {} not found", id)));
        }
        Ok(())
    }

    async fn set_group_permissions(
        tx: &mut Transaction<'_, Postgres>,
        group_id: i32,
        permissions: &[String],
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO group_permissions (group_id, codename)
            SELECT $1, UNNEST($2::text[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(permissions)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn username_conflict(err: sqlx::Error, username: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(format!("Username {} already exists", username))
    } else {
        err.into()
    }
}

fn group_conflict(err: sqlx::Error, name: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(format!("Group {} already exists", name))
    } else {
        err.into()
    }
}
