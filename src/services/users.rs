use crate::{
    auth::{hash_password, verify_password, MIN_PASSWORD_LENGTH},
    db::DbPool,
    entities::{checkout, user, UserRole},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    /// Left unchanged when absent
    pub password: Option<String>,
    pub role: UserRole,
}

/// Accounts, credentials and the admin-only lifecycle rules
pub struct UserService {
    db: Arc<DbPool>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i32) -> Result<Option<user::Model>, ServiceError> {
        Ok(user::Entity::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn get(&self, id: i32) -> Result<user::Model, ServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(&*self.db)
            .await?)
    }

    /// Users who can borrow equipment
    pub async fn list_active(&self) -> Result<Vec<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .filter(user::Column::IsActive.eq(true))
            .order_by_asc(user::Column::Username)
            .all(&*self.db)
            .await?)
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(user::Entity::find().count(&*self.db).await?)
    }

    #[instrument(skip(self, new), fields(username = %new.username))]
    pub async fn create(&self, new: NewUser) -> Result<user::Model, ServiceError> {
        let username = new.username.trim().to_string();
        let email = new.email.trim().to_lowercase();
        check_password(&new.password)?;
        self.ensure_unique(&username, &email, None).await?;

        let model = user::ActiveModel {
            username: Set(username),
            email: Set(email),
            password_hash: Set(hash_password(&new.password)?),
            role: Set(new.role),
            is_active: Set(true),
            ..Default::default()
        };

        let created = model.insert(&*self.db).await.map_err(unique_violation)?;
        info!(user_id = created.id, role = %created.role, "user created");
        Ok(created)
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, id: i32, update: UserUpdate) -> Result<user::Model, ServiceError> {
        let existing = self.get(id).await?;
        let username = update.username.trim().to_string();
        let email = update.email.trim().to_lowercase();
        self.ensure_unique(&username, &email, Some(id)).await?;

        let mut model = existing.into_active_model();
        model.username = Set(username);
        model.email = Set(email);
        model.role = Set(update.role);
        if let Some(password) = update.password.filter(|p| !p.is_empty()) {
            check_password(&password)?;
            model.password_hash = Set(hash_password(&password)?);
        }

        let updated = model.update(&*self.db).await.map_err(unique_violation)?;
        info!(user_id = id, "user updated");
        Ok(updated)
    }

    /// Verifies credentials and stamps `last_seen`
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<user::Model, ServiceError> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username.trim()))
            .one(&*self.db)
            .await?;

        let user = match found {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                warn!("failed login attempt");
                return Err(ServiceError::Unauthorized(
                    "Invalid username or password".into(),
                ));
            }
        };

        if !user.is_active {
            return Err(ServiceError::Forbidden(
                "This account has been deactivated. Contact an administrator.".into(),
            ));
        }

        let mut model = user.into_active_model();
        model.last_seen = Set(Some(Utc::now()));
        Ok(model.update(&*self.db).await?)
    }

    #[instrument(skip(self, password))]
    pub async fn set_password(&self, id: i32, password: &str) -> Result<(), ServiceError> {
        check_password(password)?;
        let mut model = self.get(id).await?.into_active_model();
        model.password_hash = Set(hash_password(password)?);
        model.update(&*self.db).await?;
        info!(user_id = id, "password changed");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, actor_id: i32, id: i32) -> Result<user::Model, ServiceError> {
        if actor_id == id {
            return Err(ServiceError::InvalidOperation(
                "You can't deactivate your own account.".into(),
            ));
        }
        self.set_active(id, false).await
    }

    #[instrument(skip(self))]
    pub async fn reactivate(&self, id: i32) -> Result<user::Model, ServiceError> {
        self.set_active(id, true).await
    }

    /// Removes a user together with their returned checkouts
    #[instrument(skip(self))]
    pub async fn delete(&self, actor_id: i32, id: i32) -> Result<user::Model, ServiceError> {
        if actor_id == id {
            return Err(ServiceError::InvalidOperation(
                "You can't delete your own account.".into(),
            ));
        }
        let user = self.get(id).await?;

        let open = checkout::Entity::find()
            .filter(checkout::Column::UserId.eq(id))
            .filter(checkout::Column::ActualReturn.is_null())
            .count(&*self.db)
            .await?;
        if open > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "{} still has {} asset(s) checked out; check them in first.",
                user.username, open
            )));
        }

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    checkout::Entity::delete_many()
                        .filter(checkout::Column::UserId.eq(id))
                        .exec(txn)
                        .await?;
                    user::Entity::delete_by_id(id).exec(txn).await?;
                    Ok(())
                })
            })
            .await?;
        info!(user_id = id, "user deleted");
        Ok(user)
    }

    async fn set_active(&self, id: i32, active: bool) -> Result<user::Model, ServiceError> {
        let mut model = self.get(id).await?.into_active_model();
        model.is_active = Set(active);
        let updated = model.update(&*self.db).await?;
        info!(user_id = id, active, "user activation changed");
        Ok(updated)
    }

    async fn ensure_unique(
        &self,
        username: &str,
        email: &str,
        except: Option<i32>,
    ) -> Result<(), ServiceError> {
        ensure_unique_on(&*self.db, username, email, except).await
    }
}

async fn ensure_unique_on<C: ConnectionTrait>(
    db: &C,
    username: &str,
    email: &str,
    except: Option<i32>,
) -> Result<(), ServiceError> {
    let mut by_name = user::Entity::find().filter(user::Column::Username.eq(username));
    let mut by_email = user::Entity::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        by_name = by_name.filter(user::Column::Id.ne(id));
        by_email = by_email.filter(user::Column::Id.ne(id));
    }

    if by_name.count(db).await? > 0 {
        return Err(ServiceError::field(
            "username",
            "Username already taken. Please choose another.",
        ));
    }
    if by_email.count(db).await? > 0 {
        return Err(ServiceError::field("email", "Email already registered."));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::field(
            "password",
            format!(
                "Password must be at least {} characters.",
                MIN_PASSWORD_LENGTH
            ),
        ));
    }
    Ok(())
}

fn unique_violation(err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::Conflict("Username or email already exists.".into())
        }
        _ => ServiceError::DatabaseError(err),
    }
}
