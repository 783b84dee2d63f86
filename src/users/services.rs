use super::models::{self as users, LoginResponse, RegisterRequest, User, normalize_email};
use crate::common::auth::{AuthSession, Role, hash_password, issue_token, verify_password};
use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::config::Config;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter,
};
use uuid::Uuid;

const MIN_PASSWORD_LENGTH: usize = 6;

fn validate_email(email: &str) -> BusinessResult<()> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(BusinessError::validation("email", "Please enter a valid email address"))
    }
}

pub async fn login(
    db: &DatabaseConnection,
    config: &Config,
    email: &str,
    password: &str,
) -> BusinessResult<LoginResponse> {
    let invalid = || BusinessError::unauthorized("Invalid email or password");

    let Some(user) = users::Entity::find()
        .filter(users::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
        .map_err(|e| e.to_business_error("user"))?
    else {
        // Spend the same bcrypt work as a password check for unknown accounts
        hash_password(password, config.password_hash_cost)?;
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash) {
        tracing::info!(email = %user.email, "Rejected login with wrong password");
        return Err(invalid());
    }

    let user = User::from(user);
    let token = issue_token(config, user.id, &user.email, &user.name, &user.role)?;
    Ok(LoginResponse { token, user })
}

pub async fn register(
    db: &DatabaseConnection,
    config: &Config,
    session: &AuthSession,
    request: RegisterRequest,
) -> BusinessResult<User> {
    session.require_role(&Role::LabAdmin, "register", "users")?;
    create_user(db, config, request).await
}

async fn create_user(
    db: &DatabaseConnection,
    config: &Config,
    request: RegisterRequest,
) -> BusinessResult<User> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(BusinessError::validation("name", "Name is required"));
    }
    let email = normalize_email(&request.email);
    validate_email(&email)?;
    if request.password.len() < MIN_PASSWORD_LENGTH {
        return Err(BusinessError::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }

    let now = Utc::now();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        email: Set(email),
        password_hash: Set(hash_password(&request.password, config.password_hash_cost)?),
        role: Set(request.role.to_string()),
        created_at: Set(now),
        last_updated: Set(now),
    }
    .insert(db)
    .await
    .map_err(|e| e.to_business_error("user"))?;

    tracing::info!(email = %user.email, role = %user.role, "Registered user");
    Ok(User::from(user))
}

pub async fn get_user(db: &DatabaseConnection, id: Uuid) -> BusinessResult<User> {
    users::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| e.to_business_error("user"))?
        .map(User::from)
        .ok_or_else(|| BusinessError::not_found("user", id))
}

/// Creates the configured lab administrator when the user table is empty
pub async fn ensure_bootstrap_admin(db: &DatabaseConnection, config: &Config) -> BusinessResult<()> {
    let Some(admin) = &config.bootstrap_admin else {
        return Ok(());
    };

    let existing = users::Entity::find()
        .count(db)
        .await
        .map_err(|e| e.to_business_error("user"))?;
    if existing > 0 {
        return Ok(());
    }

    create_user(
        db,
        config,
        RegisterRequest {
            name: "Lab Administrator".to_string(),
            email: admin.email.clone(),
            password: admin.password.clone(),
            role: Role::LabAdmin,
        },
    )
    .await?;
    tracing::info!(email = %admin.email, "Created bootstrap lab administrator");
    Ok(())
}
