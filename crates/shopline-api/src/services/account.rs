//! Accounts, sessions and roles.

use serde::{Deserialize, Serialize};
use shopline_auth::{
    normalize_email, AuthError, AuthUser, Claims, LoginRequest, PasswordHasher, Permission,
    RegisterRequest, RoleDoc, TokenKind, TokenPair, UserAccount, UserProfile, ADMIN_ROLE,
};
use shopline_commerce::ids::UserId;
use shopline_db::{Connection, Db, DocumentStore, Filter, Query, Sort};
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Profile plus tokens, returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermissions {
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: String,
}

pub async fn register(state: &AppState, request: RegisterRequest) -> Result<Session, AppError> {
    request.validate()?;
    PasswordHasher::validate_password(&request.password)?;
    let email = normalize_email(&request.email)?;
    let password_hash = state.hasher.hash(&request.password)?;

    let mut tx = state.db.begin().await?;
    if find_by_email(&mut tx, &email).await?.is_some() {
        return Err(AuthError::UserAlreadyExists(email).into());
    }
    let account = UserAccount::new(
        &email,
        &request.name,
        request.phone.clone(),
        password_hash,
        request.role(),
    );
    tx.insert(&account).await?;
    tx.commit().await?;

    info!(user_id = %account.id, email = %account.email, "user registered");
    Ok(Session {
        tokens: state.tokens.issue_pair(&account)?,
        user: account.profile(),
    })
}

/// Email and password login. Unknown email and wrong password fail alike.
pub async fn login(state: &AppState, request: LoginRequest) -> Result<Session, AppError> {
    let email = request.email.trim().to_lowercase();
    let mut conn = state.db.acquire().await?;
    let account = find_by_email(&mut conn, &email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    drop(conn);

    if !state.hasher.verify(&request.password, &account.password_hash)? {
        warn!(email = %email, "failed login");
        return Err(AuthError::InvalidCredentials.into());
    }

    info!(user_id = %account.id, "user logged in");
    Ok(Session {
        tokens: state.tokens.issue_pair(&account)?,
        user: account.profile(),
    })
}

/// Exchange a refresh token for a new pair.
pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<TokenPair, AppError> {
    let claims = state.tokens.verify(refresh_token, TokenKind::Refresh)?;
    let mut conn = state.db.acquire().await?;
    let account = account_for_claims(&mut conn, &claims).await?;
    Ok(state.tokens.issue_pair(&account)?)
}

/// Revoke every outstanding token of a user.
pub async fn logout(state: &AppState, user_id: &UserId) -> Result<(), AppError> {
    let mut tx = state.db.begin().await?;
    let mut account = require_user(&mut tx, user_id).await?;
    account.bump_token_version();
    tx.update(&account).await?;
    tx.commit().await?;

    info!(user_id = %user_id, "user logged out");
    Ok(())
}

pub async fn me(conn: &mut Connection, user_id: &UserId) -> Result<UserProfile, AppError> {
    Ok(require_user(conn, user_id).await?.profile())
}

/// The account a token was issued to, if the token is still current.
pub async fn account_for_claims(
    conn: &mut Connection,
    claims: &Claims,
) -> Result<UserAccount, AppError> {
    let account = conn
        .get::<UserAccount>(&claims.sub)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    if account.token_version != claims.ver {
        return Err(AuthError::TokenRevoked.into());
    }
    Ok(account)
}

/// The request principal for an account, with its role's current permissions.
pub async fn principal(conn: &mut Connection, account: &UserAccount) -> Result<AuthUser, AppError> {
    let permissions = permissions_for(conn, &account.role).await?;
    Ok(AuthUser::new(account, permissions))
}

/// Permissions granted by a role. Unknown roles grant nothing.
pub async fn permissions_for(conn: &mut Connection, role: &str) -> Result<Vec<Permission>, AppError> {
    Ok(conn
        .get::<RoleDoc>(role)
        .await?
        .map(|r| r.permissions)
        .unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Write the built-in roles.
pub async fn seed_roles(db: &Db) -> Result<(), AppError> {
    let mut tx = db.begin().await?;
    for role in RoleDoc::built_ins() {
        tx.save(&role).await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Make sure an admin account exists for `email`.
pub async fn bootstrap_admin(state: &AppState, email: &str, password: &str) -> Result<(), AppError> {
    let email = normalize_email(email)?;
    let mut tx = state.db.begin().await?;
    match find_by_email(&mut tx, &email).await? {
        Some(mut account) if account.role != ADMIN_ROLE => {
            account.set_role(ADMIN_ROLE);
            tx.update(&account).await?;
            info!(user_id = %account.id, "bootstrap account promoted to admin");
        }
        Some(_) => {}
        None => {
            PasswordHasher::validate_password(password)?;
            let hash = state.hasher.hash(password)?;
            let account = UserAccount::new(&email, "Administrator", None, hash, ADMIN_ROLE);
            tx.insert(&account).await?;
            info!(user_id = %account.id, email = %email, "bootstrap admin created");
        }
    }
    tx.commit().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

pub async fn list_roles(conn: &mut Connection) -> Result<Vec<RoleDoc>, AppError> {
    Ok(conn
        .find(&Query::filter(Filter::new()).sort(Sort::asc("name")))
        .await?)
}

pub async fn create_role(state: &AppState, input: NewRole) -> Result<RoleDoc, AppError> {
    let role = RoleDoc::custom(&input.name, input.permissions)?;
    let mut tx = state.db.begin().await?;
    if tx.get::<RoleDoc>(&role.name).await?.is_some() {
        return Err(AuthError::RoleAlreadyExists(role.name).into());
    }
    tx.insert(&role).await?;
    tx.commit().await?;

    info!(role = %role.name, permissions = role.permissions.len(), "role created");
    Ok(role)
}

pub async fn update_role(
    state: &AppState,
    name: &str,
    permissions: Vec<Permission>,
) -> Result<RoleDoc, AppError> {
    let mut tx = state.db.begin().await?;
    let mut role = require_role(&mut tx, name).await?;
    role.set_permissions(permissions)?;
    tx.update(&role).await?;
    tx.commit().await?;

    info!(role = %role.name, "role permissions updated");
    Ok(role)
}

/// Delete a custom role no user holds.
pub async fn delete_role(state: &AppState, name: &str) -> Result<(), AppError> {
    let mut tx = state.db.begin().await?;
    let role = require_role(&mut tx, name).await?;
    if role.built_in {
        return Err(AuthError::BuiltInRole(role.name).into());
    }
    if tx
        .count::<UserAccount>(&Filter::new().eq("role", &role.name))
        .await?
        > 0
    {
        return Err(AuthError::RoleInUse(role.name).into());
    }
    tx.delete::<RoleDoc>(&role.name).await?;
    tx.commit().await?;

    info!(role = %role.name, "role deleted");
    Ok(())
}

pub async fn assign_role(
    state: &AppState,
    user_id: &UserId,
    role: &str,
) -> Result<UserProfile, AppError> {
    let mut tx = state.db.begin().await?;
    let role = require_role(&mut tx, role).await?;
    let mut account = require_user(&mut tx, user_id).await?;
    account.set_role(&role.name);
    tx.update(&account).await?;
    tx.commit().await?;

    info!(user_id = %user_id, role = %role.name, "role assigned");
    Ok(account.profile())
}

async fn find_by_email(conn: &mut Connection, email: &str) -> Result<Option<UserAccount>, AppError> {
    Ok(conn
        .find_one::<UserAccount>(&Filter::new().eq("email", email))
        .await?)
}

async fn require_user(conn: &mut Connection, user_id: &UserId) -> Result<UserAccount, AppError> {
    conn.get::<UserAccount>(user_id.as_str())
        .await?
        .ok_or_else(|| AuthError::UserNotFound(user_id.to_string()).into())
}

async fn require_role(conn: &mut Connection, name: &str) -> Result<RoleDoc, AppError> {
    conn.get::<RoleDoc>(name)
        .await?
        .ok_or_else(|| AuthError::RoleNotFound(name.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::state;
    use shopline_auth::{CUSTOMER_ROLE, STAFF_ROLE};

    fn signup(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "secret123".to_string(),
            name: "Rahim".to_string(),
            phone: None,
        }
    }

    fn credentials(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let state = state().await;
        seed_roles(&state.db).await.unwrap();

        let session = register(&state, signup("Rahim@Shop.test")).await.unwrap();
        assert_eq!(session.user.email, "rahim@shop.test");
        assert_eq!(session.user.role, CUSTOMER_ROLE);

        let err = register(&state, signup("rahim@shop.test")).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        let session = login(&state, credentials("RAHIM@shop.test", "secret123"))
            .await
            .unwrap();
        let claims = state
            .tokens
            .verify(&session.tokens.access_token, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.sub, session.user.id.as_str());
    }

    #[tokio::test]
    async fn test_login_failures_are_generic() {
        let state = state().await;
        register(&state, signup("a@shop.test")).await.unwrap();

        let wrong_password = login(&state, credentials("a@shop.test", "nope12345"))
            .await
            .unwrap_err();
        let unknown = login(&state, credentials("b@shop.test", "secret123"))
            .await
            .unwrap_err();
        assert_eq!(wrong_password.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let state = state().await;
        let mut request = signup("a@shop.test");
        request.password = "short".to_string();
        let err = register(&state, request).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_refresh_and_logout() {
        let state = state().await;
        let session = register(&state, signup("a@shop.test")).await.unwrap();

        let pair = refresh(&state, &session.tokens.refresh_token).await.unwrap();
        assert!(!pair.access_token.is_empty());

        let err = refresh(&state, &session.tokens.access_token).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::UNAUTHORIZED);

        logout(&state, &session.user.id).await.unwrap();
        let err = refresh(&state, &pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn test_role_lifecycle() {
        let state = state().await;
        seed_roles(&state.db).await.unwrap();
        let session = register(&state, signup("a@shop.test")).await.unwrap();

        let role = create_role(
            &state,
            NewRole {
                name: "Warehouse".to_string(),
                permissions: vec![Permission::InventoryWrite, Permission::InventoryRead],
            },
        )
        .await
        .unwrap();
        assert_eq!(role.name, "warehouse");

        let err = create_role(
            &state,
            NewRole {
                name: "warehouse".to_string(),
                permissions: Vec::new(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        let err = update_role(&state, STAFF_ROLE, vec![Permission::UserManage])
            .await
            .unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        let profile = assign_role(&state, &session.user.id, "warehouse").await.unwrap();
        assert_eq!(profile.role, "warehouse");
        let err = delete_role(&state, "warehouse").await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        let err = assign_role(&state, &session.user.id, "ghost").await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::NOT_FOUND);

        assign_role(&state, &session.user.id, CUSTOMER_ROLE).await.unwrap();
        delete_role(&state, "warehouse").await.unwrap();

        let err = delete_role(&state, ADMIN_ROLE).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        let mut conn = state.db.acquire().await.unwrap();
        let names: Vec<String> = list_roles(&mut conn)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["admin", "customer", "staff"]);
    }

    #[tokio::test]
    async fn test_principal_reflects_role() {
        let state = state().await;
        seed_roles(&state.db).await.unwrap();
        let session = register(&state, signup("a@shop.test")).await.unwrap();
        assign_role(&state, &session.user.id, STAFF_ROLE).await.unwrap();

        let mut conn = state.db.acquire().await.unwrap();
        let account: UserAccount = conn.require(session.user.id.as_str()).await.unwrap();
        let user = principal(&mut conn, &account).await.unwrap();
        assert!(user.has(Permission::OrderManage));
        assert!(!user.has(Permission::UserManage));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let state = state().await;
        bootstrap_admin(&state, "Owner@Shop.test", "owner1234").await.unwrap();
        bootstrap_admin(&state, "owner@shop.test", "owner1234").await.unwrap();

        let mut conn = state.db.acquire().await.unwrap();
        let admins = conn
            .count::<UserAccount>(&Filter::new().eq("role", ADMIN_ROLE))
            .await
            .unwrap();
        assert_eq!(admins, 1);
    }
}
