use crate::{
    auth::{AuthMiddleware, AuthResponse, AuthenticatedUserId, LoginRequest, RegisterRequest},
    error::AppError,
    models::User,
    state::AppState,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::Utc;
use validator::Validate;

/// Register a new user
///
/// Creates a new account and returns its profile together with a session token.
///
/// ## Responses:
/// - `201 Created`: profile and `token`.
/// - `400 Bad Request`: validation failure, or the email is already registered.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let request = register_data.into_inner().normalized();
    request.validate()?;

    // The unique email index still decides races between concurrent registrations.
    if state
        .store
        .users
        .find_by_email(&request.email)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = state.passwords.hash(request.password).await?;
    let user = state
        .store
        .users
        .insert(User::new(request.name, &request.email, password_hash, Utc::now()))
        .await?;

    let token = state.tokens.issue(user.id)?;
    log::info!("New user registered: {}", user.id);

    Ok(HttpResponse::Created().json(AuthResponse {
        user: user.profile(),
        token,
    }))
}

/// Login user
///
/// Authenticates a user and returns its profile with a fresh token. An unknown email
/// and a wrong password produce the same 401 response.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let request = login_data.into_inner().normalized();
    request.validate()?;

    let user = state
        .store
        .users
        .find_by_email(&request.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !state
        .passwords
        .verify(request.password, user.password_hash.clone())
        .await?
    {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens.issue(user.id)?;
    log::info!("User logged in: {}", user.id);

    Ok(HttpResponse::Ok().json(AuthResponse {
        user: user.profile(),
        token,
    }))
}

/// Current user
///
/// Returns the caller's profile, or 404 if the account was deleted after the token
/// was issued.
#[get("/me", wrap = "AuthMiddleware")]
pub async fn me(
    state: web::Data<AppState>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let user = state
        .store
        .users
        .find_by_id(user_id.0)
        .await?
        .ok_or_else(AppError::user_not_found)?;

    Ok(HttpResponse::Ok().json(user.profile()))
}
