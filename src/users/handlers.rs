use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use bytes::Bytes;
use time::Date;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::{EmailChangeClaims, PasswordChangeClaims, VerifyClaims},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, is_valid_email, verify_password},
    },
    error::ApiError,
    favorites, history,
    mail::send_in_background,
    products::dto::ProductSummary,
    sellers,
    state::AppState,
    storage::{is_allowed_image, MAX_IMAGE_BYTES},
    users::{
        dto::{
            AvatarUpdatedResponse, EmailChangeRequest, MessageResponse, PasswordChangeRequest,
            PublicUser, RegisteredUser, UpdateBasicData, UserWithSeller, VerifiedResponse,
            VerifyExpiredRequest,
        },
        repo::{self, NewUser},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(register))
        .route("/users/:id", get(get_user))
        .route("/users/me", patch(update_me).delete(delete_me))
        .route("/users/me/change-avatar", patch(change_avatar))
        .route("/users/me/change-email", post(request_email_change))
        .route("/users/me/change-email/:token", get(confirm_email_change))
        .route("/users/me/change-password", post(request_password_change))
        .route(
            "/users/me/change-password/:token",
            get(confirm_password_change),
        )
        .route("/users/me/favorites", get(my_favorites))
        .route("/users/me/history", get(my_history))
        .route("/users/verify/:token", get(verify_account))
        .route("/users/verify/expired", post(resend_verification))
        .layer(DefaultBodyLimit::max(4 * 1024 * 1024))
}

fn parse_birth_date(s: &str) -> Result<Date, ApiError> {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(s, &format)
        .map_err(|_| ApiError::Validation("Invalid birthDate: expected YYYY-MM-DD".into()))
}

struct UploadedField {
    body: Bytes,
    content_type: String,
}

/// Pulls one image file plus the named text fields out of a multipart body.
async fn read_multipart(
    mut mp: Multipart,
    file_field: &str,
) -> Result<(Option<UploadedField>, Vec<(String, String)>), ApiError> {
    let mut file = None;
    let mut texts = Vec::new();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == file_field {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            if !is_allowed_image(&content_type) {
                return Err(ApiError::Validation(
                    "Invalid file type. Only JPG and PNG are allowed".into(),
                ));
            }
            let body = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Malformed file field: {e}")))?;
            if body.len() > MAX_IMAGE_BYTES {
                return Err(ApiError::Validation("Image exceeds the 3MB limit".into()));
            }
            file = Some(UploadedField { body, content_type });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(format!("Malformed field {name}: {e}")))?;
            texts.push((name, value));
        }
    }
    Ok((file, texts))
}

fn take_field(texts: &[(String, String)], name: &str) -> Result<String, ApiError> {
    texts
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.clone())
        .ok_or_else(|| ApiError::Validation(format!("Missing field: {name}")))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserWithSeller>>, ApiError> {
    let users = repo::list(&state.db).await?;
    let sellers =
        sellers::repo::find_by_user_ids(&state.db, &users.iter().map(|u| u.id).collect::<Vec<_>>())
            .await?;
    let listing = users
        .iter()
        .map(|user| UserWithSeller {
            user: PublicUser::from(user),
            seller: sellers
                .iter()
                .find(|s| s.user_id == user.id)
                .map(Into::into),
        })
        .collect();
    Ok(Json(listing))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserWithSeller>, ApiError> {
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    let seller = sellers::repo::find_by_user_id(&state.db, user.id).await?;
    Ok(Json(UserWithSeller {
        user: PublicUser::from(&user),
        seller: seller.as_ref().map(Into::into),
    }))
}

#[instrument(skip(state, mp))]
pub async fn register(
    State(state): State<AppState>,
    mp: Multipart,
) -> Result<(StatusCode, Json<RegisteredUser>), ApiError> {
    let (avatar, texts) = read_multipart(mp, "avatarPhoto").await?;
    let avatar =
        avatar.ok_or_else(|| ApiError::Validation("The profile picture is required".into()))?;

    let username = take_field(&texts, "username")?;
    let first_name = take_field(&texts, "firstName")?;
    let last_name = take_field(&texts, "lastName")?;
    let birth_date = parse_birth_date(&take_field(&texts, "birthDate")?)?;
    let email = take_field(&texts, "email")?.trim().to_lowercase();
    let password = take_field(&texts, "password")?;

    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let verify_token = keys.issue_verify(&email)?;
    let password_hash = hash_password(&password)?;

    let stored = state
        .images
        .upload(avatar.body, &avatar.content_type)
        .await?;

    let created = repo::create(
        &state.db,
        NewUser {
            username: &username,
            first_name: &first_name,
            last_name: &last_name,
            birth_date,
            email: &email,
            password_hash: &password_hash,
            verify_token: &verify_token,
            avatar_id: &stored.id,
            avatar_photo: &stored.url,
        },
    )
    .await;

    let user = match created {
        Ok(user) => user,
        Err(e) => {
            // Unique violation or storage failure: drop the orphaned avatar.
            if let Err(del) = state.images.delete(&stored.id).await {
                warn!(error = %del, "could not delete orphaned avatar");
            }
            return Err(e.into());
        }
    };

    let mailer = state.mailer.clone();
    let (name, to) = (user.first_name.clone(), user.email.clone());
    send_in_background(async move { mailer.send_verification(&name, &to, &verify_token, true).await });

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            avatar_photo: stored.url,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            birth_date: user.birth_date,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateBasicData>,
) -> Result<Json<PublicUser>, ApiError> {
    let updated = repo::update_basic(
        &state.db,
        user_id,
        payload.username.as_deref(),
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.birth_date,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(PublicUser::from(&updated)))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, ApiError> {
    if !repo::delete(&state.db, user_id).await? {
        return Err(ApiError::NotFound("User not found".into()));
    }
    info!(user_id = %user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, mp))]
pub async fn change_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> Result<Json<AvatarUpdatedResponse>, ApiError> {
    let (avatar, _) = read_multipart(mp, "avatarPhoto").await?;
    let avatar = avatar.ok_or_else(|| ApiError::Validation("New avatar photo required".into()))?;

    let user = repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    let old_avatar_id = user
        .avatar_id
        .ok_or_else(|| ApiError::NotFound("This user does not have profile picture".into()))?;

    let stored = state
        .images
        .upload(avatar.body, &avatar.content_type)
        .await?;
    repo::set_avatar(&state.db, user_id, &stored.id, &stored.url).await?;

    if let Err(e) = state.images.delete(&old_avatar_id).await {
        warn!(error = %e, avatar_id = %old_avatar_id, "could not delete previous avatar");
    }

    Ok(Json(AvatarUpdatedResponse {
        message: "Image updated successfully".into(),
        new_avatar: stored.url,
    }))
}

#[instrument(skip(state, payload))]
pub async fn request_email_change(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<EmailChangeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let new_email = payload.email.trim().to_lowercase();
    if !is_valid_email(&new_email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    let user = repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.issue_email_change(&user.username, &user.email, &new_email)?;

    let mailer = state.mailer.clone();
    let (name, to) = (user.first_name.clone(), user.email.clone());
    send_in_background(async move { mailer.send_email_change(&name, &to, &token).await });

    Ok(Json(MessageResponse {
        message: "Change email successfully sent".into(),
    }))
}

#[instrument(skip(state, token))]
pub async fn confirm_email_change(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims: EmailChangeClaims = keys.verify(&token)?;

    let applied = repo::apply_email_change(
        &state.db,
        &claims.username,
        &claims.current_email,
        &claims.new_email,
    )
    .await?;
    if !applied {
        return Err(ApiError::NotFound("User not found".into()));
    }
    info!(username = %claims.username, "email changed");
    Ok(Json(MessageResponse {
        message: "Email changed successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn request_password_change(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<PasswordChangeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }
    let user = repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found, invalid Token".into()))?;

    // The token carries hashes only; the plaintext never leaves this handler.
    let new_password_hash = hash_password(&payload.password)?;
    let keys = JwtKeys::from_ref(&state);
    let token =
        keys.issue_password_change(&user.username, &user.password_hash, &new_password_hash)?;

    let mailer = state.mailer.clone();
    let (name, to) = (user.first_name.clone(), user.email.clone());
    send_in_background(async move { mailer.send_password_change(&name, &to, &token).await });

    Ok(Json(MessageResponse {
        message: "Change Password mail successfully sent".into(),
    }))
}

#[instrument(skip(state, token))]
pub async fn confirm_password_change(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims: PasswordChangeClaims = keys.verify(&token)?;

    let applied = repo::apply_password_change(
        &state.db,
        &claims.username,
        &claims.current_password_hash,
        &claims.new_password_hash,
    )
    .await?;
    if !applied {
        return Err(ApiError::NotFound("User not found".into()));
    }
    info!(username = %claims.username, "password changed");
    Ok(Json(MessageResponse {
        message: "Password changed successfully".into(),
    }))
}

#[instrument(skip(state, token))]
pub async fn verify_account(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<VerifiedResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims: VerifyClaims = keys.verify(&token)?;

    if let Some(user) = repo::find_by_verify_token(&state.db, &token).await? {
        if user.is_verified {
            repo::clear_verify_token(&state.db, user.id).await?;
            return Err(ApiError::Conflict("Account already verified".into()));
        }
        if user.email == claims.email {
            repo::mark_verified(&state.db, user.id).await?;
            info!(user_id = %user.id, "account verified");
            return Ok(Json(VerifiedResponse { status: "verified" }));
        }
        return Err(ApiError::NotFound("User not found, invalid Token".into()));
    }

    // Replay of a consumed link: the mirrored token is gone but the account
    // may already be verified.
    if let Some(user) = repo::find_by_email(&state.db, &claims.email).await? {
        if user.is_verified {
            return Err(ApiError::Conflict("Account already verified".into()));
        }
    }
    Err(ApiError::NotFound("User not found, invalid Token".into()))
}

#[instrument(skip(state, payload))]
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<VerifyExpiredRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = repo::find_by_username_and_email(&state.db, &payload.username, &payload.email)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("User not found, invalid username or email".into())
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Incorrect password".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.issue_verify(&user.email)?;
    repo::set_verify_token(&state.db, user.id, &token).await?;

    let mailer = state.mailer.clone();
    let (name, to) = (user.first_name.clone(), user.email.clone());
    send_in_background(async move { mailer.send_verification(&name, &to, &token, false).await });

    Ok(Json(MessageResponse {
        message: "Verification email sent".into(),
    }))
}

#[instrument(skip(state))]
pub async fn my_favorites(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ProductSummary>>, ApiError> {
    let products = favorites::repo::list_products_for_user(&state.db, user_id).await?;
    Ok(Json(products.iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn my_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(page): Query<history::dto::Pagination>,
) -> Result<Json<history::dto::HistoryPage>, ApiError> {
    if page.limit <= 0 || page.offset < 0 {
        return Err(ApiError::Validation("Invalid limit or offset".into()));
    }
    let page = history::repo::page_for_user(&state.db, user_id, page.limit, page.offset).await?;
    Ok(Json(page))
}
