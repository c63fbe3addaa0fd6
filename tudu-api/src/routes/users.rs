use std::path::Path;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use validator::ValidateEmail;

use crate::{
    app_state::AppState,
    auth::{AuthUser, ACCESS_TOKEN_COOKIE},
    domain::{models::UploadCandidate, ports::inbound::UpdateProfileRequest, ProfileResponse},
    routes::{ApiError, MessageResponse},
};

const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Transport-layer cap on the avatar payload. Everything above this is
/// rejected before the image pipeline ever sees it.
const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;
// Allow multipart overhead while keeping the actual image policy at 2 MiB.
const UPLOAD_BODY_LIMIT: usize = 3 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/updateprofile", patch(update_profile))
        .route_layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .route("/me", get(me))
        .route("/deleteme", delete(delete_me))
}

async fn me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profile_service.get_profile(&user.id).await?;

    Ok(Json(profile))
}

async fn update_profile(
    user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProfileResponse>, ApiError> {
    let request = parse_update_request(&mut multipart).await?;

    if let Some(email) = &request.email {
        if !email.validate_email() {
            return Err(ApiError::bad_request("email is not valid"));
        }
    }

    let profile = state
        .profile_service
        .update_profile(&user.id, request)
        .await?;

    Ok(Json(profile))
}

async fn delete_me(
    user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    state.profile_service.delete_account(&user.id).await?;

    let removal = Cookie::build((ACCESS_TOKEN_COOKIE, "")).path("/").build();

    Ok((
        jar.remove(removal),
        Json(MessageResponse {
            message: "account deleted",
        }),
    ))
}

async fn parse_update_request(
    multipart: &mut Multipart,
) -> Result<UpdateProfileRequest, ApiError> {
    let mut request = UpdateProfileRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("failed to parse multipart field"))?
    {
        match field.name() {
            Some("username") => request.username = text_field(field).await?,
            Some("email") => request.email = text_field(field).await?,
            Some("password") => request.password = text_field(field).await?,
            Some("image") => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);

                check_declared_image_type(content_type.as_deref(), filename.as_deref())?;

                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("failed to read image payload"))?;

                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err(ApiError::new(
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "image exceeds the 2 MiB limit",
                    ));
                }

                request.image = Some(UploadCandidate::new(
                    bytes.to_vec(),
                    content_type,
                    filename,
                ));
            }
            _ => {}
        }
    }

    Ok(request)
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<Option<String>, ApiError> {
    let value = field
        .text()
        .await
        .map_err(|_| ApiError::bad_request("failed to read multipart field"))?;

    let trimmed = value.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// First-line filter on the declared type and extension. The real decision is
/// made later by decoding the bytes; this only rejects the obviously wrong.
fn check_declared_image_type(
    content_type: Option<&str>,
    filename: Option<&str>,
) -> Result<(), ApiError> {
    let declared = content_type
        .ok_or_else(|| ApiError::bad_request("image must be JPG, PNG, or WEBP"))?
        .to_lowercase();

    if !ALLOWED_IMAGE_TYPES.contains(&declared.as_str()) {
        return Err(ApiError::bad_request("image must be JPG, PNG, or WEBP"));
    }

    let extension = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| ApiError::bad_request("image filename must end in JPG, PNG, or WEBP"))?;

    if !ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::bad_request(
            "image filename must end in JPG, PNG, or WEBP",
        ));
    }

    Ok(())
}
