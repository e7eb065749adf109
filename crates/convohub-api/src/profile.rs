use axum::{
    Extension, Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
};
use axum_extra::extract::WithRejection;
use tracing::warn;

use convohub_types::api::{ProfileResponse, UpdateProfileRequest};
use convohub_types::models::CurrentUser;

use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::media::{MEDIA_URL, image_extension};
use crate::reply::Reply;
use crate::state::AppState;

/// Largest accepted profile update body, image included.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

fn profile_not_found() -> ApiError {
    ApiError::not_found("User profile not found.")
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Reply<ProfileResponse>> {
    let profile = state
        .db_call(move |db| db.get_profile(user.id)?.ok_or_else(profile_not_found))
        .await?;

    Ok(Reply::ok("User profile retrieved successfully.", convert::profile(profile)))
}

/// Fields of a profile update. Absent fields stay unchanged.
#[derive(Default)]
struct ProfileForm {
    bio: Option<String>,
    image: Option<(&'static str, Bytes)>,
}

/// Accepts `multipart/form-data` with optional `bio` and `profile_image`
/// parts, or a JSON body carrying only `bio`.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    req: Request,
) -> ApiResult<Reply<ProfileResponse>> {
    let form = if is_multipart(&req) {
        read_form(Multipart::from_request(req, &state).await?).await?
    } else {
        let WithRejection(Json(body), _) =
            WithRejection::<Json<UpdateProfileRequest>, ApiError>::from_request(req, &state).await?;
        ProfileForm {
            bio: body.bio,
            image: None,
        }
    };

    let image_url = match &form.image {
        Some((ext, data)) => Some(state.media.save_profile_image(user.id, ext, data).await?),
        None => None,
    };

    let bio = form.bio.map(|b| b.trim().to_string());
    let new_image = image_url.clone();
    let user_id = user.id;
    let result = state
        .db_call(move |db| {
            let previous = db.get_profile(user_id)?.ok_or_else(profile_not_found)?.profile_image;
            let profile = db
                .update_profile(user_id, bio.as_deref(), new_image.as_deref())?
                .ok_or_else(profile_not_found)?;
            Ok((previous, profile))
        })
        .await;

    let (previous, profile) = match result {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(url) = &image_url {
                discard(&state, url).await;
            }
            return Err(e);
        }
    };

    // Only files this server stored are ours to delete.
    if image_url.is_some() {
        if let Some(old) = previous.filter(|p| p.starts_with(MEDIA_URL)) {
            discard(&state, &old).await;
        }
    }

    Ok(Reply::ok("User profile updated successfully.", convert::profile(profile)))
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

async fn read_form(mut multipart: Multipart) -> ApiResult<ProfileForm> {
    let mut form = ProfileForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "bio" => form.bio = Some(field.text().await?),
            "profile_image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let ext = image_extension(&file_name).ok_or_else(|| {
                    ApiError::validation("Profile image must be a PNG, JPEG, GIF or WebP file.")
                })?;
                let data = field.bytes().await?;
                if data.is_empty() {
                    return Err(ApiError::validation("Profile image is empty."));
                }
                form.image = Some((ext, data));
            }
            other => return Err(ApiError::validation(format!("Unexpected field '{other}'."))),
        }
    }
    Ok(form)
}

async fn discard(state: &AppState, url: &str) {
    if let Err(e) = state.media.remove(url).await {
        warn!("Failed to remove media file {}: {}", url, e);
    }
}
