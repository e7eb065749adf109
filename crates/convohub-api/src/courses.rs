use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use tracing::info;

use convohub_types::api::{CourseRequest, CourseResponse, Empty};
use convohub_types::models::CurrentUser;

use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::middleware::require_superuser;
use crate::reply::Reply;
use crate::state::AppState;
use crate::validate::name_field;

pub(crate) const NO_ACCESS: &str = "You do not have permission to access this resource.";
const DUPLICATE_COURSE: &str = "A course with this name already exists.";

fn course_not_found() -> ApiError {
    ApiError::not_found("Course not found.")
}

pub async fn list_courses(State(state): State<AppState>) -> ApiResult<Reply<Vec<CourseResponse>>> {
    let courses = state
        .db_call(|db| Ok(db.list_courses()?))
        .await?
        .into_iter()
        .map(convert::course)
        .collect();

    Ok(Reply::ok("Course(s) retrieved successfully.", courses))
}

pub async fn get_course(
    State(state): State<AppState>,
    WithRejection(Path(course_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Reply<CourseResponse>> {
    let course = state
        .db_call(move |db| db.get_course(course_id)?.ok_or_else(course_not_found))
        .await?;

    Ok(Reply::ok("Course(s) retrieved successfully.", convert::course(course)))
}

pub async fn create_course(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<CourseRequest>, ApiError>,
) -> ApiResult<Reply<CourseResponse>> {
    require_superuser(&user, NO_ACCESS)?;
    let name = name_field("Name", req.name.as_deref().unwrap_or_default())
        .map_err(ApiError::Validation)?;

    let course = state
        .db_call(move |db| {
            let id = db
                .create_course(&name)
                .map_err(|e| ApiError::conflict_on_unique(e, DUPLICATE_COURSE))?;
            db.get_course(id)?.ok_or_else(course_not_found)
        })
        .await?;

    info!("Course {} created by {}", course.name, user.username);
    Ok(Reply::created("Course created successfully.", convert::course(course)))
}

/// Partial update: an absent name leaves the course unchanged.
pub async fn update_course(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(course_id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<CourseRequest>, ApiError>,
) -> ApiResult<Reply<CourseResponse>> {
    require_superuser(&user, NO_ACCESS)?;
    let name = req
        .name
        .as_deref()
        .map(|n| name_field("Name", n))
        .transpose()
        .map_err(ApiError::Validation)?;

    let course = state
        .db_call(move |db| {
            if let Some(name) = name {
                let renamed = db
                    .rename_course(course_id, &name)
                    .map_err(|e| ApiError::conflict_on_unique(e, DUPLICATE_COURSE))?;
                if !renamed {
                    return Err(course_not_found());
                }
            }
            db.get_course(course_id)?.ok_or_else(course_not_found)
        })
        .await?;

    Ok(Reply::ok("Course updated successfully.", convert::course(course)))
}

pub async fn delete_course(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(course_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Reply<Empty>> {
    require_superuser(&user, NO_ACCESS)?;

    state
        .db_call(move |db| {
            if db.delete_course(course_id)? {
                Ok(())
            } else {
                Err(course_not_found())
            }
        })
        .await?;

    info!("Course {} deleted by {}", course_id, user.username);
    Ok(Reply::ok("Course deleted successfully.", Empty {}))
}
