use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use tracing::info;

use convohub_db::Database;
use convohub_types::api::{CreateTeacherRequest, Empty, TeacherResponse, UpdateTeacherRequest};
use convohub_types::models::CurrentUser;

use crate::convert;
use crate::courses::NO_ACCESS;
use crate::error::{ApiError, ApiResult};
use crate::middleware::require_superuser;
use crate::reply::Reply;
use crate::state::AppState;
use crate::validate::name_field;

fn teacher_not_found() -> ApiError {
    ApiError::not_found("Teacher not found.")
}

/// Every id must name an existing course. Duplicates are collapsed.
fn check_courses(db: &Database, course_ids: &[i64]) -> ApiResult<Vec<i64>> {
    let mut ids = course_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    if db.courses_by_ids(&ids)?.len() != ids.len() {
        return Err(ApiError::validation("One or more courses not found."));
    }
    Ok(ids)
}

fn load_teacher(db: &Database, teacher_id: i64) -> ApiResult<TeacherResponse> {
    let row = db.get_teacher(teacher_id)?.ok_or_else(teacher_not_found)?;
    convert::teachers_with_courses(db, vec![row])?
        .pop()
        .ok_or_else(teacher_not_found)
}

pub async fn list_teachers(State(state): State<AppState>) -> ApiResult<Reply<Vec<TeacherResponse>>> {
    let teachers = state
        .db_call(|db| {
            let rows = db.list_teachers()?;
            Ok(convert::teachers_with_courses(db, rows)?)
        })
        .await?;

    Ok(Reply::ok("Teacher(s) retrieved successfully.", teachers))
}

pub async fn get_teacher(
    State(state): State<AppState>,
    WithRejection(Path(teacher_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Reply<TeacherResponse>> {
    let teacher = state.db_call(move |db| load_teacher(db, teacher_id)).await?;
    Ok(Reply::ok("Teacher retrieved successfully.", teacher))
}

pub async fn create_teacher(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<CreateTeacherRequest>, ApiError>,
) -> ApiResult<Reply<TeacherResponse>> {
    require_superuser(&user, NO_ACCESS)?;
    let name = req.name.as_deref().unwrap_or_default().trim();
    if name.is_empty() || req.course_ids.is_empty() {
        return Err(ApiError::validation(
            "Invalid data. 'name' and 'course_ids' are required.",
        ));
    }
    let name = name_field("Name", name).map_err(ApiError::Validation)?;
    let course_ids = req.course_ids;

    let teacher = state
        .db_call(move |db| {
            let course_ids = check_courses(db, &course_ids)?;
            let id = db.create_teacher(&name, &course_ids)?;
            load_teacher(db, id)
        })
        .await?;

    info!("Teacher {} created by {}", teacher.name, user.username);
    Ok(Reply::created("Teacher created successfully.", teacher))
}

/// The course list is replaced only when `course_ids` is present.
pub async fn update_teacher(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(teacher_id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateTeacherRequest>, ApiError>,
) -> ApiResult<Reply<TeacherResponse>> {
    require_superuser(&user, NO_ACCESS)?;
    let name = req
        .name
        .as_deref()
        .map(|n| name_field("Name", n))
        .transpose()
        .map_err(ApiError::Validation)?;
    let course_ids = req.course_ids;
    if course_ids.as_ref().is_some_and(Vec::is_empty) {
        return Err(ApiError::validation("Invalid data. 'course_ids' cannot be empty."));
    }

    let teacher = state
        .db_call(move |db| {
            if db.get_teacher(teacher_id)?.is_none() {
                return Err(teacher_not_found());
            }
            let course_ids = course_ids
                .map(|ids| check_courses(db, &ids))
                .transpose()?;

            if !db.update_teacher(teacher_id, name.as_deref(), course_ids.as_deref())? {
                return Err(teacher_not_found());
            }
            load_teacher(db, teacher_id)
        })
        .await?;

    Ok(Reply::ok("Teacher updated successfully.", teacher))
}

pub async fn delete_teacher(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(teacher_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Reply<Empty>> {
    require_superuser(&user, NO_ACCESS)?;

    state
        .db_call(move |db| {
            if db.delete_teacher(teacher_id)? {
                Ok(())
            } else {
                Err(teacher_not_found())
            }
        })
        .await?;

    info!("Teacher {} deleted by {}", teacher_id, user.username);
    Ok(Reply::ok("Teacher deleted successfully.", Empty {}))
}
