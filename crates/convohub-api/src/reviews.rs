use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};

use convohub_types::api::{CreateReviewRequest, Empty, ReviewQuery, ReviewResponse};
use convohub_types::models::CurrentUser;

use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::middleware::require_superuser;
use crate::reply::Reply;
use crate::state::AppState;
use crate::validate::contains_profanity;

const ALREADY_REVIEWED: &str = "You have already reviewed this teacher for this course.";
const SCORE_RANGE: std::ops::RangeInclusive<f64> = 1.0..=5.0;

pub async fn list_reviews(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<ReviewQuery>, ApiError>,
) -> ApiResult<Reply<Vec<ReviewResponse>>> {
    let (Some(teacher_id), Some(course_id)) = (params.teacher_id, params.course_id) else {
        return Err(ApiError::validation(
            "Both 'teacher_id' and 'course_id' are required.",
        ));
    };

    let reviews = state
        .db_call(move |db| Ok(db.get_reviews(teacher_id, course_id)?))
        .await?
        .into_iter()
        .map(convert::review)
        .collect();

    Ok(Reply::ok("Teacher reviews retrieved successfully.", reviews))
}

pub async fn create_review(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<CreateReviewRequest>, ApiError>,
) -> ApiResult<Reply<ReviewResponse>> {
    let (Some(teacher_id), Some(course_id), Some(teaching_style), Some(marking)) =
        (req.teacher_id, req.course_id, req.teaching_style, req.marking)
    else {
        return Err(ApiError::validation(
            "Missing required fields: 'teacher_id', 'course_id', 'teaching_style', 'marking'.",
        ));
    };
    let remarks = req
        .additional_remarks
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let user_id = user.id;
    let review = state
        .db_call(move |db| {
            if db.review_exists(user_id, teacher_id, course_id)? {
                return Err(ApiError::Conflict(ALREADY_REVIEWED.into()));
            }
            if !SCORE_RANGE.contains(&teaching_style) || !SCORE_RANGE.contains(&marking) {
                return Err(ApiError::validation("Scores must be between 1 and 5."));
            }
            if remarks.as_deref().is_some_and(contains_profanity) {
                warn!("User {} submitted a review with profanity", user_id);
                return Err(ApiError::validation("Immoral word detected in additional remarks"));
            }
            if db.get_teacher(teacher_id)?.is_none() {
                return Err(ApiError::not_found("Teacher not found."));
            }
            if db.get_course(course_id)?.is_none() {
                return Err(ApiError::not_found("Course not found."));
            }

            db.create_review(
                user_id,
                teacher_id,
                course_id,
                teaching_style,
                marking,
                remarks.as_deref(),
            )
            .map_err(|e| ApiError::conflict_on_unique(e, ALREADY_REVIEWED))
        })
        .await?;

    info!(
        "User {} reviewed teacher {} for course {}",
        user.username, teacher_id, course_id
    );
    Ok(Reply::created("Review added successfully.", convert::review(review)))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(review_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Reply<Empty>> {
    require_superuser(&user, "You do not have permission to delete this resource.")?;

    state
        .db_call(move |db| {
            if db.delete_review(review_id)? {
                Ok(())
            } else {
                Err(ApiError::not_found("Review not found."))
            }
        })
        .await?;

    Ok(Reply::ok("Review deleted successfully.", Empty {}))
}
