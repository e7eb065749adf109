use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use tempfile::TempDir;

use convohub_api::{AppState, AppStateInner, MediaStorage, TokenConfig, router};
use convohub_db::Database;
use convohub_gateway::hub::RoomHub;

/// The media directory lives as long as the returned `TempDir`.
async fn app() -> (Router, AppState, TempDir) {
    let db = Database::open_in_memory().unwrap();
    let tokens = TokenConfig::new("test-secret", Duration::minutes(5), Duration::days(1));
    let media_dir = tempfile::tempdir().unwrap();
    let media = MediaStorage::new(media_dir.path().to_path_buf()).await.unwrap();
    let state = AppStateInner::new(db, tokens, RoomHub::default(), media);
    (router(state.clone()), state, media_dir)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Returns the access token.
async fn signup(app: &Router, username: &str, roll: u32) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/signup/",
        None,
        Some(json!({
            "username": username,
            "email": format!("l{roll:06}@lhr.nu.edu.pk"),
            "password": "correct horse"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["access_token"].as_str().unwrap().to_string()
}

async fn create_room(app: &Router, token: &str, name: &str, topic: &str) -> i64 {
    let (status, body) = call(
        app,
        Method::POST,
        "/rooms/create/",
        Some(token),
        Some(json!({ "name": name, "topic": topic })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

const BOUNDARY: &str = "convohub-test-boundary";

/// A multipart part: field name, optional file name, contents.
type Part<'a> = (&'a str, Option<&'a str>, &'a str);

async fn upload(app: &Router, token: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/profile/")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Fetch a public file and return its status and raw bytes.
async fn fetch(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

fn meta(body: &Value) -> (&str, i64) {
    (
        body["meta"]["message"].as_str().unwrap(),
        body["meta"]["status"].as_i64().unwrap(),
    )
}

#[tokio::test]
async fn signup_returns_token_pair_in_envelope() {
    let (app, _, _media) = app().await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/signup/",
        None,
        Some(json!({
            "username": "  alice ",
            "email": "L100001@LHR.NU.EDU.PK",
            "password": "pw"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(meta(&body), ("Successfully Registered!", 201));
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"]["access_token"].is_string());
    assert!(body["data"]["refresh_token"].is_string());
}

#[tokio::test]
async fn signup_rejects_foreign_domain_and_duplicates() {
    let (app, _, _media) = app().await;
    signup(&app, "alice", 100001).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/signup/",
        None,
        Some(json!({ "username": "bob", "email": "bob@gmail.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(meta(&body), ("Only NUCES email can be used to create an account", 400));
    assert_eq!(body["data"], json!({}));

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/signup/",
        None,
        Some(json!({ "username": "alice", "email": "l100002@lhr.nu.edu.pk", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(meta(&body).0, "Username already exists!");

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/signup/",
        None,
        Some(json!({ "username": "carol", "email": "l100001@lhr.nu.edu.pk", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(meta(&body).0, "Email already exists!");
}

#[tokio::test]
async fn login_distinguishes_unknown_user_and_bad_password() {
    let (app, _, _media) = app().await;
    signup(&app, "alice", 100001).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/login/",
        None,
        Some(json!({ "username": "nobody", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(meta(&body).0, "Not Registered");

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/login/",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(meta(&body).0, "Incorrect password");

    let (status, body) = call(&app, Method::POST, "/auth/login/", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(meta(&body).0, "Username and password are required");

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/login/",
        None,
        Some(json!({ "username": "alice", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(meta(&body), ("Success", 200));
}

#[tokio::test]
async fn signup_password_is_trimmed() {
    let (app, _, _media) = app().await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/auth/signup/",
        None,
        Some(json!({ "username": "alice", "email": "l100001@lhr.nu.edu.pk", "password": "  pw  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let login = |password: &str| json!({ "username": "alice", "password": password });
    let (status, _) = call(&app, Method::POST, "/auth/login/", None, Some(login("pw"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::POST, "/auth/login/", None, Some(login("  pw  "))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/signup/",
        None,
        Some(json!({ "username": "bob", "email": "l100002@lhr.nu.edu.pk", "password": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(meta(&body).0, "Password is required");
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let (app, _, _media) = app().await;

    let (status, body) = call(&app, Method::GET, "/rooms/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(meta(&body).1, 401);

    let (status, _) = call(&app, Method::GET, "/rooms/", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_refresh_tokens() {
    let (app, _, _media) = app().await;
    let (_, body) = call(
        &app,
        Method::POST,
        "/auth/signup/",
        None,
        Some(json!({ "username": "alice", "email": "l100001@lhr.nu.edu.pk", "password": "pw" })),
    )
    .await;
    let access = body["data"]["access_token"].as_str().unwrap().to_string();
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        Method::POST,
        "/auth/token/refresh/",
        None,
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::POST, "/auth/logout/", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(meta(&body).0, "Successfully logged out.");

    let (status, _) = call(
        &app,
        Method::POST,
        "/auth/token/refresh/",
        None,
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_cannot_be_used_as_bearer() {
    let (app, _, _media) = app().await;
    let (_, body) = call(
        &app,
        Method::POST,
        "/auth/signup/",
        None,
        Some(json!({ "username": "alice", "email": "l100001@lhr.nu.edu.pk", "password": "pw" })),
    )
    .await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = call(&app, Method::GET, "/profile/", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn room_lifecycle_is_host_only() {
    let (app, _, _media) = app().await;
    let alice = signup(&app, "alice", 100001).await;
    let bob = signup(&app, "bob", 100002).await;
    let room = create_room(&app, &alice, "Compilers", "parsing").await;
    let path = format!("/rooms/{room}/");

    let (status, body) = call(&app, Method::PATCH, &path, Some(&bob), Some(json!({ "name": "Hijacked" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(meta(&body).1, 403);

    let (_, body) = call(&app, Method::GET, &path, Some(&bob), None).await;
    assert_eq!(body["data"]["room"]["name"], "Compilers");

    let (status, body) = call(&app, Method::PUT, &path, Some(&alice), Some(json!({ "topic": "lexing" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Compilers");
    assert_eq!(body["data"]["topic"], "lexing");

    let (status, _) = call(&app, Method::DELETE, &path, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::DELETE, &path, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::GET, &path, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(meta(&body), ("Room not found.", 404));
}

#[tokio::test]
async fn non_host_update_is_forbidden_even_when_invalid() {
    let (app, _, _media) = app().await;
    let alice = signup(&app, "alice", 100001).await;
    let bob = signup(&app, "bob", 100002).await;
    let room = create_room(&app, &alice, "Compilers", "parsing").await;
    let path = format!("/rooms/{room}/");

    let (status, body) = call(&app, Method::PUT, &path, Some(&bob), Some(json!({ "topic": "" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        meta(&body).0,
        "You are not authorized to update this room. Only the host can update it."
    );

    let (status, body) = call(&app, Method::PUT, &path, Some(&alice), Some(json!({ "topic": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(meta(&body).0, "Topic cannot be empty.");
}

#[tokio::test]
async fn create_room_requires_topic_and_defaults_name() {
    let (app, _, _media) = app().await;
    let alice = signup(&app, "alice", 100001).await;

    let (status, _) = call(&app, Method::POST, "/rooms/create/", Some(&alice), Some(json!({ "name": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::POST,
        "/rooms/create/",
        Some(&alice),
        Some(json!({ "topic": "anything" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "New Room");
    assert_eq!(body["data"]["host"]["username"], "alice");
    assert_eq!(body["data"]["members"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn join_is_idempotent_guarded() {
    let (app, _, _media) = app().await;
    let alice = signup(&app, "alice", 100001).await;
    let bob = signup(&app, "bob", 100002).await;
    let room = create_room(&app, &alice, "Databases", "joins").await;
    let path = format!("/rooms/{room}/join/");

    let (status, body) = call(&app, Method::POST, &path, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "room_id": room, "room_name": "Databases" }));

    let (status, body) = call(&app, Method::POST, &path, Some(&bob), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(meta(&body).0, "You are already a member of this room.");

    let (_, body) = call(&app, Method::GET, &format!("/rooms/{room}/"), Some(&bob), None).await;
    assert_eq!(body["data"]["room"]["members"].as_array().unwrap().len(), 2);

    let (status, _) = call(&app, Method::POST, "/rooms/9999/join/", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::POST, "/rooms/abc/join/", Some(&bob), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn room_list_falls_back_to_popular_rooms() {
    let (app, _, _media) = app().await;
    let alice = signup(&app, "alice", 100001).await;
    let bob = signup(&app, "bob", 100002).await;
    let carol = signup(&app, "carol", 100003).await;

    let quiet = create_room(&app, &alice, "Quiet", "nothing").await;
    let busy = create_room(&app, &alice, "Busy", "everything").await;
    call(&app, Method::POST, &format!("/rooms/{busy}/join/"), Some(&bob), None).await;

    let (_, body) = call(&app, Method::GET, "/rooms/", Some(&carol), None).await;
    let ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![busy, quiet]);

    let (_, body) = call(&app, Method::GET, "/rooms/", Some(&bob), None).await;
    let rooms = body["data"].as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["id"], busy);
}

#[tokio::test]
async fn search_matches_name_or_topic_case_insensitively() {
    let (app, _, _media) = app().await;
    let alice = signup(&app, "alice", 100001).await;
    create_room(&app, &alice, "Operating Systems", "scheduling").await;
    create_room(&app, &alice, "Networks", "TCP congestion").await;

    let (status, body) = call(&app, Method::GET, "/rooms/search/?query=tcp", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let hits = body["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["room_name"], "Networks");
    assert_eq!(hits[0]["host"], "alice");
    assert_eq!(hits[0]["members_count"], 1);

    let (status, body) = call(&app, Method::GET, "/rooms/search/?query=zzz", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = call(&app, Method::GET, "/rooms/search/?query=%20", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recent_activity_validates_limit() {
    let (app, state, _media) = app().await;
    let alice = signup(&app, "alice", 100001).await;
    let room = create_room(&app, &alice, "General", "chat").await;
    let alice_id = state.db.get_user_by_username("alice").unwrap().unwrap().id;
    for n in 0..3 {
        state.db.insert_message(room, alice_id, &format!("msg {n}")).unwrap();
    }

    let (status, body) = call(&app, Method::GET, "/rooms/recent/?limit=2", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["room"]["room_name"], "General");
    assert_eq!(items[0]["user"]["username"], "alice");

    let (status, body) = call(&app, Method::GET, "/rooms/recent/?limit=0", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(meta(&body).0, "Limit parameter must be greater than 0.");

    let (status, _) = call(&app, Method::GET, "/rooms/recent/", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn catalogue_lives_under_review_prefix() {
    let (app, _, _media) = app().await;
    let student = signup(&app, "student", 100002).await;

    for uri in ["/review/courses/", "/review/teachers/"] {
        let (status, body) = call(&app, Method::GET, uri, Some(&student), None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["data"], json!([]));
    }

    let (status, _) = call(&app, Method::GET, "/review/courses/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for uri in ["/courses/", "/teachers/", "/teacher-reviews/"] {
        let (status, _) = call(&app, Method::GET, uri, Some(&student), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn catalogue_mutations_need_superuser() {
    let (app, state, _media) = app().await;
    let admin = signup(&app, "admin", 100001).await;
    let student = signup(&app, "student", 100002).await;
    assert!(state.db.set_superuser("admin", true).unwrap());

    let (status, body) = call(&app, Method::POST, "/review/courses/", Some(&student), Some(json!({ "name": "OOP" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(meta(&body).0, "You do not have permission to access this resource.");

    let (status, body) = call(&app, Method::POST, "/review/courses/", Some(&admin), Some(json!({ "name": "OOP" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let course = body["data"]["id"].as_i64().unwrap();

    let (status, _) = call(&app, Method::POST, "/review/courses/", Some(&admin), Some(json!({ "name": "OOP" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &app,
        Method::POST,
        "/review/teachers/",
        Some(&admin),
        Some(json!({ "name": "Dr. Khan", "course_ids": [course, 9999] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(meta(&body).0, "One or more courses not found.");

    let (status, body) = call(
        &app,
        Method::POST,
        "/review/teachers/",
        Some(&admin),
        Some(json!({ "name": "Dr. Khan", "course_ids": [course] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["courses"], json!([{ "id": course, "name": "OOP" }]));

    let (status, body) = call(&app, Method::GET, "/review/teachers/", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn review_flow_enforces_rules() {
    let (app, state, _media) = app().await;
    let admin = signup(&app, "admin", 100001).await;
    let student = signup(&app, "student", 100002).await;
    state.db.set_superuser("admin", true).unwrap();

    let course = state.db.create_course("Algorithms").unwrap();
    let teacher = state.db.create_teacher("Dr. Ali", &[course]).unwrap();
    let review = |style: f64, remarks: &str| {
        json!({
            "teacher_id": teacher,
            "course_id": course,
            "teaching_style": style,
            "marking": 4,
            "additional_remarks": remarks
        })
    };

    let (status, _) = call(&app, Method::POST, "/review/teacher-reviews/", Some(&student), Some(json!({ "teacher_id": teacher }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::POST, "/review/teacher-reviews/", Some(&student), Some(review(6.0, ""))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, Method::POST, "/review/teacher-reviews/", Some(&student), Some(review(4.0, "total crap"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(meta(&body).0, "Immoral word detected in additional remarks");

    let (status, body) = call(&app, Method::POST, "/review/teacher-reviews/", Some(&student), Some(review(4.5, "Clear lectures"))).await;
    assert_eq!(status, StatusCode::CREATED);
    let review_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = call(&app, Method::POST, "/review/teacher-reviews/", Some(&student), Some(review(3.0, "again"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(meta(&body).0, "You have already reviewed this teacher for this course.");

    let uri = format!("/review/teacher-reviews/?teacher_id={teacher}&course_id={course}");
    let (_, body) = call(&app, Method::GET, &uri, Some(&student), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["teaching_style"], 4.5);

    let (status, _) = call(&app, Method::GET, "/review/teacher-reviews/", Some(&student), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let path = format!("/review/teacher-reviews/{review_id}/");
    let (status, body) = call(&app, Method::DELETE, &path, Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(meta(&body).0, "You do not have permission to delete this resource.");

    let (status, _) = call(&app, Method::DELETE, &path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::DELETE, &path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_update_is_partial() {
    let (app, _, _media) = app().await;
    let alice = signup(&app, "alice", 100001).await;

    let (status, body) = call(&app, Method::GET, "/profile/", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "l100001@lhr.nu.edu.pk");
    assert_eq!(body["data"]["bio"], "");
    assert_eq!(body["data"]["profile_image"], Value::Null);

    let (status, _) = call(&app, Method::PUT, "/profile/", Some(&alice), Some(json!({ "bio": "CS '26" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = upload(&app, &alice, &[("profile_image", Some("me.png"), "fake png bytes")]).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(meta(&body).0, "User profile updated successfully.");
    assert_eq!(body["data"]["bio"], "CS '26");
    let url = body["data"]["profile_image"].as_str().unwrap().to_string();
    assert!(url.starts_with("/media/profile_images/"), "{url}");

    let (status, bytes) = fetch(&app, &url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"fake png bytes");

    let (status, body) = upload(&app, &alice, &[("bio", None, "  Compilers TA  ")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bio"], "Compilers TA");
    assert_eq!(body["data"]["profile_image"], url.as_str());
}

#[tokio::test]
async fn new_profile_image_replaces_the_old_file() {
    let (app, _, _media) = app().await;
    let alice = signup(&app, "alice", 100001).await;

    let (_, body) = upload(&app, &alice, &[("profile_image", Some("first.png"), "one")]).await;
    let first = body["data"]["profile_image"].as_str().unwrap().to_string();
    let (status, body) = upload(
        &app,
        &alice,
        &[("bio", None, "hello"), ("profile_image", Some("second.JPEG"), "two")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["data"]["profile_image"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert!(second.ends_with(".jpg"), "{second}");

    assert_eq!(fetch(&app, &first).await.0, StatusCode::NOT_FOUND);
    assert_eq!(fetch(&app, &second).await, (StatusCode::OK, b"two".to_vec()));
}

#[tokio::test]
async fn bad_profile_uploads_are_rejected() {
    let (app, _, _media) = app().await;
    let alice = signup(&app, "alice", 100001).await;

    let (status, body) = upload(&app, &alice, &[("profile_image", Some("notes.txt"), "text")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(meta(&body).0, "Profile image must be a PNG, JPEG, GIF or WebP file.");

    let (status, body) = upload(&app, &alice, &[("profile_image", Some("empty.png"), "")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(meta(&body).0, "Profile image is empty.");

    let (status, _) = upload(&app, &alice, &[("avatar", Some("me.png"), "png")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Images cannot be set by reference.
    let (status, _) = call(
        &app,
        Method::PUT,
        "/profile/",
        Some(&alice),
        Some(json!({ "profile_image": "/media/profile_images/someone-else.png" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, Method::GET, "/profile/", Some(&alice), None).await;
    assert_eq!(body["data"]["profile_image"], Value::Null);
}

#[tokio::test]
async fn unknown_paths_use_the_envelope() {
    let (app, _, _media) = app().await;
    let (status, body) = call(&app, Method::GET, "/nope/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(meta(&body).1, 404);
}
