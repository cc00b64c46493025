use crate::error::{AppError, INVALID_IMAGE, NO_FACE_FOUND};
use crate::records;
use crate::session::{removal_cookie, session_cookie, Admin, SESSION_COOKIE};
use crate::state::AppState;
use crate::views;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::cookie::CookieJar;
use base64::Engine as _;
use image::RgbImage;
use rollcall_core::{Identity, Matcher};
use rollcall_export::ExportFormat;
use rollcall_speech::SpeechOutcome;
use rollcall_store::ATTENDANCE;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Webcam snapshots arrive base64-encoded in a form field.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/dashboard", get(dashboard))
        .route("/register", get(register_page).post(register))
        .route("/mark_attendance", get(mark_attendance_page))
        .route("/mark_attendance/facial", post(mark_attendance_facial))
        .route("/mark_attendance/speech", post(mark_attendance_speech))
        .route("/export", get(export))
        .route("/clear_attendance", get(clear_attendance))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<String> {
    Html(views::index())
}

async fn login_page() -> Html<String> {
    Html(views::login())
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(State(state): State<AppState>, jar: CookieJar, Form(form): Form<LoginForm>) -> Response {
    if !state.credentials.verify(&form.username, &form.password) {
        tracing::warn!(username = %form.username, "login rejected");
        return Html(views::login()).into_response();
    }

    let token = state.sessions.create(&form.username);
    (jar.add(session_cookie(token)), Redirect::to("/dashboard")).into_response()
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.revoke(cookie.value());
    }
    (jar.remove(removal_cookie()), Redirect::to("/"))
}

#[derive(Deserialize)]
struct DashboardQuery {
    notice: Option<String>,
}

async fn dashboard(
    admin: Admin,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, AppError> {
    let records = records::attendance(state.store.as_ref())?;
    Ok(Html(views::dashboard(
        &admin.username,
        &records,
        query.notice.as_deref(),
    )))
}

async fn register_page(_admin: Admin) -> Html<String> {
    Html(views::register())
}

#[derive(Deserialize)]
struct RegisterForm {
    name: String,
    roll_number: String,
    image: String,
}

async fn register(
    _admin: Admin,
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, AppError> {
    let image = decode_image(&form.image)?;
    let encoding = state
        .engine
        .encode_image(image)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::bad_request(NO_FACE_FOUND))?;

    records::insert_identity(
        state.store.as_ref(),
        &Identity {
            name: form.name,
            roll_number: form.roll_number,
            encoding,
        },
    )?;
    Ok(Redirect::to("/dashboard"))
}

/// Decode a base64 image, with or without a `data:image/...;base64,` prefix.
fn decode_image(data: &str) -> Result<RgbImage, AppError> {
    let payload = match data.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| {
            tracing::debug!(error = %e, "image payload is not base64");
            AppError::bad_request(INVALID_IMAGE)
        })?;
    let image = image::load_from_memory(&bytes).map_err(|e| {
        tracing::debug!(error = %e, "image payload could not be decoded");
        AppError::bad_request(INVALID_IMAGE)
    })?;
    Ok(image.to_rgb8())
}

async fn mark_attendance_page(_admin: Admin) -> Html<String> {
    Html(views::mark_attendance())
}

async fn mark_attendance_facial(_admin: Admin, State(state): State<AppState>) -> Result<Redirect, AppError> {
    let encodings = state.engine.capture_faces().await?;
    if encodings.is_empty() {
        tracing::info!("facial attendance: no faces in frame");
        return Ok(Redirect::to("/dashboard"));
    }

    let known = records::known_faces(state.store.as_ref())?;
    for encoding in &encodings {
        let result = state.matcher.best_match(encoding, &known)?;
        match &result.label {
            Some(name) => records::mark_present_by_name(state.store.as_ref(), name)?,
            None => tracing::info!(
                label = result.label_or_unknown(),
                distance = result.distance,
                "facial attendance: face not recognized"
            ),
        }
    }
    Ok(Redirect::to("/dashboard"))
}

async fn mark_attendance_speech(_admin: Admin, State(state): State<AppState>) -> Result<Redirect, AppError> {
    let outcome = state.engine.listen().await?;
    let notice = match &outcome {
        SpeechOutcome::Recognized {
            transcript,
            roll_number,
        } => {
            tracing::info!(%transcript, %roll_number, "speech attendance: roll number heard");
            if records::mark_present_by_roll(state.store.as_ref(), roll_number)? {
                outcome.tag()
            } else {
                "already-marked"
            }
        }
        SpeechOutcome::NoSpeech => {
            tracing::info!("speech attendance: nothing recognized");
            outcome.tag()
        }
        SpeechOutcome::ServiceError(reason) => {
            tracing::warn!(%reason, "speech attendance: service unavailable");
            outcome.tag()
        }
    };
    Ok(Redirect::to(&format!("/dashboard?notice={notice}")))
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

async fn export(
    _admin: Admin,
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let format: ExportFormat = query
        .format
        .as_deref()
        .ok_or_else(|| AppError::bad_request("Missing export format."))?
        .parse()?;

    let documents = state.store.find_all(ATTENDANCE)?;
    let bytes = rollcall_export::render(format, &documents)?;

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", format.file_name()),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn clear_attendance(_admin: Admin, State(state): State<AppState>) -> Result<Redirect, AppError> {
    records::clear_attendance(state.store.as_ref())?;
    Ok(Redirect::to("/dashboard"))
}
