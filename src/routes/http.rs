//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::State,
  http::{header, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::GeneratedExam;
use crate::export::{export_exam, ExportFormat};
use crate::logic::{build_exam, check_models, grade_objective};
use crate::protocol::*;
use crate::state::AppState;

fn bad_request(message: &str) -> Response {
  (StatusCode::BAD_REQUEST, Json(ErrorOut::new(message))).into_response()
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(request_id = %Uuid::new_v4()))]
pub async fn http_generate_questions(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Response {
  let (req, include_answer_key) = match body.into_request(state.limits.max_questions) {
    Ok(v) => v,
    Err(message) => {
      warn!(target: "examgen_backend", %message, "Rejected generation request");
      return bad_request(&message);
    }
  };

  let built = build_exam(&state.client, &state.prompts, &req, include_answer_key, &state.request_token()).await;
  info!(
    target: "examgen_backend",
    subject = %req.subject,
    total = built.exam.questions.total(),
    used_fallback = built.used_fallback,
    fallback_marker = built.exam.questions.has_fallback_marker(),
    "HTTP exam generated"
  );
  Json(GenerateOut {
    success: true,
    exam: built.exam,
    used_fallback: built.used_fallback,
    sources: built.sources,
  })
  .into_response()
}

#[instrument(level = "info", skip(body), fields(format = ?body.format))]
pub async fn http_export_exam(Json(body): Json<ExportIn>) -> Response {
  let Some(raw_exam) = body.exam else {
    return bad_request("Missing exam data");
  };
  let Some(format) = body.format.as_deref().and_then(ExportFormat::parse) else {
    return bad_request("Invalid or missing format");
  };
  let exam: GeneratedExam = match serde_json::from_value(raw_exam) {
    Ok(e) => e,
    Err(e) => {
      warn!(target: "export", error = %e, "Malformed exam in export request");
      return bad_request("Invalid exam data");
    }
  };

  match export_exam(&exam, format) {
    Ok(doc) => (
      [
        (header::CONTENT_TYPE, doc.content_type.to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", doc.filename)),
        (header::CACHE_CONTROL, "no-cache".to_string()),
      ],
      doc.bytes,
    )
      .into_response(),
    Err(e) => {
      error!(target: "export", error = %e, "Export failed");
      let message = format!("Failed to generate {} file: {}", format.extension().to_uppercase(), e);
      (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorOut::new(message))).into_response()
    }
  }
}

#[instrument(level = "info", skip(body), fields(mc_answers = body.answers.multiple_choice.len(), tf_answers = body.answers.true_false.len()))]
pub async fn http_grade_exam(Json(body): Json<GradeIn>) -> impl IntoResponse {
  let score = grade_objective(&body.exam, &body.answers);
  info!(target: "examgen_backend", correct = score.correct, total = score.total, percentage = score.percentage, "Exam graded");
  Json(score)
}

#[instrument(level = "info", skip(state))]
pub async fn http_check_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let models = check_models(state.model()).await;
  Json(CheckModelsOut { models })
}
