use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use triage_core::{
    ConversationSession, Dispatcher, InMemorySessionStorage, Intent, SessionStorage,
    TriageConfig, TriageError, TurnRunner, text::canonicalize,
};
use uuid::Uuid;

use crate::models::{
    AssistantRequest, AssistantResponse, DiseaseResponse, IntentInfo, IntentResponse,
    IntentsResponse, TextRequest, TurnStatus,
};

pub const SERVICE_NAME: &str = "Health Triage Assistant API";

pub const ASK_SYMPTOM_NOTE: &str =
    "Here are some common symptoms I can tell you about. Could you please specify the condition you're asking about?";

pub const GIVE_SYMPTOM_NOTE: &str =
    "Thanks for describing how you feel. Send your symptoms to the health assistant to get a likely condition.";

const CORRELATION_HEADER: &str = "x-correlation-id";

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub session_storage: Arc<dyn SessionStorage>,
    pub dispatcher: Arc<Dispatcher>,
    pub runner: TurnRunner,
    pub max_text_chars: usize,
}

/// Wire a dispatcher to fresh in-memory session storage.
pub fn create_app_state(dispatcher: Arc<Dispatcher>, config: &TriageConfig) -> AppState {
    let session_storage: Arc<dyn SessionStorage> =
        Arc::new(InMemorySessionStorage::with_ttl(config.session_ttl()));
    let runner = TurnRunner::new(
        dispatcher.clone(),
        session_storage.clone(),
        config.max_transcript_messages,
    );

    AppState {
        session_storage,
        dispatcher,
        runner,
        max_text_chars: config.max_text_chars,
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/ai/intents", get(list_intents))
        .route("/api/v1/ai/predict-intent", post(predict_intent))
        .route("/api/v1/ai/predict-disease", post(predict_disease))
        .route("/api/v1/ai/health-assistant", post(health_assistant))
        .route("/api/v1/ai/session/{session_id}", get(get_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state)
}

/// Runs every request inside an `http_request` span tagged with a fresh correlation id.
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = &header {
        request.headers_mut().insert(CORRELATION_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "service": SERVICE_NAME,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn list_intents() -> Json<IntentsResponse> {
    Json(IntentsResponse {
        intents: Intent::ALL
            .iter()
            .map(|intent| IntentInfo {
                name: intent.as_str().to_string(),
                description: intent.description().to_string(),
            })
            .collect(),
    })
}

fn validate_text(text: &str, max_chars: usize) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(bad_request_error("Text is required"));
    }
    let chars = text.chars().count();
    if chars > max_chars {
        warn!(chars, max_chars, "Text too long");
        return Err(bad_request_error(&format!(
            "Text must be at most {max_chars} characters"
        )));
    }
    Ok(())
}

async fn predict_intent(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> ApiResult<IntentResponse> {
    validate_text(&request.text, state.max_text_chars)?;
    info!(text_length = request.text.len(), "Predicting intent");

    let prediction = state.dispatcher.classify(&request.text).await.map_err(|e| {
        error!(error = %e, "Intent prediction failed");
        internal_error("Failed to predict intent", &e.to_string())
    })?;

    let response = match Dispatcher::canned_reply(prediction.intent) {
        Some(reply) => reply,
        None if prediction.intent == Intent::AskSymptom => ASK_SYMPTOM_NOTE,
        None => GIVE_SYMPTOM_NOTE,
    };

    info!(intent = %prediction.intent, confidence = ?prediction.confidence, "Intent predicted");
    Ok(Json(IntentResponse {
        intent: prediction.intent,
        response: response.to_string(),
        confidence: prediction.confidence,
    }))
}

async fn predict_disease(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> ApiResult<DiseaseResponse> {
    validate_text(&request.text, state.max_text_chars)?;
    info!(text_length = request.text.len(), "Predicting disease");

    let prediction = state.dispatcher.predict(&request.text).await.map_err(|e| {
        error!(error = %e, "Disease prediction failed");
        internal_error("Failed to predict disease", &e.to_string())
    })?;

    let symptoms = state
        .dispatcher
        .index()
        .get(&canonicalize(&prediction.label))
        .map(|record| record.symptoms.clone())
        .unwrap_or_default();

    info!(disease = %prediction.label, confidence = prediction.confidence, "Disease predicted");
    Ok(Json(DiseaseResponse {
        disease: prediction.label,
        confidence: prediction.confidence,
        symptoms,
    }))
}

async fn health_assistant(
    State(state): State<AppState>,
    Json(request): Json<AssistantRequest>,
) -> ApiResult<AssistantResponse> {
    validate_text(&request.text, state.max_text_chars)?;

    if let Some(session_id) = &request.session_id {
        if Uuid::parse_str(session_id).is_err() {
            warn!(session_id = %session_id, "Invalid session ID format");
            return Err(bad_request_error("Invalid session ID format"));
        }
    }

    info!(
        session_id = ?request.session_id,
        text_length = request.text.len(),
        "Processing health assistant turn"
    );

    let outcome = match state
        .runner
        .run(request.session_id.as_deref(), &request.text)
        .await
    {
        Ok(outcome) => outcome,
        Err(TriageError::SessionNotFound(id)) => {
            info!(session_id = %id, "Session not found");
            return Err(not_found_error("Session not found", &id));
        }
        Err(e) => {
            error!(session_id = ?request.session_id, error = %e, "Failed to process turn");
            return Err(internal_error("Failed to process message", &e.to_string()));
        }
    };

    if outcome.response.is_failure() {
        error!(session_id = %outcome.session_id, "Turn ended in failure");
        return Err(internal_error(
            "Failed to process message",
            &outcome.response.message(),
        ));
    }

    let status = if outcome.waiting_for_input {
        TurnStatus::WaitingForInput
    } else {
        TurnStatus::Completed
    };

    info!(
        session_id = %outcome.session_id,
        intent = ?outcome.intent,
        status = ?status,
        "Turn completed"
    );

    Ok(Json(AssistantResponse {
        session_id: outcome.session_id,
        intent: outcome.intent,
        message: outcome.response.message(),
        disease: outcome.response.disease().map(str::to_string),
        confidence: outcome.response.confidence(),
        response: outcome.response,
        status,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<ConversationSession> {
    info!(session_id = %session_id, "Getting session");

    match state.session_storage.get(&session_id).await {
        Ok(Some(session)) => Ok(Json(session)),
        Ok(None) => Err(not_found_error("Session not found", &session_id)),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to get session");
            Err(internal_error("Failed to get session", &e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tower::ServiceExt;
    use triage_core::{
        ConditionPredictor, IntentClassifier, IntentPrediction, PredictionResult, Result,
        SymptomIndex,
    };

    struct FixedClassifier(Intent);

    #[async_trait]
    impl IntentClassifier for FixedClassifier {
        async fn classify(&self, _text: &str) -> Result<IntentPrediction> {
            Ok(IntentPrediction::with_confidence(self.0, 0.9))
        }
    }

    struct BrokenClassifier;

    #[async_trait]
    impl IntentClassifier for BrokenClassifier {
        async fn classify(&self, _text: &str) -> Result<IntentPrediction> {
            Err(TriageError::Inference("model crashed".to_string()))
        }
    }

    struct ScriptedPredictor(Mutex<VecDeque<f64>>);

    #[async_trait]
    impl ConditionPredictor for ScriptedPredictor {
        async fn predict(&self, _symptom_text: &str) -> Result<PredictionResult> {
            let confidence = self.0.lock().unwrap().pop_front().unwrap_or(0.0);
            Ok(PredictionResult {
                label: "Flu".to_string(),
                confidence,
            })
        }
    }

    fn app(classifier: Arc<dyn IntentClassifier>, confidences: &[f64]) -> Router {
        let index = SymptomIndex::build(vec![(
            "Flu".to_string(),
            vec!["fever".to_string(), "chills".to_string()],
        )])
        .unwrap();
        let config = TriageConfig::default();
        let dispatcher = Dispatcher::new(
            classifier,
            Arc::new(ScriptedPredictor(Mutex::new(
                confidences.iter().copied().collect(),
            ))),
            Arc::new(index),
            &config,
        );
        build_router(create_app_state(Arc::new(dispatcher), &config))
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ok_with_correlation_header() {
        let app = app(Arc::new(FixedClassifier(Intent::Greet)), &[]);
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(CORRELATION_HEADER));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "OK");
        assert_eq!(body["service"], SERVICE_NAME);
    }

    #[tokio::test]
    async fn lists_all_intents() {
        let app = app(Arc::new(FixedClassifier(Intent::Greet)), &[]);
        let (status, body) = get_json(&app, "/api/v1/ai/intents").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intents"].as_array().unwrap().len(), Intent::ALL.len());
        assert_eq!(body["intents"][0]["name"], "greet");
    }

    #[tokio::test]
    async fn predict_intent_returns_canned_reply() {
        let app = app(Arc::new(FixedClassifier(Intent::Thanks)), &[]);
        let (status, body) =
            post_json(&app, "/api/v1/ai/predict-intent", json!({ "text": "thanks a lot" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "thanks");
        assert_eq!(body["response"], triage_core::response::FAREWELL);
        assert_eq!(body["confidence"], 0.9);
    }

    #[tokio::test]
    async fn blank_text_is_a_bad_request() {
        let app = app(Arc::new(FixedClassifier(Intent::Greet)), &[]);
        let (status, body) =
            post_json(&app, "/api/v1/ai/predict-intent", json!({ "text": "   " })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Text is required");
    }

    #[tokio::test]
    async fn overlong_text_is_a_bad_request() {
        let app = app(Arc::new(FixedClassifier(Intent::AskSymptom)), &[]);
        let text = "tell me about flu ".repeat(200);

        for uri in [
            "/api/v1/ai/predict-intent",
            "/api/v1/ai/predict-disease",
            "/api/v1/ai/health-assistant",
        ] {
            let (status, body) = post_json(&app, uri, json!({ "text": text })).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].as_str().unwrap().contains("2000"));
        }
    }

    #[tokio::test]
    async fn ask_symptom_turn_returns_symptom_list() {
        let app = app(Arc::new(FixedClassifier(Intent::AskSymptom)), &[]);
        let (status, body) = post_json(
            &app,
            "/api/v1/ai/health-assistant",
            json!({ "text": "tell me about flu" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"]["type"], "symptom_list");
        assert_eq!(body["disease"], "Flu");
        assert_eq!(body["status"], "completed");
    }

    #[tokio::test]
    async fn predict_disease_includes_known_symptoms() {
        let app = app(Arc::new(FixedClassifier(Intent::GiveSymptom)), &[0.8]);
        let (status, body) = post_json(
            &app,
            "/api/v1/ai/predict-disease",
            json!({ "text": "fever and chills" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["disease"], "Flu");
        assert_eq!(body["confidence"], 0.8);
        assert_eq!(body["symptoms"], json!(["fever", "chills"]));
    }

    #[tokio::test]
    async fn health_assistant_parks_then_completes() {
        let app = app(Arc::new(FixedClassifier(Intent::GiveSymptom)), &[0.1, 0.6]);

        let (status, first) = post_json(
            &app,
            "/api/v1/ai/health-assistant",
            json!({ "text": "I feel hot" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["status"], "waiting_for_input");
        assert_eq!(first["response"]["type"], "needs_clarification");
        let session_id = first["session_id"].as_str().unwrap().to_string();

        let (status, second) = post_json(
            &app,
            "/api/v1/ai/health-assistant",
            json!({ "session_id": session_id, "text": "and shivering" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["status"], "completed");
        assert_eq!(second["disease"], "Flu");
        assert_eq!(second["confidence"], 0.6);
        assert_eq!(second["intent"], "give_symptom");

        let (status, session) =
            get_json(&app, &format!("/api/v1/ai/session/{session_id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["transcript"].as_array().unwrap().len(), 4);
        assert!(session["pending"].is_null());
    }

    #[tokio::test]
    async fn malformed_session_id_is_rejected() {
        let app = app(Arc::new(FixedClassifier(Intent::Greet)), &[]);
        let (status, _) = post_json(
            &app,
            "/api/v1/ai/health-assistant",
            json!({ "session_id": "not-a-uuid", "text": "hi" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = app(Arc::new(FixedClassifier(Intent::Greet)), &[]);
        let missing = Uuid::new_v4().to_string();

        let (status, body) = post_json(
            &app,
            "/api/v1/ai/health-assistant",
            json!({ "session_id": missing, "text": "hi" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["session_id"], missing);

        let (status, _) = get_json(&app, &format!("/api/v1/ai/session/{missing}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_turn_is_an_internal_error() {
        let app = app(Arc::new(BrokenClassifier), &[]);
        let (status, body) = post_json(
            &app,
            "/api/v1/ai/health-assistant",
            json!({ "text": "hello" }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["details"], triage_core::response::FAILURE);
    }
}
