use super::{ErrorResponse, SharedState};
use crate::session::SubmitOutcome;
use crate::store::models::{DocumentContext, Message};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TurnResponse {
    pub user: Message,
    pub reply: Message,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub sending: bool,
    pub message_count: usize,
    pub document: DocumentContext,
}

pub async fn get_messages(State(state): State<SharedState>) -> Json<Vec<Message>> {
    Json(state.session.messages())
}

pub async fn send_message(
    State(state): State<SharedState>,
    Json(payload): Json<SendMessageRequest>,
) -> Response {
    match state.session.submit(&payload.text).await {
        SubmitOutcome::Ignored => StatusCode::NO_CONTENT.into_response(),
        SubmitOutcome::Busy => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "A reply is still in progress".into(),
            }),
        )
            .into_response(),
        SubmitOutcome::Replied { user, reply } => Json(TurnResponse { user, reply }).into_response(),
    }
}

pub async fn get_status(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        sending: state.session.is_sending(),
        message_count: state.session.message_count(),
        document: state.session.document(),
    })
}
