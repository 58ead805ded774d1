//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use playdo_core::conversation::service::TurnError;
use playdo_types::error::RepositoryError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Authentication failure.
    Unauthorized(String),
    /// Invalid message context or malformed request.
    Validation(String),
    /// The conversation does not exist.
    ConversationNotFound(String),
    /// Another writer took the sequence number; the turn may be retried.
    SequenceConflict(String),
    /// The upstream call failed after the user message was saved.
    Upstream {
        message: String,
        sequence_number: u32,
        retryable: bool,
    },
    /// No upstream credentials are configured; nothing was saved.
    UpstreamNotConfigured(String),
    /// Storage failed before anything was saved.
    Persistence(String),
    /// The reply arrived but could not be saved.
    ReplyNotSaved { message: String, reply: String },
    /// Generic internal error.
    Internal(String),
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::Validation(e) => AppError::Validation(e.to_string()),
            TurnError::ConversationNotFound(id) => {
                AppError::ConversationNotFound(format!("Conversation {id} not found"))
            }
            TurnError::Conflict(msg) => AppError::SequenceConflict(msg),
            TurnError::Persistence(e) => AppError::Persistence(e.to_string()),
            TurnError::Upstream {
                user_sequence,
                source,
            } => AppError::Upstream {
                message: source.to_string(),
                sequence_number: user_sequence,
                retryable: source.is_retryable(),
            },
            TurnError::ReplyNotSaved { reply, source } => AppError::ReplyNotSaved {
                message: source.to_string(),
                reply,
            },
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => {
                AppError::ConversationNotFound("Conversation not found".to_string())
            }
            RepositoryError::Conflict(msg) => AppError::SequenceConflict(msg),
            other => AppError::Persistence(other.to_string()),
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
        match self {
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::ConversationNotFound(msg) => {
                (StatusCode::NOT_FOUND, "CONVERSATION_NOT_FOUND", msg.clone(), None)
            }
            AppError::SequenceConflict(msg) => {
                (StatusCode::CONFLICT, "SEQUENCE_CONFLICT", msg.clone(), None)
            }
            AppError::Upstream {
                message,
                sequence_number,
                retryable,
            } => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                message.clone(),
                Some(json!({
                    "user_message_saved": true,
                    "sequence_number": sequence_number,
                    "retryable": retryable,
                })),
            ),
            AppError::UpstreamNotConfigured(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UPSTREAM_NOT_CONFIGURED",
                msg.clone(),
                Some(json!({ "user_message_saved": false })),
            ),
            AppError::Persistence(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR", msg.clone(), None)
            }
            AppError::ReplyNotSaved { message, reply } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "REPLY_NOT_SAVED",
                message.clone(),
                Some(json!({ "user_message_saved": true, "reply": reply })),
            ),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone(), None)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        if status.is_server_error() {
            tracing::error!(code, %message, "Request failed");
        }

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [error]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playdo_types::llm::UpstreamError;
    use playdo_types::message::ValidationError;

    #[test]
    fn test_turn_error_status_mapping() {
        let cases = [
            (TurnError::Validation(ValidationError::UnpairedOutput), StatusCode::BAD_REQUEST),
            (
                TurnError::ConversationNotFound(playdo_types::conversation::ConversationId::new()),
                StatusCode::NOT_FOUND,
            ),
            (TurnError::Conflict("taken".into()), StatusCode::CONFLICT),
            (
                TurnError::Persistence(RepositoryError::Connection),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                TurnError::Upstream {
                    user_sequence: 4,
                    source: UpstreamError::Timeout(std::time::Duration::from_secs(120)),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                TurnError::ReplyNotSaved {
                    reply: "hi".into(),
                    source: RepositoryError::Query("disk full".into()),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, _, _, _) = AppError::from(err).parts();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_upstream_details_report_saved_sequence() {
        let err = AppError::from(TurnError::Upstream {
            user_sequence: 6,
            source: UpstreamError::Overloaded("busy".into()),
        });
        let (_, code, _, details) = err.parts();
        assert_eq!(code, "UPSTREAM_ERROR");
        let details = details.unwrap();
        assert_eq!(details["user_message_saved"], true);
        assert_eq!(details["sequence_number"], 6);
        assert_eq!(details["retryable"], true);
    }

    #[test]
    fn test_reply_not_saved_carries_reply_text() {
        let err = AppError::from(TurnError::ReplyNotSaved {
            reply: "Look at line 2.".into(),
            source: RepositoryError::Query("disk full".into()),
        });
        let (_, code, _, details) = err.parts();
        assert_eq!(code, "REPLY_NOT_SAVED");
        assert_eq!(details.unwrap()["reply"], "Look at line 2.");
    }
}
