//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use event_store::EventStoreError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order validation or lifecycle error.
    Order(OrderError),
    /// Saga execution error.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Order(err) => order_error_to_response(&err),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn order_error_to_response(err: &OrderError) -> (StatusCode, String) {
    match err {
        OrderError::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
        OrderError::CustomerIdRequired
        | OrderError::NoItems
        | OrderError::InvalidQuantity { .. }
        | OrderError::InvalidPrice { .. }
        | OrderError::AmountOverflow => (StatusCode::BAD_REQUEST, err.to_string()),
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    match &err {
        SagaError::SagaNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        SagaError::InvalidSagaId(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        SagaError::AlreadyStarted(_)
        | SagaError::InvalidState { .. }
        | SagaError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        SagaError::Order(order_err) => order_error_to_response(order_err),
        _ => {
            tracing::error!(error = %err, "internal server error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_validation_errors_are_bad_requests() {
        assert_eq!(status_of(OrderError::NoItems.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(OrderError::CustomerIdRequired.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(OrderError::AmountOverflow.into()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_saga_errors() {
        assert_eq!(
            status_of(SagaError::SagaNotFound("order-saga-x".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(SagaError::AlreadyStarted(OrderId::new()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SagaError::InvalidSagaId("nope".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(SagaError::Interrupted("order-saga-x".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
