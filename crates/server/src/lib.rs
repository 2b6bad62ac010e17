use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, ErrorKind};

use serde::Serialize;
pub use server::{router, run, run_with_listener};

mod convert;
mod expenses;
mod scores;
mod server;
mod shares;
mod splits;
mod user;

pub mod types {
    pub mod expense {
        pub use api_types::expense::{
            ExpenseAnnotations, ExpenseCreated, ExpenseList, ExpenseListResponse, ExpenseNew,
            ExpenseView,
        };
    }

    pub mod split {
        pub use api_types::split::{
            SettlementEvent, SettlementStatus, SettlementView, SplitCorrection, SplitNew,
            SplitPolicy, SplitView,
        };
    }

    pub mod share {
        pub use api_types::share::{
            PaymentNew, PaymentRecorded, PaymentView, ShareDetailResponse, ShareStatus, ShareView,
        };
    }

    pub mod score {
        pub use api_types::score::{
            ScoreEntryKind, ScoreEntryView, ScoreHistoryResponse, ScoreOverride,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::TransientStore => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
