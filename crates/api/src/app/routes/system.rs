use axum::http::StatusCode;

pub async fn root() -> &'static str {
    "SprintSpace server is running"
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
