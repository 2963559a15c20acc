pub mod friends;
pub mod groups;
pub mod health;
pub mod login;
pub mod root;
pub mod two_factor;

use axum::{response::IntoResponse, Json};

// axum handler for the generated OpenAPI document
pub async fn openapi_json() -> impl IntoResponse {
    Json(super::openapi())
}
