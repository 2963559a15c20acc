use utoipa::OpenApi;

use super::handlers::{friends, groups, health, login, root, two_factor};

#[derive(OpenApi)]
#[openapi(
    info(title = "vrcrelay", description = "VRChat session relay"),
    paths(
        root::dashboard,
        login::login_form,
        login::authenticate,
        two_factor::challenge_form,
        two_factor::verify,
        friends::friends,
        groups::groups,
        health::health,
    ),
    components(schemas(login::LoginForm, two_factor::VerifyForm, health::Health)),
    tags(
        (name = "auth", description = "Login and two-factor challenge"),
        (name = "views", description = "Pages rendered from upstream data"),
        (name = "health", description = "Service health"),
    )
)]
struct ApiDoc;

/// The relay's OpenAPI document.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
