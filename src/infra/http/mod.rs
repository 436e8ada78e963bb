mod admin;
mod middleware;
mod public;
mod views;

pub use admin::{
    AdminState, AuthorCreateRequest, CategoryCreateRequest, CategoryUpdateRequest,
    ContentCreateRequest, ContentUpdateRequest, build_admin_router,
};
pub use middleware::RequestContext;
pub use public::{HttpState, build_router};
pub use views::{AuthorView, CategoryView, ContentView, ListView};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

/// 204 when the datastore answers, 503 with the failure attached otherwise.
fn health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
