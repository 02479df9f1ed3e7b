use axum::{
    Router,
    routing::{get, post, put},
};

pub mod common;
pub mod events;
pub mod registrations;
pub mod session;
pub mod system;

/// Routes reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/jwt", post(session::issue_token))
        .route("/login", post(session::login))
        .route("/logout", post(session::logout))
        .merge(events::public_router())
}

/// Routes behind the auth guard.
pub fn protected_router() -> Router {
    Router::new()
        .merge(events::protected_router())
        .route(
            "/registrations",
            get(registrations::list_registrations).post(registrations::create_registration),
        )
        .route("/registrations/search", get(registrations::search_registrations))
        .route(
            "/registrations/:id",
            put(registrations::update_registration)
                .get(registrations::get_registration)
                .delete(registrations::delete_registration),
        )
}
