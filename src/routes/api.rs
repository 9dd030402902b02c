use crate::{
    handlers::{
        create_room, diagnostics, get_document, get_room, health_check, join_room, login, my_rooms, put_document,
        ready_check, register, user_rooms,
    },
    routes::auth_middleware::auth_middleware,
    state::AppState,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router {
    let protected = Router::<AppState>::new()
        .route("/v1/diagnostics", get(diagnostics))
        .route("/rooms", post(create_room))
        .route("/rooms/my-rooms", get(my_rooms))
        .route("/rooms/user/:user_id", get(user_rooms))
        .route("/rooms/:room_id/join", post(join_room))
        .route("/documents/:room_id", get(get_document).put(put_document))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)); // Applies to all routes added above

    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/rooms/:room_id", get(get_room))
        .merge(protected)
        .with_state(state)
}
