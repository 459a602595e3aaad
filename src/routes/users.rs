use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// User Router Module (public half)
///
/// Defines the account lifecycle endpoints that must be reachable without a
/// session: registration, login, logout and token refresh. Logout and refresh
/// identify the session through the refresh cookie rather than a Bearer token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /registration
        // Creates an account with the default 'user' role. The payload is
        // validated; a duplicate email is rejected with 409.
        .route("/registration", post(handlers::register))
        // POST /login
        // Exchanges credentials for a token pair and sets the refresh cookie.
        .route("/login", post(handlers::login))
        // POST /logout
        // Revokes the stored refresh token and clears the cookie.
        .route("/logout", post(handlers::logout))
        // GET /refresh
        // Rotates the token pair using the refresh cookie. The token must still
        // exist in the store, so logged-out sessions cannot refresh.
        .route("/refresh", get(handlers::refresh))
}

/// User Router Module (protected half)
///
/// Administrative user management. Every handler here re-checks the resolved
/// role and rejects non-admin callers with 403, on top of the authentication
/// layer wrapped around this router.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // GET /users
        // Lists every user account. Admin only.
        .route("/users", get(handlers::get_users))
        // POST /updateUserRole
        // Changes the role tag on a user record. Admin only.
        .route("/updateUserRole", post(handlers::update_user_role))
        // DELETE /deleteUser/{userId}
        // Removes a user account. Admin only.
        .route("/deleteUser/{userId}", delete(handlers::delete_user))
}
