use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Collection Router Module (public half)
///
/// The ranking query is the only collection read exposed to anonymous clients.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /collections/largest
        // Retrieves the collections holding the most items, with counts.
        // The static segment takes priority over the {collectionId} capture.
        .route("/collections/largest", get(handlers::get_largest_collections))
}

/// Collection Router Module (protected half)
///
/// Collection CRUD plus the image upload endpoint. Every route requires an
/// authenticated session; ownership is carried in the records themselves and
/// is not re-checked here.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // POST /collections
        // Creates a collection from a validated payload.
        .route("/collections", post(handlers::create_collection))
        // GET/PUT/DELETE /collections/{collectionId}
        // Retrieves, partially updates or removes a single collection.
        .route(
            "/collections/{collectionId}",
            get(handlers::get_collection)
                .put(handlers::update_collection)
                .delete(handlers::delete_collection),
        )
        // GET /collections/my/{userId}
        // Lists the collections owned by the user named in the path.
        .route("/collections/my/{userId}", get(handlers::get_my_collections))
        // POST /upload
        // Accepts a multipart form with an 'imageUrl' file part and stores it
        // under the mounted version's upload subdirectory.
        .route("/upload", post(handlers::upload_image))
}
