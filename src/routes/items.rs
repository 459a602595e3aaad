use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Item Router Module (public half)
///
/// The latest-items listing is the only item read exposed to anonymous clients.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /items/latest
        // Retrieves the most recently created items across all collections.
        .route("/items/latest", get(handlers::get_latest_items))
}

/// Item Router Module (protected half)
///
/// Item CRUD nested under the collection path space. The static 'items'
/// segment takes priority over the {collectionId} capture, so these routes
/// coexist with the collection detail routes.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // POST /collections/items
        // Creates an item from a validated payload. The referenced collection
        // must exist.
        .route("/collections/items", post(handlers::create_item))
        // GET/PUT/DELETE /collections/items/{itemId}
        // Retrieves, partially updates or removes a single item.
        .route(
            "/collections/items/{itemId}",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        // GET /collections/{collectionId}/items
        // Lists every item referencing the given collection.
        .route(
            "/collections/{collectionId}/items",
            get(handlers::get_items_in_collection),
        )
}
