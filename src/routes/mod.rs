/// Router Module Index
///
/// Organizes the application's routing logic into entity modules, each split
/// into a public and a protected router. The split keeps access control
/// explicit at the module level (via Axum layers), preventing accidental
/// exposure of protected endpoints.
///
/// The same modules are mounted under both `/api` and `/api/v2`; the mounted
/// version travels with the request as an extension.

/// Account lifecycle, session routes and admin user management.
pub mod users;

/// Collection CRUD, the ranking query and the image upload endpoint.
pub mod collections;

/// Item CRUD and the latest-items listing.
pub mod items;
