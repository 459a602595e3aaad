use crate::{
    ApiVersion, AppState,
    auth::{self, AuthUser},
    error::ApiError,
    extract::ValidatedJson,
    models::{
        self, AuthResponse, Collection, CollectionResponse, CreateCollectionRequest,
        CreateItemRequest, Item, ItemResponse, LoginRequest, MessageResponse, RegisterRequest,
        UpdateCollectionRequest, UpdateItemRequest, UpdateUserRoleRequest, UploadResponse, User,
        UserResponse, parse_object_id, to_bson_document,
    },
};
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use bson::oid::ObjectId;
use chrono::Utc;
use uuid::Uuid;

// --- User / Auth Handlers ---

/// register
///
/// [Public Route] Creates a new user account with the default "user" role.
///
/// *Flow*: Rejects a duplicate email with 409, hashes the password with bcrypt,
/// persists the record, then signs a token pair. The refresh token is stored
/// server-side and set as an httpOnly cookie.
#[utoipa::path(
    post,
    path = "/api/registration",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = AuthResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    if state.repo.get_user_by_email(&payload.email).await.is_some() {
        return Err(ApiError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {}", e)))?;

    let user = User {
        id: ObjectId::new(),
        email: payload.email,
        password: hash,
        role: "user".to_string(),
        created_at: Utc::now(),
    };

    let created = state
        .repo
        .create_user(user)
        .await
        .ok_or_else(|| ApiError::Internal("failed to create user".to_string()))?;

    let pair = auth::issue_token_pair(&state.config, &created.id)?;
    state
        .repo
        .save_refresh_token(created.id, &pair.refresh_token)
        .await;

    let jar = jar.add(auth::refresh_cookie(pair.refresh_token.clone()));

    Ok((
        jar,
        Json(AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: UserResponse::from(created),
        }),
    ))
}

/// login
///
/// [Public Route] Exchanges email/password credentials for a token pair.
///
/// *Note*: Unknown email and wrong password produce the same 401 message, so
/// the endpoint does not reveal which accounts exist.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let verified = bcrypt::verify(&payload.password, &user.password)
        .map_err(|e| ApiError::Internal(format!("failed to verify password: {}", e)))?;
    if !verified {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let pair = auth::issue_token_pair(&state.config, &user.id)?;
    state
        .repo
        .save_refresh_token(user.id, &pair.refresh_token)
        .await;

    let jar = jar.add(auth::refresh_cookie(pair.refresh_token.clone()));

    Ok((
        jar,
        Json(AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: UserResponse::from(user),
        }),
    ))
}

/// logout
///
/// [Public Route] Revokes the stored refresh token named by the cookie and
/// clears the cookie. Succeeds even when no cookie is present.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    if let Some(cookie) = jar.get(auth::REFRESH_COOKIE) {
        state.repo.delete_refresh_token(cookie.value()).await;
    }

    let jar = jar.add(auth::clear_refresh_cookie());

    Ok((
        jar,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}

/// refresh
///
/// [Public Route] Rotates the token pair using the refresh cookie.
///
/// *Flow*: The cookie token must carry a valid signature AND still exist in the
/// store; a token deleted by logout is rejected even before its expiry. On
/// success a fresh pair is issued and the stored token is replaced.
#[utoipa::path(
    get,
    path = "/api/refresh",
    responses(
        (status = 200, description = "Refreshed", body = AuthResponse),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let token = jar
        .get(auth::REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized("User is not authorized".to_string()))?;

    let claims = auth::decode_refresh_token(&state.config, &token)?;

    state
        .repo
        .find_refresh_token(&token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("User is not authorized".to_string()))?;

    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("User is not authorized".to_string()))?;

    let user = state
        .repo
        .get_user(user_id)
        .await
        .ok_or_else(|| ApiError::Unauthorized("User is not authorized".to_string()))?;

    let pair = auth::issue_token_pair(&state.config, &user.id)?;
    state
        .repo
        .save_refresh_token(user.id, &pair.refresh_token)
        .await;

    let jar = jar.add(auth::refresh_cookie(pair.refresh_token.clone()));

    Ok((
        jar,
        Json(AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: UserResponse::from(user),
        }),
    ))
}

// --- Admin Handlers ---

/// get_users
///
/// [Admin Route] Lists every user account.
///
/// *Authorization*: Explicitly checks that the `role` resolved by `AuthUser` is "admin".
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_users(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    if role != "admin" {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    let users = state.repo.get_users().await;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// update_user_role
///
/// [Admin Route] Changes the role tag on a user record.
///
/// *Authorization*: Explicitly checks that the caller's `role` is "admin". The
/// target role is restricted to the two known tags.
#[utoipa::path(
    post,
    path = "/api/updateUserRole",
    request_body = UpdateUserRoleRequest,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_role(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if role != "admin" {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    if payload.role != "user" && payload.role != "admin" {
        return Err(ApiError::BadRequest("Invalid role".to_string()));
    }

    let user_id = parse_object_id(&payload.user_id)?;
    let updated = state
        .repo
        .update_user_role(user_id, &payload.role)
        .await
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(updated)))
}

/// delete_user
///
/// [Admin Route] Removes a user account.
///
/// *Authorization*: Explicitly checks that the caller's `role` is "admin".
#[utoipa::path(
    delete,
    path = "/api/deleteUser/{userId}",
    params(("userId" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if role != "admin" {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    let user_id = parse_object_id(&user_id)?;
    if state.repo.delete_user(user_id).await {
        Ok(Json(MessageResponse {
            message: "User deleted".to_string(),
        }))
    } else {
        Err(ApiError::NotFound("User not found".to_string()))
    }
}

// --- Collection Handlers ---

/// create_collection
///
/// [Authenticated Route] Creates a collection record from a validated payload.
/// The owner reference comes from the payload, not the session, so admins can
/// create collections on behalf of other users.
#[utoipa::path(
    post,
    path = "/api/collections",
    request_body = CreateCollectionRequest,
    responses(
        (status = 201, description = "Created", body = CollectionResponse),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_collection(
    _auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateCollectionRequest>,
) -> Result<(StatusCode, Json<CollectionResponse>), ApiError> {
    // Validation already constrained the category to the known set.
    let category = models::CollectionCategory::parse(&payload.category)
        .ok_or_else(|| ApiError::BadRequest("Invalid category".to_string()))?;
    let owner = parse_object_id(&payload.owner)?;
    let fields = to_bson_document(&payload.fields)?;

    let collection = Collection {
        id: ObjectId::new(),
        name: payload.name,
        description: payload.description,
        category,
        fields,
        owner,
        image_url: payload.image_url,
        created_at: Utc::now(),
    };

    let created = state
        .repo
        .create_collection(collection)
        .await
        .ok_or_else(|| ApiError::Internal("failed to create collection".to_string()))?;

    Ok((StatusCode::CREATED, Json(CollectionResponse::from(created))))
}

/// get_collection
///
/// [Authenticated Route] Retrieves a single collection by its identifier.
#[utoipa::path(
    get,
    path = "/api/collections/{collectionId}",
    params(("collectionId" = String, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Found", body = CollectionResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_collection(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
) -> Result<Json<CollectionResponse>, ApiError> {
    let id = parse_object_id(&collection_id)?;
    match state.repo.get_collection(id).await {
        Some(collection) => Ok(Json(CollectionResponse::from(collection))),
        None => Err(ApiError::NotFound("Collection not found".to_string())),
    }
}

/// update_collection
///
/// [Authenticated Route] Applies a partial update to a collection. Only fields
/// present in the payload are written; category and fields values are checked
/// before they reach the store.
#[utoipa::path(
    put,
    path = "/api/collections/{collectionId}",
    params(("collectionId" = String, Path, description = "Collection ID")),
    request_body = UpdateCollectionRequest,
    responses(
        (status = 200, description = "Updated", body = CollectionResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_collection(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Json(payload): Json<UpdateCollectionRequest>,
) -> Result<Json<CollectionResponse>, ApiError> {
    let id = parse_object_id(&collection_id)?;

    if let Some(category) = &payload.category {
        if models::CollectionCategory::parse(category).is_none() {
            return Err(ApiError::BadRequest("Invalid category".to_string()));
        }
    }
    if let Some(fields) = &payload.fields {
        if !fields.as_object().is_some_and(|map| !map.is_empty()) {
            return Err(ApiError::BadRequest("Invalid value".to_string()));
        }
    }

    match state.repo.update_collection(id, payload).await {
        Some(collection) => Ok(Json(CollectionResponse::from(collection))),
        None => Err(ApiError::NotFound("Collection not found".to_string())),
    }
}

/// delete_collection
///
/// [Authenticated Route] Removes a collection record. Items referencing it are
/// left in place; they become unreachable through collection routes.
#[utoipa::path(
    delete,
    path = "/api/collections/{collectionId}",
    params(("collectionId" = String, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_collection(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_object_id(&collection_id)?;
    if state.repo.delete_collection(id).await {
        Ok(Json(MessageResponse {
            message: "Collection deleted".to_string(),
        }))
    } else {
        Err(ApiError::NotFound("Collection not found".to_string()))
    }
}

/// get_largest_collections
///
/// [Public Route] Retrieves the collections holding the most items, annotated
/// with their item counts. The limit (5) is hardcoded in the repository call.
#[utoipa::path(
    get,
    path = "/api/collections/largest",
    responses((status = 200, description = "Largest collections", body = [CollectionResponse]))
)]
pub async fn get_largest_collections(
    State(state): State<AppState>,
) -> Json<Vec<CollectionResponse>> {
    let collections = state.repo.get_largest_collections(5).await;
    Json(
        collections
            .into_iter()
            .map(CollectionResponse::from)
            .collect(),
    )
}

/// get_my_collections
///
/// [Authenticated Route] Lists all collections owned by the user named in the
/// path.
#[utoipa::path(
    get,
    path = "/api/collections/my/{userId}",
    params(("userId" = String, Path, description = "Owner user ID")),
    responses((status = 200, description = "Owned collections", body = [CollectionResponse]))
)]
pub async fn get_my_collections(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<CollectionResponse>>, ApiError> {
    let owner = parse_object_id(&user_id)?;
    let collections = state.repo.get_collections_by_owner(owner).await;
    Ok(Json(
        collections
            .into_iter()
            .map(CollectionResponse::from)
            .collect(),
    ))
}

// --- Upload Handler ---

/// upload_image
///
/// [Authenticated Route] Accepts a multipart form with an `imageUrl` file part,
/// persists it under a unique name and returns the public path.
///
/// *Note*: The mounted API version decides the subdirectory, so v1 and v2
/// uploads never collide.
#[utoipa::path(
    post,
    path = "/api/upload",
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "No file part in the form")
    )
)]
pub async fn upload_image(
    _auth: AuthUser,
    State(state): State<AppState>,
    Extension(version): Extension<ApiVersion>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart payload".to_string()))?
    {
        if field.name() != Some("imageUrl") {
            continue;
        }

        // Derive the extension from the client file name, defaulting to 'bin'.
        let extension = field
            .file_name()
            .map(std::path::Path::new)
            .and_then(|p| p.extension())
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("bin")
            .to_string();
        let filename = format!("{}.{}", Uuid::new_v4(), extension);

        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("Invalid multipart payload".to_string()))?;

        let image_url = state
            .storage
            .save_upload(version.subdir(), &filename, &bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to store upload: {}", e)))?;

        return Ok(Json(UploadResponse { image_url }));
    }

    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

// --- Item Handlers ---

/// create_item
///
/// [Authenticated Route] Creates an item inside an existing collection.
///
/// *Flow*: The referenced collection must exist; the item's dynamic attributes
/// are stored as-is and are expected to follow that collection's field schema.
#[utoipa::path(
    post,
    path = "/api/collections/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Created", body = ItemResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Referenced collection not found")
    )
)]
pub async fn create_item(
    _auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let collection_ref = parse_object_id(&payload.collection_ref)?;

    state
        .repo
        .get_collection(collection_ref)
        .await
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    let dynamic_fields = to_bson_document(&payload.dynamic_fields)?;

    let item = Item {
        id: ObjectId::new(),
        name: payload.name,
        collection_ref,
        dynamic_fields,
        created_at: Utc::now(),
    };

    let created = state
        .repo
        .create_item(item)
        .await
        .ok_or_else(|| ApiError::Internal("failed to create item".to_string()))?;

    Ok((StatusCode::CREATED, Json(ItemResponse::from(created))))
}

/// update_item
///
/// [Authenticated Route] Applies a partial update to an item.
#[utoipa::path(
    put,
    path = "/api/collections/items/{itemId}",
    params(("itemId" = String, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated", body = ItemResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_item(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let id = parse_object_id(&item_id)?;

    if let Some(dynamic_fields) = &payload.dynamic_fields {
        if !dynamic_fields.as_object().is_some_and(|map| !map.is_empty()) {
            return Err(ApiError::BadRequest("Invalid value".to_string()));
        }
    }

    match state.repo.update_item(id, payload).await {
        Some(item) => Ok(Json(ItemResponse::from(item))),
        None => Err(ApiError::NotFound("Item not found".to_string())),
    }
}

/// delete_item
///
/// [Authenticated Route] Removes an item record.
#[utoipa::path(
    delete,
    path = "/api/collections/items/{itemId}",
    params(("itemId" = String, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_item(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_object_id(&item_id)?;
    if state.repo.delete_item(id).await {
        Ok(Json(MessageResponse {
            message: "Item deleted".to_string(),
        }))
    } else {
        Err(ApiError::NotFound("Item not found".to_string()))
    }
}

/// get_items_in_collection
///
/// [Authenticated Route] Lists every item referencing the given collection.
/// An unknown collection yields an empty list rather than a 404.
#[utoipa::path(
    get,
    path = "/api/collections/{collectionId}/items",
    params(("collectionId" = String, Path, description = "Collection ID")),
    responses((status = 200, description = "Items", body = [ItemResponse]))
)]
pub async fn get_items_in_collection(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let id = parse_object_id(&collection_id)?;
    let items = state.repo.get_items_in_collection(id).await;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// get_item
///
/// [Authenticated Route] Retrieves a single item by its identifier.
#[utoipa::path(
    get,
    path = "/api/collections/items/{itemId}",
    params(("itemId" = String, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Found", body = ItemResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_item(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let id = parse_object_id(&item_id)?;
    match state.repo.get_item(id).await {
        Some(item) => Ok(Json(ItemResponse::from(item))),
        None => Err(ApiError::NotFound("Item not found".to_string())),
    }
}

/// get_latest_items
///
/// [Public Route] Retrieves the most recently created items across all
/// collections. The limit (10) is hardcoded in the repository call.
#[utoipa::path(
    get,
    path = "/api/items/latest",
    responses((status = 200, description = "Latest items", body = [ItemResponse]))
)]
pub async fn get_latest_items(State(state): State<AppState>) -> Json<Vec<ItemResponse>> {
    let items = state.repo.get_latest_items(10).await;
    Json(items.into_iter().map(ItemResponse::from).collect())
}

// --- Service Handlers ---

/// welcome
///
/// [Public Route] Plain greeting at the root path.
pub async fn welcome() -> &'static str {
    "WELCOME"
}

/// health_check
///
/// [Public Route] Liveness probe for deployment tooling.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
