use bson::Document;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::ApiError;

// --- Core Application Schemas (Mapped to the Document Store) ---

/// User
///
/// Canonical identity record stored in the `users` collection. The password is
/// kept as a bcrypt hash and never leaves the store layer; outward responses go
/// through [`UserResponse`], which carries no credential material at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    // The user's primary identifier.
    pub email: String,
    pub password: String,
    // The RBAC field: 'user' or 'admin'.
    pub role: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Collection
///
/// A user-owned grouping of items stored in the `collections` collection. The
/// `fields` document describes the attribute schema that items in this
/// collection are expected to follow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    pub category: CollectionCategory,
    // Free-form schema for the dynamic attributes of this collection's items.
    pub fields: Document,
    // Reference to the owning user record.
    pub owner: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// CollectionCategory
///
/// The closed set of categories a collection may belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum CollectionCategory {
    Books,
    Signs,
    Silverware,
    Paintings,
}

impl CollectionCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Books" => Some(CollectionCategory::Books),
            "Signs" => Some(CollectionCategory::Signs),
            "Silverware" => Some(CollectionCategory::Silverware),
            "Paintings" => Some(CollectionCategory::Paintings),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionCategory::Books => "Books",
            CollectionCategory::Signs => "Signs",
            CollectionCategory::Silverware => "Silverware",
            CollectionCategory::Paintings => "Paintings",
        }
    }
}

/// Item
///
/// A record belonging to exactly one collection, stored in the `items`
/// collection. Its dynamic attributes follow the owning collection's `fields`
/// schema, though the store itself does not enforce that shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub collection_ref: ObjectId,
    pub dynamic_fields: Document,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// CollectionWithCount
///
/// Aggregation output shape for the "largest collections" query: a collection
/// record annotated with the number of items referencing it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionWithCount {
    #[serde(flatten)]
    pub collection: Collection,
    pub item_count: i64,
}

/// RefreshToken
///
/// One persisted refresh token per user, stored in the `tokens` collection.
/// Logging in or refreshing replaces the stored token; logging out removes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub refresh_token: String,
}

// --- API Payload Schemas (Inbound) ---

/// Registration payload. Field messages mirror what the frontend displays
/// under each input.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 150))]
    pub password: String,
}

/// Login payload. Credential checks happen against the store, not here, so the
/// payload carries no validation rules.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Collection creation payload.
///
/// `fields` is the free-form schema for item attributes; it must be a
/// non-empty JSON object. `owner` is the hex identifier of the owning user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCollectionRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    #[validate(custom(function = validate_category))]
    pub category: String,
    #[serde(default)]
    #[validate(custom(function = validate_dynamic_object))]
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub fields: serde_json::Value,
    #[serde(default)]
    #[validate(custom(function = validate_owner))]
    pub owner: String,
    pub image_url: Option<String>,
}

/// Collection update payload. Every field is optional; only the fields present
/// are written back to the store.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateCollectionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[ts(type = "Record<string, unknown> | null")]
    #[schema(value_type = Object)]
    pub fields: Option<serde_json::Value>,
    pub image_url: Option<String>,
}

/// Item creation payload. `collection_ref` must be the exact 24-character hex
/// identifier of the owning collection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateItemRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = validate_collection_ref))]
    pub collection_ref: String,
    #[serde(default)]
    #[validate(custom(function = validate_dynamic_object))]
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub dynamic_fields: serde_json::Value,
}

/// Item update payload. Every field is optional; only the fields present are
/// written back to the store.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    #[ts(type = "Record<string, unknown> | null")]
    #[schema(value_type = Object)]
    pub dynamic_fields: Option<serde_json::Value>,
}

/// Role change payload for the admin user-management endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateUserRoleRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub role: String,
}

fn validate_category(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Category is required".into());
        return Err(err);
    }
    if CollectionCategory::parse(raw).is_none() {
        let mut err = ValidationError::new("invalid");
        err.message = Some("Invalid category".into());
        return Err(err);
    }
    Ok(())
}

fn validate_owner(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Owner is required".into());
        return Err(err);
    }
    if raw.chars().count() < 24 {
        let mut err = ValidationError::new("invalid");
        err.message = Some("Invalid input".into());
        return Err(err);
    }
    Ok(())
}

fn validate_collection_ref(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Collection reference is required".into());
        return Err(err);
    }
    if raw.chars().count() != 24 {
        let mut err = ValidationError::new("invalid");
        err.message = Some("Invalid collection reference".into());
        return Err(err);
    }
    Ok(())
}

// Dynamic attribute payloads must be non-empty JSON objects. The default
// "Invalid value" wording comes from the error layer when no message is set.
fn validate_dynamic_object(value: &serde_json::Value) -> Result<(), ValidationError> {
    match value.as_object() {
        Some(map) if !map.is_empty() => Ok(()),
        _ => Err(ValidationError::new("invalid")),
    }
}

// --- API Response Schemas (Outbound) ---

/// UserResponse
///
/// The outward projection of a user record. Identifiers are rendered as hex
/// strings and the password hash is never included.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.to_hex(),
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// CollectionResponse
///
/// The outward projection of a collection record. `item_count` is only present
/// on aggregation results that computed it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CollectionResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: CollectionCategory,
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub fields: serde_json::Value,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<Collection> for CollectionResponse {
    fn from(collection: Collection) -> Self {
        CollectionResponse {
            id: collection.id.to_hex(),
            name: collection.name,
            description: collection.description,
            category: collection.category,
            fields: bson::Bson::Document(collection.fields).into_relaxed_extjson(),
            owner: collection.owner.to_hex(),
            image_url: collection.image_url,
            item_count: None,
            created_at: collection.created_at,
        }
    }
}

impl From<CollectionWithCount> for CollectionResponse {
    fn from(with_count: CollectionWithCount) -> Self {
        let mut response = CollectionResponse::from(with_count.collection);
        response.item_count = Some(with_count.item_count);
        response
    }
}

/// ItemResponse
///
/// The outward projection of an item record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    pub collection_ref: String,
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub dynamic_fields: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        ItemResponse {
            id: item.id.to_hex(),
            name: item.name,
            collection_ref: item.collection_ref.to_hex(),
            dynamic_fields: bson::Bson::Document(item.dynamic_fields).into_relaxed_extjson(),
            created_at: item.created_at,
        }
    }
}

/// AuthResponse
///
/// Returned by registration, login and refresh. The refresh token is also set
/// as an httpOnly cookie; it is included in the body for non-browser clients.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

/// UploadResponse
///
/// Returned by the image upload endpoint: the public URL the stored file is
/// served under.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadResponse {
    pub image_url: String,
}

/// Plain acknowledgement body for endpoints with nothing else to return.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

// --- Conversion Helpers ---

/// Parses a path or payload identifier into an [`ObjectId`], mapping malformed
/// input to a 400 instead of surfacing a driver cast failure.
pub fn parse_object_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid identifier".to_string()))
}

/// Converts a validated JSON object into a store document.
pub fn to_bson_document(value: &serde_json::Value) -> Result<Document, ApiError> {
    bson::to_document(value).map_err(|_| ApiError::BadRequest("Invalid value".to_string()))
}
