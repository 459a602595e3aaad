use crate::models::{
    Collection, CollectionWithCount, Item, RefreshToken, UpdateCollectionRequest,
    UpdateItemRequest, User,
};
use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::options::ReturnDocument;
use std::sync::Arc;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core
/// of the Repository Abstraction pattern, allowing the handlers to interact with
/// the data layer without knowing the specific implementation (MongoDB, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// safely shareable and usable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users / Auth ---
    async fn get_users(&self) -> Vec<User>;
    async fn get_user(&self, id: ObjectId) -> Option<User>;
    // Credential lookup during login and duplicate check during registration.
    async fn get_user_by_email(&self, email: &str) -> Option<User>;
    async fn create_user(&self, user: User) -> Option<User>;
    // Admin action: changes the role tag on a user record.
    async fn update_user_role(&self, id: ObjectId, role: &str) -> Option<User>;
    async fn delete_user(&self, id: ObjectId) -> bool;

    // --- Refresh Tokens ---
    // One stored token per user: saving replaces any previous token.
    async fn save_refresh_token(&self, user_id: ObjectId, token: &str) -> bool;
    async fn find_refresh_token(&self, token: &str) -> Option<RefreshToken>;
    async fn delete_refresh_token(&self, token: &str) -> bool;

    // --- Collections ---
    async fn create_collection(&self, collection: Collection) -> Option<Collection>;
    async fn get_collection(&self, id: ObjectId) -> Option<Collection>;
    // Partial update: only fields present in the request are written.
    async fn update_collection(
        &self,
        id: ObjectId,
        req: UpdateCollectionRequest,
    ) -> Option<Collection>;
    async fn delete_collection(&self, id: ObjectId) -> bool;
    async fn get_collections_by_owner(&self, owner: ObjectId) -> Vec<Collection>;
    // Retrieves collections ranked by item count.
    async fn get_largest_collections(&self, limit: i64) -> Vec<CollectionWithCount>;

    // --- Items ---
    async fn create_item(&self, item: Item) -> Option<Item>;
    async fn get_item(&self, id: ObjectId) -> Option<Item>;
    // Partial update: only fields present in the request are written.
    async fn update_item(&self, id: ObjectId, req: UpdateItemRequest) -> Option<Item>;
    async fn delete_item(&self, id: ObjectId) -> bool;
    async fn get_items_in_collection(&self, collection_id: ObjectId) -> Vec<Item>;
    // Retrieves the most recently created items across all collections.
    async fn get_latest_items(&self, limit: i64) -> Vec<Item>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Builds the `$set` document for a partial collection update. Fields absent
/// from the request are left untouched in the store. Values that cannot be
/// represented as BSON are skipped.
pub fn collection_update_document(req: &UpdateCollectionRequest) -> Document {
    let mut set = Document::new();
    if let Some(name) = &req.name {
        set.insert("name", name);
    }
    if let Some(description) = &req.description {
        set.insert("description", description);
    }
    if let Some(category) = &req.category {
        set.insert("category", category);
    }
    if let Some(fields) = &req.fields {
        if let Ok(bson) = bson::to_bson(fields) {
            set.insert("fields", bson);
        }
    }
    if let Some(image_url) = &req.image_url {
        set.insert("imageUrl", image_url);
    }
    set
}

/// Builds the `$set` document for a partial item update.
pub fn item_update_document(req: &UpdateItemRequest) -> Document {
    let mut set = Document::new();
    if let Some(name) = &req.name {
        set.insert("name", name);
    }
    if let Some(dynamic_fields) = &req.dynamic_fields {
        if let Ok(bson) = bson::to_bson(dynamic_fields) {
            set.insert("dynamicFields", bson);
        }
    }
    set
}

/// Builds the aggregation pipeline ranking collections by the number of items
/// referencing them. The joined item array is projected away so the output is
/// a collection document plus an `itemCount` field.
pub fn largest_collections_pipeline(limit: i64) -> Vec<Document> {
    vec![
        doc! { "$lookup": {
            "from": "items",
            "localField": "_id",
            "foreignField": "collectionRef",
            "as": "collectionItems",
        } },
        doc! { "$addFields": { "itemCount": { "$size": "$collectionItems" } } },
        doc! { "$project": { "collectionItems": 0 } },
        doc! { "$sort": { "itemCount": -1 } },
        doc! { "$limit": limit },
    ]
}

/// MongoRepository
///
/// The concrete implementation of the `Repository` trait, backed by the MongoDB database.
pub struct MongoRepository {
    db: Database,
}

impl MongoRepository {
    /// Creates a new repository instance using the connected database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn users(&self) -> mongodb::Collection<User> {
        self.db.collection("users")
    }

    fn collections(&self) -> mongodb::Collection<Collection> {
        self.db.collection("collections")
    }

    fn items(&self) -> mongodb::Collection<Item> {
        self.db.collection("items")
    }

    fn tokens(&self) -> mongodb::Collection<RefreshToken> {
        self.db.collection("tokens")
    }
}

#[async_trait]
impl Repository for MongoRepository {
    /// get_users
    ///
    /// Retrieves every user record. Only reachable through the admin listing handler.
    async fn get_users(&self) -> Vec<User> {
        let cursor = match self.users().find(doc! {}).sort(doc! { "createdAt": -1 }).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("get_users error: {:?}", e);
                return vec![];
            }
        };
        cursor.try_collect().await.unwrap_or_else(|e| {
            tracing::error!("get_users cursor error: {:?}", e);
            vec![]
        })
    }

    /// get_user
    ///
    /// Retrieves a user record by identifier. Used by the auth extractor on every
    /// authenticated request to resolve the current role.
    async fn get_user(&self, id: ObjectId) -> Option<User> {
        self.users()
            .find_one(doc! { "_id": id })
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    /// get_user_by_email
    ///
    /// Retrieves a user record by email address.
    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        self.users()
            .find_one(doc! { "email": email })
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user_by_email error: {:?}", e);
                None
            })
    }

    /// create_user
    ///
    /// Inserts a new user record. The caller is responsible for hashing the
    /// password and checking for a duplicate email beforehand.
    async fn create_user(&self, user: User) -> Option<User> {
        match self.users().insert_one(&user).await {
            Ok(_) => Some(user),
            Err(e) => {
                tracing::error!("create_user error: {:?}", e);
                None
            }
        }
    }

    /// update_user_role
    ///
    /// Sets the role tag on a user record, returning the updated record.
    async fn update_user_role(&self, id: ObjectId, role: &str) -> Option<User> {
        self.users()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": { "role": role } })
            .return_document(ReturnDocument::After)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_user_role error: {:?}", e);
                None
            })
    }

    /// delete_user
    ///
    /// Removes a user record. Returns true only if a record was deleted.
    async fn delete_user(&self, id: ObjectId) -> bool {
        match self.users().delete_one(doc! { "_id": id }).await {
            Ok(res) => res.deleted_count > 0,
            Err(e) => {
                tracing::error!("delete_user error: {:?}", e);
                false
            }
        }
    }

    // --- REFRESH TOKENS ---

    /// save_refresh_token
    ///
    /// Upserts the stored refresh token for a user. A user holds at most one
    /// stored token, so a new login invalidates the previous session's refresh.
    async fn save_refresh_token(&self, user_id: ObjectId, token: &str) -> bool {
        match self
            .tokens()
            .update_one(
                doc! { "user": user_id },
                doc! { "$set": { "refreshToken": token } },
            )
            .upsert(true)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("save_refresh_token error: {:?}", e);
                false
            }
        }
    }

    /// find_refresh_token
    ///
    /// Looks up a stored refresh token by its value. A token missing from the
    /// store is treated as revoked regardless of its signature.
    async fn find_refresh_token(&self, token: &str) -> Option<RefreshToken> {
        self.tokens()
            .find_one(doc! { "refreshToken": token })
            .await
            .unwrap_or_else(|e| {
                tracing::error!("find_refresh_token error: {:?}", e);
                None
            })
    }

    /// delete_refresh_token
    ///
    /// Removes a stored refresh token by its value. Returns true only if a
    /// record was deleted.
    async fn delete_refresh_token(&self, token: &str) -> bool {
        match self
            .tokens()
            .delete_one(doc! { "refreshToken": token })
            .await
        {
            Ok(res) => res.deleted_count > 0,
            Err(e) => {
                tracing::error!("delete_refresh_token error: {:?}", e);
                false
            }
        }
    }

    // --- COLLECTIONS ---

    /// create_collection
    ///
    /// Inserts a new collection record built by the handler.
    async fn create_collection(&self, collection: Collection) -> Option<Collection> {
        match self.collections().insert_one(&collection).await {
            Ok(_) => Some(collection),
            Err(e) => {
                tracing::error!("create_collection error: {:?}", e);
                None
            }
        }
    }

    /// get_collection
    ///
    /// Retrieves a collection record by identifier.
    async fn get_collection(&self, id: ObjectId) -> Option<Collection> {
        self.collections()
            .find_one(doc! { "_id": id })
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_collection error: {:?}", e);
                None
            })
    }

    /// update_collection
    ///
    /// Applies a partial update built from the fields present in the request,
    /// returning the updated record. An empty update degrades to a plain read
    /// because the store rejects an empty `$set`.
    async fn update_collection(
        &self,
        id: ObjectId,
        req: UpdateCollectionRequest,
    ) -> Option<Collection> {
        let set = collection_update_document(&req);
        if set.is_empty() {
            return self.get_collection(id).await;
        }
        self.collections()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_collection error: {:?}", e);
                None
            })
    }

    /// delete_collection
    ///
    /// Removes a collection record. Returns true only if a record was deleted.
    async fn delete_collection(&self, id: ObjectId) -> bool {
        match self.collections().delete_one(doc! { "_id": id }).await {
            Ok(res) => res.deleted_count > 0,
            Err(e) => {
                tracing::error!("delete_collection error: {:?}", e);
                false
            }
        }
    }

    /// get_collections_by_owner
    ///
    /// Retrieves all collections owned by the given user, newest first.
    async fn get_collections_by_owner(&self, owner: ObjectId) -> Vec<Collection> {
        let cursor = match self
            .collections()
            .find(doc! { "owner": owner })
            .sort(doc! { "createdAt": -1 })
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("get_collections_by_owner error: {:?}", e);
                return vec![];
            }
        };
        cursor.try_collect().await.unwrap_or_else(|e| {
            tracing::error!("get_collections_by_owner cursor error: {:?}", e);
            vec![]
        })
    }

    /// get_largest_collections
    ///
    /// Runs the ranking aggregation joining items onto collections and sorting
    /// by the resulting count.
    async fn get_largest_collections(&self, limit: i64) -> Vec<CollectionWithCount> {
        let cursor = match self
            .collections()
            .aggregate(largest_collections_pipeline(limit))
            .with_type::<CollectionWithCount>()
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("get_largest_collections error: {:?}", e);
                return vec![];
            }
        };
        cursor.try_collect().await.unwrap_or_else(|e| {
            tracing::error!("get_largest_collections cursor error: {:?}", e);
            vec![]
        })
    }

    // --- ITEMS ---

    /// create_item
    ///
    /// Inserts a new item record built by the handler. The handler has already
    /// verified that the referenced collection exists.
    async fn create_item(&self, item: Item) -> Option<Item> {
        match self.items().insert_one(&item).await {
            Ok(_) => Some(item),
            Err(e) => {
                tracing::error!("create_item error: {:?}", e);
                None
            }
        }
    }

    /// get_item
    ///
    /// Retrieves an item record by identifier.
    async fn get_item(&self, id: ObjectId) -> Option<Item> {
        self.items()
            .find_one(doc! { "_id": id })
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_item error: {:?}", e);
                None
            })
    }

    /// update_item
    ///
    /// Applies a partial update built from the fields present in the request,
    /// returning the updated record.
    async fn update_item(&self, id: ObjectId, req: UpdateItemRequest) -> Option<Item> {
        let set = item_update_document(&req);
        if set.is_empty() {
            return self.get_item(id).await;
        }
        self.items()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_item error: {:?}", e);
                None
            })
    }

    /// delete_item
    ///
    /// Removes an item record. Returns true only if a record was deleted.
    async fn delete_item(&self, id: ObjectId) -> bool {
        match self.items().delete_one(doc! { "_id": id }).await {
            Ok(res) => res.deleted_count > 0,
            Err(e) => {
                tracing::error!("delete_item error: {:?}", e);
                false
            }
        }
    }

    /// get_items_in_collection
    ///
    /// Retrieves all items referencing the given collection in insertion order.
    async fn get_items_in_collection(&self, collection_id: ObjectId) -> Vec<Item> {
        let cursor = match self
            .items()
            .find(doc! { "collectionRef": collection_id })
            .sort(doc! { "createdAt": 1 })
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("get_items_in_collection error: {:?}", e);
                return vec![];
            }
        };
        cursor.try_collect().await.unwrap_or_else(|e| {
            tracing::error!("get_items_in_collection cursor error: {:?}", e);
            vec![]
        })
    }

    /// get_latest_items
    ///
    /// Retrieves the most recently created items across all collections.
    async fn get_latest_items(&self, limit: i64) -> Vec<Item> {
        let cursor = match self
            .items()
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .limit(limit)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("get_latest_items error: {:?}", e);
                return vec![];
            }
        };
        cursor.try_collect().await.unwrap_or_else(|e| {
            tracing::error!("get_latest_items cursor error: {:?}", e);
            vec![]
        })
    }
}
