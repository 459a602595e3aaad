use bson::doc;
use bson::oid::ObjectId;
use chrono::Utc;
use curio_api::error::ApiError;
use curio_api::models::{
    Collection, CollectionCategory, CollectionResponse, CollectionWithCount,
    CreateCollectionRequest, CreateItemRequest, RegisterRequest, User, UserResponse,
    parse_object_id,
};
use serde_json::json;
use validator::Validate;

// --- Test Utilities ---

/// Collects the rendered messages reported for a single field.
fn messages_for(errors: &validator::ValidationErrors, field: &str) -> Vec<String> {
    errors
        .field_errors()
        .get(field)
        .map(|errs| {
            errs.iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn valid_collection_payload() -> CreateCollectionRequest {
    CreateCollectionRequest {
        name: "Vintage signs".to_string(),
        description: "Enamel advertising signs".to_string(),
        category: "Signs".to_string(),
        fields: json!({ "maker": "string", "year": "number" }),
        owner: ObjectId::new().to_hex(),
        image_url: None,
    }
}

fn valid_item_payload() -> CreateItemRequest {
    CreateItemRequest {
        name: "Esso oil sign".to_string(),
        collection_ref: ObjectId::new().to_hex(),
        dynamic_fields: json!({ "year": 1956 }),
    }
}

// --- Registration Payload ---

#[test]
fn test_register_request_accepts_valid_credentials() {
    let payload = RegisterRequest {
        email: "collector@example.com".to_string(),
        password: "opensesame".to_string(),
    };
    assert!(payload.validate().is_ok());
}

#[test]
fn test_register_request_rejects_malformed_email() {
    let payload = RegisterRequest {
        email: "not-an-email".to_string(),
        password: "opensesame".to_string(),
    };
    let errors = payload.validate().unwrap_err();
    assert!(errors.field_errors().contains_key("email"));
}

#[test]
fn test_register_request_rejects_empty_password() {
    let payload = RegisterRequest {
        email: "collector@example.com".to_string(),
        password: "".to_string(),
    };
    let errors = payload.validate().unwrap_err();
    assert!(errors.field_errors().contains_key("password"));
}

#[test]
fn test_register_request_rejects_overlong_password() {
    let payload = RegisterRequest {
        email: "collector@example.com".to_string(),
        password: "x".repeat(151),
    };
    let errors = payload.validate().unwrap_err();
    assert!(errors.field_errors().contains_key("password"));
}

#[test]
fn test_register_request_accepts_password_at_length_limit() {
    let payload = RegisterRequest {
        email: "collector@example.com".to_string(),
        password: "x".repeat(150),
    };
    assert!(payload.validate().is_ok());
}

#[test]
fn test_register_request_defaults_missing_fields_to_empty() {
    // A body with no fields at all must still deserialize, then fail validation
    // on both fields rather than failing deserialization.
    let payload: RegisterRequest = serde_json::from_str("{}").expect("empty body deserializes");
    let errors = payload.validate().unwrap_err();
    let fields = errors.field_errors();
    assert!(fields.contains_key("email"));
    assert!(fields.contains_key("password"));
}

// --- Collection Payload ---

#[test]
fn test_create_collection_request_accepts_valid_payload() {
    assert!(valid_collection_payload().validate().is_ok());
}

#[test]
fn test_create_collection_request_field_messages() {
    let mut payload = valid_collection_payload();
    payload.name = "".to_string();
    payload.description = "".to_string();
    let errors = payload.validate().unwrap_err();

    assert_eq!(messages_for(&errors, "name"), vec!["Name is required"]);
    assert_eq!(
        messages_for(&errors, "description"),
        vec!["Description is required"]
    );
}

#[test]
fn test_create_collection_request_category_messages() {
    let mut payload = valid_collection_payload();
    payload.category = "".to_string();
    let errors = payload.validate().unwrap_err();
    assert_eq!(
        messages_for(&errors, "category"),
        vec!["Category is required"]
    );

    let mut payload = valid_collection_payload();
    payload.category = "Cars".to_string();
    let errors = payload.validate().unwrap_err();
    assert_eq!(messages_for(&errors, "category"), vec!["Invalid category"]);
}

#[test]
fn test_create_collection_request_owner_messages() {
    let mut payload = valid_collection_payload();
    payload.owner = "".to_string();
    let errors = payload.validate().unwrap_err();
    assert_eq!(messages_for(&errors, "owner"), vec!["Owner is required"]);

    let mut payload = valid_collection_payload();
    payload.owner = "short".to_string();
    let errors = payload.validate().unwrap_err();
    assert_eq!(messages_for(&errors, "owner"), vec!["Invalid input"]);
}

#[test]
fn test_create_collection_request_rejects_empty_fields_object() {
    let mut payload = valid_collection_payload();
    payload.fields = json!({});
    assert!(payload.validate().is_err());

    let mut payload = valid_collection_payload();
    payload.fields = json!(["not", "an", "object"]);
    assert!(payload.validate().is_err());
}

#[test]
fn test_fields_violation_renders_fallback_message() {
    // The dynamic-object rule sets no message of its own; the error layer
    // supplies the generic wording when flattening.
    let mut payload = valid_collection_payload();
    payload.fields = json!({});
    let errors = payload.validate().unwrap_err();

    match ApiError::from_validation_errors(errors) {
        ApiError::Validation(field_errors) => {
            let fields_error = field_errors
                .iter()
                .find(|e| e.field == "fields")
                .expect("fields error reported");
            assert_eq!(fields_error.message, "Invalid value");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_validation_errors_report_wire_field_names() {
    // Payload keys travel in camelCase, so reported field names must too.
    let mut payload = valid_item_payload();
    payload.collection_ref = "".to_string();
    let errors = payload.validate().unwrap_err();

    match ApiError::from_validation_errors(errors) {
        ApiError::Validation(field_errors) => {
            assert!(field_errors.iter().any(|e| e.field == "collectionRef"));
            assert!(field_errors.iter().all(|e| e.field != "collection_ref"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

// --- Item Payload ---

#[test]
fn test_create_item_request_accepts_valid_payload() {
    assert!(valid_item_payload().validate().is_ok());
}

#[test]
fn test_create_item_request_name_message() {
    let mut payload = valid_item_payload();
    payload.name = "".to_string();
    let errors = payload.validate().unwrap_err();
    assert_eq!(messages_for(&errors, "name"), vec!["Name is required"]);
}

#[test]
fn test_create_item_request_collection_ref_messages() {
    let mut payload = valid_item_payload();
    payload.collection_ref = "".to_string();
    let errors = payload.validate().unwrap_err();
    assert_eq!(
        messages_for(&errors, "collection_ref"),
        vec!["Collection reference is required"]
    );

    // One character short of a hex ObjectId.
    let mut payload = valid_item_payload();
    payload.collection_ref = "a".repeat(23);
    let errors = payload.validate().unwrap_err();
    assert_eq!(
        messages_for(&errors, "collection_ref"),
        vec!["Invalid collection reference"]
    );

    // One character over.
    let mut payload = valid_item_payload();
    payload.collection_ref = "a".repeat(25);
    assert!(payload.validate().is_err());
}

#[test]
fn test_create_item_request_rejects_non_object_dynamic_fields() {
    let mut payload = valid_item_payload();
    payload.dynamic_fields = json!("just a string");
    assert!(payload.validate().is_err());
}

// --- Store Document Serialization ---

#[test]
fn test_user_document_uses_store_key_names() {
    let user = User {
        id: ObjectId::new(),
        email: "collector@example.com".to_string(),
        password: "hashed".to_string(),
        role: "user".to_string(),
        created_at: Utc::now(),
    };

    let document = bson::to_document(&user).expect("user serializes to a document");
    // The identifier must land under '_id' and timestamps under camelCase keys,
    // matching what the driver writes and reads.
    assert!(document.contains_key("_id"));
    assert!(document.contains_key("createdAt"));
    assert!(!document.contains_key("created_at"));
}

#[test]
fn test_collection_document_round_trips() {
    let collection = Collection {
        id: ObjectId::new(),
        name: "Railway signs".to_string(),
        description: "Cast iron station signage".to_string(),
        category: CollectionCategory::Signs,
        fields: doc! { "year": "number" },
        owner: ObjectId::new(),
        image_url: None,
        created_at: Utc::now(),
    };

    let document = bson::to_document(&collection).expect("collection serializes");
    assert_eq!(document.get_str("category").unwrap(), "Signs");
    // An unset image URL is omitted entirely rather than stored as null.
    assert!(!document.contains_key("imageUrl"));

    let parsed: Collection = bson::from_document(document).expect("collection deserializes");
    assert_eq!(parsed.id, collection.id);
    assert_eq!(parsed.category, CollectionCategory::Signs);
}

// --- Outbound Projections ---

#[test]
fn test_user_response_never_carries_credentials() {
    let user = User {
        id: ObjectId::new(),
        email: "collector@example.com".to_string(),
        password: "a-bcrypt-hash".to_string(),
        role: "admin".to_string(),
        created_at: Utc::now(),
    };
    let expected_id = user.id.to_hex();

    let response = UserResponse::from(user);
    assert_eq!(response.id, expected_id);

    let json_output = serde_json::to_string(&response).unwrap();
    assert!(!json_output.contains("password"));
    assert!(!json_output.contains("a-bcrypt-hash"));
    // Outbound keys are camelCase for the frontend.
    assert!(json_output.contains(r#""createdAt""#));
}

#[test]
fn test_collection_response_omits_absent_item_count() {
    let collection = Collection {
        id: ObjectId::new(),
        name: "Oil paintings".to_string(),
        description: "Landscapes in oil".to_string(),
        category: CollectionCategory::Paintings,
        fields: doc! { "artist": "string" },
        owner: ObjectId::new(),
        image_url: Some("/uploads/frame.png".to_string()),
        created_at: Utc::now(),
    };

    let response = CollectionResponse::from(collection);
    assert_eq!(response.fields, json!({ "artist": "string" }));

    let json_output = serde_json::to_string(&response).unwrap();
    assert!(!json_output.contains("itemCount"));
    assert!(json_output.contains(r#""imageUrl":"/uploads/frame.png""#));
}

#[test]
fn test_collection_response_carries_aggregated_count() {
    let with_count = CollectionWithCount {
        collection: Collection {
            id: ObjectId::new(),
            name: "Pub signs".to_string(),
            description: "Hanging pub signage".to_string(),
            category: CollectionCategory::Signs,
            fields: doc! { "county": "string" },
            owner: ObjectId::new(),
            image_url: None,
            created_at: Utc::now(),
        },
        item_count: 12,
    };

    let response = CollectionResponse::from(with_count);
    assert_eq!(response.item_count, Some(12));

    let json_output = serde_json::to_string(&response).unwrap();
    assert!(json_output.contains(r#""itemCount":12"#));
}

// --- Category Parsing ---

#[test]
fn test_category_parse_covers_known_set() {
    assert_eq!(
        CollectionCategory::parse("Books"),
        Some(CollectionCategory::Books)
    );
    assert_eq!(
        CollectionCategory::parse("Silverware"),
        Some(CollectionCategory::Silverware)
    );
    assert_eq!(CollectionCategory::parse("books"), None);
    assert_eq!(CollectionCategory::parse("Cars"), None);

    // as_str and parse agree in both directions.
    for category in [
        CollectionCategory::Books,
        CollectionCategory::Signs,
        CollectionCategory::Silverware,
        CollectionCategory::Paintings,
    ] {
        assert_eq!(CollectionCategory::parse(category.as_str()), Some(category));
    }
}

// --- Identifier Parsing ---

#[test]
fn test_parse_object_id_round_trips_hex() {
    let id = ObjectId::new();
    let parsed = parse_object_id(&id.to_hex()).expect("hex identifier parses");
    assert_eq!(parsed, id);
}

#[test]
fn test_parse_object_id_rejects_garbage() {
    match parse_object_id("definitely-not-hex") {
        Err(ApiError::BadRequest(message)) => assert_eq!(message, "Invalid identifier"),
        other => panic!("expected bad request, got {:?}", other.is_ok()),
    }
}
