//! Typed access to the identity and attendance collections.

use rollcall_core::{AttendanceRecord, Identity, KnownFace};
use rollcall_store::{Document, DocumentStore, StoreError, ATTENDANCE, FACE_ENCODINGS};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    Ok(serde_json::from_value(serde_json::to_value(value)?)?)
}

fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

pub fn insert_identity(store: &dyn DocumentStore, identity: &Identity) -> Result<String, StoreError> {
    let id = store.insert(FACE_ENCODINGS, to_document(identity)?)?;
    tracing::info!(
        name = %identity.name,
        roll_number = %identity.roll_number,
        dim = identity.encoding.len(),
        "identity registered"
    );
    Ok(id)
}

/// Every registered encoding, read fresh from the store.
pub fn known_faces(store: &dyn DocumentStore) -> Result<Vec<KnownFace>, StoreError> {
    store
        .find_all(FACE_ENCODINGS)?
        .into_iter()
        .map(|doc| from_document::<Identity>(doc).map(KnownFace::from))
        .collect()
}

pub fn attendance(store: &dyn DocumentStore) -> Result<Vec<AttendanceRecord>, StoreError> {
    store
        .find_all(ATTENDANCE)?
        .into_iter()
        .map(from_document)
        .collect()
}

/// Record a face match. Every match is recorded, repeats included.
pub fn mark_present_by_name(store: &dyn DocumentStore, name: &str) -> Result<(), StoreError> {
    store.insert(ATTENDANCE, to_document(&AttendanceRecord::present_by_name(name))?)?;
    tracing::info!(name, "attendance marked by face");
    Ok(())
}

/// Record a spoken roll number unless one is already on record.
/// Returns whether a new record was written.
pub fn mark_present_by_roll(store: &dyn DocumentStore, roll_number: &str) -> Result<bool, StoreError> {
    let mut filter = Document::new();
    filter.insert("roll_number".to_string(), Value::String(roll_number.to_string()));
    if store.find_one(ATTENDANCE, &filter)?.is_some() {
        tracing::info!(roll_number, "roll number already marked");
        return Ok(false);
    }

    store.insert(ATTENDANCE, to_document(&AttendanceRecord::present_by_roll(roll_number))?)?;
    tracing::info!(roll_number, "attendance marked by speech");
    Ok(true)
}

pub fn clear_attendance(store: &dyn DocumentStore) -> Result<usize, StoreError> {
    store.delete_all(ATTENDANCE)
}
