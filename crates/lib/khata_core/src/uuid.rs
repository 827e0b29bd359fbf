// Helper for generating UUIDv7 (timestamp-sortable UUIDs).
//
// Refresh records, user ids, tax models and token nonces are generated
// app-side so ids sort by creation time.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
