//! Blob Storage Module
//!
//! Media messages and group images are uploaded in two steps: the client asks
//! for a one-time upload URL, then posts the bytes to it and receives a
//! `storage_id` to reference from a message or group.
//!
//! # Module Structure
//!
//! ```text
//! storage/
//! ├── mod.rs      - Module exports and documentation
//! ├── blob.rs     - BlobStore trait and filesystem implementation
//! ├── tickets.rs  - One-time upload tickets
//! ├── db.rs       - Blob reference lookups
//! └── handlers.rs - Upload/download handlers and helpers
//! ```

pub mod blob;
pub mod db;
pub mod handlers;
pub mod tickets;

pub use blob::{BlobMeta, BlobStore, FsBlobStore};
pub use handlers::{attach_blob, discard_blob, generate_upload_url, upload};
pub use tickets::UploadTickets;
