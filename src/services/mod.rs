//! Service layer: password hashing, token issuance, media host client.

pub mod media;
pub mod password;
pub mod token;

pub use media::{HttpMediaStore, MediaStore, StagedFile, StoredMedia};
pub use token::{TokenKind, TokenService};
