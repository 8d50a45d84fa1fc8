// Linkshelf shared type definitions

pub mod bookmark;
pub mod errors;
pub mod metadata;
pub mod pending;
pub mod settings;
pub mod sync;
