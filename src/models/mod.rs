//! Core data models for the media relay.
//!
//! Nothing here is persisted: a `FileId` and the object key derived from it are
//! the only identity a stored video has.

pub mod media;
pub mod responses;
