//! Service layer: adapters for the extraction tool and object storage, and
//! the media lifecycle that sequences them.

pub mod extractor;
pub mod media_service;
pub mod object_store;

#[cfg(test)]
pub mod testing;
