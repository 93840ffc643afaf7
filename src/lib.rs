//! File lifecycle service
//!
//! Uploaded files start unused and are reclaimed after an expiration delay
//! unless another service publishes a reference for them. Producer services
//! can depend on this crate for [`features::file_events::FileReferencePublisher`],
//! [`modules::messaging::HttpEventPublisher`] and the event schema.

pub mod core;
pub mod features;
pub mod modules;
pub mod shared;
