//! Data model for the KYC document portal.
//!
//! Plain serde records mirroring the backend's wire format. All
//! relations are by opaque string identifier — no entity holds a
//! direct reference to another, and nothing here is persisted locally.

pub mod client;
pub mod document;
pub mod enums;
pub mod flow;
pub mod notification;
pub mod version;

pub use client::*;
pub use document::*;
pub use enums::*;
pub use flow::*;
pub use notification::*;
pub use version::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Version regression on document {document_id}: {current} -> {proposed}")]
    VersionRegression {
        document_id: String,
        current: u32,
        proposed: u32,
    },
}
