//! Durable registrations of capabilities layers.
//!
//! Provides:
//! - [`RegistrationRecord`], the parameters needed to rebuild a configuration
//! - identifier derivation and dimension (de)serialization
//! - [`CsvRecordStore`], a flat file store safe for concurrent registrations

pub mod csv_store;
pub mod record;

pub use csv_store::{CsvRecordStore, RegistrationStore, StoreError};
pub use record::{
    derive_id, serialize_dimensions, unserialize_dimensions, CapabilitiesType, RegistrationRecord,
};
