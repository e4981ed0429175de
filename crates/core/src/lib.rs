//! Script host domain logic.
//!
//! Everything here is pure or touches only the local filesystem: body
//! coercion, request shapes and their per-profile translation, profile
//! detection, run statistics, external-context flattening, and the
//! file-backed key-value store. Network I/O and script execution live in
//! `scripthost-engine`.

pub mod body;
pub mod error;
pub mod external;
pub mod naming;
pub mod profile;
pub mod request;
pub mod stats;
pub mod store;
