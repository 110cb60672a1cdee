//! Shared types for pkgstate.
//!
//! The state model (`PackageState`, `OperationStatus`) is what every other
//! component reads and writes; the wire types mirror the backend command
//! surface field-for-field so payloads stay compatible with the package
//! manager bridge.

pub mod state;
pub mod types;
pub mod wire;

// Re-exports
pub use state::*;
pub use types::*;
pub use wire::*;
