//! Object-store scaler: scale on how many objects sit in a bucket.

pub mod auth;
pub mod counter;
pub mod metadata;
pub mod scaler;

pub use auth::GcpAuthorization;
pub use counter::count_objects;
pub use metadata::ObjectCountMetadata;
pub use scaler::{KIND, ObjectCountScaler};
