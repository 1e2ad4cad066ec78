pub mod config;
pub mod fields;
pub mod model;

pub use config::{AppConfig, LibraryConfig, CONFIG_SCHEMA_VERSION};
pub use fields::{FieldSpec, FieldValue, FIELDS};
pub use model::{LibraryTrack, TrackKind, TrackRecord, TrackUpdate};
