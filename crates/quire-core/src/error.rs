//! Error types for `quire-core`.

use thiserror::Error;

use crate::entity::Entity;

#[derive(Debug, Error)]
pub enum Error {
  /// A history index past the oldest version (or any index on an empty
  /// history).
  #[error("index {index} is out of range for {entity} ({len} versions)")]
  OutOfRange {
    entity: Entity,
    index:  usize,
    len:    usize,
  },

  #[error("unknown entity: {0}")]
  UnknownEntity(Entity),

  #[error("invalid subject name: {0:?}")]
  InvalidName(String),

  #[error("invalid slug: {0:?}")]
  InvalidSlug(String),

  /// The history lists a date whose version could not be read back.
  #[error("version {date} of {entity} is missing")]
  MissingVersion {
    entity: Entity,
    date:   chrono::NaiveDate,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error into [`Error::Store`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
