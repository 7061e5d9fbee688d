//! Short unique identifiers for naming generated objects

use uuid::Uuid;

/// Length of the identifiers produced by [`UuidShortIds`]
pub const SHORT_ID_LEN: usize = 8;

/// Source of short, globally unique identifiers
///
/// Ingress names carry one of these as a suffix so repeated builds for the
/// same domain never collide.
pub trait IdGenerator: Send + Sync {
    /// Produce a new identifier
    fn short_id(&self) -> String;
}

/// Identifier generator backed by random v4 UUIDs
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidShortIds;

impl IdGenerator for UuidShortIds {
    fn short_id(&self) -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(SHORT_ID_LEN);
        id
    }
}
