use foundation::LatLng;

use crate::entity::{Entity, EntityId};
use crate::overlay::Overlay;

/// The engine's live representation of one entity.
///
/// Only the registry creates, mutates and destroys markers; everything else
/// sees them through these read accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub(crate) entity_id: EntityId,
    pub(crate) position: LatLng,
    pub(crate) overlay: Overlay,
    pub(crate) snapshot: Entity,
    pub(crate) is_visible: bool,
    pub(crate) is_selected: bool,
}

impl Marker {
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// The entity as of the last reconciliation that changed it.
    pub fn snapshot(&self) -> &Entity {
        &self.snapshot
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }
}
