use foundation::LatLng;
use serde::{Deserialize, Serialize};

use crate::error::CreateFailure;

/// Host-assigned identity of an entity. Stable across updates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Active,
    Planned,
}

/// A property record as supplied by the host. The engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub position: Option<LatLng>,
    pub status: EntityStatus,
    pub display_name: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl Entity {
    pub fn new(
        id: impl Into<String>,
        position: LatLng,
        status: EntityStatus,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(id),
            position: Some(position),
            status,
            display_name: display_name.into(),
            thumbnail_url: None,
        }
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// The position if present and inside WGS84 ranges.
    pub fn valid_position(&self) -> Result<LatLng, CreateFailure> {
        match self.position {
            None => Err(CreateFailure::MissingPosition),
            Some(p) if !p.is_valid() => Err(CreateFailure::InvalidPosition {
                lat: p.lat,
                lng: p.lng,
            }),
            Some(p) => Ok(p),
        }
    }
}
