use crate::{BarnId, Color};

use std::fmt::{Display, Formatter};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Identity of an animal. Allocated in increasing order.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct AnimalId(pub u64);

impl AnimalId {
    /// The raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for AnimalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "animal-{}", self.0)
    }
}

/// Represents an animal living on the farm.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Animal {
    /// The unique identifier for the animal.
    pub id: AnimalId,

    /// The animal's name.
    pub name: String,

    /// Decides which barns the animal may live in.
    pub favorite_color: Color,

    /// The barn the animal is assigned to. Only `None` while the animal is
    /// being moved between barns.
    pub barn: Option<BarnId>,
}

/// An animal that has not been placed on the farm yet.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NewAnimal {
    /// The animal's name.
    pub name: String,

    /// Decides which barns the animal may live in.
    pub favorite_color: Color,
}

impl NewAnimal {
    /// Creates a new, unplaced animal.
    pub fn new(name: impl Into<String>, favorite_color: Color) -> Self {
        Self {
            name: name.into(),
            favorite_color,
        }
    }

    pub(crate) fn into_animal(self, id: AnimalId) -> Animal {
        Animal {
            id,
            name: self.name,
            favorite_color: self.favorite_color,
            barn: None,
        }
    }
}

impl TryFrom<Bytes> for Animal {
    type Error = ciborium::de::Error<std::io::Error>;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let reader = bytes.as_ref();
        ciborium::de::from_reader(reader)
    }
}

impl TryInto<Bytes> for Animal {
    type Error = ciborium::ser::Error<std::io::Error>;

    fn try_into(self) -> Result<Bytes, Self::Error> {
        let mut writer = Vec::new();
        ciborium::ser::into_writer(&self, &mut writer)?;
        Ok(Bytes::from(writer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbor_encoding_preserves_barn_reference() {
        let animal = Animal {
            id: AnimalId(7),
            name: "Clarabelle".to_string(),
            favorite_color: Color::Green,
            barn: Some(BarnId(3)),
        };

        let bytes: Bytes = animal.clone().try_into().unwrap();
        let decoded = Animal::try_from(bytes).unwrap();

        assert_eq!(decoded, animal);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(Animal::try_from(Bytes::from_static(b"\xff\x00not cbor")).is_err());
    }
}
