use crate::Color;

use std::fmt::{Display, Formatter};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Identity of a barn. Allocated in increasing order, so ordering by id is
/// ordering by creation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct BarnId(pub u64);

impl BarnId {
    /// The raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for BarnId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "barn-{}", self.0)
    }
}

/// A barn housing animals of a single color.
///
/// Barns keep no list of their members; membership is derived from each
/// animal's barn reference.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Barn {
    /// The unique identifier for the barn.
    pub id: BarnId,

    /// Informational name.
    pub name: String,

    /// The color every member animal must share.
    pub color: Color,
}

impl Barn {
    /// Creates a barn.
    pub fn new(id: BarnId, name: impl Into<String>, color: Color) -> Self {
        Self {
            id,
            name: name.into(),
            color,
        }
    }
}

impl TryFrom<Bytes> for Barn {
    type Error = ciborium::de::Error<std::io::Error>;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let reader = bytes.as_ref();
        ciborium::de::from_reader(reader)
    }
}

impl TryInto<Bytes> for Barn {
    type Error = ciborium::ser::Error<std::io::Error>;

    fn try_into(self) -> Result<Bytes, Self::Error> {
        let mut writer = Vec::new();
        ciborium::ser::into_writer(&self, &mut writer)?;
        Ok(Bytes::from(writer))
    }
}
