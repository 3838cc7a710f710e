//! Material extension types

/// Base material group from materials extension
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseMaterialGroup {
    /// Base material group ID
    pub id: usize,
    /// List of base materials in this group
    pub materials: Vec<BaseMaterial>,
}

impl BaseMaterialGroup {
    /// Create a new base material group
    pub fn new(id: usize) -> Self {
        Self {
            id,
            materials: Vec::new(),
        }
    }

    /// Position of the first material equal to `material`
    pub fn position_of(&self, material: &BaseMaterial) -> Option<usize> {
        self.materials.iter().position(|m| m == material)
    }

    /// Number of materials in the group
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// True when the group has no materials
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Base material from materials extension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseMaterial {
    /// Material name
    pub name: String,
    /// Display color in RGBA format
    pub displaycolor: (u8, u8, u8, u8),
}

impl BaseMaterial {
    /// Create a new base material
    pub fn new(name: impl Into<String>, displaycolor: (u8, u8, u8, u8)) -> Self {
        Self {
            name: name.into(),
            displaycolor,
        }
    }
}
