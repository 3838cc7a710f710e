//! Base material palette deduplication

use crate::model::{BaseMaterial, BaseMaterialGroup};
use crate::scene::SceneMaterial;

/// Document-wide palette collected while objects are exported
///
/// Two host materials with the same name and the same 8-bit color collapse into one
/// entry.
#[derive(Debug, Clone, Default)]
pub struct MaterialPalette {
    materials: Vec<BaseMaterial>,
}

impl MaterialPalette {
    /// Empty palette
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of `material`, inserting it when unseen
    pub fn intern(&mut self, material: &SceneMaterial) -> usize {
        let base = BaseMaterial::new(material.name.clone(), material.displaycolor());
        match self.materials.iter().position(|m| *m == base) {
            Some(index) => index,
            None => {
                self.materials.push(base);
                self.materials.len() - 1
            }
        }
    }

    /// Number of distinct materials
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// True when no material was interned
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Turn the palette into the document's base material group
    pub fn into_group(self, id: usize) -> BaseMaterialGroup {
        BaseMaterialGroup {
            id,
            materials: self.materials,
        }
    }
}
