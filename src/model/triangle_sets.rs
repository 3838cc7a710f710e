//! Triangle Sets extension types

use std::collections::HashSet;

use crate::error::{Error, Result};

/// Prefix of synthesized triangle set identifiers
pub const IDENTIFIER_PREFIX: &str = "ts_";

/// Physical layout a mesh's triangle sets were read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriangleSetLayout {
    /// Unnamespaced `<trianglesets>` with space-separated `<ref>` text and no identifiers
    Legacy,
    /// `<t:trianglesets>` with `identifier` attributes and one `<t:ref index="N"/>` per triangle
    Current,
}

/// A named, identified, ordered set of triangle indices within one mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangleSet {
    /// Display name
    pub name: String,
    /// Identifier, required when writing
    pub identifier: String,
    /// Triangle indices in stored order
    pub triangles: Vec<usize>,
}

impl TriangleSet {
    /// Create an empty triangle set
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            triangles: Vec::new(),
        }
    }

    /// Create a triangle set with members
    pub fn with_triangles(
        name: impl Into<String>,
        identifier: impl Into<String>,
        triangles: Vec<usize>,
    ) -> Self {
        Self {
            triangles,
            ..Self::new(name, identifier)
        }
    }

    /// Identifier used when none is stored: `ts_<ordinal>`
    pub fn synthesized_identifier(ordinal: usize) -> String {
        format!("{}{}", IDENTIFIER_PREFIX, ordinal)
    }

    /// Number of referenced triangles
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// True when the set references no triangle
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Check the set against a mesh with `triangle_count` triangles
    pub fn validate(&self, triangle_count: usize) -> Result<()> {
        if self.identifier.trim().is_empty() {
            return Err(Error::ExtensionEncoding(format!(
                "Triangle set '{}' has an empty identifier",
                self.name
            )));
        }
        if let Some(&bad) = self.triangles.iter().find(|&&t| t >= triangle_count) {
            return Err(Error::ExtensionEncoding(format!(
                "Triangle set '{}' references triangle {} but the mesh has {} triangles",
                self.name, bad, triangle_count
            )));
        }
        Ok(())
    }
}

/// Check every set of one mesh, including identifier uniqueness
pub fn validate_triangle_sets(sets: &[TriangleSet], triangle_count: usize) -> Result<()> {
    let mut seen = HashSet::with_capacity(sets.len());
    for set in sets {
        set.validate(triangle_count)?;
        if !seen.insert(set.identifier.as_str()) {
            return Err(Error::ExtensionEncoding(format!(
                "Triangle set identifier '{}' is used more than once in one mesh",
                set.identifier
            )));
        }
    }
    Ok(())
}

/// Rewrite member indices after triangles were removed from the mesh
///
/// `remap[old]` holds the new index, or `None` when the triangle was removed.
/// Returns how many references were dropped.
pub fn remap_triangle_sets(sets: &mut [TriangleSet], remap: &[Option<usize>]) -> usize {
    let mut dropped = 0;
    for set in sets {
        let before = set.triangles.len();
        set.triangles = set
            .triangles
            .iter()
            .filter_map(|&t| remap.get(t).copied().flatten())
            .collect();
        dropped += before - set.triangles.len();
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_identifier() {
        assert_eq!(TriangleSet::synthesized_identifier(0), "ts_0");
        assert_eq!(TriangleSet::synthesized_identifier(12), "ts_12");
    }

    #[test]
    fn test_validate_rejects_empty_identifier() {
        let set = TriangleSet::with_triangles("Red", "  ", vec![0]);
        assert!(matches!(
            set.validate(1),
            Err(Error::ExtensionEncoding(_))
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let set = TriangleSet::with_triangles("Red", "ts_0", vec![0, 4]);
        assert!(set.validate(4).is_err());
        assert!(set.validate(5).is_ok());
    }

    #[test]
    fn test_duplicate_identifiers_rejected() {
        let sets = vec![
            TriangleSet::with_triangles("A", "ts_0", vec![0]),
            TriangleSet::with_triangles("B", "ts_0", vec![1]),
        ];
        assert!(validate_triangle_sets(&sets, 2).is_err());
    }

    #[test]
    fn test_empty_set_is_legal() {
        let sets = vec![TriangleSet::new("Nothing", "ts_0")];
        assert!(validate_triangle_sets(&sets, 0).is_ok());
    }

    #[test]
    fn test_remap_drops_removed_triangles() {
        let mut sets = vec![TriangleSet::with_triangles("A", "ts_0", vec![0, 1, 2, 3])];
        let remap = vec![Some(0), None, Some(1), Some(2)];
        let dropped = remap_triangle_sets(&mut sets, &remap);
        assert_eq!(dropped, 1);
        assert_eq!(sets[0].triangles, vec![0, 1, 2]);
    }
}
