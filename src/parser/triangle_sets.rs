//! Triangle Sets extension parsing
//!
//! Two layouts exist in the wild. Older writers emit an unnamespaced `<trianglesets>`
//! whose sets hold one `<ref>` with space-separated indices and no identifier. The
//! published extension uses `<t:trianglesets>` with an `identifier` on each set and
//! one `<t:ref index="N"/>` (or `<t:refrange>`) per member. Both are collected into a
//! [`TriangleSetsBlock`] and projected onto the same [`TriangleSet`] type once the
//! mesh's triangle count is known.

use std::collections::HashSet;

use crate::error::{Error, Result, Warning, WarningKind};
use crate::model::{TriangleSet, TriangleSetLayout};
use quick_xml::events::BytesStart;

use super::parse_attributes;

/// A triangle set as written by older producers
#[derive(Debug, Default)]
pub(super) struct LegacySet {
    name: Option<String>,
    refs: String,
}

/// A `<t:triangleset>` as written by the published extension
#[derive(Debug, Default)]
pub(super) struct CurrentSet {
    name: Option<String>,
    identifier: Option<String>,
    ranges: Vec<(usize, usize)>,
    problem: Option<String>,
}

/// The triangle sets of one mesh, in the layout they were stored in
#[derive(Debug)]
pub(super) enum TriangleSetsBlock {
    Legacy(Vec<LegacySet>),
    Current(Vec<CurrentSet>),
}

impl TriangleSetsBlock {
    /// Start an empty block
    pub fn new(layout: TriangleSetLayout) -> Self {
        match layout {
            TriangleSetLayout::Legacy => Self::Legacy(Vec::new()),
            TriangleSetLayout::Current => Self::Current(Vec::new()),
        }
    }

    /// Layout of this block
    pub fn layout(&self) -> TriangleSetLayout {
        match self {
            Self::Legacy(_) => TriangleSetLayout::Legacy,
            Self::Current(_) => TriangleSetLayout::Current,
        }
    }

    /// Open a `<triangleset>` element
    pub fn open_set(&mut self, e: &BytesStart) -> Result<()> {
        let attrs = parse_attributes(e)?;
        let name = attrs.get("name").cloned();
        match self {
            Self::Legacy(sets) => sets.push(LegacySet {
                name,
                refs: String::new(),
            }),
            Self::Current(sets) => sets.push(CurrentSet {
                name,
                identifier: attrs.get("identifier").cloned(),
                ..CurrentSet::default()
            }),
        }
        Ok(())
    }

    /// Text content of a legacy `<ref>`
    pub fn push_text(&mut self, text: &str) {
        if let Self::Legacy(sets) = self
            && let Some(set) = sets.last_mut()
        {
            if !set.refs.is_empty() {
                set.refs.push(' ');
            }
            set.refs.push_str(text);
        }
    }

    /// A `<t:ref index="N"/>` element
    pub fn push_ref(&mut self, e: &BytesStart) {
        if let Self::Current(sets) = self
            && let Some(set) = sets.last_mut()
        {
            match index_attribute(e, "index") {
                Ok(index) => set.ranges.push((index, index)),
                Err(err) => {
                    set.problem.get_or_insert(err.to_string());
                }
            }
        }
    }

    /// A `<t:refrange startindex="A" endindex="B"/>` element, both ends inclusive
    pub fn push_range(&mut self, e: &BytesStart) {
        if let Self::Current(sets) = self
            && let Some(set) = sets.last_mut()
        {
            let range = index_attribute(e, "startindex")
                .and_then(|start| Ok((start, index_attribute(e, "endindex")?)));
            match range {
                Ok((start, end)) if start <= end => set.ranges.push((start, end)),
                Ok((start, end)) => {
                    set.problem
                        .get_or_insert(format!("refrange {}..{} is reversed", start, end));
                }
                Err(err) => {
                    set.problem.get_or_insert(err.to_string());
                }
            }
        }
    }

    /// Project onto [`TriangleSet`]s for a mesh with `triangle_count` triangles
    ///
    /// Malformed sets are dropped with a warning; empty sets are kept with one. Every
    /// kept set takes the next value of `ordinal`, which names legacy sets `ts_<n>`.
    pub fn project(
        self,
        triangle_count: usize,
        ordinal: &mut usize,
        object_id: usize,
    ) -> (Vec<TriangleSet>, Vec<Warning>) {
        let mut sets = Vec::new();
        let mut warnings = Vec::new();
        let mut drop_set = |name: &Option<String>, reason: String| {
            let label = name.as_deref().unwrap_or("<unnamed>");
            warnings.push(
                Warning::new(
                    WarningKind::TriangleSet,
                    format!("triangle set '{}' dropped: {}", label, reason),
                )
                .for_object(object_id),
            );
        };

        match self {
            Self::Legacy(raw) => {
                for legacy in raw {
                    let Some(name) = legacy.name.clone() else {
                        drop_set(&legacy.name, "missing name".to_string());
                        continue;
                    };
                    let refs: std::result::Result<Vec<usize>, _> =
                        legacy.refs.split_whitespace().map(str::parse::<usize>).collect();
                    let triangles = match refs {
                        Ok(refs) => refs,
                        Err(_) => {
                            drop_set(
                                &legacy.name,
                                format!("ref text '{}' is not a list of indices", legacy.refs),
                            );
                            continue;
                        }
                    };
                    let set = TriangleSet::with_triangles(
                        name,
                        TriangleSet::synthesized_identifier(*ordinal),
                        triangles,
                    );
                    if let Err(err) = set.validate(triangle_count) {
                        drop_set(&legacy.name, err.to_string());
                        continue;
                    }
                    *ordinal += 1;
                    sets.push(set);
                }
            }
            Self::Current(raw) => {
                let mut identifiers = HashSet::new();
                for current in raw {
                    if let Some(problem) = current.problem {
                        drop_set(&current.name, problem);
                        continue;
                    }
                    let Some(name) = current.name.clone() else {
                        drop_set(&current.name, "missing name".to_string());
                        continue;
                    };
                    let identifier = match current.identifier {
                        Some(id) if !id.trim().is_empty() => id,
                        _ => {
                            drop_set(&current.name, "missing identifier".to_string());
                            continue;
                        }
                    };
                    if !identifiers.insert(identifier.clone()) {
                        drop_set(
                            &current.name,
                            format!("identifier '{}' already used in this mesh", identifier),
                        );
                        continue;
                    }
                    if let Some(&(_, end)) = current.ranges.iter().find(|r| r.1 >= triangle_count)
                    {
                        drop_set(
                            &current.name,
                            format!(
                                "references triangle {} but the mesh has {} triangles",
                                end, triangle_count
                            ),
                        );
                        continue;
                    }
                    let triangles = current
                        .ranges
                        .iter()
                        .flat_map(|&(start, end)| start..=end)
                        .collect();
                    *ordinal += 1;
                    sets.push(TriangleSet::with_triangles(name, identifier, triangles));
                }
            }
        }

        for set in sets.iter().filter(|s| s.is_empty()) {
            warnings.push(
                Warning::new(
                    WarningKind::TriangleSet,
                    format!("triangle set '{}' is empty", set.name),
                )
                .for_object(object_id),
            );
        }

        (sets, warnings)
    }
}

fn index_attribute(e: &BytesStart, name: &str) -> Result<usize> {
    let attrs = parse_attributes(e)?;
    let value = attrs
        .get(name)
        .ok_or_else(|| Error::missing_attribute("ref", name))?;
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::parse_error_with_context(name, value, "non-negative integer"))
}
