//! Package reading functionality for 3MF files

use std::io::{Read, Seek};

use crate::error::{Error, Result};
use crate::model::Attachment;
use crate::schema::{MODEL_REL_TYPE, RELATIONSHIPS_CONTENT_TYPE};
use zip::ZipArchive;

use super::content_types::ContentTypes;
use super::relationships::{Relationship, parse_relationships};
use super::{CONTENT_TYPES_PATH, RELS_PATH};

/// Content type assumed for parts no declaration covers
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Represents an OPC package (3MF file)
///
/// Opening validates the package structure: the content types part must exist, the
/// package relationships must name a 3D model part, and that part must be present.
pub struct Package<R: Read> {
    archive: ZipArchive<R>,
    content_types: ContentTypes,
    relationships: Vec<Relationship>,
    model_path: String,
}

impl<R: Read + Seek> Package<R> {
    /// Open a 3MF package from a reader
    pub fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| Error::package_format(format!("Not a ZIP archive: {}", e)))?;

        let mut package = Self {
            archive,
            content_types: ContentTypes::default(),
            relationships: Vec::new(),
            model_path: String::new(),
        };

        let content_types = package
            .find_part(CONTENT_TYPES_PATH)
            .ok_or_else(|| {
                Error::package_format(format!("Missing required file: {}", CONTENT_TYPES_PATH))
            })?;
        package.content_types = ContentTypes::parse(&package.part_string(&content_types)?)?;
        if !package.content_types.declares_model() {
            tracing::warn!("content types declare no 3D model part");
        }

        let rels = package.find_part(RELS_PATH).ok_or_else(|| {
            Error::package_format(format!("Missing required file: {}", RELS_PATH))
        })?;
        package.relationships = parse_relationships(&package.part_string(&rels)?)?;
        package.model_path = package.discover_model_path()?;

        tracing::debug!(
            model = %package.model_path,
            parts = package.archive.len(),
            "opened 3MF package"
        );
        Ok(package)
    }

    /// Resolve the root model part from the package relationships
    fn discover_model_path(&self) -> Result<String> {
        let rel = self
            .relationships
            .iter()
            .find(|r| r.rel_type == MODEL_REL_TYPE)
            .ok_or_else(|| Error::package_format("3D model relationship not found"))?;

        // Targets are meant to be percent-encoded, but raw UTF-8 is common in the wild
        let decoded = rel.resolved_target();
        if let Some(found) = self.find_part(&decoded) {
            return Ok(found);
        }
        let raw = rel.target.trim_start_matches('/');
        self.find_part(raw).ok_or_else(|| {
            Error::package_format(format!(
                "Model relationship targets '{}' which is not in the archive",
                rel.target
            ))
        })
    }

    /// Archive entry name for a part, matching case-insensitively as OPC requires
    fn find_part(&self, name: &str) -> Option<String> {
        let name = name.trim_start_matches('/');
        let mut fallback = None;
        for entry in self.archive.file_names() {
            if entry == name {
                return Some(entry.to_string());
            }
            if fallback.is_none() && entry.eq_ignore_ascii_case(name) {
                fallback = Some(entry.to_string());
            }
        }
        fallback
    }

    /// Part name of the root 3D model
    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    /// Package level relationships
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Content type declarations
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Raw bytes of the root model part
    pub fn model_bytes(&mut self) -> Result<Vec<u8>> {
        let path = self.model_path.clone();
        self.part_bytes(&path)
    }

    /// Raw bytes of a part
    pub fn part_bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|_| Error::package_format(format!("Missing part: {}", name)))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }

    fn part_string(&mut self, name: &str) -> Result<String> {
        let bytes = self.part_bytes(name)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::package_format(format!("{} is not valid UTF-8: {}", name, e)))
    }

    /// Check if a file exists in the archive
    pub fn has_file(&self, name: &str) -> bool {
        self.find_part(name).is_some()
    }

    /// Get the number of files in the archive
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Check if the archive is empty
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// List all file names in the archive
    pub fn file_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Every part other than the content types, the package relationships and the model
    ///
    /// Parts targeted by a package relationship remember its type so that writing them
    /// back restores the relationship.
    pub fn attachments(&mut self) -> Result<Vec<Attachment>> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .filter(|name| {
                !name.eq_ignore_ascii_case(CONTENT_TYPES_PATH)
                    && !name.eq_ignore_ascii_case(RELS_PATH)
            })
            .filter(|name| *name != self.model_path)
            .map(str::to_string)
            .collect();
        names.sort();

        let mut attachments = Vec::with_capacity(names.len());
        for name in names {
            let data = self.part_bytes(&name)?;
            let content_type = self
                .content_types
                .content_type_of(&name)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    if name.ends_with(".rels") {
                        RELATIONSHIPS_CONTENT_TYPE.to_string()
                    } else {
                        FALLBACK_CONTENT_TYPE.to_string()
                    }
                });

            let mut attachment = Attachment::new(name.clone(), content_type, data);
            if let Some(rel) = self
                .relationships
                .iter()
                .find(|r| r.rel_type != MODEL_REL_TYPE && r.resolved_target() == name)
            {
                attachment = attachment.with_relationship(rel.rel_type.clone());
            }
            tracing::trace!(part = %attachment.path, "carrying package part");
            attachments.push(attachment);
        }
        Ok(attachments)
    }
}
