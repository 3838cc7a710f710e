//! Base material parsing

use crate::error::{Error, Result};
use crate::model::{BaseMaterial, BaseMaterialGroup};
use quick_xml::events::BytesStart;

use super::parse_attributes;

/// Parse a `<basematerials>` start tag into an empty group
pub(super) fn parse_base_material_group(e: &BytesStart) -> Result<BaseMaterialGroup> {
    let attrs = parse_attributes(e)?;
    let id = attrs
        .get("id")
        .ok_or_else(|| Error::missing_attribute("basematerials", "id"))?;
    let id = id.parse::<usize>().map_err(|_| {
        Error::parse_error_with_context("basematerials id", id, "non-negative integer")
    })?;
    Ok(BaseMaterialGroup::new(id))
}

/// Parse a `<base>` entry
pub(super) fn parse_base_material(e: &BytesStart) -> Result<BaseMaterial> {
    let attrs = parse_attributes(e)?;
    let name = attrs.get("name").cloned().unwrap_or_default();
    let color = attrs
        .get("displaycolor")
        .ok_or_else(|| Error::missing_attribute("base", "displaycolor"))?;
    Ok(BaseMaterial::new(name, parse_color(color)?))
}

/// Parse `#RRGGBB` or `#RRGGBBAA`; alpha defaults to opaque
pub fn parse_color(value: &str) -> Result<(u8, u8, u8, u8)> {
    let invalid = || Error::parse_error_with_context("displaycolor", value, "#RRGGBB or #RRGGBBAA");
    let hex = value.trim().strip_prefix('#').ok_or_else(invalid)?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(invalid());
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok((channel(0)?, channel(2)?, channel(4)?, alpha))
}
