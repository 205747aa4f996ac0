//! Material definitions and the name -> material registry.
//!
//! The registry is loaded once at startup from a line-oriented properties
//! source and handed by reference to the loader (to resolve fragment
//! material names) and to the tile manager (to batch visible fragments).
//!
//! # Format
//!
//! ```text
//! # Comments run to the end of the line.
//! grass {
//!     texture = grass.rgb
//!     ambient = 0.0 0.0 0.0 1.0
//!     diffuse = 0.5 0.6 0.4
//!     alpha = no
//! }
//! ```
//!
//! Colours take three or four components; a missing alpha is 1.0.

use std::collections::HashMap;
use std::path::Path;

use crate::batch::SortList;
use crate::error::{Error, Result};

/// Index of a material in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(usize);

impl MaterialId {
    /// Position of the material in registry order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Lighting and texture parameters for a class of terrain surface.
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    /// Ambient reflectance (RGBA).
    pub ambient: [f32; 4],
    /// Diffuse reflectance (RGBA).
    pub diffuse: [f32; 4],
    /// Specular reflectance (RGBA).
    pub specular: [f32; 4],
    /// Emitted colour (RGBA).
    pub emission: [f32; 4],
    /// Specular exponent.
    pub shininess: f32,
    /// Whether the material needs alpha blending.
    pub alpha: bool,
    /// Texture file name, resolved by the render backend.
    pub texture: Option<String>,
    pub(crate) sort_list: SortList,
}

impl Material {
    /// Create a material with default lighting and no texture.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient: [0.2, 0.2, 0.2, 1.0],
            diffuse: [0.8, 0.8, 0.8, 1.0],
            specular: [0.0, 0.0, 0.0, 1.0],
            emission: [0.0, 0.0, 0.0, 1.0],
            shininess: 0.0,
            alpha: false,
            texture: None,
            sort_list: SortList::default(),
        }
    }

    /// Set the texture name.
    #[must_use]
    pub fn with_texture(mut self, texture: impl Into<String>) -> Self {
        self.texture = Some(texture.into());
        self
    }

    /// Set the diffuse colour.
    #[must_use]
    pub fn with_diffuse(mut self, diffuse: [f32; 4]) -> Self {
        self.diffuse = diffuse;
        self
    }

    /// The material's registry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fragments batched under this material for the current frame.
    #[must_use]
    pub fn sort_list(&self) -> &SortList {
        &self.sort_list
    }

    fn apply_property(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "texture" => {
                if value.is_empty() {
                    return Err("texture name is empty".to_string());
                }
                self.texture = Some(value.to_string());
            }
            "ambient" => self.ambient = parse_rgba(value)?,
            "diffuse" => self.diffuse = parse_rgba(value)?,
            "specular" => self.specular = parse_rgba(value)?,
            "emission" => self.emission = parse_rgba(value)?,
            "shininess" => {
                self.shininess = value
                    .parse()
                    .map_err(|_| format!("invalid shininess `{value}`"))?;
            }
            "alpha" => self.alpha = parse_flag(value)?,
            _ => {
                tracing::warn!(material = %self.name, key, "ignoring unknown material property");
            }
        }
        Ok(())
    }
}

fn parse_rgba(value: &str) -> std::result::Result<[f32; 4], String> {
    let components = value
        .split_whitespace()
        .map(str::parse::<f32>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid colour `{value}`: {e}"))?;
    match components.as_slice() {
        &[r, g, b] => Ok([r, g, b, 1.0]),
        &[r, g, b, a] => Ok([r, g, b, a]),
        _ => Err(format!(
            "colour needs 3 or 4 components, got {}",
            components.len()
        )),
    }
}

fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Ok(true),
        "no" | "false" | "off" | "0" => Ok(false),
        _ => Err(format!("invalid flag `{value}`")),
    }
}

/// Name -> material table.
#[derive(Debug, Clone)]
pub struct MaterialRegistry {
    materials: Vec<Material>,
    by_name: HashMap<String, MaterialId>,
    list_capacity: usize,
}

impl MaterialRegistry {
    /// Create an empty registry whose materials batch at most
    /// `list_capacity` fragments per frame.
    #[must_use]
    pub fn new(list_capacity: usize) -> Self {
        Self {
            materials: Vec::new(),
            by_name: HashMap::new(),
            list_capacity,
        }
    }

    /// Parse a registry from a properties source.
    pub fn parse(source: &str, list_capacity: usize) -> Result<Self> {
        let mut registry = Self::new(list_capacity);
        // The material being defined and the line its block opened on.
        let mut open: Option<(Material, usize)> = None;

        for (index, raw) in source.lines().enumerate() {
            let line_number = index + 1;
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            if line == "}" {
                let Some((material, _)) = open.take() else {
                    return Err(parse_error(line_number, "`}` without an open material"));
                };
                if registry.by_name.contains_key(material.name()) {
                    return Err(parse_error(
                        line_number,
                        format!("duplicate material `{}`", material.name()),
                    ));
                }
                registry.insert(material)?;
                continue;
            }

            match open.as_mut() {
                None => {
                    let name = line
                        .strip_suffix('{')
                        .map(str::trim)
                        .filter(|name| !name.is_empty() && !name.contains(char::is_whitespace))
                        .ok_or_else(|| parse_error(line_number, "expected `name {`"))?;
                    open = Some((Material::new(name), line_number));
                }
                Some((material, _)) => {
                    let (key, value) = line
                        .split_once('=')
                        .ok_or_else(|| parse_error(line_number, "expected `key = value`"))?;
                    material
                        .apply_property(key.trim(), value.trim())
                        .map_err(|detail| parse_error(line_number, detail))?;
                }
            }
        }

        if let Some((material, opened)) = open {
            return Err(parse_error(
                opened,
                format!("material `{}` is never closed", material.name()),
            ));
        }

        tracing::debug!(count = registry.len(), "parsed material registry");
        Ok(registry)
    }

    /// Read and parse a registry from a file.
    pub fn load(path: &Path, list_capacity: usize) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let registry = Self::parse(&source, list_capacity)?;
        tracing::info!(path = %path.display(), count = registry.len(), "loaded materials");
        Ok(registry)
    }

    /// Add a material, sizing its sort list to the registry capacity.
    pub fn insert(&mut self, mut material: Material) -> Result<MaterialId> {
        if self.by_name.contains_key(material.name()) {
            return Err(Error::DuplicateMaterial {
                name: material.name,
            });
        }
        let id = MaterialId(self.materials.len());
        material.sort_list = SortList::with_capacity(self.list_capacity);
        self.by_name.insert(material.name.clone(), id);
        self.materials.push(material);
        Ok(id)
    }

    /// Look up a material by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    /// Look up a material by name for a fragment being built, warning if it
    /// is unknown. The fragment is then built without a material and never
    /// batched.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<MaterialId> {
        let id = self.find(name);
        if id.is_none() {
            tracing::warn!(material = name, "unknown material, fragment will not be drawn");
        }
        id
    }

    /// Access a material by id, `None` if the id belongs to another registry.
    #[must_use]
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    /// Materials in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(index, material)| (MaterialId(index), material))
    }

    /// Number of registered materials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether no materials are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Fixed per-material fragment capacity.
    #[must_use]
    pub fn list_capacity(&self) -> usize {
        self.list_capacity
    }

    pub(crate) fn materials_mut(&mut self) -> &mut [Material] {
        &mut self.materials
    }
}

fn parse_error(line: usize, detail: impl Into<String>) -> Error {
    Error::MaterialParse {
        line,
        detail: detail.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "
# Terrain materials.
grass {
    texture = grass.rgb
    ambient = 0.1 0.1 0.1 1.0
    diffuse = 0.5 0.6 0.4   # no alpha component
    alpha = no
}

water {
    texture = water.rgb
    alpha = yes
    shininess = 12.5
}
";

    #[test]
    fn test_parse_registry() {
        let registry = MaterialRegistry::parse(SOURCE, 16).unwrap();
        assert_eq!(registry.len(), 2);

        let grass = registry.get(registry.find("grass").unwrap()).unwrap();
        assert_eq!(grass.name(), "grass");
        assert_eq!(grass.texture.as_deref(), Some("grass.rgb"));
        assert_eq!(grass.ambient, [0.1, 0.1, 0.1, 1.0]);
        assert_eq!(grass.diffuse, [0.5, 0.6, 0.4, 1.0]);
        assert!(!grass.alpha);
        assert_eq!(grass.sort_list().capacity(), 16);

        let water = registry.get(registry.find("water").unwrap()).unwrap();
        assert!(water.alpha);
        assert!((water.shininess - 12.5).abs() < f32::EPSILON);

        let order: Vec<_> = registry.iter().map(|(_, m)| m.name()).collect();
        assert_eq!(order, vec!["grass", "water"]);
    }

    #[test]
    fn test_unknown_name_resolves_to_none() {
        let registry = MaterialRegistry::parse(SOURCE, 16).unwrap();
        assert_eq!(registry.resolve("lava"), None);
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let registry = MaterialRegistry::parse("rock {\n  roughness = 3\n}\n", 4).unwrap();
        assert!(registry.find("rock").is_some());
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let err = error_line(MaterialRegistry::parse("rock {\n diffuse = 1 2\n}\n", 4));
        assert_eq!(err, Some(2));

        let err = error_line(MaterialRegistry::parse("rock\n", 4));
        assert_eq!(err, Some(1));

        let err = error_line(MaterialRegistry::parse("\nrock {\n alpha = no\n", 4));
        assert_eq!(err, Some(2));

        let err = error_line(MaterialRegistry::parse("a {\n}\na {\n}\n", 4));
        assert_eq!(err, Some(4));

        let err = error_line(MaterialRegistry::parse("}\n", 4));
        assert_eq!(err, Some(1));
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut registry = MaterialRegistry::new(4);
        registry.insert(Material::new("sand")).unwrap();
        assert!(matches!(
            registry.insert(Material::new("sand")),
            Err(Error::DuplicateMaterial { .. })
        ));
    }

    fn error_line(result: Result<MaterialRegistry>) -> Option<usize> {
        match result {
            Err(Error::MaterialParse { line, .. }) => Some(line),
            _ => None,
        }
    }
}
