//! Class registry: the mapping from class id to semantic name.
//!
//! The registry is an explicit value handed to the mask loader (to reject
//! unknown ids) and to the emitter (to write `data.yaml`), so two conversions
//! with different registries never interfere.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::BlenderlineError;
use crate::ir::ClassId;

/// Known classes of a dataset, ordered by id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassRegistry {
    names: BTreeMap<ClassId, String>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry where each name's index is its class id.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (ClassId::new(idx as u32), name.into()))
            .collect();
        Self { names }
    }

    pub fn insert(&mut self, id: impl Into<ClassId>, name: impl Into<String>) {
        self.names.insert(id.into(), name.into());
    }

    pub fn contains(&self, id: ClassId) -> bool {
        self.names.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// Reads a `classes.yaml` registry.
    ///
    /// `names` may be a sequence (index is the id) or a mapping from id to
    /// name. Blank names become `class_<id>`.
    pub fn read_yaml(path: &Path) -> Result<Self, BlenderlineError> {
        let data = fs::read_to_string(path).map_err(|source| {
            BlenderlineError::corrupt(path, format!("cannot read class registry: {source}"))
        })?;
        Self::from_yaml_str(&data).map_err(|source| BlenderlineError::ClassRegistryParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(data: &str) -> Result<Self, serde_yaml::Error> {
        let parsed: RegistryYaml = serde_yaml::from_str(data)?;
        let pairs: Vec<(u32, String)> = match parsed.names {
            RegistryNames::Sequence(names) => names
                .into_iter()
                .enumerate()
                .map(|(idx, name)| (idx as u32, name))
                .collect(),
            RegistryNames::Mapping(mapping) => mapping.into_iter().collect(),
        };

        let names = pairs
            .into_iter()
            .map(|(id, name)| {
                let name = if name.trim().is_empty() {
                    format!("class_{}", id)
                } else {
                    name
                };
                (ClassId::new(id), name)
            })
            .collect();
        Ok(Self { names })
    }
}

#[derive(Debug, Deserialize)]
struct RegistryYaml {
    names: RegistryNames,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegistryNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<u32, String>),
}
