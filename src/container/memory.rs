//! In-memory container tree
//!
//! Holds the group tree of one session and implements `ContainerIo` over it.
//! `FileContainer` layers file persistence on top; tests use it directly.

use crate::container::error::{ContainerError, ContainerResult};
use crate::container::interface::ContainerIo;
use crate::container::node::{AttrValue, Dataset, Group};
use crate::container::registry::ObjectRegistry;
use crate::reference::{ObjectReference, ReferenceResolver};
use crate::timeseries::Handle;
use crate::types::{
    CURRENT_FORMAT_VERSION, FORMAT_VERSION_ATTR, FormatVersion, OBJECT_ID_ATTR, StoreResult,
};

/// Group tree plus the object registry of one session
#[derive(Debug)]
pub struct MemoryContainer {
    root: Group,
    registry: ObjectRegistry,
    dirty: bool,
}

impl MemoryContainer {
    /// Create an empty tree stamped with the current format version
    pub fn new() -> Self {
        Self::with_version(CURRENT_FORMAT_VERSION)
    }

    /// Create an empty tree stamped with `version`
    pub fn with_version(version: FormatVersion) -> Self {
        let mut root = Group::new();
        root.attrs.insert(
            FORMAT_VERSION_ATTR.to_string(),
            AttrValue::Text(version.to_string()),
        );
        Self {
            root,
            registry: ObjectRegistry::new(),
            dirty: true,
        }
    }

    /// Adopt a tree read from storage and index the objects it holds
    pub fn from_root(root: Group) -> Self {
        let registry = ObjectRegistry::new();
        root.walk("", &mut |path, group| {
            if let Some(id) = group.attrs.get(OBJECT_ID_ATTR).and_then(AttrValue::as_str) {
                registry.register(ObjectReference::from_string(id), path);
            }
        });
        Self {
            root,
            registry,
            dirty: false,
        }
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Registry handle shared with readers of this session
    pub fn registry(&self) -> ObjectRegistry {
        self.registry.clone()
    }

    /// Whether the tree changed since it was loaded or last marked clean
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn group_at(&self, components: &[&str]) -> ContainerResult<&Group> {
        let mut group = &self.root;
        for (depth, name) in components.iter().enumerate() {
            group = group
                .groups
                .get(*name)
                .ok_or_else(|| ContainerError::NotFound(join(&components[..=depth])))?;
        }
        Ok(group)
    }

    fn group_at_mut(&mut self, components: &[&str], create: bool) -> ContainerResult<&mut Group> {
        let mut group = &mut self.root;
        for (depth, name) in components.iter().enumerate() {
            if create && !group.groups.contains_key(*name) {
                if group.datasets.contains_key(*name) {
                    return Err(ContainerError::InvalidPath(join(&components[..=depth])));
                }
                group.groups.insert((*name).to_string(), Group::new());
            }
            group = group
                .groups
                .get_mut(*name)
                .ok_or_else(|| ContainerError::NotFound(join(&components[..=depth])))?;
        }
        Ok(group)
    }

    /// Re-index the group at `components` if it is an identified object
    fn sync_object(&self, components: &[&str]) {
        if let Ok(group) = self.group_at(components) {
            if let Some(id) = group.attrs.get(OBJECT_ID_ATTR).and_then(AttrValue::as_str) {
                self.registry
                    .register(ObjectReference::from_string(id), &join(components));
            }
        }
    }
}

impl Default for MemoryContainer {
    fn default() -> Self {
        Self::new()
    }
}

fn split(path: &str) -> ContainerResult<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(ContainerError::InvalidPath(path.to_string()));
    }
    Ok(path.split('/').filter(|c| !c.is_empty()).collect())
}

fn join(components: &[&str]) -> String {
    format!("/{}", components.join("/"))
}

impl ContainerIo for MemoryContainer {
    fn format_version(&self) -> ContainerResult<Option<FormatVersion>> {
        match self.root.attrs.get(FORMAT_VERSION_ATTR) {
            None => Ok(None),
            Some(AttrValue::Text(text)) => text
                .parse::<FormatVersion>()
                .map(Some)
                .map_err(|e| ContainerError::ParseError(e.to_string())),
            Some(other) => Err(ContainerError::ParseError(format!(
                "format version attribute is not text: {:?}",
                other
            ))),
        }
    }

    fn group(&self, path: &str) -> ContainerResult<&Group> {
        self.group_at(&split(path)?)
    }

    fn create_group(&mut self, path: &str) -> ContainerResult<()> {
        let components = split(path)?;
        let existed = self.group_at(&components).is_ok();
        self.group_at_mut(&components, true)?;
        if !existed {
            self.dirty = true;
        }
        Ok(())
    }

    fn read_dataset(&self, path: &str) -> ContainerResult<&Dataset> {
        let components = split(path)?;
        let (name, parent) = components
            .split_last()
            .ok_or_else(|| ContainerError::InvalidPath(path.to_string()))?;
        self.group_at(parent)?
            .datasets
            .get(*name)
            .ok_or_else(|| ContainerError::NotFound(path.to_string()))
    }

    fn write_dataset(&mut self, path: &str, dataset: Dataset) -> ContainerResult<()> {
        let components = split(path)?;
        let (name, parent) = components
            .split_last()
            .ok_or_else(|| ContainerError::InvalidPath(path.to_string()))?;
        let group = self.group_at_mut(parent, true)?;
        if group.groups.contains_key(*name) {
            return Err(ContainerError::InvalidPath(path.to_string()));
        }
        group.datasets.insert((*name).to_string(), dataset);
        self.dirty = true;
        self.sync_object(parent);
        Ok(())
    }

    fn attribute(&self, path: &str, key: &str) -> ContainerResult<Option<&AttrValue>> {
        let components = split(path)?;
        if let Ok(group) = self.group_at(&components) {
            return Ok(group.attrs.get(key));
        }
        Ok(self.read_dataset(path)?.attrs.get(key))
    }

    fn set_attribute(&mut self, path: &str, key: &str, value: AttrValue) -> ContainerResult<()> {
        let components = split(path)?;
        let attrs = if self.group_at(&components).is_ok() {
            &mut self.group_at_mut(&components, false)?.attrs
        } else {
            let (name, parent) = components
                .split_last()
                .ok_or_else(|| ContainerError::InvalidPath(path.to_string()))?;
            &mut self
                .group_at_mut(parent, false)?
                .datasets
                .get_mut(*name)
                .ok_or_else(|| ContainerError::NotFound(path.to_string()))?
                .attrs
        };
        if attrs.get(key) == Some(&value) {
            return Ok(());
        }
        attrs.insert(key.to_string(), value);
        self.dirty = true;

        if self.group_at(&components).is_ok() {
            self.sync_object(&components);
        } else if let Some((_, parent)) = components.split_last() {
            self.sync_object(parent);
        }
        Ok(())
    }

    fn exists(&self, path: &str) -> ContainerResult<bool> {
        let components = split(path)?;
        if self.group_at(&components).is_ok() {
            return Ok(true);
        }
        Ok(self.read_dataset(path).is_ok())
    }

    fn resolve_object_reference(&self, target: &ObjectReference) -> StoreResult<Handle> {
        self.registry.resolve(target, &self.root)
    }
}

impl ReferenceResolver for MemoryContainer {
    fn resolve_object(&self, target: &ObjectReference) -> StoreResult<Handle> {
        self.resolve_object_reference(target)
    }
}
