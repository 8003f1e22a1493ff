//! File-backed container
//!
//! On-disk layout:
//! - line 1: `NTBL1 <crc32 of body, 8 hex digits>`
//! - body: JSON document of the group tree
//!
//! Maps in the tree are ordered, so an unchanged tree always encodes to the
//! same bytes. A session opened `Read` never writes; `Append` writes on close
//! only if something changed.

use crate::container::error::{ContainerError, ContainerResult};
use crate::container::interface::ContainerIo;
use crate::container::memory::MemoryContainer;
use crate::container::node::{AttrValue, Dataset, Group};
use crate::container::registry::ObjectRegistry;
use crate::reference::{ObjectReference, ReferenceResolver};
use crate::timeseries::Handle;
use crate::types::{FormatVersion, StoreError, StoreConfig, StoreResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Mode a container session is opened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only; the file is never written
    Read,
    /// Read-write on an existing file
    Append,
    /// New file, replacing any existing one on flush
    Create,
}

impl OpenMode {
    pub fn is_writable(&self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

/// A container session over one file
#[derive(Debug)]
pub struct FileContainer {
    path: PathBuf,
    mode: OpenMode,
    config: StoreConfig,
    tree: MemoryContainer,
    closed: bool,
}

impl FileContainer {
    const MAGIC: &'static str = "NTBL1";

    /// Start a new container file stamped with `config.format_version`
    pub fn create(path: impl AsRef<Path>, config: StoreConfig) -> ContainerResult<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("creating container {:?} at version {}", path, config.format_version);
        Ok(Self {
            tree: MemoryContainer::with_version(config.format_version),
            path,
            mode: OpenMode::Create,
            config,
            closed: false,
        })
    }

    /// Open a container file
    ///
    /// # Arguments
    /// * `path` - Location of the container file
    /// * `mode` - Access mode; `Create` replaces any existing file on flush
    /// * `config` - Format version and checksum options
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, config: StoreConfig) -> ContainerResult<Self> {
        if mode == OpenMode::Create {
            return Self::create(path, config);
        }
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path)?;
        let root = Self::decode(&bytes, config.verify_checksum)?;
        let tree = MemoryContainer::from_root(root);
        log::debug!(
            "opened container {:?} ({:?}, {} objects)",
            path,
            mode,
            tree.registry().len()
        );
        Ok(Self {
            path,
            mode,
            config,
            tree,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Object registry of this session
    pub fn registry(&self) -> ObjectRegistry {
        self.tree.registry()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Write pending changes to disk
    pub fn flush(&mut self) -> ContainerResult<()> {
        self.check_open()?;
        if !self.mode.is_writable() || !self.tree.is_dirty() {
            return Ok(());
        }
        let bytes = Self::encode(self.tree.root(), self.config.pretty)?;
        // the file is replaced by rename, never rewritten in place
        let staging = self.staging_path();
        fs::write(&staging, bytes)?;
        if let Err(err) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        self.tree.mark_clean();
        log::debug!("flushed container {:?}", self.path);
        Ok(())
    }

    /// Flush and end the session; handles resolved through it become unreachable
    pub fn close(&mut self) -> ContainerResult<()> {
        if self.closed {
            return Ok(());
        }
        let flushed = self.flush();
        self.tree.registry().close();
        self.closed = true;
        flushed
    }

    /// Encode a tree into the on-disk format
    pub fn encode(root: &Group, pretty: bool) -> ContainerResult<Vec<u8>> {
        let body = if pretty {
            serde_json::to_vec_pretty(root)?
        } else {
            serde_json::to_vec(root)?
        };
        let checksum = crc32fast::hash(&body);
        let mut bytes = format!("{} {:08x}\n", Self::MAGIC, checksum).into_bytes();
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decode the on-disk format into a tree
    pub fn decode(bytes: &[u8], verify_checksum: bool) -> ContainerResult<Group> {
        let newline = bytes
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| ContainerError::BadHeader("missing header line".to_string()))?;
        let header = std::str::from_utf8(&bytes[..newline])
            .map_err(|e| ContainerError::BadHeader(e.to_string()))?;
        let body = &bytes[newline + 1..];

        let mut parts = header.split(' ');
        if parts.next() != Some(Self::MAGIC) {
            return Err(ContainerError::BadHeader(format!("unexpected magic in '{}'", header)));
        }
        let expected = parts
            .next()
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .ok_or_else(|| ContainerError::BadHeader(format!("no checksum in '{}'", header)))?;

        if verify_checksum {
            let actual = crc32fast::hash(body);
            if actual != expected {
                return Err(ContainerError::ChecksumMismatch { expected, actual });
            }
        }
        Ok(serde_json::from_slice(body)?)
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn check_open(&self) -> ContainerResult<()> {
        if self.closed {
            Err(ContainerError::Closed)
        } else {
            Ok(())
        }
    }

    fn check_writable(&self, path: &str) -> ContainerResult<()> {
        self.check_open()?;
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(ContainerError::ReadOnly(path.to_string()))
        }
    }
}

impl ContainerIo for FileContainer {
    fn format_version(&self) -> ContainerResult<Option<FormatVersion>> {
        self.check_open()?;
        self.tree.format_version()
    }

    fn group(&self, path: &str) -> ContainerResult<&Group> {
        self.check_open()?;
        self.tree.group(path)
    }

    fn create_group(&mut self, path: &str) -> ContainerResult<()> {
        self.check_writable(path)?;
        self.tree.create_group(path)
    }

    fn read_dataset(&self, path: &str) -> ContainerResult<&Dataset> {
        self.check_open()?;
        self.tree.read_dataset(path)
    }

    fn write_dataset(&mut self, path: &str, dataset: Dataset) -> ContainerResult<()> {
        self.check_writable(path)?;
        self.tree.write_dataset(path, dataset)
    }

    fn attribute(&self, path: &str, key: &str) -> ContainerResult<Option<&AttrValue>> {
        self.check_open()?;
        self.tree.attribute(path, key)
    }

    fn set_attribute(&mut self, path: &str, key: &str, value: AttrValue) -> ContainerResult<()> {
        self.check_writable(path)?;
        self.tree.set_attribute(path, key, value)
    }

    fn exists(&self, path: &str) -> ContainerResult<bool> {
        self.check_open()?;
        self.tree.exists(path)
    }

    fn resolve_object_reference(&self, target: &ObjectReference) -> StoreResult<Handle> {
        if self.closed {
            return Err(StoreError::ContainerClosed);
        }
        self.tree.resolve_object_reference(target)
    }
}

impl ReferenceResolver for FileContainer {
    fn resolve_object(&self, target: &ObjectReference) -> StoreResult<Handle> {
        self.resolve_object_reference(target)
    }
}

impl Drop for FileContainer {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("failed to close container {:?}: {}", self.path, err);
        }
    }
}
