//! Container module
//!
//! The hierarchical store tables and time series live in: a tree of groups
//! and datasets with attributes, persisted as one file, plus the per-session
//! registry that turns object references into live handles.

pub mod error;
pub use error::{ContainerError, ContainerResult};

pub mod interface;
pub use interface::ContainerIo;

pub mod node;
pub use node::{AttrValue, Dataset, Element, Field, Group};

pub mod memory;
pub use memory::MemoryContainer;

pub mod registry;
pub use registry::ObjectRegistry;

pub mod file;
pub use file::{FileContainer, OpenMode};
