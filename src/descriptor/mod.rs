//! Parameter descriptors, the registry that holds them, and catalogs that
//! build registries from YAML

mod catalog;
mod registry;
mod types;

pub use catalog::{
    Catalog, CatalogEntry, CatalogError, ContextDefaults, BUILTIN_CATALOG,
    DEFAULT_CONTEXT_KEY, DEFAULT_CONTEXT_PATTERN,
};
pub use registry::{DescriptorRegistry, RegistryError};
pub use types::{format_numeric, ParameterDescriptor, ParameterRequest};
