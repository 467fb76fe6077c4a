//! DescriptorRegistry: the catalog of known parameters

use super::types::{ParameterDescriptor, ParameterRequest};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised by registry lookups
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Descriptor not found: {0}")]
    DescriptorNotFound(String),
}

/// Maps descriptor keys to descriptors, remembering registration order
#[derive(Debug, Clone, Default)]
pub struct DescriptorRegistry {
    descriptors: HashMap<String, ParameterDescriptor>,
    order: Vec<String>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor, replacing any previous one with the same key
    ///
    /// A replaced descriptor keeps its original position in [`Self::keys`].
    pub fn register(&mut self, descriptor: ParameterDescriptor) {
        if !self.descriptors.contains_key(&descriptor.key) {
            self.order.push(descriptor.key.clone());
        }
        self.descriptors.insert(descriptor.key.clone(), descriptor);
    }

    pub fn get(&self, key: &str) -> Option<&ParameterDescriptor> {
        self.descriptors.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.descriptors.contains_key(key)
    }

    /// Clone a descriptor into a session request
    ///
    /// With `value` the request modifies the parameter, without it the
    /// request only reads.
    pub fn instantiate(
        &self,
        key: &str,
        value: Option<&str>,
    ) -> Result<ParameterRequest, RegistryError> {
        let descriptor = self
            .descriptors
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::DescriptorNotFound(key.to_string()))?;
        Ok(match value {
            Some(value) => ParameterRequest::modify(descriptor, value),
            None => ParameterRequest::read(descriptor),
        })
    }

    /// Keys in registration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|k| k.as_str())
    }

    /// Descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.order.iter().filter_map(|k| self.descriptors.get(k))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
