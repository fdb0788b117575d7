//! Resource and prompt providers.
//!
//! A provider exposes a list of items. Aggregators hold providers in
//! registration order: listing concatenates every provider's items (no
//! sorting, no de-duplication) and lookups go to the first provider that
//! recognises the identifier.

pub mod prompts;
pub mod resources;

use serde_json::{Map, Value};

use crate::error::{PromptError, ResourceError};

pub use prompts::{
    BoundPrompt, FilePromptProvider, PromptArgument, PromptDescriptor, PromptMessage,
    PromptTemplate, Role, StaticPromptProvider,
};
pub use resources::{
    FileResourceProvider, ResourceContent, ResourceDescriptor, StaticResource,
    StaticResourceProvider,
};

/// A source of read-only resources.
pub trait ResourceProvider: Send + Sync {
    /// Iterates the provider's descriptors.
    ///
    /// Each call starts a fresh scan.
    fn descriptors(&self) -> Box<dyn Iterator<Item = ResourceDescriptor> + '_>;

    /// Collects every descriptor.
    fn list(&self) -> Vec<ResourceDescriptor> {
        self.descriptors().collect()
    }

    /// Reads a resource by ID.
    ///
    /// Returns `Ok(None)` if this provider does not know the ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is recognised but the content cannot be
    /// read.
    fn read(&self, id: &str) -> Result<Option<ResourceContent>, ResourceError>;
}

/// A source of prompt templates.
pub trait PromptProvider: Send + Sync {
    /// Lists the prompts this provider offers.
    fn list(&self) -> Vec<PromptDescriptor>;

    /// Looks up a template by name.
    fn template(&self, name: &str) -> Option<PromptTemplate>;
}

/// Concatenation of several resource providers.
#[derive(Default)]
pub struct ResourceAggregator {
    providers: Vec<Box<dyn ResourceProvider>>,
}

impl ResourceAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider; its items are listed after those already added.
    #[must_use]
    pub fn with(mut self, provider: impl ResourceProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Returns the number of providers.
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

impl ResourceProvider for ResourceAggregator {
    fn descriptors(&self) -> Box<dyn Iterator<Item = ResourceDescriptor> + '_> {
        Box::new(self.providers.iter().flat_map(|p| p.descriptors()))
    }

    fn read(&self, id: &str) -> Result<Option<ResourceContent>, ResourceError> {
        for provider in &self.providers {
            if let Some(content) = provider.read(id)? {
                return Ok(Some(content));
            }
        }
        Ok(None)
    }
}

/// Concatenation of several prompt providers.
#[derive(Default)]
pub struct PromptAggregator {
    providers: Vec<Box<dyn PromptProvider>>,
}

impl PromptAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider.
    #[must_use]
    pub fn with(mut self, provider: impl PromptProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Finds the prompt `name` and binds `arguments` to it.
    ///
    /// Returns `None` if no provider knows the name.
    #[must_use]
    pub fn get(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Option<Result<BoundPrompt, PromptError>> {
        self.template(name).map(|template| template.bind(arguments))
    }
}

impl PromptProvider for PromptAggregator {
    fn list(&self) -> Vec<PromptDescriptor> {
        self.providers.iter().flat_map(|p| p.list()).collect()
    }

    fn template(&self, name: &str) -> Option<PromptTemplate> {
        self.providers.iter().find_map(|p| p.template(name))
    }
}
