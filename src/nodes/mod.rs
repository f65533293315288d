//! Host-facing node interface and the registry of built-in nodes.
//!
//! A host discovers nodes by identifier, reads their input and parameter
//! declarations to build its UI, and calls [`Node::apply`] with whatever the
//! user wired up. Everything numeric is delegated to [`crate::ops`].

mod builtin;
mod params;
mod registry;

pub use builtin::BuiltinNode;
pub use params::{ParamKind, ParamSpec, ParamValue, Params, Resolved};
pub use registry::NodeRegistry;

use serde::Serialize;

use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::latent::{Latent, Mask};

/// Category every built-in node is filed under.
pub const CATEGORY: &str = "latent/transform";

/// Kind of a tensor input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// A sample container.
    Latent,
    /// A spatial mask.
    Mask,
}

/// A tensor input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputSpec {
    /// Slot name as shown by the host.
    pub name: &'static str,
    /// What the slot accepts.
    pub kind: InputKind,
    /// Whether the node can run without it.
    pub optional: bool,
}

/// Tensors wired into one node call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeInputs<'a> {
    /// First (or only) latent.
    pub latent: Option<&'a Latent>,
    /// Second latent, for two-input nodes.
    pub latent_b: Option<&'a Latent>,
    /// Optional spatial mask.
    pub mask: Option<&'a Mask>,
}

impl<'a> NodeInputs<'a> {
    /// Inputs with a single latent.
    #[must_use]
    pub fn new(latent: &'a Latent) -> Self {
        Self {
            latent: Some(latent),
            ..Self::default()
        }
    }

    /// Add a second latent.
    #[must_use]
    pub fn with_latent_b(mut self, latent_b: &'a Latent) -> Self {
        self.latent_b = Some(latent_b);
        self
    }

    /// Add a mask.
    #[must_use]
    pub fn with_mask(mut self, mask: &'a Mask) -> Self {
        self.mask = Some(mask);
        self
    }

    /// The first latent, or a [`Error::MissingInput`] naming the slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the first latent was not supplied.
    pub fn latent(&self, slot: &'static str) -> Result<&'a Latent> {
        self.latent.ok_or(Error::MissingInput(slot))
    }

    /// The second latent, or a [`Error::MissingInput`] naming the slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the second latent was not supplied.
    pub fn latent_b(&self, slot: &'static str) -> Result<&'a Latent> {
        self.latent_b.ok_or(Error::MissingInput(slot))
    }
}

/// A filter a host can discover and invoke.
pub trait Node: Send + Sync {
    /// Identifier the host registers the node under.
    fn id(&self) -> &'static str;

    /// Name shown to users.
    fn display_name(&self) -> &'static str {
        self.id()
    }

    /// Menu category.
    fn category(&self) -> &'static str {
        CATEGORY
    }

    /// Tensor input slots.
    fn inputs(&self) -> &[InputSpec];

    /// Scalar and option parameters.
    fn params(&self) -> &[ParamSpec];

    /// Check parameters without running the node.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is unknown, mistyped or out of range.
    fn validate(&self, params: &Params) -> Result<()> {
        params.resolve(self.params()).map(|_| ())
    }

    /// Run the node.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, an input is missing, or the
    /// underlying operation rejects its inputs.
    fn apply(
        &self,
        inputs: &NodeInputs<'_>,
        params: &Params,
        config: &FilterConfig,
    ) -> Result<Latent>;
}
