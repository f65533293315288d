//! Identifier-to-node registry.

use std::collections::BTreeMap;

use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::latent::Latent;

use super::{builtin, Node, NodeInputs, Params};

/// Nodes keyed by their host identifier.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: Vec<Box<dyn Node>>,
    index: BTreeMap<&'static str, usize>,
}

impl NodeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in node.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for node in builtin::all() {
            // Built-in identifiers are distinct
            let id = node.id();
            registry.index.insert(id, registry.nodes.len());
            registry.nodes.push(Box::new(node));
        }
        registry
    }

    /// Register a node.
    ///
    /// # Errors
    ///
    /// Returns an error if a node with the same identifier is already registered.
    pub fn register(&mut self, node: Box<dyn Node>) -> Result<()> {
        let id = node.id();
        if self.index.contains_key(id) {
            return Err(Error::invalid("node", format!("{id:?} is already registered")));
        }
        tracing::debug!(node = id, "registering node");
        self.index.insert(id, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Look up a node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] if nothing is registered under `id`.
    pub fn get(&self, id: &str) -> Result<&dyn Node> {
        self.index
            .get(id)
            .map(|&i| &*self.nodes[i])
            .ok_or_else(|| Error::UnknownNode(id.to_string()))
    }

    /// Nodes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Node> {
        self.nodes.iter().map(|node| &**node)
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no nodes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Identifier to display name, the table hosts register alongside the nodes.
    #[must_use]
    pub fn display_names(&self) -> BTreeMap<&'static str, &'static str> {
        self.iter()
            .map(|node| (node.id(), node.display_name()))
            .collect()
    }

    /// Look up `id` and apply it.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unknown or fails.
    pub fn apply(
        &self,
        id: &str,
        inputs: &NodeInputs<'_>,
        params: &Params,
        config: &FilterConfig,
    ) -> Result<Latent> {
        self.get(id)?.apply(inputs, params, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::BuiltinNode;

    #[test]
    fn test_builtin_ids() {
        let registry = NodeRegistry::builtin();
        assert_eq!(registry.len(), 18);
        for id in [
            "LT: Multiply",
            "LT: Add",
            "LT: Blur",
            "LT: Sharpen",
            "LT: Gaussian Noise",
            "LT: Blend",
            "LT: Wave",
            "LT: Hue Shift",
            "LT: Levels",
        ] {
            assert_eq!(registry.get(id).unwrap().id(), id);
        }
        assert_eq!(registry.display_names()["LT: Blend"], "LT: Blend");
    }

    #[test]
    fn test_unknown_node() {
        let registry = NodeRegistry::builtin();
        assert!(matches!(
            registry.get("LT: Posterize"),
            Err(Error::UnknownNode(_))
        ));
    }

    #[test]
    fn test_duplicate_rejected() {
        fn passthrough(
            inputs: &NodeInputs<'_>,
            _: &crate::nodes::Resolved,
            _: &FilterConfig,
        ) -> Result<Latent> {
            Ok(inputs.latent("latent")?.clone())
        }

        let mut registry = NodeRegistry::new();
        let node = || Box::new(BuiltinNode::new("Passthrough", "Passthrough", &[], &[], passthrough));
        registry.register(node()).unwrap();
        assert!(registry.register(node()).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_defaults_validate() {
        let registry = NodeRegistry::builtin();
        for node in registry.iter() {
            assert!(node.validate(&Params::new()).is_ok(), "{}", node.id());
        }
    }
}
