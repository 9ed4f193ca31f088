//! Building node kinds from stored type names.

use std::collections::BTreeMap;
use std::fmt;

use wiregraph_core::config::DEFAULT_MAX_PORT_COUNT;
use wiregraph_core::{Attributes, ContainerKind, GenericKind, NodeKind, PortLayout, CONTAINER_TYPE};

use crate::keys;

/// Instantiates a node kind from its persisted type name.
///
/// `attributes` are the record's keys, relative to its prefix, for kinds
/// whose construction depends on stored state. Returning `None` marks the
/// type as unknown; the loader skips the record.
pub trait NodeFactory {
    fn create(&self, type_name: &str, attributes: &Attributes) -> Option<Box<dyn NodeKind>>;
}

type Constructor = Box<dyn Fn(&Attributes) -> Box<dyn NodeKind> + Send + Sync>;

/// A name → constructor table.
///
/// [`KindRegistry::with_builtins`] knows the built-in `Container` kind;
/// application kinds are added with [`register`](KindRegistry::register) or,
/// for kinds described only by a port layout,
/// [`register_generic`](KindRegistry::register_generic).
#[derive(Default)]
pub struct KindRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindRegistry")
            .field("types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(CONTAINER_TYPE, |_| Box::new(ContainerKind));
        registry
    }

    /// Registers `constructor` under `type_name`, replacing any earlier one.
    pub fn register<F>(&mut self, type_name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&Attributes) -> Box<dyn NodeKind> + Send + Sync + 'static,
    {
        self.constructors
            .insert(type_name.into(), Box::new(constructor));
        self
    }

    /// Registers a [`GenericKind`] with the given layout.
    pub fn register_generic(&mut self, type_name: impl Into<String>, layout: PortLayout) -> &mut Self {
        let type_name = type_name.into();
        let name = type_name.clone();
        self.register(type_name, move |_| Box::new(GenericKind::new(name.clone(), layout)))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl NodeFactory for KindRegistry {
    fn create(&self, type_name: &str, attributes: &Attributes) -> Option<Box<dyn NodeKind>> {
        self.constructors
            .get(type_name)
            .map(|constructor| constructor(attributes))
    }
}

/// Accepts every type name.
///
/// `Container` records become containers; anything else becomes a
/// [`GenericKind`] whose layout is read from the record's own port keys.
/// Tools that inspect stored graphs without knowing their kinds load
/// through this. Slot counts above `max_port_count` are read as zero; the
/// loader then rejects the record's port shape.
#[derive(Debug, Clone, Copy)]
pub struct LayoutFactory {
    pub max_port_count: usize,
}

impl Default for LayoutFactory {
    fn default() -> Self {
        LayoutFactory {
            max_port_count: DEFAULT_MAX_PORT_COUNT,
        }
    }
}

impl NodeFactory for LayoutFactory {
    fn create(&self, type_name: &str, attributes: &Attributes) -> Option<Box<dyn NodeKind>> {
        if type_name == CONTAINER_TYPE {
            return Some(Box::new(ContainerKind));
        }
        let flag = |key: &str| attributes.get(key).and_then(|v| keys::parse_bool(v)).unwrap_or(false);
        let count = |key: &str| {
            attributes
                .get(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|count| *count <= self.max_port_count)
                .unwrap_or(0)
        };
        let layout = PortLayout {
            inputs: count(keys::NUMBER_INPUTS),
            fixed_inputs: flag(keys::INPUT_LIST_FIXED),
            outputs: count(keys::NUMBER_OUTPUTS),
            fixed_outputs: flag(keys::OUTPUT_LIST_FIXED),
        };
        Some(Box::new(GenericKind::new(type_name, layout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_know_containers_only() {
        let registry = KindRegistry::with_builtins();
        let kind = registry.create("Container", &Attributes::new()).unwrap();
        assert!(kind.is_container());
        assert!(registry.create("Filter", &Attributes::new()).is_none());
    }

    #[test]
    fn generic_kinds_keep_name_and_layout() {
        let mut registry = KindRegistry::with_builtins();
        registry.register_generic("Filter", PortLayout::fixed_inputs(1));
        let kind = registry.create("Filter", &Attributes::new()).unwrap();
        assert_eq!(kind.type_name(), "Filter");
        assert_eq!(kind.port_layout(), PortLayout::fixed_inputs(1));
        assert_eq!(registry.type_names().collect::<Vec<_>>(), vec!["Container", "Filter"]);
    }

    #[test]
    fn layout_factory_reads_the_stored_shape() {
        let mut attributes = Attributes::new();
        attributes.insert("input_list_fixed".into(), "1".into());
        attributes.insert("number_inputs".into(), "2".into());
        let factory = LayoutFactory::default();
        let kind = factory.create("Blend", &attributes).unwrap();
        assert_eq!(kind.type_name(), "Blend");
        assert_eq!(kind.port_layout(), PortLayout::fixed_inputs(2));
        assert!(factory
            .create("Container", &Attributes::new())
            .unwrap()
            .is_container());

        attributes.insert("number_inputs".into(), "1000000000000".into());
        let kind = factory.create("Blend", &attributes).unwrap();
        assert_eq!(kind.port_layout().inputs, 0);
    }
}
