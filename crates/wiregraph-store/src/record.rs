//! Typed records of the objects stored under a container prefix.
//!
//! Parsing a store is a pure step: [`parse_records`] groups every
//! `<prefix>object<N>.<rest>` key by `N`, strips the object prefix, and
//! returns the groups in numeric order. Gaps in the numbering are fine and
//! `object10` sorts after `object2`. Nested objects of a stored container
//! stay inside its record as `object<M>.<rest>` attributes and are parsed
//! again with the record's prefix.

use std::collections::BTreeMap;

use regex::Regex;
use wiregraph_core::{Attributes, NodeId};

use crate::error::LoadError;
use crate::keys;
use crate::traits::KeyValueStore;

/// One stored object, with keys relative to its own prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// The `N` of `object<N>`.
    pub index: u32,
    /// Full prefix the record was read from, e.g. `object3.`.
    pub prefix: String,
    pub attributes: Attributes,
}

impl ObjectRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn type_name(&self) -> Option<&str> {
        self.get(keys::TYPE).map(str::trim).filter(|name| !name.is_empty())
    }

    /// The stored identifier, if any.
    pub fn saved_id(&self) -> Result<Option<NodeId>, LoadError> {
        match self.get(keys::ID) {
            Some(value) => parse_id(keys::ID, value).map(Some),
            None => Ok(None),
        }
    }

    /// Stored input references in slot order. `None` marks an empty slot.
    pub fn inputs(&self) -> Result<Vec<Option<NodeId>>, LoadError> {
        connection_slots(&self.attributes, keys::INPUT_CONNECTION)
    }

    /// Stored output references in slot order.
    pub fn outputs(&self) -> Result<Vec<Option<NodeId>>, LoadError> {
        connection_slots(&self.attributes, keys::OUTPUT_CONNECTION)
    }
}

/// Harvests `<stem>K` for contiguous `K`. Layouts numbering from 1 are read
/// too; their first key becomes slot 0.
pub fn connection_slots(
    attributes: &Attributes,
    stem: &str,
) -> Result<Vec<Option<NodeId>>, LoadError> {
    let start = if attributes.contains_key(&format!("{}0", stem)) {
        0
    } else {
        1
    };
    let mut slots = Vec::new();
    for k in start.. {
        let key = format!("{}{}", stem, k);
        let Some(value) = attributes.get(&key) else {
            break;
        };
        let id = parse_id(&key, value)?;
        slots.push(id.is_valid().then_some(id));
    }
    Ok(slots)
}

pub(crate) fn parse_id(key: &str, value: &str) -> Result<NodeId, LoadError> {
    value.parse::<NodeId>().map_err(|_| LoadError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Groups the store's `<prefix>object<N>.` keys into records, sorted by `N`.
pub fn parse_records(
    store: &dyn KeyValueStore,
    prefix: &str,
) -> Result<Vec<ObjectRecord>, LoadError> {
    let pattern = Regex::new(&format!(
        r"^{}{}(\d+)\.(.+)$",
        regex::escape(prefix),
        keys::OBJECT
    ))
    .map_err(|e| LoadError::InvalidValue {
        key: prefix.to_string(),
        value: e.to_string(),
    })?;

    let mut grouped: BTreeMap<u32, Attributes> = BTreeMap::new();
    for key in store.keys_matching(&pattern)? {
        let Some(captures) = pattern.captures(&key) else {
            continue;
        };
        let Ok(index) = captures[1].parse::<u32>() else {
            continue;
        };
        let Some(value) = store.find("", &key)? else {
            continue;
        };
        grouped
            .entry(index)
            .or_default()
            .insert(captures[2].to_string(), value);
    }

    Ok(grouped
        .into_iter()
        .map(|(index, attributes)| ObjectRecord {
            index,
            prefix: keys::object_prefix(prefix, index as usize),
            attributes,
        })
        .collect())
}

/// The keys stored directly under `prefix`, excluding those of its objects.
pub fn parse_own_attributes(
    store: &dyn KeyValueStore,
    prefix: &str,
) -> Result<Attributes, LoadError> {
    let pattern = Regex::new(&format!("^{}", regex::escape(prefix))).map_err(|e| {
        LoadError::InvalidValue {
            key: prefix.to_string(),
            value: e.to_string(),
        }
    })?;
    let mut attributes = Attributes::new();
    for key in store.keys_matching(&pattern)? {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };
        if rest.is_empty() || keys::is_object_key(rest) {
            continue;
        }
        if let Some(value) = store.find("", &key)? {
            attributes.insert(rest.to_string(), value);
        }
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn store(entries: &[(&str, &str)]) -> MemoryStore {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn records_sort_numerically_with_gaps() {
        let store = store(&[
            ("object10.type", "C"),
            ("object2.type", "B"),
            ("object5.type", "A"),
            ("description", "root"),
        ]);
        let records = parse_records(&store, "").unwrap();
        let order: Vec<u32> = records.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![2, 5, 10]);
        assert_eq!(records[2].type_name(), Some("C"));
        assert_eq!(records[2].prefix, "object10.");
    }

    #[test]
    fn prefix_is_escaped_and_stripped() {
        let store = store(&[
            ("chain.object1.type", "Filter"),
            ("chainXobject1.type", "Decoy"),
        ]);
        let records = parse_records(&store, "chain.").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("type"), Some("Filter"));
    }

    #[test]
    fn nested_objects_stay_in_their_record() {
        let store = store(&[
            ("object1.type", "Container"),
            ("object1.object1.type", "Filter"),
        ]);
        let records = parse_records(&store, "").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("object1.type"), Some("Filter"));

        let nested = parse_records(&store, &records[0].prefix).unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].prefix, "object1.object1.");
    }

    #[test]
    fn own_attributes_skip_objects() {
        let store = store(&[
            ("description", "root"),
            ("property.gain", "{\"Float\":2.0}"),
            ("object1.type", "Filter"),
            ("objective", "kept"),
        ]);
        let own = parse_own_attributes(&store, "").unwrap();
        let keys: Vec<&str> = own.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["description", "objective", "property.gain"]);
    }

    #[test]
    fn inputs_harvest_contiguous_slots() {
        let store = store(&[
            ("object1.input_connection0", "7"),
            ("object1.input_connection1", "-1"),
            ("object1.input_connection2", "9"),
            ("object1.input_connection4", "11"),
        ]);
        let records = parse_records(&store, "").unwrap();
        let record = &records[0];
        assert_eq!(
            record.inputs().unwrap(),
            vec![Some(NodeId(7)), None, Some(NodeId(9))]
        );
    }

    #[test]
    fn one_based_inputs_are_accepted() {
        let store = store(&[
            ("object1.input_connection1", "3"),
            ("object1.input_connection2", "4"),
        ]);
        let records = parse_records(&store, "").unwrap();
        let record = &records[0];
        assert_eq!(record.inputs().unwrap(), vec![Some(NodeId(3)), Some(NodeId(4))]);
    }

    #[test]
    fn bad_id_is_an_invalid_value() {
        let store = store(&[("object1.id", "seven")]);
        let records = parse_records(&store, "").unwrap();
        let record = &records[0];
        assert!(matches!(
            record.saved_id(),
            Err(LoadError::InvalidValue { ref key, .. }) if key == "id"
        ));
    }
}
