//! Key names of the persisted layout.
//!
//! Node keys are relative to the node's prefix. Children of a container are
//! stored under `<prefix>object<N>.` with `N` counting from 1 in child order.

pub const TYPE: &str = "type";
pub const ID: &str = "id";
pub const DESCRIPTION: &str = "description";
pub const INPUT_LIST_FIXED: &str = "input_list_fixed";
pub const OUTPUT_LIST_FIXED: &str = "output_list_fixed";
pub const NUMBER_INPUTS: &str = "number_inputs";
pub const NUMBER_OUTPUTS: &str = "number_outputs";
pub const INPUT_CONNECTION: &str = "input_connection";
pub const OUTPUT_CONNECTION: &str = "output_connection";
pub const PROPERTY_PREFIX: &str = "property.";
pub const OBJECT: &str = "object";

/// Value written for an empty port slot.
pub const EMPTY_SLOT: &str = "-1";

const RESERVED: [&str; 7] = [
    TYPE,
    ID,
    DESCRIPTION,
    INPUT_LIST_FIXED,
    OUTPUT_LIST_FIXED,
    NUMBER_INPUTS,
    NUMBER_OUTPUTS,
];

/// Prefix of the child at 1-based `position` under `prefix`.
pub fn object_prefix(prefix: &str, position: usize) -> String {
    format!("{}{}{}.", prefix, OBJECT, position)
}

pub fn input_connection(slot: usize) -> String {
    format!("{}{}", INPUT_CONNECTION, slot)
}

pub fn output_connection(slot: usize) -> String {
    format!("{}{}", OUTPUT_CONNECTION, slot)
}

pub fn property(name: &str) -> String {
    format!("{}{}", PROPERTY_PREFIX, name)
}

/// Keys a node kind must not write: they carry the node's own state.
pub fn is_reserved(key: &str) -> bool {
    RESERVED.contains(&key)
        || key.starts_with(PROPERTY_PREFIX)
        || is_indexed(key, INPUT_CONNECTION)
        || is_indexed(key, OUTPUT_CONNECTION)
        || is_object_key(key)
}

fn is_indexed(key: &str, stem: &str) -> bool {
    key.strip_prefix(stem)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Does `key` belong to a nested object (`object<N>.<rest>`)?
pub fn is_object_key(key: &str) -> bool {
    key.strip_prefix(OBJECT)
        .and_then(|rest| rest.split_once('.'))
        .is_some_and(|(digits, _)| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Parses the boolean spellings found in keyword files.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
