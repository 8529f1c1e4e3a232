use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A value that can live in a [`Registry`]
pub trait RegistryEntry {
    fn key(&self) -> &str;
}

/// Bidirectional key/index mapping preserving insertion order.
///
/// Change-sets only append, so an index handed out once stays valid until
/// the next snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registry<T> {
    entries: Vec<T>,
    #[serde(skip)]
    indices: HashMap<String, usize>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            indices: HashMap::new(),
        }
    }
}

impl<T: RegistryEntry> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry in document order
    pub fn from_entries(entries: impl IntoIterator<Item = T>) -> Self {
        let mut registry = Self::new();
        registry.extend_from(entries);
        registry
    }

    /// Adds a value, returning its index.
    ///
    /// A key that is already registered keeps its index; the stored value is
    /// replaced in place.
    pub fn add(&mut self, value: T) -> usize {
        if let Some(&index) = self.indices.get(value.key()) {
            self.entries[index] = value;
            return index;
        }
        let index = self.entries.len();
        self.indices.insert(value.key().to_string(), index);
        self.entries.push(value);
        index
    }

    /// Appends values without disturbing existing indices
    pub fn extend_from(&mut self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.add(value);
        }
    }

    pub fn for_key(&self, key: &str) -> Option<&T> {
        self.indices.get(key).map(|&index| &self.entries[index])
    }

    pub fn for_index(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.indices.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.indices.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(RegistryEntry::key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A person issues can be assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub key: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    pub name: String,
}

impl Assignee {
    /// Display initials: first and last word initials, or the first two
    /// letters of a single-word name
    pub fn initials(&self) -> String {
        let words: Vec<&str> = self.name.split_whitespace().collect();
        let initials: String = match words.as_slice() {
            [] => self.key.chars().take(2).collect(),
            [single] => single.chars().take(2).collect(),
            [first, .., last] => first.chars().take(1).chain(last.chars().take(1)).collect(),
        };
        initials.to_uppercase()
    }
}

impl RegistryEntry for Assignee {
    fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

impl RegistryEntry for Priority {
    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueType {
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

impl RegistryEntry for IssueType {
    fn key(&self) -> &str {
        &self.name
    }
}

/// A component, label or fix-version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiSelectValue {
    pub name: String,
}

impl MultiSelectValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RegistryEntry for MultiSelectValue {
    fn key(&self) -> &str {
        &self.name
    }
}

/// One selectable value of a custom field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub key: String,
    pub value: String,
}

impl RegistryEntry for CustomFieldValue {
    fn key(&self) -> &str {
        &self.key
    }
}

/// A named custom field with its own value registry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomField {
    pub name: String,
    pub values: Registry<CustomFieldValue>,
}

impl CustomField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Registry::new(),
        }
    }
}

impl RegistryEntry for CustomField {
    fn key(&self) -> &str {
        &self.name
    }
}

/// A per-project auxiliary workflow field with a fixed option list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelTask {
    pub code: String,
    pub name: String,
    pub options: Vec<String>,
}

impl ParallelTask {
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }
}

impl RegistryEntry for ParallelTask {
    fn key(&self) -> &str {
        &self.code
    }
}

/// All board-wide reference data
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceData {
    pub assignees: Registry<Assignee>,
    pub priorities: Registry<Priority>,
    pub issue_types: Registry<IssueType>,
    pub components: Registry<MultiSelectValue>,
    pub labels: Registry<MultiSelectValue>,
    pub fix_versions: Registry<MultiSelectValue>,
    pub custom_fields: Registry<CustomField>,
}

impl ReferenceData {
    pub fn custom_field(&self, name: &str) -> Option<&CustomField> {
        self.custom_fields.for_key(name)
    }

    /// Appends values to a custom field, creating the field if it is new
    pub fn extend_custom_field(
        &mut self,
        name: &str,
        values: impl IntoIterator<Item = CustomFieldValue>,
    ) {
        let index = match self.custom_fields.index_of(name) {
            Some(index) => index,
            None => self.custom_fields.add(CustomField::new(name)),
        };
        if let Some(field) = self.custom_fields.entries.get_mut(index) {
            field.values.extend_from(values);
        }
    }
}
