use serde::Serialize;

/// Placeholder values produced by matching one input against one template.
///
/// Keeps template order so previews list variables the way the user wrote them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariableBinding {
    values: Vec<(String, String)>,
}

impl VariableBinding {
    /// Bind `name`, replacing any earlier value.
    pub fn insert(&mut self, name: String, value: String) {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
