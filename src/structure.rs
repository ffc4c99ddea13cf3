use serde::ser::{Serialize, SerializeMap, Serializer};

/// Maps output field names to source metric names, e.g.
/// `{"newCases": "newCasesByPublishDate"}`.
///
/// Fields serialize in insertion order. Any other `Serialize` value that
/// produces a JSON object works as a structure descriptor too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Structure {
    fields: Vec<(String, String)>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the output field `name`, sourced from `metric`.
    pub fn field(mut self, name: impl Into<String>, metric: impl Into<String>) -> Self {
        let name = name.into();
        let metric = metric.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = metric,
            None => self.fields.push((name, metric)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Structure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, metric) in &self.fields {
            map.serialize_entry(name, metric)?;
        }
        map.end()
    }
}
