use pcs_core::pointcloud::{CloudHeader, GenericValue};

/// Overrides or adds header-level attributes over a source header.
///
/// The attribute list is the source's own list plus any names introduced
/// purely by the alias map, appended in first-seen order with no
/// duplicates. Lookups prefer the alias map over the source.
pub struct AliasHeader {
    src: Box<dyn CloudHeader>,
    aliases: Vec<(String, GenericValue)>,
    names: Vec<String>,
    source_len: usize,
}

impl AliasHeader {
    pub fn new(
        src: Box<dyn CloudHeader>,
        aliases: impl IntoIterator<Item = (String, GenericValue)>,
    ) -> Self {
        let mut deduped: Vec<(String, GenericValue)> = Vec::new();
        for (name, value) in aliases {
            match deduped.iter_mut().find(|(n, _)| *n == name) {
                Some((_, existing)) => *existing = value,
                None => deduped.push((name, value)),
            }
        }

        let mut names = src.attribute_list();
        let source_len = names.len();
        for (name, _) in &deduped {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }

        AliasHeader {
            src,
            aliases: deduped,
            names,
            source_len,
        }
    }

    fn alias(&self, name: &str) -> Option<&GenericValue> {
        self.aliases.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl CloudHeader for AliasHeader {
    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        let name = self.names.get(id)?;
        if let Some(value) = self.alias(name) {
            return Some(value.clone());
        }
        if id < self.source_len {
            return self.src.attribute_by_id(id);
        }
        None
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        if let Some(value) = self.alias(name) {
            return Some(value.clone());
        }
        self.src.attribute_by_name(name)
    }

    fn attribute_list(&self) -> Vec<String> {
        self.names.clone()
    }

    fn expected_point_count(&self) -> i64 {
        self.src.expected_point_count()
    }
}
