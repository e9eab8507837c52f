use crate::model::{CatalogItem, Lead};

/// Records that can be filtered by a free-text query.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

/// Case-insensitive substring match. A blank query matches everything.
pub fn matches(query: &str, fields: &[&str]) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields.iter().any(|f| f.to_lowercase().contains(&needle))
}

pub fn filter<'a, T: Searchable>(records: &'a [T], query: &str) -> Vec<&'a T> {
    records
        .iter()
        .filter(|r| matches(query, &r.search_fields()))
        .collect()
}

impl Searchable for CatalogItem {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.sku.as_deref());
        fields.extend(self.unit.as_deref());
        fields
    }
}

impl Searchable for Lead {
    fn search_fields(&self) -> Vec<&str> {
        let c = &self.customer;
        let mut fields = vec![c.name.as_str()];
        fields.extend(c.phone.as_deref());
        fields.extend(c.email.as_deref());
        fields.extend(c.gstin.as_deref());
        fields
    }
}
