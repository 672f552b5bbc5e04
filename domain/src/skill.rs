use std::collections::BTreeSet;

use crate::store::Store;

/// Every skill listed on any profile, deduplicated and sorted.
pub fn all(store: &Store) -> Vec<String> {
    store
        .users
        .iter()
        .flat_map(|entry| entry.value().skills.clone())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
