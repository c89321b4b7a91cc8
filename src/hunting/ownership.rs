use serde::{Deserialize, Serialize};

use crate::models::ComicIdentity;

use super::identity::IdentityKey;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ownership {
    pub owned: bool,
    pub copy_count: usize,
}

/// Count owned copies sharing the candidate's identity key.
pub fn resolve_ownership(candidate: &ComicIdentity, owned_items: &[ComicIdentity]) -> Ownership {
    let key = IdentityKey::from(candidate);
    resolve_ownership_by_key(&key, owned_items)
}

pub fn resolve_ownership_by_key(key: &IdentityKey, owned_items: &[ComicIdentity]) -> Ownership {
    let copy_count = owned_items
        .iter()
        .filter(|item| IdentityKey::from(*item) == *key)
        .count();

    Ownership {
        owned: copy_count > 0,
        copy_count,
    }
}
