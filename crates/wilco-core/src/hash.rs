use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::WilcoError;
use crate::serde::to_canonical_json_bytes;

/// Computes a stable hexadecimal hash for the provided payload using canonical JSON ordering.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, WilcoError> {
    let bytes = to_canonical_json_bytes(value)?;
    let digest = Sha256::digest(bytes);
    Ok(format!("{:x}", digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn hash_ignores_map_insertion_order() {
        let mut a = HashMap::new();
        a.insert("m_mu", 1);
        a.insert("e", 2);
        let mut b = HashMap::new();
        b.insert("e", 2);
        b.insert("m_mu", 1);
        assert_eq!(
            stable_hash_string(&a).expect("hash"),
            stable_hash_string(&b).expect("hash")
        );
    }
}
