use sha2::{Digest, Sha256};

use crate::utils::text::normalize;

/// SHA-256 hex digest of the normalised `title|employer|region` triple.
pub fn vacancy_fingerprint(title: &str, employer: &str, region: &str) -> String {
    let material = format!(
        "{}|{}|{}",
        normalize(title),
        normalize(employer),
        normalize(region)
    );
    hex::encode(Sha256::digest(material.as_bytes()))
}
