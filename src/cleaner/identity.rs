//! Stable product identity

use sha2::{Digest, Sha256};

/// Hashed when a record carries none of the identity fields
pub const UNKNOWN_IDENTITY: &str = "unknown";

const ID_LEN: usize = 12;

/// Derives a stable 12-hex-character id from the identity fields
///
/// Fields are taken in the order (product_url, source_url, title, category),
/// trimmed and lowercased; absent or blank fields are skipped and the rest
/// are joined with `|` before hashing.
///
/// # Examples
///
/// ```
/// use ecomscrape::cleaner::stable_product_id;
///
/// let a = stable_product_id(Some("https://shop/p/1"), None, Some("Book 1"), None);
/// let b = stable_product_id(Some(" HTTPS://SHOP/P/1 "), None, Some("book 1"), None);
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 12);
/// ```
pub fn stable_product_id(
    product_url: Option<&str>,
    source_url: Option<&str>,
    title: Option<&str>,
    category: Option<&str>,
) -> String {
    let parts: Vec<String> = [product_url, source_url, title, category]
        .into_iter()
        .flatten()
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect();

    let base = if parts.is_empty() {
        UNKNOWN_IDENTITY.to_string()
    } else {
        parts.join("|")
    };

    let digest = hex::encode(Sha256::digest(base.as_bytes()));
    digest[..ID_LEN].to_string()
}
