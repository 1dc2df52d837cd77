//! Page/per-page translation into backend query strings

use super::types::Address;

/// Append `page` and `per_page` query parameters to an un-paginated base path
///
/// A parameter is only written when its argument is present; absence means
/// "use the backend default". Parameters are appended, never merged with an
/// existing query string, so callers pass the bare resource path.
pub fn paginate(base: &str, page: Option<u32>, per_page: Option<u32>) -> Address {
    let mut address = base.to_string();
    let mut separator = if base.contains('?') { '&' } else { '?' };

    if let Some(page) = page {
        address.push(separator);
        address.push_str(&format!("page={}", page));
        separator = '&';
    }

    if let Some(per_page) = per_page {
        address.push(separator);
        address.push_str(&format!("per_page={}", per_page));
    }

    Address::new(address)
}
