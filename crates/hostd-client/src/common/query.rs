//! Query utilities for the hostd API
//!
//! Provides helpers for building query strings and reducing resource URLs
//! to names.

/// Append `params` to `path` as a query string, skipping empty values
pub fn with_query(path: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}

/// Path of a named resource below a collection, with the name escaped
pub fn resource_path(collection: &str, name: &str) -> String {
    format!("{}/{}", collection, urlencoding::encode(name))
}

/// Last path segment of a resource URL, decoded
pub fn last_segment(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or(url);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// Reduce a list of resource URLs (`/1.0/cluster/members/node1`) to names
pub fn names_from_urls(urls: &[String]) -> Vec<String> {
    urls.iter()
        .map(|url| {
            let segment = last_segment(url);
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .collect()
}
