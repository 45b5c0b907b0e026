use url::Url;

use crate::{Endpoint, QueryParams, RequestError};

/// Joins `base_url` and the endpoint path, then appends its query parameters.
///
/// Example: `"https://example.com"` + `"/api/test"` → `"https://example.com/api/test"`
pub fn build_url<E>(base_url: &str, endpoint: &E) -> Result<Url, RequestError>
where
    E: Endpoint + ?Sized,
{
    build_url_with(base_url, &endpoint.path(), &endpoint.query_parameters())
}

/// Same as [`build_url`] with the path and parameters given directly.
///
/// Query items already present in `path` are kept ahead of `params`. Keys and
/// values are percent-encoded, leaving only unreserved characters as-is.
pub fn build_url_with(
    base_url: &str,
    path: &str,
    params: &QueryParams,
) -> Result<Url, RequestError> {
    let full = format!("{base_url}{path}");
    let mut url = Url::parse(&full).map_err(|_| RequestError::InvalidUrl)?;
    if params.is_empty() {
        return Ok(url);
    }

    let appended = params
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(&value.to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{appended}"),
        _ => appended,
    };
    url.set_query(Some(&query));
    Ok(url)
}
