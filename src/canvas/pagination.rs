use std::collections::HashSet;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::{CanvasTransport, RestParams};
use crate::error::AppError;

/// Extracts the `rel="next"` target from an RFC 8288 `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// Follows next links from `first_url` until the server stops sending them,
/// collecting every page's items in order.
pub async fn depaginate<T>(
    transport: &dyn CanvasTransport,
    first_url: &str,
    params: &RestParams,
    decode: impl Fn(&str) -> Result<Vec<T>, AppError>,
) -> Result<Vec<T>, AppError> {
    let mut items = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(first_url.to_string());
    let mut pages = 0usize;

    while let Some(url) = next.take() {
        if !visited.insert(url.clone()) {
            return Err(AppError::Network(format!(
                "pagination loop: {} was already fetched",
                url
            )));
        }

        let page = transport.get(&url, params).await?;
        items.extend(decode(&page.body)?);
        next = page.next_url;
        pages += 1;
    }

    debug!("depaginated {} items over {} pages from {}", items.len(), pages, first_url);
    Ok(items)
}

pub fn decode_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, AppError> {
    Ok(serde_json::from_str(body)?)
}
