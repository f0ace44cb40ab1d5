//! Photo thumbnails embedded as data URIs.
//!
//! Every photo is fetched in parallel; each one either embeds or is left as
//! it was, independently of the others.

use base64::{engine::general_purpose::STANDARD, Engine};
use rayon::prelude::*;
use tracing::debug;

use crate::place::Place;
use crate::traits::{FetchedPhoto, PhotoFetcher};

pub const THUMBNAIL_MAX_WIDTH: u32 = 200;

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Blocking HTTP photo fetcher.
#[derive(Debug, Clone)]
pub struct HttpPhotoFetcher {
    client: reqwest::blocking::Client,
}

impl HttpPhotoFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

impl PhotoFetcher for HttpPhotoFetcher {
    fn fetch(&self, url: &str) -> Option<FetchedPhoto> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status());

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err.without_url(), "photo fetch failed");
                return None;
            }
        };

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let bytes = response.bytes().ok()?;
        Some(FetchedPhoto {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

/// Rewrites the `maxwidth` parameter of a photo URL.
pub fn with_max_width(url: &str, width: u32) -> String {
    rewrite_query_param(url, "maxwidth", |_| Some(width.to_string()))
}

/// Removes `key=` parameters so the URL can be shared.
pub fn strip_api_key(url: &str) -> String {
    rewrite_query_param(url, "key", |_| None)
}

/// Applies `f` to every value of `name` in the query string. Returning None
/// drops the parameter.
fn rewrite_query_param<F>(url: &str, name: &str, f: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let params: Vec<String> = query
        .split('&')
        .filter_map(|param| match param.split_once('=') {
            Some((key, value)) if key == name => f(value).map(|v| format!("{}={}", key, v)),
            _ => Some(param.to_string()),
        })
        .collect();

    if params.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, params.join("&"))
    }
}

fn data_uri(photo: &FetchedPhoto) -> String {
    format!("data:{};base64,{}", photo.content_type, STANDARD.encode(&photo.bytes))
}

/// Replaces each remote photo URL with an embedded thumbnail.
///
/// Returns how many were embedded. Places whose fetch failed keep their URL.
pub fn embed_thumbnails<F: PhotoFetcher>(places: &mut [Place], fetcher: &F) -> usize {
    let embedded: Vec<Option<String>> = places
        .par_iter()
        .map(|place| {
            let url = place.enrichment.photo_url.as_deref()?;
            if url.starts_with("data:") {
                return None;
            }
            fetcher
                .fetch(&with_max_width(url, THUMBNAIL_MAX_WIDTH))
                .map(|photo| data_uri(&photo))
        })
        .collect();

    let mut count = 0;
    for (place, uri) in places.iter_mut().zip(embedded) {
        if let Some(uri) = uri {
            place.enrichment.photo_url = Some(uri);
            count += 1;
        }
    }

    debug!(embedded = count, total = places.len(), "thumbnails embedded");
    count
}

/// Strips API keys from every photo URL that is still remote.
pub fn strip_api_keys(places: &mut [Place]) {
    for place in places.iter_mut() {
        if let Some(url) = place.enrichment.photo_url.as_mut() {
            if !url.starts_with("data:") {
                *url = strip_api_key(url);
            }
        }
    }
}
