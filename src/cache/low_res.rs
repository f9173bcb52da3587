// SPDX-License-Identifier: GPL-3.0-only

//! Low-resolution preview sources
//!
//! Known image CDNs can resize on their side, so for those the preview is
//! a separate, much smaller request. Everything else is downsampled locally
//! from the decoded full image and recompressed as a low quality JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError, RgbaImage};

/// Rewrite `url` to request a small rendition from a recognised CDN
///
/// Returns `None` for hosts without a known resizing API.
pub fn cdn_rewrite(url: &str, max_dimension: u32, quality: u8) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let (authority, path_and_query) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => return None,
    };
    let host = authority.rsplit('@').next()?.split(':').next()?.to_ascii_lowercase();

    if host == "res.cloudinary.com" {
        let marker = "/image/upload/";
        let idx = path_and_query.find(marker)? + marker.len();
        let (head, tail) = path_and_query.split_at(idx);
        return Some(format!(
            "{}://{}{}w_{},q_{},c_limit/{}",
            scheme, authority, head, max_dimension, quality, tail
        ));
    }

    if host.ends_with(".imgix.net") || host == "images.unsplash.com" {
        let (path, query) = match path_and_query.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path_and_query, None),
        };
        let mut params: Vec<String> = query
            .into_iter()
            .flat_map(|q| q.split('&'))
            .filter(|p| !p.is_empty())
            .filter(|p| {
                let key = p.split('=').next().unwrap_or_default();
                key != "w" && key != "q"
            })
            .map(str::to_string)
            .collect();
        params.push(format!("w={}", max_dimension));
        params.push(format!("q={}", quality));
        return Some(format!("{}://{}{}?{}", scheme, authority, path, params.join("&")));
    }

    if host == "cdn.shopify.com" {
        let (path, query) = match path_and_query.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path_and_query, None),
        };
        let file_start = path.rfind('/').map_or(0, |i| i + 1);
        let dot = path[file_start..].rfind('.').map(|i| file_start + i)?;
        let resized = format!("{}_{}x{}", &path[..dot], max_dimension, &path[dot..]);
        return Some(match query {
            Some(q) => format!("{}://{}{}?{}", scheme, authority, resized, q),
            None => format!("{}://{}{}", scheme, authority, resized),
        });
    }

    None
}

/// Shrink an image to fit `max_dimension` and encode it as JPEG
///
/// Blocking; call from `spawn_blocking`. Images already within the budget
/// are only recompressed.
pub fn downsample(source: &RgbaImage, max_dimension: u32, quality: u8) -> Result<Vec<u8>, ImageError> {
    let image = DynamicImage::ImageRgba8(source.clone());
    let image = if image.width() > max_dimension || image.height() > max_dimension {
        image.thumbnail(max_dimension, max_dimension)
    } else {
        image
    };
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality.clamp(1, 100));
    encoder.encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    Ok(buffer)
}
