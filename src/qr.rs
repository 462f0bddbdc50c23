// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! QR code rendering for share and portal links.
//!
//! Responses embed the QR image directly as a base64 SVG data URL so
//! clients can drop it into an `<img>` tag without another round trip.

use base64ct::{Base64, Encoding};
use qrcode::render::svg;
use qrcode::QrCode;

use crate::error::ApiError;

/// Brand ink color for the dark modules.
const DARK_COLOR: &str = "#134252";
const LIGHT_COLOR: &str = "#ffffff";

/// Render `contents` as an SVG QR code and wrap it in a data URL.
pub fn data_url(contents: &str) -> Result<String, ApiError> {
    let code = QrCode::new(contents.as_bytes())
        .map_err(|_| ApiError::internal("Failed to generate QR code"))?;

    let image = code
        .render::<svg::Color>()
        .min_dimensions(240, 240)
        .dark_color(svg::Color(DARK_COLOR))
        .light_color(svg::Color(LIGHT_COLOR))
        .build();

    Ok(format!(
        "data:image/svg+xml;base64,{}",
        Base64::encode_string(image.as_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_svg_data_url() {
        let url = data_url("https://paperlink.app/view/abc123").unwrap();
        let encoded = url.strip_prefix("data:image/svg+xml;base64,").unwrap();

        let svg = String::from_utf8(Base64::decode_vec(encoded).unwrap()).unwrap();
        assert!(svg.starts_with("<?xml") || svg.starts_with("<svg"));
        assert!(svg.contains(DARK_COLOR));
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = data_url("https://paperlink.app/upload/PL_3210_4821").unwrap();
        let b = data_url("https://paperlink.app/upload/PL_3210_4821").unwrap();
        assert_eq!(a, b);
    }
}
