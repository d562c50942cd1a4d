//! Image encoding: surface pixels → compressed bytes → base64 [`PageImage`].
//!
//! JPEG output drops the alpha channel; the surface is cleared to opaque
//! white before each page, so nothing visible is lost.

use crate::config::ImageEncoding;
use crate::output::PageImage;
use crate::pipeline::surface::Surface;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Compress the current surface contents.
pub fn encode_surface(surface: &Surface, encoding: ImageEncoding) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match encoding {
        ImageEncoding::Jpeg { quality } => {
            let rgb = DynamicImage::ImageRgba8(surface.pixels().clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;
        }
        ImageEncoding::Png => {
            surface
                .pixels()
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        }
    }
    Ok(buf)
}

/// Encode the surface as the image for `page_num`.
pub fn encode_page(
    surface: &Surface,
    encoding: ImageEncoding,
    page_num: usize,
) -> Result<PageImage, image::ImageError> {
    let bytes = encode_surface(surface, encoding)?;
    let data = STANDARD.encode(&bytes);
    let (width, height) = surface.dimensions();
    debug!(
        "Encoded page {} → {} bytes {} ({} base64)",
        page_num,
        bytes.len(),
        encoding.mime_type(),
        data.len()
    );

    Ok(PageImage {
        page_num,
        width,
        height,
        mime_type: encoding.mime_type().to_string(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::surface::Viewport;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn painted_surface(width: u32, height: u32) -> Surface {
        let mut s = Surface::new(u64::MAX);
        s.acquire(&Viewport {
            width,
            height,
            scale: 1.0,
        })
        .unwrap();
        let mut ink = RgbaImage::from_pixel(width / 2, height / 2, Rgba([10, 40, 200, 255]));
        ink.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        s.draw(&DynamicImage::ImageRgba8(ink));
        s
    }

    #[test]
    fn jpeg_page_decodes_to_surface_size() {
        let s = painted_surface(64, 48);
        let page = encode_page(&s, ImageEncoding::default(), 1).expect("encode should succeed");
        assert_eq!(page.mime_type, "image/jpeg");
        assert_eq!((page.width, page.height), (64, 48));
        assert!(!page.data.starts_with("data:"));

        let bytes = page.decode().expect("valid base64");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!(img.dimensions(), (64, 48));
    }

    #[test]
    fn png_page_is_lossless() {
        let s = painted_surface(16, 16);
        let page = encode_page(&s, ImageEncoding::Png, 3).unwrap();
        assert_eq!(page.page_num, 3);
        assert_eq!(page.mime_type, "image/png");

        let img = image::load_from_memory(&page.decode().unwrap()).unwrap().to_rgba8();
        assert_eq!(&img, s.pixels());
    }

    #[test]
    fn encoding_is_deterministic() {
        let s = painted_surface(32, 32);
        for enc in [ImageEncoding::default(), ImageEncoding::Png] {
            let a = encode_page(&s, enc, 1).unwrap();
            let b = encode_page(&s, enc, 1).unwrap();
            assert_eq!(a, b);
        }
    }
}
