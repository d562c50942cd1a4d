//! The drawing surface pages are rasterised into.
//!
//! One [`Surface`] is created per conversion and reused for every page. Each
//! page re-acquires it at that page's [`Viewport`]: the pixel buffer is kept
//! when the dimensions are unchanged and reallocated in place otherwise, then
//! cleared to opaque white.

use crate::error::SurfaceError;
use crate::output::PageSize;
use image::{imageops, DynamicImage, Rgba, RgbaImage};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Pixel dimensions of one page at a zoom multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

impl Viewport {
    /// Scale a page size in points, truncating each side to whole pixels.
    pub fn for_page(size: PageSize, scale: f32) -> Self {
        Self {
            width: to_pixels(size.width_pt, scale),
            height: to_pixels(size.height_pt, scale),
            scale,
        }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

fn to_pixels(points: f32, scale: f32) -> u32 {
    let px = (f64::from(points) * f64::from(scale)).floor();
    if px.is_finite() && px > 0.0 {
        px.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// A reusable RGBA raster.
#[derive(Debug)]
pub struct Surface {
    canvas: RgbaImage,
    max_pixels: u64,
}

impl Surface {
    /// An empty surface that refuses viewports larger than `max_pixels`.
    pub fn new(max_pixels: u64) -> Self {
        Self {
            canvas: RgbaImage::new(0, 0),
            max_pixels,
        }
    }

    /// Size the surface to `viewport` and clear it.
    pub fn acquire(&mut self, viewport: &Viewport) -> Result<(), SurfaceError> {
        let (width, height) = (viewport.width, viewport.height);
        if width == 0 || height == 0 {
            return Err(SurfaceError::ZeroSized { width, height });
        }
        if viewport.pixel_count() > self.max_pixels {
            return Err(SurfaceError::TooLarge {
                width,
                height,
                max_pixels: self.max_pixels,
            });
        }

        if self.canvas.dimensions() != (width, height) {
            let bytes = usize::try_from(viewport.pixel_count() * 4)
                .map_err(|_| SurfaceError::OutOfMemory { bytes: usize::MAX })?;
            let mut buf = std::mem::replace(&mut self.canvas, RgbaImage::new(0, 0)).into_raw();
            buf.clear();
            buf.try_reserve_exact(bytes)
                .map_err(|_| SurfaceError::OutOfMemory { bytes })?;
            buf.resize(bytes, 0);
            self.canvas = RgbaImage::from_raw(width, height, buf)
                .ok_or(SurfaceError::OutOfMemory { bytes })?;
        }

        for px in self.canvas.pixels_mut() {
            *px = WHITE;
        }
        Ok(())
    }

    /// Copy a rendered page onto the surface at the origin.
    ///
    /// Pixels outside the surface are clipped.
    pub fn draw(&mut self, image: &DynamicImage) {
        let rgba = image.to_rgba8();
        imageops::replace(&mut self.canvas, &rgba, 0, 0);
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.canvas
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.canvas.as_raw().capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter() -> PageSize {
        PageSize {
            width_pt: 612.0,
            height_pt: 792.0,
        }
    }

    #[test]
    fn viewport_truncates_fractional_pixels() {
        let vp = Viewport::for_page(
            PageSize {
                width_pt: 100.5,
                height_pt: 50.9,
            },
            3.0,
        );
        assert_eq!((vp.width, vp.height), (301, 152));
    }

    #[test]
    fn letter_at_default_zoom() {
        let vp = Viewport::for_page(letter(), 3.0);
        assert_eq!((vp.width, vp.height), (1836, 2376));
    }

    #[test]
    fn negative_or_nan_sizes_become_zero() {
        let vp = Viewport::for_page(
            PageSize {
                width_pt: -5.0,
                height_pt: f32::NAN,
            },
            3.0,
        );
        assert_eq!((vp.width, vp.height), (0, 0));
    }

    #[test]
    fn acquire_clears_to_white() {
        let mut s = Surface::new(1_000_000);
        s.acquire(&Viewport::for_page(letter(), 0.1)).unwrap();
        assert_eq!(s.dimensions(), (61, 79));
        assert!(s.pixels().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn zero_area_is_refused() {
        let mut s = Surface::new(u64::MAX);
        let vp = Viewport {
            width: 0,
            height: 10,
            scale: 1.0,
        };
        assert_eq!(
            s.acquire(&vp),
            Err(SurfaceError::ZeroSized {
                width: 0,
                height: 10
            })
        );
    }

    #[test]
    fn over_budget_is_refused() {
        let mut s = Surface::new(99);
        let vp = Viewport {
            width: 10,
            height: 10,
            scale: 1.0,
        };
        assert!(matches!(
            s.acquire(&vp),
            Err(SurfaceError::TooLarge { max_pixels: 99, .. })
        ));
    }

    #[test]
    fn reacquire_reuses_buffer() {
        let mut s = Surface::new(u64::MAX);
        let big = Viewport {
            width: 40,
            height: 40,
            scale: 1.0,
        };
        let small = Viewport {
            width: 20,
            height: 10,
            scale: 1.0,
        };
        s.acquire(&big).unwrap();
        let cap = s.capacity();
        s.acquire(&small).unwrap();
        assert_eq!(s.dimensions(), (20, 10));
        assert_eq!(s.capacity(), cap);
    }

    #[test]
    fn draw_overwrites_and_clips() {
        let mut s = Surface::new(u64::MAX);
        s.acquire(&Viewport {
            width: 4,
            height: 4,
            scale: 1.0,
        })
        .unwrap();
        let red = RgbaImage::from_pixel(8, 2, Rgba([255, 0, 0, 255]));
        s.draw(&DynamicImage::ImageRgba8(red));
        assert_eq!(*s.pixels().get_pixel(3, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*s.pixels().get_pixel(3, 2), WHITE);
        assert_eq!(s.dimensions(), (4, 4));
    }
}
