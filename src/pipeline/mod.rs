//! Pipeline stages for PDF-to-image conversion.
//!
//! ```text
//! input ──▶ render ──▶ rasterize ──▶ surface ──▶ encode
//! (bytes)   (pdfium)   (page loop)   (canvas)    (jpeg/png → base64)
//! ```
//!
//! 1. [`input`]     — resolve a path or URL to validated PDF bytes
//! 2. [`render`]    — bind pdfium, open the document, implement
//!    [`rasterize::RenderBackend`] for it; blocking, run via `spawn_blocking`
//! 3. [`rasterize`] — the strictly sequential page loop and its abort rules
//! 4. [`surface`]   — viewport maths and the reusable drawing surface
//! 5. [`encode`]    — compress the surface and wrap it as a [`crate::PageImage`]

pub mod encode;
pub mod input;
pub mod rasterize;
pub mod render;
pub mod surface;
