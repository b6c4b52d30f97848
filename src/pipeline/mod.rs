//! Conversion pipelines, one per route.
//!
//! Each submodule implements one transformation and is testable on its own
//! against mock engines.
//!
//! ## Data Flow
//!
//! ```text
//! image    ──▶ reencode ──────────────────────────────▶ encode
//! media    ──▶ media (transcoder, declarative codec args)
//! document ──▶ document (router)
//!                ├─▶ pdf_raster  (rasteriser ──▶ stack ──▶ encode)
//!                ├─▶ paginate    (render host ──▶ slice ──▶ PDF)
//!                ├─▶ screenshot  (typeset ──▶ embed ──▶ render host ──▶ encode)
//!                └─▶ typeset     (typesetter ──▶ embed ──▶ css)
//! ```
//!
//! 1. [`reencode`]   — decode and re-encode a raster image
//! 2. [`media`]      — drive the transcoder with per-target codec arguments
//! 3. [`document`]   — pick a document route and fail fast on unsupported pairs
//! 4. [`typeset`]    — direct conversion through the typesetting engine
//! 5. [`embed`]      — rewrite DOCX media references to data URIs
//! 6. [`screenshot`] — lay out HTML off-screen and capture it
//! 7. [`paginate`]   — capture page sections and assemble an A4 PDF
//! 8. [`pdf_raster`] — rasterise PDF pages into one tall JPEG
//! 9. [`encode`]     — raster encoders shared by the image-producing routes

pub mod css;
pub mod document;
pub mod embed;
pub mod encode;
pub mod media;
pub mod paginate;
pub mod pdf_raster;
pub mod reencode;
pub mod screenshot;
pub mod typeset;

#[cfg(test)]
pub(crate) mod testing;
