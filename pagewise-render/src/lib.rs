//! Rendering for the original-PDF view: a pdfium-backed document provider
//! and highlight painting for rendered pages.

pub mod highlight;
#[cfg(feature = "pdf")]
mod pdfium;

pub use highlight::{encode_png, paint_highlights, write_png};
#[cfg(feature = "pdf")]
pub use pdfium::{PdfiumProvider, PDFIUM_LIBRARY_ENV};
