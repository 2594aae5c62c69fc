//! PDF page handling module

pub mod accumulate;
pub mod metadata;
pub mod create;

// Re-export commonly used items
pub use accumulate::PageAccumulator;
pub use metadata::{count_pages, extract_metadata, page_sizes, PdfMetadata};
pub use create::{compose_image_page, image_page_document};
