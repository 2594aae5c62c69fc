//! PDF metadata extraction

use std::path::Path;
use lopdf::{Document, Object};
use crate::error::{Error, Result};
use crate::pdf::accumulate::find_inherited;

/// Count pages by reading the Count field from the root Pages dictionary
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let pages_id = doc
        .catalog()?
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("Catalog has no Pages reference".to_string()))?;

    let count = doc
        .get_dictionary(pages_id)?
        .get(b"Count")
        .map_err(|_| Error::General("No Count in Pages".to_string()))?;

    match count {
        Object::Integer(n) if *n >= 0 => Ok(*n as usize),
        _ => Err(Error::General("Count is not a valid integer".to_string())),
    }
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Page sizes in points (width, height), in page order
    pub page_sizes: Vec<(f32, f32)>,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Producing application (if present)
    pub producer: Option<String>,
}

/// Read a text entry from the trailer's Info dictionary
fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info_id = doc.trailer.get(b"Info").and_then(Object::as_reference).ok()?;
    let bytes = doc.get_dictionary(info_id).ok()?.get(key).ok()?.as_str().ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;

    let page_count = count_pages_from_catalog(&doc)?;
    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(PdfMetadata {
        page_count,
        page_sizes: document_page_sizes(&doc),
        title: info_string(&doc, b"Title"),
        author: info_string(&doc, b"Author"),
        producer: info_string(&doc, b"Producer"),
    })
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation that reads the Count field from the Pages dictionary.
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(page_count)
}

/// Page sizes of a PDF file in points, in page order
pub fn page_sizes(path: &Path) -> Result<Vec<(f32, f32)>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let doc = Document::load(path)?;
    Ok(document_page_sizes(&doc))
}

/// Width and height of each page's MediaBox. Pages without a readable
/// MediaBox report (0, 0).
pub(crate) fn document_page_sizes(doc: &Document) -> Vec<(f32, f32)> {
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            find_inherited(doc, page_id, b"MediaBox")
                .and_then(|media_box| media_box_size(doc, media_box))
                .unwrap_or((0.0, 0.0))
        })
        .collect()
}

fn media_box_size(doc: &Document, media_box: &Object) -> Option<(f32, f32)> {
    let media_box = match media_box {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let values: Vec<f32> = media_box
        .as_array()
        .ok()?
        .iter()
        .map(|v| v.as_float())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match values.as_slice() {
        [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_document;
    use tempfile::TempDir;

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_extract_metadata_nonexistent_file() {
        let result = extract_metadata(Path::new("nonexistent.pdf"));
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_metadata_of_saved_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("three.pdf");
        sample_document(&[100, 200, 300]).save(&path).unwrap();

        assert_eq!(count_pages(&path).unwrap(), 3);

        let metadata = extract_metadata(&path).unwrap();
        assert_eq!(metadata.page_count, 3);
        assert_eq!(
            metadata.page_sizes,
            vec![(100.0, 792.0), (200.0, 792.0), (300.0, 792.0)]
        );
        assert!(metadata.title.is_none());
    }
}
