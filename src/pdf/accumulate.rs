//! Page accumulation and output writing using lopdf

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Local};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against cyclic Parent chains in broken files
const MAX_TREE_DEPTH: usize = 64;

/// Ordered collection of pages built up one document at a time.
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
///
/// Each appended document is renumbered past the objects already held, so
/// object ids never collide. Pages keep the order in which they were
/// appended, and within one document their original page order.
#[derive(Debug)]
pub struct PageAccumulator {
    /// Next free object id
    max_id: u32,
    page_ids: Vec<ObjectId>,
    objects: BTreeMap<ObjectId, Object>,
}

impl Default for PageAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PageAccumulator {
    pub fn new() -> Self {
        Self {
            max_id: 1,
            page_ids: Vec::new(),
            objects: BTreeMap::new(),
        }
    }

    /// Number of pages accumulated so far
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.page_ids.is_empty()
    }

    /// Move every page of `doc` to the end of the accumulator.
    ///
    /// Returns the number of pages appended.
    pub fn append(&mut self, mut doc: Document) -> lopdf::Result<usize> {
        let original_pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if original_pages.is_empty() {
            return Ok(0);
        }

        // Pages are re-parented below, so anything they inherit from the old
        // tree has to live on the page itself first.
        for &page_id in &original_pages {
            inline_inherited_attributes(&mut doc, page_id)?;
        }

        doc.renumber_objects_with(self.max_id);
        self.max_id = doc.max_id + 1;

        // get_pages is keyed by page number, so values come out in page order
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let count = pages.len();

        for (id, object) in doc.objects {
            if !is_tree_node(&object) {
                self.objects.insert(id, object);
            }
        }
        self.page_ids.extend(pages);

        debug!("Accumulated {} page(s), {} total", count, self.page_ids.len());
        Ok(count)
    }

    /// Build the merged document with a fresh page tree and catalog
    pub fn into_document(self) -> Document {
        let mut merged_doc = Document::with_version("1.5");

        // Add all collected objects FIRST
        merged_doc.objects.extend(self.objects);

        // new_object_id() must hand out ids above everything just added
        merged_doc.max_id = self.max_id - 1;

        let pages_id = merged_doc.new_object_id();

        let kids: Vec<Object> = self
            .page_ids
            .iter()
            .map(|&id| Object::Reference(id))
            .collect();

        let mut pages_object = Dictionary::new();
        pages_object.set("Type", Object::Name(b"Pages".to_vec()));
        pages_object.set("Count", Object::Integer(self.page_ids.len() as i64));
        pages_object.set("Kids", Object::Array(kids));

        let catalog_id = merged_doc.new_object_id();
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));

        merged_doc.objects.insert(catalog_id, Object::Dictionary(catalog));
        merged_doc.objects.insert(pages_id, Object::Dictionary(pages_object));
        merged_doc.trailer.set("Root", Object::Reference(catalog_id));

        for &page_id in &self.page_ids {
            if let Ok(Object::Dictionary(dict)) = merged_doc.get_object_mut(page_id) {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }

        let info_id = merged_doc.add_object(document_info(Local::now()));
        merged_doc.trailer.set("Info", Object::Reference(info_id));

        merged_doc
    }

    /// Serialize the accumulated pages to `output`.
    ///
    /// The document is written to a sibling temp file and renamed into place
    /// only once fully written, so a failed write never leaves a truncated
    /// file at `output`.
    pub fn write(self, output: &Path) -> Result<()> {
        let write_err = |source: std::io::Error| Error::WriteOutput {
            path: output.to_path_buf(),
            source,
        };

        let mut doc = self.into_document();
        doc.compress();

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = tempfile::Builder::new()
            .prefix(".docmerge-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(write_err)?;

        doc.save_to(&mut staged).map_err(|e| {
            write_err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        staged.as_file().sync_all().map_err(write_err)?;
        staged.persist(output).map_err(|e| write_err(e.error))?;

        Ok(())
    }
}

/// Info dictionary stamped on every merged document
fn document_info(now: DateTime<Local>) -> Dictionary {
    let mut info = Dictionary::new();
    info.set(
        "Producer",
        Object::string_literal(concat!("docmerge ", env!("CARGO_PKG_VERSION"))),
    );
    info.set("CreationDate", Object::string_literal(pdf_date(now)));
    info
}

/// Format a timestamp as a PDF date string, e.g. `D:20260114093000+01'00'`
fn pdf_date(now: DateTime<Local>) -> String {
    let offset = now.format("%z").to_string();
    let (hours, minutes) = offset.split_at(offset.len().min(3));
    format!("D:{}{}'{}'", now.format("%Y%m%d%H%M%S"), hours, minutes)
}

/// Catalog and Pages nodes of appended documents are replaced on output
fn is_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => match dict.get(b"Type") {
            Ok(Object::Name(name)) => {
                name.as_slice() == b"Catalog" || name.as_slice() == b"Pages"
            }
            _ => false,
        },
        _ => false,
    }
}

/// Look up `key` on a page, walking up the page tree if the page lacks it
pub(crate) fn find_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node_id = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Copy inheritable attributes from ancestors onto the page itself
fn inline_inherited_attributes(doc: &mut Document, page_id: ObjectId) -> lopdf::Result<()> {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();
    {
        let page = doc.get_dictionary(page_id)?;
        for key in INHERITABLE {
            if page.has(key) {
                continue;
            }
            if let Some(value) = find_inherited(doc, page_id, key) {
                inherited.push((key, value.clone()));
            }
        }
    }

    if inherited.is_empty() {
        return Ok(());
    }

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    Ok(())
}
