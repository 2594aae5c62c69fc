//! Integration tests for the docmerge library

use docmerge::convert::{DocumentConverter, SlideDeckApp, SlideDeckSession};
use docmerge::pdf::{count_pages, page_sizes};
use docmerge::{
    merge_files, ConversionError, FileOutcome, MergeJob, MergeOptions, Merger,
};
use image::RgbImage;
use lopdf::{Dictionary, Document, Object, Stream};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// Write a PDF with one page per entry in `widths`. The page width tags
/// each page so the merged order can be checked.
fn write_pdf(path: &Path, widths: &[i64]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for &width in widths {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"0 0 m".to_vec()));
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width),
                Object::Integer(500),
            ]),
        );
        page.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(kids.len() as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.save(path).expect("Failed to write fixture PDF");
}

fn widths_of(path: &Path) -> Vec<i64> {
    page_sizes(path)
        .expect("Failed to read page sizes")
        .into_iter()
        .map(|(w, _)| w.round() as i64)
        .collect()
}

/// Converter standing in for an office suite: writes a fixed PDF
struct FixedPdfConverter {
    widths: Vec<i64>,
    calls: Rc<RefCell<Vec<PathBuf>>>,
}

impl DocumentConverter for FixedPdfConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        self.calls.borrow_mut().push(input.to_path_buf());
        write_pdf(output, &self.widths);
        Ok(())
    }
}

/// Slide deck app whose export writes a fixed PDF, recording the lifecycle
struct FixedSlideApp {
    widths: Vec<i64>,
    fail_export: bool,
    events: Rc<RefCell<Vec<&'static str>>>,
}

struct FixedSlideSession {
    widths: Vec<i64>,
    fail_export: bool,
    events: Rc<RefCell<Vec<&'static str>>>,
}

impl SlideDeckApp for FixedSlideApp {
    fn launch(&self, _workdir: &Path) -> Result<Box<dyn SlideDeckSession>, ConversionError> {
        self.events.borrow_mut().push("launch");
        Ok(Box::new(FixedSlideSession {
            widths: self.widths.clone(),
            fail_export: self.fail_export,
            events: Rc::clone(&self.events),
        }))
    }
}

impl SlideDeckSession for FixedSlideSession {
    fn open_hidden(&mut self, _presentation: &Path) -> Result<(), ConversionError> {
        self.events.borrow_mut().push("open");
        Ok(())
    }

    fn export_pdf(&mut self, output: &Path) -> Result<(), ConversionError> {
        self.events.borrow_mut().push("export");
        if self.fail_export {
            return Err(ConversionError::Automation("export failed".to_string()));
        }
        write_pdf(output, &self.widths);
        Ok(())
    }

    fn close_presentation(&mut self) {
        self.events.borrow_mut().push("close");
    }

    fn quit(&mut self) {
        self.events.borrow_mut().push("quit");
    }
}

struct Setup {
    inputs: TempDir,
    temp_root: TempDir,
}

impl Setup {
    fn new() -> Self {
        Self {
            inputs: TempDir::new().expect("Failed to create temp directory"),
            temp_root: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    fn pdf(&self, name: &str, widths: &[i64]) -> PathBuf {
        let path = self.inputs.path().join(name);
        write_pdf(&path, widths);
        path
    }

    fn image(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.inputs.path().join(name);
        RgbImage::new(width, height).save(&path).expect("Failed to write image");
        path
    }

    fn text(&self, name: &str) -> PathBuf {
        let path = self.inputs.path().join(name);
        std::fs::write(&path, "plain text").expect("Failed to write file");
        path
    }

    fn output(&self) -> PathBuf {
        self.inputs.path().join("merged.pdf")
    }

    fn options(&self) -> MergeOptions {
        MergeOptions {
            temp_root: Some(self.temp_root.path().to_path_buf()),
            ..MergeOptions::default()
        }
    }

    fn workspace_gone(&self) -> bool {
        std::fs::read_dir(self.temp_root.path())
            .expect("temp root readable")
            .next()
            .is_none()
    }
}

#[test]
fn test_merge_pdfs_page_count_and_order() {
    let setup = Setup::new();
    let inputs = vec![
        setup.pdf("1. first.pdf", &[101]),
        setup.pdf("2. second.pdf", &[201, 202, 203]),
        setup.pdf("3. third.pdf", &[301, 302]),
    ];

    let (ok, message) = merge_files(&inputs, setup.output());
    assert!(ok, "{}", message);

    assert_eq!(count_pages(&setup.output()).unwrap(), 6);
    assert_eq!(
        widths_of(&setup.output()),
        vec![101, 201, 202, 203, 301, 302]
    );
}

#[test]
fn test_reordering_inputs_reorders_pages() {
    let setup = Setup::new();
    let a = setup.pdf("a.pdf", &[11, 12]);
    let b = setup.pdf("b.pdf", &[21]);

    let forward = setup.inputs.path().join("forward.pdf");
    let backward = setup.inputs.path().join("backward.pdf");

    assert!(merge_files(&[a.clone(), b.clone()], &forward).0);
    assert!(merge_files(&[b, a], &backward).0);

    assert_eq!(widths_of(&forward), vec![11, 12, 21]);
    assert_eq!(widths_of(&backward), vec![21, 11, 12]);
}

#[test]
fn test_merge_empty_input_list() {
    let setup = Setup::new();
    let no_inputs: Vec<PathBuf> = Vec::new();
    let (ok, message) = merge_files(&no_inputs, setup.output());

    assert!(!ok);
    assert!(message.contains("No files"), "{}", message);
    assert!(!setup.output().exists());
}

#[test]
fn test_all_unsupported_inputs_write_nothing() {
    let setup = Setup::new();
    let job = MergeJob::new(
        vec![setup.text("notes.txt"), setup.text("legacy.doc")],
        setup.output(),
    );

    let outcome = Merger::new(setup.options()).run(&job);

    assert!(!outcome.success());
    assert!(outcome.message().contains("No valid pages"));
    assert_eq!(outcome.report.warnings().count(), 2);
    assert!(!setup.output().exists());
    assert!(setup.workspace_gone());
}

#[test]
fn test_unsupported_file_is_skipped_with_warning() {
    let setup = Setup::new();
    let notes = setup.text("notes.txt");
    let job = MergeJob::new(
        vec![setup.pdf("two.pdf", &[50, 60]), notes.clone()],
        setup.output(),
    );

    let outcome = Merger::new(setup.options()).run(&job);

    assert!(outcome.success(), "{}", outcome.message());
    assert_eq!(count_pages(&setup.output()).unwrap(), 2);

    let warnings: Vec<_> = outcome.report.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].path, notes);
    assert!(matches!(warnings[0].outcome, FileOutcome::Skipped { .. }));
    assert!(setup.workspace_gone());
}

#[test]
fn test_workspace_removed_on_success_and_failure() {
    let setup = Setup::new();

    let ok_job = MergeJob::new(vec![setup.image("photo.png", 40, 30)], setup.output());
    let outcome = Merger::new(setup.options()).run(&ok_job);
    assert!(outcome.success());
    let workspace = outcome.report.workspace.clone().expect("workspace was created");
    assert!(!workspace.exists());

    let failing_job = MergeJob::new(vec![setup.text("broken.png")], setup.output());
    let outcome = Merger::new(setup.options()).run(&failing_job);
    assert!(!outcome.success());
    let workspace = outcome.report.workspace.clone().expect("workspace was created");
    assert!(!workspace.exists());
    assert!(setup.workspace_gone());
}

#[test]
fn test_image_page_matches_pixel_size() {
    let setup = Setup::new();
    let inputs = vec![setup.image("photo.png", 800, 600)];

    let (ok, message) = merge_files(&inputs, setup.output());
    assert!(ok, "{}", message);

    let sizes = page_sizes(&setup.output()).unwrap();
    assert_eq!(sizes, vec![(800.0, 600.0)]);
}

#[test]
fn test_jpeg_input() {
    let setup = Setup::new();
    let photo = setup.image("photo.JPG", 64, 48);

    let (ok, message) = merge_files(&[photo], setup.output());
    assert!(ok, "{}", message);
    assert_eq!(page_sizes(&setup.output()).unwrap(), vec![(64.0, 48.0)]);
}

#[test]
fn test_jpeg_with_png_extension() {
    let setup = Setup::new();
    let path = setup.inputs.path().join("phone-export.png");
    RgbImage::new(30, 20)
        .save_with_format(&path, image::ImageFormat::Jpeg)
        .expect("Failed to write image");

    let (ok, message) = merge_files(&[path], setup.output());
    assert!(ok, "{}", message);
    assert_eq!(page_sizes(&setup.output()).unwrap(), vec![(30.0, 20.0)]);
}

#[test]
fn test_mixed_inputs_with_converters() {
    let setup = Setup::new();
    let report = setup.text("report.docx");
    let deck = setup.text("deck.pptx");
    let calls = Rc::new(RefCell::new(Vec::new()));
    let events = Rc::new(RefCell::new(Vec::new()));

    let merger = Merger::with_converters(
        setup.options(),
        Box::new(FixedPdfConverter {
            widths: vec![401, 402],
            calls: Rc::clone(&calls),
        }),
        Box::new(FixedSlideApp {
            widths: vec![501, 502, 503],
            fail_export: false,
            events: Rc::clone(&events),
        }),
    );

    let job = MergeJob::new(
        vec![
            setup.pdf("cover.pdf", &[100]),
            report.clone(),
            setup.image("figure.png", 300, 200),
            deck,
        ],
        setup.output(),
    );
    let outcome = merger.run(&job);

    assert!(outcome.success(), "{}", outcome.message());
    assert_eq!(outcome.report.total_pages, 7);
    assert_eq!(
        widths_of(&setup.output()),
        vec![100, 401, 402, 300, 501, 502, 503]
    );
    assert_eq!(*calls.borrow(), vec![report]);
    assert_eq!(*events.borrow(), vec!["launch", "open", "export", "close", "quit"]);
    assert!(setup.workspace_gone());
}

#[test]
fn test_failed_slide_export_releases_session_and_continues() {
    let setup = Setup::new();
    let events = Rc::new(RefCell::new(Vec::new()));

    let merger = Merger::with_converters(
        setup.options(),
        Box::new(FixedPdfConverter {
            widths: vec![],
            calls: Rc::new(RefCell::new(Vec::new())),
        }),
        Box::new(FixedSlideApp {
            widths: vec![],
            fail_export: true,
            events: Rc::clone(&events),
        }),
    );

    let job = MergeJob::new(
        vec![setup.text("deck.ppt"), setup.pdf("after.pdf", &[77])],
        setup.output(),
    );
    let outcome = merger.run(&job);

    assert!(outcome.success(), "{}", outcome.message());
    assert_eq!(widths_of(&setup.output()), vec![77]);
    assert!(matches!(
        outcome.report.files[0].outcome,
        FileOutcome::Failed { error: ConversionError::Automation(_) }
    ));
    assert_eq!(*events.borrow(), vec!["launch", "open", "export", "close", "quit"]);
}

#[test]
fn test_inputs_sharing_a_stem_both_contribute() {
    let setup = Setup::new();
    let sub_a = setup.inputs.path().join("a");
    let sub_b = setup.inputs.path().join("b");
    std::fs::create_dir_all(&sub_a).unwrap();
    std::fs::create_dir_all(&sub_b).unwrap();

    let first = sub_a.join("scan.png");
    let second = sub_b.join("scan.png");
    RgbImage::new(10, 10).save(&first).unwrap();
    RgbImage::new(20, 20).save(&second).unwrap();

    let (ok, message) = merge_files(&[first, second], setup.output());
    assert!(ok, "{}", message);
    assert_eq!(widths_of(&setup.output()), vec![10, 20]);
}

#[test]
fn test_unwritable_output_reports_failure() {
    let setup = Setup::new();
    let inputs = vec![setup.pdf("one.pdf", &[10])];
    let output = setup.inputs.path().join("no-such-dir").join("merged.pdf");

    let (ok, message) = merge_files(&inputs, &output);

    assert!(!ok);
    assert!(message.contains("Failed to write output file"), "{}", message);
    assert!(!output.exists());
}

#[test]
fn test_output_is_replaced_atomically() {
    let setup = Setup::new();
    std::fs::write(setup.output(), b"previous contents").unwrap();

    let inputs = vec![setup.pdf("one.pdf", &[10, 20])];
    let (ok, message) = merge_files(&inputs, setup.output());
    assert!(ok, "{}", message);
    assert_eq!(widths_of(&setup.output()), vec![10, 20]);
}
