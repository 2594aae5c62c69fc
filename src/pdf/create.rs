//! Single-page PDF creation from raster images

use std::path::Path;

use image::{ColorType, DynamicImage, GenericImageView, ImageReader};
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::debug;

use crate::error::ConversionError;

/// Resource name the image is drawn under
const IMAGE_NAME: &str = "Im0";

fn image_xobject_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

/// Build a one-page document whose page is exactly the image's pixel size,
/// one point per pixel, with the image filling the page.
///
/// Grayscale images stay grayscale; an alpha channel becomes a soft mask.
pub fn image_page_document(image: &DynamicImage) -> Document {
    let (width, height) = image.dimensions();
    let color = image.color();

    let grayscale = matches!(
        color,
        ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16
    );
    let (color_space, samples) = if grayscale {
        ("DeviceGray", image.to_luma8().into_raw())
    } else {
        ("DeviceRGB", image.to_rgb8().into_raw())
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut image_dict = image_xobject_dict(width, height, color_space);
    if color.has_alpha() {
        let alpha: Vec<u8> = image.to_rgba8().pixels().map(|p| p[3]).collect();
        let mask_id = doc.add_object(Stream::new(
            image_xobject_dict(width, height, "DeviceGray"),
            alpha,
        ));
        image_dict.set("SMask", Object::Reference(mask_id));
    }
    let image_id = doc.add_object(Stream::new(image_dict, samples));

    let content = format!("q\n{} 0 0 {} 0 0 cm\n/{} Do\nQ\n", width, height, IMAGE_NAME);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut xobjects = Dictionary::new();
    xobjects.set(IMAGE_NAME, Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width as i64),
            Object::Integer(height as i64),
        ]),
    );
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));
    let page_id = doc.add_object(page);

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(1));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc
}

/// Decode the image at `image_path` and save it as a single-page PDF at
/// `output`. Returns the image's pixel dimensions.
///
/// The decoded image is dropped before the PDF is written.
pub fn compose_image_page(image_path: &Path, output: &Path) -> Result<(u32, u32), ConversionError> {
    let (dimensions, mut doc) = {
        let image = ImageReader::open(image_path)?.with_guessed_format()?.decode()?;
        let dimensions = image.dimensions();
        if dimensions.0 == 0 || dimensions.1 == 0 {
            return Err(ConversionError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "image has zero width or height",
            )));
        }
        (dimensions, image_page_document(&image))
    };

    doc.compress();
    doc.save(output)?;

    debug!(
        "Composed {}x{} page from {}",
        dimensions.0,
        dimensions.1,
        image_path.display()
    );
    Ok(dimensions)
}
