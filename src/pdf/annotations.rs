//! Visual markers: flags on untranslated blocks and block outlines for
//! inspecting extraction results.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, StringFormat};

use super::document::PdfDocument;
use super::geometry::BoundingBox;
use crate::errors::PdfError;

const FLAG_COLOR: [f32; 3] = [1.0, 0.0, 0.0];

/// PDF text string: literal for ASCII, UTF-16BE with a byte order mark otherwise
pub fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Put a red square annotation around a block whose original text was kept
pub fn flag_block(
    doc: &mut PdfDocument,
    page_number: u32,
    bbox: &BoundingBox,
    note: &str,
) -> Result<(), PdfError> {
    let page_id = doc.page_id(page_number)?;
    let geometry = doc.page_geometry(page_id);
    let (x, y, w, h) = geometry.to_user_rect(bbox);
    let color: Vec<Object> = FLAG_COLOR.iter().map(|c| Object::Real(*c)).collect();

    let annotation = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Square",
        "Rect" => vec![Object::Real(x), Object::Real(y), Object::Real(x + w), Object::Real(y + h)],
        "C" => color,
        "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(1)],
        "F" => Object::Integer(4),
        "T" => text_string("yaptwai"),
        "Contents" => text_string(note),
    };
    doc.add_annotation(page_id, annotation)
}

/// Draw a thin red outline around every box of a page
pub fn outline_blocks(doc: &mut PdfDocument, page_number: u32, boxes: &[BoundingBox]) -> Result<(), PdfError> {
    if boxes.is_empty() {
        return Ok(());
    }
    let page_id = doc.page_id(page_number)?;
    let geometry = doc.page_geometry(page_id);

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("RG", FLAG_COLOR.iter().map(|c| Object::Real(*c)).collect()),
        Operation::new("w", vec![Object::Real(0.5)]),
    ];
    for bbox in boxes {
        let (x, y, w, h) = geometry.to_user_rect(bbox);
        operations.push(Operation::new(
            "re",
            vec![Object::Real(x), Object::Real(y), Object::Real(w), Object::Real(h)],
        ));
        operations.push(Operation::new("S", vec![]));
    }
    operations.push(Operation::new("Q", vec![]));

    let content = Content { operations }
        .encode()
        .map_err(|e| PdfError::Save(format!("failed to encode outlines: {}", e)))?;
    doc.append_page_content(page_id, content)
}
