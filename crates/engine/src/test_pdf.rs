//! Synthetic PDF builder for tests.
//!
//! Builds a minimal but structurally valid document with `lopdf` so tests
//! never depend on binary fixtures or a native rendering library.

use lopdf::{dictionary, Document, Object, Stream};

/// Build a PDF with `page_count` empty pages, each with the given
/// MediaBox dimensions in points.
pub fn synthetic_pdf(page_count: usize, width_pt: f32, height_pt: f32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let mut page_ids = Vec::with_capacity(page_count);
    for _ in 0..page_count {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width_pt),
                Object::Real(height_pt),
            ],
            "Contents" => Object::Reference(content_id),
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(page_count as i64),
    });

    for page_id in &page_ids {
        if let Ok(page_obj) = doc.get_object_mut(*page_id) {
            if let Ok(dict) = page_obj.as_dict_mut() {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("synthetic PDF should serialize");
    bytes
}
