//! Shared fixtures for stamp-core integration tests

#![allow(dead_code)]

use image::{ImageBuffer, ImageOutputFormat, Rgba};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;

/// One page of a generated test document
pub struct PageSpec {
    pub media_box: [i64; 4],
    /// Extra entries merged into the page dictionary
    pub extra: Dictionary,
}

impl PageSpec {
    pub fn sized(width: i64, height: i64) -> Self {
        Self {
            media_box: [0, 0, width, height],
            extra: Dictionary::new(),
        }
    }

    pub fn letter() -> Self {
        Self::sized(612, 792)
    }
}

pub fn build_pdf(pages: Vec<PageSpec>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for (i, spec) in pages.into_iter().enumerate() {
        let content = Content {
            operations: vec![
                // Leaves a scaled CTM behind on purpose
                Operation::new(
                    "cm",
                    vec![2.into(), 0.into(), 0.into(), 2.into(), 0.into(), 0.into()],
                ),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
                Operation::new("Td", vec![36.into(), 36.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("Page {}", i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let [x0, y0, x1, y1] = spec.media_box;
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![x0.into(), y0.into(), x1.into(), y1.into()],
            "Contents" => content_id,
        };
        for (key, value) in spec.extra.iter() {
            page.set(key.clone(), value.clone());
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn letter_pdf(pages: usize) -> Vec<u8> {
    build_pdf((0..pages).map(|_| PageSpec::letter()).collect())
}

pub fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

/// A signature image with the same 2:1 aspect ratio as the default stamp
pub fn signature_png() -> Vec<u8> {
    png(300, 150, [20, 20, 120, 255])
}

/// Stamp rectangle recovered from a signed page, in top-left coordinates
/// of the displayed page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    /// The image's top edge faces the top of the displayed page
    pub upright: bool,
}

fn number(obj: &Object) -> f64 {
    match obj {
        Object::Integer(i) => *i as f64,
        Object::Real(r) => *r as f64,
        other => panic!("expected number, got {:?}", other),
    }
}

fn page_rect(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<[f64; 4]> {
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let arr = page.get(key).ok()?.as_array().unwrap();
    let v: Vec<f64> = arr.iter().map(number).collect();
    Some([v[0].min(v[2]), v[1].min(v[3]), v[0].max(v[2]), v[1].max(v[3])])
}

/// Visible box and rotation, as set directly on the generated pages
fn page_frame(doc: &Document, page_id: ObjectId) -> ([f64; 4], i64) {
    let media = page_rect(doc, page_id, b"MediaBox").unwrap();
    let visible = page_rect(doc, page_id, b"CropBox").unwrap_or(media);
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let rotate = page
        .get(b"Rotate")
        .map(|r| r.as_i64().unwrap().rem_euclid(360))
        .unwrap_or(0);
    (visible, rotate)
}

/// User space point to top-left coordinates on the displayed page
fn to_display(frame: ([f64; 4], i64), x: f64, y: f64) -> (f64, f64) {
    let ([llx, lly, urx, ury], rotate) = frame;
    match rotate {
        90 => (y - lly, x - llx),
        180 => (urx - x, y - lly),
        270 => (ury - y, urx - x),
        _ => (x - llx, ury - y),
    }
}

fn round(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Every stamp drawn on each page, in page order
pub fn placements(pdf: &[u8]) -> Vec<Vec<Placement>> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
            let frame = page_frame(&doc, page_id);

            let mut found = Vec::new();
            let mut last_cm: Option<Vec<f64>> = None;
            for op in &content.operations {
                match op.operator.as_str() {
                    "cm" => last_cm = Some(op.operands.iter().map(number).collect()),
                    "Do" => {
                        let name = op.operands[0].as_name().unwrap();
                        if name.starts_with(b"SigStamp") {
                            let m = last_cm.clone().expect("stamp drawn without cm");
                            let corner = |s: f64, t: f64| {
                                to_display(
                                    frame,
                                    m[0] * s + m[2] * t + m[4],
                                    m[1] * s + m[3] * t + m[5],
                                )
                            };
                            let corners = [corner(0.0, 0.0), corner(1.0, 0.0), corner(0.0, 1.0), corner(1.0, 1.0)];
                            let xs = corners.iter().map(|c| c.0);
                            let ys = corners.iter().map(|c| c.1);
                            let x0 = xs.clone().fold(f64::INFINITY, f64::min);
                            let x1 = xs.fold(f64::NEG_INFINITY, f64::max);
                            let y0 = ys.clone().fold(f64::INFINITY, f64::min);
                            let y1 = ys.fold(f64::NEG_INFINITY, f64::max);

                            // Image top-left is (s, t) = (0, 1)
                            let (tl_x, tl_y) = corner(0.0, 1.0);
                            let upright = round(tl_x) == round(x0) && round(tl_y) == round(y0);

                            found.push(Placement {
                                x0: round(x0),
                                y0: round(y0),
                                x1: round(x1),
                                y1: round(y1),
                                upright,
                            });
                        }
                    }
                    _ => {}
                }
            }
            found
        })
        .collect()
}

pub fn placement(x0: f64, y0: f64, x1: f64, y1: f64) -> Placement {
    Placement {
        x0,
        y0,
        x1,
        y1,
        upright: true,
    }
}
