//! PDF document loader built on lopdf
//!
//! Wraps a parsed [`lopdf::Document`] behind an owned handle that exposes the
//! handful of operations stamping needs: page count, page geometry, image
//! insertion and serialization.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{HashMap, HashSet};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::LoaderError;
use crate::geometry::{fit_keep_proportion, InsertionRect, PageGeometry};
use crate::signature::SignatureImage;
use crate::source::Source;

/// US Letter, used when no MediaBox exists anywhere in the page tree
const FALLBACK_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Prefix for XObject names registered on stamped pages
const XOBJECT_PREFIX: &str = "SigStamp";

/// An open PDF document
///
/// The handle owns the parsed document. [`PdfDocument::close`] releases it
/// early; dropping the handle releases it too.
pub struct PdfDocument {
    doc: Option<Document>,
    pages: Vec<ObjectId>,
    /// Image XObjects already embedded, keyed by source digest
    embedded: HashMap<[u8; 32], ObjectId>,
    /// Pages whose original content has been wrapped in `q`/`Q`
    isolated: HashSet<ObjectId>,
}

impl PdfDocument {
    /// Open a PDF from a path or byte buffer
    pub fn open(source: &Source) -> Result<Self, LoaderError> {
        let doc = match source {
            Source::Path(path) => Document::load(path),
            Source::Bytes(bytes) => Document::load_mem(bytes),
        }
        .map_err(|e| LoaderError::Open(e.to_string()))?;

        Ok(Self::from_document(doc))
    }

    /// Wrap an already parsed document
    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self {
            doc: Some(doc),
            pages,
            embedded: HashMap::new(),
            isolated: HashSet::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Visible width and height of a page (zero-based index)
    ///
    /// This is the CropBox clipped to the MediaBox, with width and height
    /// swapped for pages rotated by 90 or 270 degrees.
    pub fn page_geometry(&self, page_index: usize) -> Result<PageGeometry, LoaderError> {
        let doc = self.doc()?;
        let page_id = self.page_id(page_index)?;
        Ok(page_frame(doc, page_id).geometry())
    }

    /// Draw `image` inside `rect` on a page (zero-based index)
    ///
    /// `rect` uses a top-left origin on the visible page, as reported by
    /// [`PdfDocument::page_geometry`]. The image keeps its aspect ratio, is
    /// anchored at the rect's top-left corner and appears upright on
    /// rotated pages.
    pub fn insert_image(
        &mut self,
        page_index: usize,
        rect: InsertionRect,
        image: &SignatureImage,
    ) -> Result<(), LoaderError> {
        let page_id = self.page_id(page_index)?;
        let needs_isolation = !self.isolated.contains(&page_id);
        let cached = self.embedded.get(image.digest()).copied();

        let doc = self.doc_mut()?;

        let image_id = match cached {
            Some(id) => id,
            None => embed_image(doc, image),
        };

        let name = register_xobject(doc, page_id, image_id)?;

        let frame = page_frame(doc, page_id);
        let (width, height) = fit_keep_proportion(&rect, image.width(), image.height());
        let matrix = frame.image_matrix(rect.x0, rect.y0, width, height);

        let draw = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    matrix.iter().map(|v| Object::Real(*v as f32)).collect(),
                ),
                Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                Operation::new("Q", vec![]),
            ],
        };
        let draw_bytes = draw
            .encode()
            .map_err(|e| LoaderError::ImageInsert(e.to_string()))?;

        append_page_content(doc, page_id, draw_bytes, needs_isolation)?;

        self.embedded.insert(*image.digest(), image_id);
        self.isolated.insert(page_id);
        Ok(())
    }

    /// Serialize the current document state to bytes, in memory
    pub fn serialize(&mut self) -> Result<Vec<u8>, LoaderError> {
        let doc = self.doc_mut()?;
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| LoaderError::Serialize(e.to_string()))?;
        Ok(buffer)
    }

    /// Serialize through an anonymous transient file created in `dir`
    ///
    /// The file gets a random name and is removed before this returns, on
    /// both success and error. A failed removal is handed to `on_cleanup_failure`
    /// instead of failing the call.
    pub fn serialize_spooled<F>(
        &mut self,
        dir: &Path,
        on_cleanup_failure: F,
    ) -> Result<Vec<u8>, LoaderError>
    where
        F: FnOnce(&Path, &std::io::Error),
    {
        let doc = self.doc_mut()?;

        let mut spool = tempfile::Builder::new()
            .prefix("stamp-")
            .suffix(".pdf")
            .rand_bytes(16)
            .tempfile_in(dir)
            .map_err(|e| LoaderError::Serialize(format!("Failed to create spool file: {}", e)))?;

        let written = write_and_read_back(doc, spool.as_file_mut());

        let spool_path = spool.path().to_path_buf();
        if let Err(e) = spool.close() {
            on_cleanup_failure(&spool_path, &e);
        }

        written
    }

    /// Release the parsed document. Safe to call any number of times.
    pub fn close(&mut self) {
        self.doc = None;
        self.pages.clear();
        self.embedded.clear();
        self.isolated.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.doc.is_none()
    }

    fn doc(&self) -> Result<&Document, LoaderError> {
        self.doc.as_ref().ok_or(LoaderError::Closed)
    }

    fn doc_mut(&mut self) -> Result<&mut Document, LoaderError> {
        self.doc.as_mut().ok_or(LoaderError::Closed)
    }

    fn page_id(&self, page_index: usize) -> Result<ObjectId, LoaderError> {
        if self.is_closed() {
            return Err(LoaderError::Closed);
        }
        self.pages
            .get(page_index)
            .copied()
            .ok_or(LoaderError::Index {
                index: page_index,
                page_count: self.pages.len(),
            })
    }
}

/// Parse PDF bytes and return the page count
pub fn page_count(bytes: &[u8]) -> Result<usize, LoaderError> {
    let doc = Document::load_mem(bytes).map_err(|e| LoaderError::Open(e.to_string()))?;
    Ok(doc.get_pages().len())
}

fn write_and_read_back(doc: &mut Document, file: &mut std::fs::File) -> Result<Vec<u8>, LoaderError> {
    {
        let mut writer = BufWriter::new(&mut *file);
        doc.save_to(&mut writer)
            .map_err(|e| LoaderError::Serialize(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| LoaderError::Serialize(e.to_string()))?;
    }

    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut bytes))
        .map_err(|e| LoaderError::Serialize(format!("Failed to read spool file: {}", e)))?;
    Ok(bytes)
}

/// The visible area of a page and how it is turned for display
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageFrame {
    /// `[llx, lly, urx, ury]` in default user space
    visible: [f64; 4],
    /// Clockwise display rotation: 0, 90, 180 or 270
    rotate: i64,
}

impl PageFrame {
    fn geometry(&self) -> PageGeometry {
        let [llx, lly, urx, ury] = self.visible;
        let (width, height) = (urx - llx, ury - lly);
        match self.rotate {
            90 | 270 => PageGeometry::new(height, width),
            _ => PageGeometry::new(width, height),
        }
    }

    /// Map a top-left-origin point on the displayed page to user space
    fn to_user(&self, u: f64, v: f64) -> (f64, f64) {
        let [llx, lly, urx, ury] = self.visible;
        match self.rotate {
            90 => (llx + v, lly + u),
            180 => (urx - u, lly + v),
            270 => (urx - v, ury - u),
            _ => (llx + u, ury - v),
        }
    }

    /// `cm` operands that draw the unit image square as a `width` x `height`
    /// box whose displayed top-left corner is `(u, v)`
    fn image_matrix(&self, u: f64, v: f64, width: f64, height: f64) -> [f64; 6] {
        let (ox, oy) = self.to_user(u, v + height);
        let (rx, ry) = self.to_user(u + width, v + height);
        let (tx, ty) = self.to_user(u, v);
        [rx - ox, ry - oy, tx - ox, ty - oy, ox, oy]
    }
}

fn page_frame(doc: &Document, page_id: ObjectId) -> PageFrame {
    let media = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| parse_rect(doc, obj))
        .unwrap_or(FALLBACK_MEDIA_BOX);

    let visible = inherited(doc, page_id, b"CropBox")
        .and_then(|obj| parse_rect(doc, obj))
        .and_then(|crop| intersect(crop, media))
        .unwrap_or(media);

    let rotate = inherited(doc, page_id, b"Rotate")
        .and_then(|obj| extract_number(resolve(doc, obj)))
        .map(|deg| (deg as i64).rem_euclid(360))
        .filter(|deg| deg % 90 == 0)
        .unwrap_or(0);

    PageFrame { visible, rotate }
}

/// Look up a page attribute, walking up the page tree for inherited values
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    let mut visited = HashSet::new();

    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        let dict = doc.get_object(id).and_then(Object::as_dict).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}

/// Overlap of two normalised rectangles, `None` when they do not overlap
fn intersect(a: [f64; 4], b: [f64; 4]) -> Option<[f64; 4]> {
    let rect = [a[0].max(b[0]), a[1].max(b[1]), a[2].min(b[2]), a[3].min(b[3])];
    (rect[0] < rect[2] && rect[1] < rect[3]).then_some(rect)
}

/// Parse a PDF rectangle, normalising it so `ll` is the lower-left corner
fn parse_rect(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let arr = resolve(doc, obj).as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }

    let mut values = [0.0f64; 4];
    for (slot, obj) in values.iter_mut().zip(arr) {
        *slot = extract_number(resolve(doc, obj))?;
    }

    let [x1, y1, x2, y2] = values;
    Some([x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)])
}

fn extract_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Add the image (and its soft mask, if any) as XObjects
fn embed_image(doc: &mut Document, image: &SignatureImage) -> ObjectId {
    let width = image.width() as i64;
    let height = image.height() as i64;

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };

    if let Some(alpha) = image.alpha_stream() {
        let smask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            alpha.to_vec(),
        );
        let smask_id = doc.add_object(smask);
        image_dict.set("SMask", Object::Reference(smask_id));
    }

    doc.add_object(Stream::new(image_dict, image.rgb_stream().to_vec()))
}

/// Make sure the page's XObject resources reference `image_id` and return the
/// name it is registered under.
///
/// Inherited or shared resource dictionaries are copied onto the page first,
/// so other pages are never affected.
fn register_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    image_id: ObjectId,
) -> Result<String, LoaderError> {
    let mut resources = effective_resources(doc, page_id)?;

    let mut xobjects = match resources.get(b"XObject") {
        Ok(obj) => resolve(doc, obj)
            .as_dict()
            .cloned()
            .map_err(|_| LoaderError::ImageInsert("XObject resources are not a dictionary".into()))?,
        Err(_) => Dictionary::new(),
    };

    let existing = xobjects.iter().find_map(|(key, value)| match value {
        Object::Reference(id) if *id == image_id => Some(String::from_utf8_lossy(key).into_owned()),
        _ => None,
    });

    let name = match existing {
        Some(name) => name,
        None => {
            let name = (0..)
                .map(|n| format!("{}{}", XOBJECT_PREFIX, n))
                .find(|candidate| !xobjects.has(candidate.as_bytes()))
                .unwrap_or_else(|| XOBJECT_PREFIX.to_string());
            xobjects.set(name.as_bytes().to_vec(), Object::Reference(image_id));
            name
        }
    };

    resources.set("XObject", Object::Dictionary(xobjects));

    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(name)
}

/// The page's resource dictionary, own or inherited, as an owned copy
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, LoaderError> {
    let mut current = Some(page_id);
    let mut visited = HashSet::new();

    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        let dict = doc
            .get_object(id)
            .and_then(Object::as_dict)
            .map_err(|e| LoaderError::ImageInsert(format!("Page tree node is invalid: {}", e)))?;

        if let Ok(obj) = dict.get(b"Resources") {
            return resolve(doc, obj)
                .as_dict()
                .cloned()
                .map_err(|_| LoaderError::ImageInsert("Resources is not a dictionary".into()));
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(Dictionary::new())
}

/// Append a content stream to the page
///
/// The first time a page is touched, its existing content is wrapped in a
/// `q`/`Q` pair so graphics state it leaves behind cannot move the stamp.
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
    isolate: bool,
) -> Result<(), LoaderError> {
    let mut contents: Vec<Object> = {
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| LoaderError::ImageInsert(format!("Page is not a dictionary: {}", e)))?;

        match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        }
    };

    let stamp_id = if isolate && !contents.is_empty() {
        let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        contents.insert(0, Object::Reference(open_id));

        let mut closed = b"Q\n".to_vec();
        closed.extend_from_slice(&content);
        doc.add_object(Stream::new(Dictionary::new(), closed))
    } else {
        doc.add_object(Stream::new(Dictionary::new(), content))
    };
    contents.push(Object::Reference(stamp_id));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, LoaderError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| LoaderError::ImageInsert(format!("Page is not a dictionary: {}", e)))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::fixtures::png;

    fn letter_doc(pages: usize) -> PdfDocument {
        PdfDocument::open(&Source::bytes(fixtures::letter_pdf(pages))).unwrap()
    }

    #[test]
    fn test_open_counts_pages() {
        assert_eq!(letter_doc(3).page_count(), 3);
    }

    #[test]
    fn test_open_html_fails() {
        let html = b"<!DOCTYPE html><html><body>Not a PDF</body></html>";
        let result = PdfDocument::open(&Source::bytes(html.to_vec()));
        assert!(matches!(result, Err(LoaderError::Open(_))));
    }

    #[test]
    fn test_open_empty_fails() {
        assert!(matches!(
            PdfDocument::open(&Source::bytes(Vec::new())),
            Err(LoaderError::Open(_))
        ));
    }

    #[test]
    fn test_open_missing_path_fails() {
        let result = PdfDocument::open(&Source::path("/no/such/document.pdf"));
        assert!(matches!(result, Err(LoaderError::Open(_))));
    }

    #[test]
    fn test_page_geometry() {
        let pdf = fixtures::pdf_with_pages(&[(612, 792), (842, 595)]);
        let doc = PdfDocument::open(&Source::bytes(pdf)).unwrap();
        assert_eq!(doc.page_geometry(0).unwrap(), PageGeometry::new(612.0, 792.0));
        assert_eq!(doc.page_geometry(1).unwrap(), PageGeometry::new(842.0, 595.0));
    }

    #[test]
    fn test_page_geometry_out_of_range() {
        let doc = letter_doc(2);
        assert!(matches!(
            doc.page_geometry(2),
            Err(LoaderError::Index { index: 2, page_count: 2 })
        ));
    }

    #[test]
    fn test_media_box_inherited_from_parent() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 400.into(), 300.into()],
                "CropBox" => vec![50.into(), 0.into(), 350.into(), 300.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let pdf = PdfDocument::from_document(doc);
        assert_eq!(pdf.page_count(), 1);
        assert_eq!(pdf.page_geometry(0).unwrap(), PageGeometry::new(300.0, 300.0));
    }

    fn frame(visible: [f64; 4], rotate: i64) -> PageFrame {
        PageFrame { visible, rotate }
    }

    #[test]
    fn test_crop_box_limits_geometry() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "CropBox" => vec![0.into(), 392.into(), 300.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        assert_eq!(
            page_frame(&doc, page_id),
            frame([0.0, 392.0, 300.0, 792.0], 0)
        );
    }

    #[test]
    fn test_crop_box_is_clipped_to_media_box() {
        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "CropBox" => vec![(-100).into(), 0.into(), 700.into(), 500.into()],
        });
        assert_eq!(page_frame(&doc, page_id).visible, [0.0, 0.0, 612.0, 500.0]);

        // A crop box that misses the media box entirely is ignored
        let stray = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "CropBox" => vec![700.into(), 800.into(), 900.into(), 900.into()],
        });
        assert_eq!(page_frame(&doc, stray).visible, [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn test_rotate_is_normalised() {
        let mut doc = Document::with_version("1.7");
        let mut rotated = |value: Object| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Rotate" => value,
            })
        };
        let ids = [
            rotated(Object::Integer(-90)),
            rotated(Object::Integer(450)),
            rotated(Object::Integer(45)),
        ];
        let rotations: Vec<i64> = ids.iter().map(|id| page_frame(&doc, *id).rotate).collect();
        assert_eq!(rotations, vec![270, 90, 0]);
    }

    #[test]
    fn test_rotated_geometry_swaps_sides() {
        let letter = [0.0, 0.0, 612.0, 792.0];
        assert_eq!(frame(letter, 0).geometry(), PageGeometry::new(612.0, 792.0));
        assert_eq!(frame(letter, 90).geometry(), PageGeometry::new(792.0, 612.0));
        assert_eq!(frame(letter, 180).geometry(), PageGeometry::new(612.0, 792.0));
        assert_eq!(frame(letter, 270).geometry(), PageGeometry::new(792.0, 612.0));
    }

    #[test]
    fn test_displayed_top_left_maps_to_user_space() {
        let visible = [10.0, 20.0, 110.0, 220.0];
        assert_eq!(frame(visible, 0).to_user(0.0, 0.0), (10.0, 220.0));
        assert_eq!(frame(visible, 90).to_user(0.0, 0.0), (10.0, 20.0));
        assert_eq!(frame(visible, 180).to_user(0.0, 0.0), (110.0, 20.0));
        assert_eq!(frame(visible, 270).to_user(0.0, 0.0), (110.0, 220.0));
    }

    #[test]
    fn test_image_matrix_without_rotation() {
        let m = frame([0.0, 0.0, 612.0, 792.0], 0).image_matrix(412.0, 667.0, 150.0, 75.0);
        assert_eq!(m, [150.0, 0.0, 0.0, 75.0, 412.0, 50.0]);
    }

    #[test]
    fn test_image_matrix_on_quarter_turn() {
        // Displayed 792x612; the image's right edge runs up the user-space y axis
        let m = frame([0.0, 0.0, 612.0, 792.0], 90).image_matrix(0.0, 0.0, 150.0, 75.0);
        assert_eq!(m, [0.0, 150.0, -75.0, 0.0, 75.0, 0.0]);
    }

    #[test]
    fn test_parse_rect_normalises_order() {
        let doc = Document::new();
        let arr = Object::Array(vec![
            Object::Integer(612),
            Object::Integer(792),
            Object::Integer(0),
            Object::Integer(0),
        ]);
        assert_eq!(parse_rect(&doc, &arr), Some([0.0, 0.0, 612.0, 792.0]));
    }

    #[test]
    fn test_parse_rect_rejects_short_array() {
        let doc = Document::new();
        let arr = Object::Array(vec![Object::Integer(0), Object::Integer(0)]);
        assert_eq!(parse_rect(&doc, &arr), None);
    }

    #[test]
    fn test_insert_image_embeds_once() {
        let mut doc = letter_doc(3);
        let image = SignatureImage::from_bytes(&png(20, 10, [0, 0, 0, 255])).unwrap();
        let rect = InsertionRect::new(412.0, 667.0, 562.0, 742.0);
        for page in 0..3 {
            doc.insert_image(page, rect, &image).unwrap();
        }
        assert_eq!(doc.embedded.len(), 1);
        assert_eq!(doc.isolated.len(), 3);
    }

    #[test]
    fn test_insert_image_registers_xobject_on_page() {
        let mut doc = letter_doc(1);
        let image = SignatureImage::from_bytes(&png(20, 10, [0, 0, 0, 255])).unwrap();
        doc.insert_image(0, InsertionRect::new(0.0, 0.0, 150.0, 75.0), &image)
            .unwrap();

        let inner = doc.doc().unwrap();
        let page_id = doc.pages[0];
        let resources = effective_resources(inner, page_id).unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert!(xobjects.has(b"SigStamp0"));
        // Inherited fonts are carried over when resources are materialised
        assert!(resources.has(b"Font"));
    }

    #[test]
    fn test_insert_image_out_of_range() {
        let mut doc = letter_doc(1);
        let image = SignatureImage::from_bytes(&png(2, 2, [0, 0, 0, 255])).unwrap();
        let result = doc.insert_image(5, InsertionRect::new(0.0, 0.0, 1.0, 1.0), &image);
        assert!(matches!(result, Err(LoaderError::Index { .. })));
    }

    #[test]
    fn test_serialize_round_trips_page_count() {
        let mut doc = letter_doc(4);
        let bytes = doc.serialize().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(page_count(&bytes).unwrap(), 4);
    }

    #[test]
    fn test_serialize_spooled_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = letter_doc(2);
        let bytes = doc
            .serialize_spooled(dir.path(), |path, e| panic!("cleanup failed for {:?}: {}", path, e))
            .unwrap();
        assert_eq!(page_count(&bytes).unwrap(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_serialize_spooled_missing_dir_fails() {
        let mut doc = letter_doc(1);
        let result = doc.serialize_spooled(Path::new("/no/such/spool/dir"), |_, _| {});
        assert!(matches!(result, Err(LoaderError::Serialize(_))));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut doc = letter_doc(1);
        doc.close();
        doc.close();
        assert!(doc.is_closed());
        assert_eq!(doc.page_count(), 0);
        assert!(matches!(doc.page_geometry(0), Err(LoaderError::Closed)));
        assert!(matches!(doc.serialize(), Err(LoaderError::Closed)));
    }
}
