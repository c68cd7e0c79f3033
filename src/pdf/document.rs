//! Owned PDF document handle, page ranges and page geometry.

use log::debug;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Read;

use super::geometry::BoundingBox;
use crate::errors::PdfError;

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: &[&[u8]] = &[b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Page tree depth beyond which we stop following `Parent`
const MAX_TREE_DEPTH: usize = 32;

/// US Letter, used when a page declares no MediaBox at all
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Inclusive, 1-based page range validated against a page count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    /// Validate `start..=end` against a document with `total` pages
    pub fn new(start: u32, end: u32, total: u32) -> Result<Self, PdfError> {
        if start < 1 || end > total || end < start {
            return Err(PdfError::InvalidRange { start, end, total });
        }
        Ok(Self { start, end })
    }

    /// Resolve optional bounds, defaulting to the first and last page
    pub fn resolve(start: Option<u32>, end: Option<u32>, total: u32) -> Result<Self, PdfError> {
        Self::new(start.unwrap_or(1), end.unwrap_or(total), total)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, page: u32) -> bool {
        page >= self.start && page <= self.end
    }

    /// Page numbers in order
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }

    /// Original page number of the `index`-th (1-based) page after selection
    pub fn original_page(&self, index: u32) -> u32 {
        self.start + index - 1
    }
}

/// Page box and the conversion between PDF user space (bottom-left origin)
/// and the top-left coordinates used for blocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub media_box: [f32; 4],
}

impl PageGeometry {
    pub fn width(&self) -> f32 {
        self.media_box[2] - self.media_box[0]
    }

    pub fn height(&self) -> f32 {
        self.media_box[3] - self.media_box[1]
    }

    /// User space point to top-left page coordinates
    pub fn to_top_left(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.media_box[0], self.media_box[3] - y)
    }

    /// Top-left page coordinates to user space
    pub fn to_user_space(&self, x: f32, y: f32) -> (f32, f32) {
        (x + self.media_box[0], self.media_box[3] - y)
    }

    /// A top-left box as a user space rectangle `(x, y, width, height)`
    pub fn to_user_rect(&self, bbox: &BoundingBox) -> (f32, f32, f32, f32) {
        let (x, y) = self.to_user_space(bbox.x0, bbox.y1);
        (x, y, bbox.width(), bbox.height())
    }
}

/// A loaded document, exclusively owned by one pipeline run
#[derive(Debug)]
pub struct PdfDocument {
    doc: Document,
}

impl PdfDocument {
    /// Parse a document held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let doc = Document::load_mem(bytes).map_err(|e| PdfError::Load(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(PdfError::Load("encrypted documents are not supported".to_string()));
        }
        Ok(Self { doc })
    }

    /// Buffer a reader completely so the bytes can be parsed more than once
    pub fn read_source<R: Read>(mut reader: R) -> Result<Vec<u8>, PdfError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| PdfError::Load(format!("Failed to read input: {}", e)))?;
        Ok(bytes)
    }

    pub fn inner(&self) -> &Document {
        &self.doc
    }

    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Object id of a page by 1-based number
    pub fn page_id(&self, page_number: u32) -> Result<ObjectId, PdfError> {
        self.doc
            .get_pages()
            .get(&page_number)
            .copied()
            .ok_or_else(|| PdfError::Load(format!("page {} does not exist", page_number)))
    }

    /// Look up an attribute on the page or the nearest ancestor that has it
    pub fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let mut current = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = current.get(key) {
                return Some(resolve(&self.doc, value).clone());
            }
            let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
            current = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    pub fn page_geometry(&self, page_id: ObjectId) -> PageGeometry {
        let media_box = self
            .inherited_attribute(page_id, b"MediaBox")
            .and_then(|obj| match obj {
                Object::Array(values) if values.len() == 4 => {
                    let numbers: Vec<f32> = values.iter().filter_map(|v| number(&self.doc, v)).collect();
                    (numbers.len() == 4).then(|| {
                        [
                            numbers[0].min(numbers[2]),
                            numbers[1].min(numbers[3]),
                            numbers[0].max(numbers[2]),
                            numbers[1].max(numbers[3]),
                        ]
                    })
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_MEDIA_BOX);
        PageGeometry { media_box }
    }

    /// Resolved, possibly inherited resource dictionary (cloned)
    pub fn page_resources(&self, page_id: ObjectId) -> Dictionary {
        match self.inherited_attribute(page_id, b"Resources") {
            Some(Object::Dictionary(dict)) => dict,
            _ => Dictionary::new(),
        }
    }

    /// Concatenated, decoded content of every stream of a page
    pub fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>, PdfError> {
        let page = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| PdfError::Load(e.to_string()))?;
        let streams: Vec<&Object> = match page.get(b"Contents") {
            Ok(obj) => match resolve(&self.doc, obj) {
                Object::Array(items) => items.iter().map(|i| resolve(&self.doc, i)).collect(),
                other => vec![other],
            },
            Err(_) => Vec::new(),
        };

        let mut content = Vec::new();
        for object in streams {
            let Object::Stream(stream) = object else {
                continue;
            };
            let data = if stream.dict.has(b"Filter") {
                stream
                    .decompressed_content()
                    .map_err(|e| PdfError::Load(format!("undecodable content stream: {}", e)))?
            } else {
                stream.content.clone()
            };
            content.extend_from_slice(&data);
            content.push(b'\n');
        }
        Ok(content)
    }

    /// Replace every content stream of a page with one new stream
    pub fn set_page_content(&mut self, page_id: ObjectId, content: Vec<u8>) -> Result<(), PdfError> {
        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), content));
        self.page_dict_mut(page_id)?
            .set("Contents", Object::Reference(stream_id));
        Ok(())
    }

    /// Add a content stream drawn after the existing ones
    pub fn append_page_content(&mut self, page_id: ObjectId, content: Vec<u8>) -> Result<(), PdfError> {
        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), content));
        let existing = self
            .doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|d| d.get(b"Contents").ok().cloned());
        let contents = match existing {
            Some(obj) => {
                let mut items = match resolve(&self.doc, &obj) {
                    Object::Array(items) => items.clone(),
                    _ => vec![obj.clone()],
                };
                items.push(Object::Reference(stream_id));
                Object::Array(items)
            }
            None => Object::Reference(stream_id),
        };
        self.page_dict_mut(page_id)?.set("Contents", contents);
        Ok(())
    }

    /// Make sure the page's own resource dictionary maps a font under some
    /// name, returning that name
    pub fn register_page_font(
        &mut self,
        page_id: ObjectId,
        preferred: &str,
        font_id: ObjectId,
    ) -> Result<String, PdfError> {
        let mut resources = self.page_resources(page_id);
        let mut fonts = match resources.get(b"Font").map(|f| resolve(&self.doc, f)) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };

        for (name, value) in fonts.iter() {
            if value.as_reference().ok() == Some(font_id) {
                return Ok(String::from_utf8_lossy(name).into_owned());
            }
        }

        let mut name = preferred.to_string();
        let mut suffix = 1;
        while fonts.has(name.as_bytes()) {
            name = format!("{}{}", preferred, suffix);
            suffix += 1;
        }
        fonts.set(name.clone(), Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(fonts));
        self.page_dict_mut(page_id)?
            .set("Resources", Object::Dictionary(resources));
        Ok(name)
    }

    /// Attach an annotation dictionary to a page
    pub fn add_annotation(&mut self, page_id: ObjectId, annotation: Dictionary) -> Result<(), PdfError> {
        let annotation_id = self.doc.add_object(annotation);
        let existing = self
            .doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|d| d.get(b"Annots").ok().cloned());
        let mut annots = match existing.as_ref().map(|obj| resolve(&self.doc, obj)) {
            Some(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        annots.push(Object::Reference(annotation_id));
        self.page_dict_mut(page_id)?.set("Annots", Object::Array(annots));
        Ok(())
    }

    /// Keep only the pages of `range`, in their original order.
    ///
    /// Inherited attributes are copied onto each kept page before the page
    /// tree is flattened, then unreachable objects are dropped.
    pub fn select_pages(&mut self, range: &PageRange) -> Result<(), PdfError> {
        let total = self.page_count();
        PageRange::new(range.start(), range.end(), total)?;
        if range.start() == 1 && range.end() == total {
            return Ok(());
        }

        let pages = self.doc.get_pages();
        let kept: Vec<ObjectId> = range.pages().filter_map(|n| pages.get(&n).copied()).collect();

        for &page_id in &kept {
            for key in INHERITABLE {
                let own = self
                    .doc
                    .get_dictionary(page_id)
                    .map(|d| d.has(key))
                    .unwrap_or(false);
                if own {
                    continue;
                }
                if let Some(value) = self.inherited_attribute(page_id, key) {
                    self.page_dict_mut(page_id)?.set(key.to_vec(), value);
                }
            }
        }

        let pages_id = self.root_pages_id()?;
        for &page_id in &kept {
            self.page_dict_mut(page_id)?
                .set("Parent", Object::Reference(pages_id));
        }
        let root_pages = self
            .doc
            .get_object_mut(pages_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfError::Load(format!("page tree root is unusable: {}", e)))?;
        root_pages.set(
            "Kids",
            Object::Array(kept.iter().map(|id| Object::Reference(*id)).collect()),
        );
        root_pages.set("Count", Object::Integer(kept.len() as i64));

        let pruned = self.doc.prune_objects();
        debug!(
            "Kept pages {}-{} of {}, pruned {} objects",
            range.start(),
            range.end(),
            total,
            pruned.len()
        );
        Ok(())
    }

    /// Serialize the document
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, PdfError> {
        self.doc.compress();
        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| PdfError::Save(e.to_string()))?;
        Ok(output)
    }

    fn root_pages_id(&self) -> Result<ObjectId, PdfError> {
        let catalog = self
            .doc
            .catalog()
            .map_err(|e| PdfError::Load(format!("missing catalog: {}", e)))?;
        catalog
            .get(b"Pages")
            .and_then(Object::as_reference)
            .map_err(|e| PdfError::Load(format!("catalog has no page tree: {}", e)))
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary, PdfError> {
        self.doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfError::Load(format!("page object {:?} is unusable: {}", page_id, e)))
    }
}

/// Follow references until a direct object is reached
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    let mut current = object;
    for _ in 0..MAX_TREE_DEPTH {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => current = target,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

/// Numeric value of an integer or real object, following references
pub fn number(doc: &Document, object: &Object) -> Option<f32> {
    match resolve(doc, object) {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
