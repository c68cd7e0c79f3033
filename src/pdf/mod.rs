/*!
 * PDF reading and editing.
 *
 * - `document`: the owned document, page ranges and page geometry
 * - `interpreter`: content stream interpretation shared by extraction and redaction
 * - `extract`: grouping of glyphs into text blocks
 * - `redact`: removal of the text layer under boxes
 * - `reinsert`: drawing translated text into boxes
 * - `embed`, `shaping`, `layout`: fonts, right-to-left shaping and fitting
 * - `annotations`: flags on untranslated blocks and debug outlines
 */

pub use self::document::{PageGeometry, PageRange, PdfDocument};
pub use self::extract::{Block, BlockExtractor, ExtractOptions};
pub use self::geometry::BoundingBox;
pub use self::interpreter::GlyphRef;
pub use self::redact::{RedactionOptions, RedactionOutcome, Redactor};
pub use self::reinsert::{LayoutStrategy, ReinsertOptions, RenderDirective, RenderedBox, Reinserter};
pub use self::shaping::Direction;

pub mod annotations;
pub mod cmap;
pub mod document;
pub mod embed;
pub mod encoding;
pub mod extract;
pub mod fonts;
pub mod geometry;
pub mod interpreter;
pub mod layout;
pub mod redact;
pub mod reinsert;
pub mod shaping;
