/*!
 * PDF translation pipeline.
 *
 * - `orchestrator`: runs extraction, translation, redaction and reinsertion page by page
 * - `progress`: integer percent progress reporting
 * - `report`: counts and per-block failures of a run
 */

pub use self::orchestrator::{PdfTranslationPipeline, PipelineConfig, PipelineOutput};
pub use self::progress::{ProgressSink, ProgressTracker};
pub use self::report::PipelineReport;

pub mod orchestrator;
pub mod progress;
pub mod report;
