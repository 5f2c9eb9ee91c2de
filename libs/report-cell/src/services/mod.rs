pub mod aggregate;
pub mod export;
pub mod report;

pub use export::Attachment;
pub use report::ReportService;
