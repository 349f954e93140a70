pub mod extract;
pub mod search;
pub mod summarizer;

pub use search::{ArxivSearch, PaperSearch};
pub use summarizer::{PdfSummarizer, Summarizer};
