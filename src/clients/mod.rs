pub mod arxiv_client;
pub mod llm_client;
pub mod pdf_client;

pub use arxiv_client::ArxivClient;
pub use llm_client::LlmClient;
pub use pdf_client::PdfFetcher;
