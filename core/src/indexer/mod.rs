pub mod ingestor;
pub mod reorg;

pub use ingestor::Ingestor;
