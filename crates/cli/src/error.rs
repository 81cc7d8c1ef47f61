use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Input directory not found: {}", .0.display())]
    InputDirNotFound(PathBuf),

    #[error("No PDF files found in {}", .0.display())]
    NoPdfs(PathBuf),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Extraction task failed: {0}")]
    Join(String),
}
