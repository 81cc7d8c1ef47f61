use std::path::Path;

use pdf_outline::Thresholds;

use crate::prelude::{println, *};

/// Print the outline of a single document as a JSON object.
pub fn extract(path: &Path, levels: bool, thresholds: &Thresholds) -> Result<()> {
    let result = pdf_outline::extract_file(path, thresholds)
        .wrap_err_with(|| f!("failed to extract {}", path.display()))?;
    println!("{}", result.to_json(levels)?);
    Ok(())
}

/// Print the Info-dictionary metadata of a document.
pub fn info(path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).wrap_err_with(|| f!("failed to read {}", path.display()))?;
    let meta = pdf_outline::info(&bytes).map_err(|e| eyre!(e))?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}
