use std::path::Path;

use pdf_outline::Thresholds;

use crate::prelude::{println, *};

/// Load the classifier thresholds, starting from the defaults.
///
/// Keys missing from the TOML file keep their default value. The result is
/// validated so a bad file fails before any PDF is touched.
pub fn load_thresholds(path: Option<&Path>) -> Result<Thresholds> {
    let thresholds = match path {
        None => Thresholds::default(),
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| f!("failed to read config {}", path.display()))?;
            toml::from_str::<Thresholds>(&text)
                .wrap_err_with(|| f!("invalid config {}", path.display()))?
        }
    };
    thresholds.validate()?;
    log::debug!("effective thresholds: {thresholds:?}");
    Ok(thresholds)
}

/// Print the effective thresholds as TOML.
pub fn print(thresholds: &Thresholds) -> Result<()> {
    let text = toml::to_string_pretty(thresholds)
        .map_err(|e| eyre!("failed to serialize thresholds: {e}"))?;
    println!("{}", text.trim_end());
    Ok(())
}
