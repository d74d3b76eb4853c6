use std::path::PathBuf;

use anyhow::Result;

use unity_cup_terminal::import_template::{DEFAULT_TEMPLATE_NAME, write_import_template};

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_NAME));

    let rows = write_import_template(&path)?;
    println!("Wrote {} ({} example rows)", path.display(), rows);
    Ok(())
}
