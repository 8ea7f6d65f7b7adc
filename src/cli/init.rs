//! Initialize command.

use console::style;

use crate::config::Settings;
use crate::repository::{run_migrations, AsyncSqlitePool};

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    std::fs::create_dir_all(&settings.data_dir)?;

    let pool = AsyncSqlitePool::from_path(&settings.database_path());
    run_migrations(&pool).await?;

    println!(
        "{} Initialized BookDex in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!("  Database: {}", settings.database_path().display());
    println!("  Origin:   {}", settings.origin.base_url);

    Ok(())
}
