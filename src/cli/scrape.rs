//! Scrape commands: categories, product listings, product detail.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::repository::{run_migrations, AsyncSqlitePool};
use crate::services::IngestService;

/// Open the database and build the ingest service. Migrations are
/// idempotent, so every command runs them up front.
async fn open_ingest(settings: &Settings) -> anyhow::Result<IngestService> {
    std::fs::create_dir_all(&settings.data_dir)?;
    let pool = AsyncSqlitePool::from_path(&settings.database_path());
    run_migrations(&pool).await?;
    Ok(IngestService::new(settings.clone(), pool))
}

fn print_errors(errors: &[String]) {
    for error in errors {
        eprintln!("  {} {}", style("✗").red(), error);
    }
}

/// Scrape the origin's category index.
pub async fn cmd_scrape_categories(settings: &Settings) -> anyhow::Result<()> {
    let ingest = open_ingest(settings).await?;

    println!(
        "{} Scraping categories from {}",
        style("→").cyan(),
        settings.origin.base_url
    );

    let outcome = ingest.scrape_categories().await?;
    for category in &outcome.saved {
        println!("  {} {} ({})", style("✓").green(), category.name, category.slug);
    }
    print_errors(&outcome.errors);

    println!(
        "{} {} categories saved, {} errors",
        style("✓").green(),
        outcome.saved.len(),
        outcome.errors.len()
    );
    Ok(())
}

/// Scrape product listings for the named categories, or every known
/// category with `--all`.
pub async fn cmd_scrape_products(
    settings: &Settings,
    categories: &[String],
    all: bool,
) -> anyhow::Result<()> {
    let ingest = open_ingest(settings).await?;

    let targets: Vec<String> = if all {
        ingest
            .categories()
            .list()
            .await?
            .into_iter()
            .map(|c| c.slug)
            .collect()
    } else {
        categories.to_vec()
    };

    if targets.is_empty() {
        anyhow::bail!("no categories specified (name one, or use --all after `scrape categories`)");
    }

    let pb = ProgressBar::new(targets.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut total_saved = 0;
    let mut total_errors = 0;
    for target in &targets {
        pb.set_message(target.clone());
        match ingest.scrape_products(target).await {
            Ok(outcome) => {
                total_saved += outcome.saved.len();
                total_errors += outcome.errors.len();
                if !outcome.errors.is_empty() {
                    pb.suspend(|| print_errors(&outcome.errors));
                }
            }
            Err(e) => {
                total_errors += 1;
                pb.suspend(|| eprintln!("  {} {}: {}", style("✗").red(), target, e));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!(
        "{} {} products saved across {} categories, {} errors",
        style("✓").green(),
        total_saved,
        targets.len(),
        total_errors
    );
    Ok(())
}

/// Scrape one product's detail page.
pub async fn cmd_scrape_detail(settings: &Settings, product_id: i32) -> anyhow::Result<()> {
    let ingest = open_ingest(settings).await?;

    let product = ingest.scrape_product_detail(product_id).await?;
    println!(
        "{} Refreshed {} ({})",
        style("✓").green(),
        product.title,
        product
            .author
            .as_deref()
            .unwrap_or("unknown author")
    );
    if let Some(price) = product.price {
        let currency = product.currency.as_deref().unwrap_or("GBP");
        println!("  Price:  {} {:.2}", currency, price);
    }
    if let Some(rating) = product.rating {
        println!("  Rating: {:.1} ({} reviews)", rating, product.review_count);
    }

    Ok(())
}
