//! End-to-end pipeline tests: fixture HTML through extraction,
//! normalization, and reconciliation into a scratch database.

use url::Url;

use bookdex::repository::{run_migrations, AsyncSqlitePool, CategoryRepository, ProductRepository};
use bookdex::scrapers::static_html::extract_from_html;
use bookdex::scrapers::ContentType;
use bookdex::services::Reconciler;

const LISTING_PAGE: &str = r#"
<html><body>
  <nav>
    <a href="/category/fiction">Fiction</a>
    <a href="/category/science">Science</a>
  </nav>
  <div class="results">
    <div class="product-card">
      <h3><a href="/products/dune">Dune</a></h3>
      <span class="author">by Frank Herbert</span>
      <span class="price">£12.50</span>
      <span class="rating">4.5 out of 5</span>
      <img src="/images/dune.jpg" alt="Dune">
    </div>
    <div class="product-card">
      <h3><a href="/products/emma">Emma</a></h3>
      <span class="author">Jane Austen</span>
      <span class="price">£8.99</span>
    </div>
    <div class="product-card">
      <h3><a href="/products/neuromancer">Neuromancer</a></h3>
      <span class="price">not a price</span>
    </div>
    <div class="product-card">
      <span class="price">£3.00</span>
    </div>
  </div>
</body></html>
"#;

const DETAIL_PAGE: &str = r#"
<html><body>
  <h2 class="product-title">Dune</h2>
  <span class="author">Frank Herbert</span>
  <span class="price">£11.00</span>
  <table>
    <tr><th>ISBN-13</th><td>9780441013593</td></tr>
    <tr><th>Publisher</th><td>Ace Books</td></tr>
    <tr><th>Pages</th><td>412</td></tr>
  </table>
  <div class="synopsis">Melange is everything on Arrakis.</div>
  <div class="review">
    <span class="reviewer">Paul</span>
    <span class="rating">5 stars</span>
    <p>Changed how I read science fiction. Verified Purchase.</p>
  </div>
  <div class="review">
    <span class="reviewer">Gurney</span>
    <span class="rating">4 stars</span>
    <p>Long but worth it.</p>
  </div>
</body></html>
"#;

async fn scratch_db(dir: &tempfile::TempDir) -> AsyncSqlitePool {
    let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));
    run_migrations(&pool).await.unwrap();
    pool
}

#[tokio::test]
async fn test_listing_page_to_persisted_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let pool = scratch_db(&dir).await;
    let categories = CategoryRepository::new(pool.clone());
    let products = ProductRepository::new(pool);
    let reconciler = Reconciler::new(categories.clone(), products.clone());

    let base = Url::parse("https://shop.example.com/category/fiction").unwrap();

    let scraped_categories: Vec<_> = extract_from_html(ContentType::Categories, LISTING_PAGE, &base, false)
        .into_iter()
        .filter_map(|r| r.as_category().cloned())
        .collect();
    assert_eq!(scraped_categories.len(), 2);

    let outcome = reconciler.reconcile_categories(&scraped_categories).await;
    assert_eq!(outcome.saved.len(), 2);
    assert!(outcome.errors.is_empty());

    let fiction = categories
        .find_by_slug("fiction")
        .await
        .unwrap()
        .expect("fiction category persisted");

    // Three cards have usable titles; the title-less fourth is dropped.
    let scraped_products: Vec<_> = extract_from_html(ContentType::Products, LISTING_PAGE, &base, false)
        .into_iter()
        .filter_map(|r| r.as_product().cloned())
        .collect();
    assert_eq!(scraped_products.len(), 3);

    let outcome = reconciler
        .reconcile_products(fiction.id, &scraped_products)
        .await
        .unwrap();
    assert_eq!(outcome.saved.len(), 3);
    assert!(outcome.errors.is_empty());

    let (stored, total) = products.list(Some(fiction.id), 1, 50).await.unwrap();
    assert_eq!(total, 3);

    let dune = stored.iter().find(|p| p.title == "Dune").unwrap();
    assert_eq!(dune.author.as_deref(), Some("Frank Herbert"));
    assert_eq!(dune.price, Some(12.50));
    assert_eq!(dune.rating, Some(4.5));
    assert_eq!(
        dune.source_url.as_deref(),
        Some("https://shop.example.com/products/dune")
    );

    // Unparsable price degrades that one field, not the record.
    let neuromancer = stored.iter().find(|p| p.title == "Neuromancer").unwrap();
    assert_eq!(neuromancer.price, None);
}

#[tokio::test]
async fn test_rescrape_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let pool = scratch_db(&dir).await;
    let categories = CategoryRepository::new(pool.clone());
    let products = ProductRepository::new(pool);
    let reconciler = Reconciler::new(categories.clone(), products.clone());

    let base = Url::parse("https://shop.example.com/category/fiction").unwrap();
    let scraped_categories: Vec<_> = extract_from_html(ContentType::Categories, LISTING_PAGE, &base, false)
        .into_iter()
        .filter_map(|r| r.as_category().cloned())
        .collect();
    let scraped_products: Vec<_> = extract_from_html(ContentType::Products, LISTING_PAGE, &base, false)
        .into_iter()
        .filter_map(|r| r.as_product().cloned())
        .collect();

    reconciler.reconcile_categories(&scraped_categories).await;
    let fiction = categories.find_by_slug("fiction").await.unwrap().unwrap();
    let first = reconciler
        .reconcile_products(fiction.id, &scraped_products)
        .await
        .unwrap();

    // Same page again: rows update in place, no duplicates.
    reconciler.reconcile_categories(&scraped_categories).await;
    let second = reconciler
        .reconcile_products(fiction.id, &scraped_products)
        .await
        .unwrap();

    let first_ids: Vec<i32> = first.saved.iter().map(|p| p.id).collect();
    let second_ids: Vec<i32> = second.saved.iter().map(|p| p.id).collect();
    assert_eq!(first_ids, second_ids);

    let (_, total) = products.list(None, 1, 50).await.unwrap();
    assert_eq!(total, 3);
    let all = categories.list().await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_detail_page_refreshes_product_and_reviews() {
    let dir = tempfile::tempdir().unwrap();
    let pool = scratch_db(&dir).await;
    let categories = CategoryRepository::new(pool.clone());
    let products = ProductRepository::new(pool);
    let reconciler = Reconciler::new(categories.clone(), products.clone());

    let base = Url::parse("https://shop.example.com/category/fiction").unwrap();
    let scraped_categories: Vec<_> = extract_from_html(ContentType::Categories, LISTING_PAGE, &base, false)
        .into_iter()
        .filter_map(|r| r.as_category().cloned())
        .collect();
    let scraped_products: Vec<_> = extract_from_html(ContentType::Products, LISTING_PAGE, &base, false)
        .into_iter()
        .filter_map(|r| r.as_product().cloned())
        .collect();
    reconciler.reconcile_categories(&scraped_categories).await;
    let fiction = categories.find_by_slug("fiction").await.unwrap().unwrap();
    reconciler
        .reconcile_products(fiction.id, &scraped_products)
        .await
        .unwrap();

    let detail_url = Url::parse("https://shop.example.com/products/dune").unwrap();
    let detailed = extract_from_html(ContentType::ProductDetail, DETAIL_PAGE, &detail_url, false)
        .into_iter()
        .find_map(|r| r.as_product().cloned())
        .expect("detail page yields a product");
    let bundle = detailed.detail.as_ref().expect("extended bundle present");
    assert_eq!(bundle.isbn13.as_deref(), Some("9780441013593"));
    assert_eq!(bundle.pages, Some(412));
    assert_eq!(bundle.reviews.len(), 2);

    let updated = reconciler
        .upsert_product(fiction.id, &detailed)
        .await
        .unwrap();
    assert_eq!(updated.price, Some(11.00));
    assert_eq!(updated.publisher.as_deref(), Some("Ace Books"));

    let stored = reconciler
        .replace_reviews(updated.id, &bundle.reviews)
        .await
        .unwrap();
    assert_eq!(stored, 2);

    let reviews = products.list_reviews(updated.id).await.unwrap();
    assert_eq!(reviews.len(), 2);
    let paul = reviews
        .iter()
        .find(|r| r.reviewer_name.as_deref() == Some("Paul"))
        .unwrap();
    assert_eq!(paul.rating, 5);
    assert!(paul.is_verified_purchase);

    // No duplicate products after the detail refresh.
    let (_, total) = products.list(Some(fiction.id), 1, 50).await.unwrap();
    assert_eq!(total, 3);
}
