//! Integration tests for the scrape pipeline
//!
//! These tests use wiremock to create mock listing sites and run the full
//! plan, fetch, parse, clean and export cycle end-to-end.

use ecomscrape::config::{parse_config, ConfigFormat, SiteConfig};
use ecomscrape::crawler::{Coordinator, RunOptions, RunStage};
use ecomscrape::output::{
    filter_products, load_snapshot, ExportFormat, FileSink, MemorySink, ProductQuery,
    LATEST_SNAPSHOT_FILE,
};
use std::collections::HashSet;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Two-item listing in the books.toscrape.com layout
const BOOKS_PAGE: &str = r#"<html><body><ol class="row">
  <li><article class="product_pod">
    <h3><a href="catalogue/a-light-in-the-attic_1000/index.html" title="A Light in the Attic">A Light in the ...</a></h3>
    <p class="star-rating Three"></p>
    <div class="product_price">
      <p class="price_color">£51.77</p>
      <p class="instock availability"><i class="icon-ok"></i> In stock </p>
    </div>
  </article></li>
  <li><article class="product_pod">
    <h3><a href="catalogue/tipping-the-velvet_999/index.html" title="Tipping the Velvet">Tipping the Velvet</a></h3>
    <p class="star-rating Five"></p>
    <div class="product_price">
      <p class="price_color">£45.17</p>
      <p class="instock availability"><i class="icon-ok"></i> In stock </p>
    </div>
  </article></li>
</ol></body></html>"#;

/// Builds a YAML site config pointing at the mock server
fn books_config(base: &str, start_urls: &[String], extra: &str) -> SiteConfig {
    let urls: String = start_urls
        .iter()
        .map(|url| format!("  - \"{}\"\n", url))
        .collect();

    let yaml = format!(
        r#"
site_name: books
base_url: "{base}/"
currency: GBP
start_urls:
{urls}
request:
  timeout: 5
  max_retries: 0
  backoff_factor: 0
parsing:
  product_container: article.product_pod
  fields:
    name:
      selector: h3 a
      attribute: title
    url:
      selector: h3 a
      attribute: href
      join_base_url: true
    price_current:
      selector: .price_color
    availability:
      selector: .availability
    rating:
      selector: p.star-rating
      attribute: class
{extra}
"#
    );

    parse_config(&yaml, ConfigFormat::Yaml).unwrap()
}

fn numbered_page(n: usize, next: Option<&str>) -> String {
    let next_link = next
        .map(|href| format!(r#"<ul class="pager"><li class="next"><a href="{}">next</a></li></ul>"#, href))
        .unwrap_or_default();

    format!(
        r#"<html><body>
        <article class="product_pod"><h3><a href="p{n}-a.html" title="Page {n} A">a</a></h3><p class="price_color">£{n}.00</p></article>
        <article class="product_pod"><h3><a href="p{n}-b.html" title="Page {n} B">b</a></h3><p class="price_color">£{n}.50</p></article>
        {next_link}
        </body></html>"#
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_item_fixture_end_to_end() {
    let server = MockServer::start().await;
    mount_page(&server, "/index.html", BOOKS_PAGE.to_string(), 1).await;

    let config = books_config(
        &server.uri(),
        &[format!("{}/index.html", server.uri())],
        "",
    );

    let mut coordinator = Coordinator::new(config, RunOptions::default()).unwrap();
    let mut sink = MemorySink::new();
    let report = coordinator.run(&mut sink).await.unwrap();

    let products = sink.products();
    assert_eq!(products.len(), 2);

    let ids: HashSet<&str> = products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(products.iter().all(|p| p.id.len() == 12));

    assert_eq!(products[0].price_current, Some(51.77));
    assert_eq!(products[1].price_current, Some(45.17));
    assert_eq!(products[0].rating, Some(3.0));
    assert_eq!(products[1].rating, Some(5.0));
    assert!(products
        .iter()
        .all(|p| p.availability.as_deref() == Some("in_stock")));

    assert_eq!(products[0].title.as_deref(), Some("A Light in the Attic"));
    assert_eq!(
        products[0].product_url.as_deref(),
        Some(format!("{}/catalogue/a-light-in-the-attic_1000/index.html", server.uri()).as_str())
    );
    assert_eq!(products[0].currency.as_deref(), Some("GBP"));
    assert_eq!(products[0].category, "unknown");
    assert_eq!(products[0].scraped_at, products[1].scraped_at);

    assert_eq!(report.stage, RunStage::Done);
    assert_eq!(report.fetch.successes, 1);
    assert_eq!(report.fetch.failures, 0);
}

#[tokio::test]
async fn test_ids_stable_across_runs() {
    let server = MockServer::start().await;
    mount_page(&server, "/index.html", BOOKS_PAGE.to_string(), 2).await;
    let start = vec![format!("{}/index.html", server.uri())];

    let mut first = MemorySink::new();
    Coordinator::new(books_config(&server.uri(), &start, ""), RunOptions::default())
        .unwrap()
        .run(&mut first)
        .await
        .unwrap();

    let mut second = MemorySink::new();
    Coordinator::new(books_config(&server.uri(), &start, ""), RunOptions::default())
        .unwrap()
        .run(&mut second)
        .await
        .unwrap();

    let first_ids: Vec<&str> = first.products().iter().map(|p| p.id.as_str()).collect();
    let second_ids: Vec<&str> = second.products().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn test_format_pagination_fetches_each_page() {
    let server = MockServer::start().await;
    for n in 1..=3 {
        mount_page(&server, &format!("/page-{}.html", n), numbered_page(n, None), 1).await;
    }

    let extra = format!(
        r#"pagination:
  mode: format
  url_template: "{}/page-{{}}.html"
  start: 1
  end: 3"#,
        server.uri()
    );
    let config = books_config(&server.uri(), &[server.uri()], &extra);

    let mut sink = MemorySink::new();
    let report = Coordinator::new(config, RunOptions::default())
        .unwrap()
        .run(&mut sink)
        .await
        .unwrap();

    assert_eq!(report.pages_planned, 3);
    let names: Vec<&str> = sink
        .products()
        .iter()
        .filter_map(|p| p.name.as_deref())
        .collect();
    assert_eq!(
        names,
        vec!["Page 1 A", "Page 1 B", "Page 2 A", "Page 2 B", "Page 3 A", "Page 3 B"]
    );
}

#[tokio::test]
async fn test_link_pagination_reuses_discovered_pages() {
    let server = MockServer::start().await;
    // Each page is fetched exactly once: during discovery, never again
    mount_page(&server, "/catalogue/page-1.html", numbered_page(1, Some("page-2.html")), 1).await;
    mount_page(&server, "/catalogue/page-2.html", numbered_page(2, Some("page-3.html")), 1).await;
    mount_page(&server, "/catalogue/page-3.html", numbered_page(3, Some("page-1.html")), 1).await;

    let extra = r#"pagination:
  mode: link
  next_selector: li.next a
  max_pages: 10"#;
    let config = books_config(
        &server.uri(),
        &[format!("{}/catalogue/page-1.html", server.uri())],
        extra,
    );

    let mut sink = MemorySink::new();
    let report = Coordinator::new(config, RunOptions::default())
        .unwrap()
        .run(&mut sink)
        .await
        .unwrap();

    assert_eq!(report.pages_planned, 3);
    assert_eq!(report.pages_with_html, 3);
    assert_eq!(sink.products().len(), 6);
    assert_eq!(report.fetch.successes, 3);
}

#[tokio::test]
async fn test_config_cap_truncates_and_stops() {
    let server = MockServer::start().await;
    mount_page(&server, "/p1", numbered_page(1, None), 1).await;
    mount_page(&server, "/p2", numbered_page(2, None), 1).await;
    mount_page(&server, "/p3", numbered_page(3, None), 0).await;

    let start: Vec<String> = (1..=3).map(|n| format!("{}/p{}", server.uri(), n)).collect();
    let config = books_config(&server.uri(), &start, "max_products: 3");

    let mut sink = MemorySink::new();
    let report = Coordinator::new(config, RunOptions::default())
        .unwrap()
        .run(&mut sink)
        .await
        .unwrap();

    assert_eq!(sink.products().len(), 3);
    assert_eq!(report.collection, RunStage::Capped);
    assert_eq!(report.pages_with_html, 2);
}

#[tokio::test]
async fn test_dry_run_touches_first_page_only() {
    let server = MockServer::start().await;
    mount_page(&server, "/p1", numbered_page(1, None), 1).await;
    mount_page(&server, "/p2", numbered_page(2, None), 0).await;

    let start: Vec<String> = (1..=2).map(|n| format!("{}/p{}", server.uri(), n)).collect();
    let config = books_config(&server.uri(), &start, "");
    let options = RunOptions {
        dry_run: true,
        ..RunOptions::default()
    };

    let mut sink = MemorySink::new();
    let report = Coordinator::new(config, options)
        .unwrap()
        .run(&mut sink)
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.raw_records, 2);
    assert!(sink.batches.is_empty());
}

#[tokio::test]
async fn test_concurrent_fetch_collects_every_page() {
    let server = MockServer::start().await;
    for n in 1..=4 {
        mount_page(&server, &format!("/p{}", n), numbered_page(n, None), 1).await;
    }
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut start: Vec<String> = (1..=4).map(|n| format!("{}/p{}", server.uri(), n)).collect();
    start.push(format!("{}/broken", server.uri()));

    let mut config = books_config(&server.uri(), &start, "");
    config.request.max_workers = 3;

    let mut sink = MemorySink::new();
    let report = Coordinator::new(config, RunOptions::default())
        .unwrap()
        .run(&mut sink)
        .await
        .unwrap();

    // Completion order is unspecified, so compare as a set
    let names: HashSet<String> = sink
        .products()
        .iter()
        .filter_map(|p| p.name.clone())
        .collect();
    assert_eq!(names.len(), 8);
    assert!(names.contains("Page 4 B"));
    assert_eq!(report.pages_with_html, 4);
    assert_eq!(report.fetch.failures, 1);
}

#[tokio::test]
async fn test_file_sink_export_and_snapshot_query() {
    let server = MockServer::start().await;
    mount_page(&server, "/index.html", BOOKS_PAGE.to_string(), 1).await;
    let output = tempfile::TempDir::new().unwrap();

    let config = books_config(
        &server.uri(),
        &[format!("{}/index.html", server.uri())],
        "",
    );
    let mut sink = FileSink::new(
        vec![
            ExportFormat::Csv,
            ExportFormat::Tsv,
            ExportFormat::Xlsx,
            ExportFormat::Json,
        ],
        output.path(),
    );
    Coordinator::new(config, RunOptions::default())
        .unwrap()
        .run(&mut sink)
        .await
        .unwrap();

    let export = sink.last_report().unwrap();
    assert_eq!(export.files.len(), 4);
    for (_, path) in &export.files {
        assert!(path.exists(), "{} should exist", path.display());
    }

    let snapshot = load_snapshot(&output.path().join(LATEST_SNAPSHOT_FILE)).unwrap();
    assert_eq!(snapshot.len(), 2);

    let query = ProductQuery {
        min_price: Some(50.0),
        ..ProductQuery::default()
    };
    let expensive = filter_products(&snapshot, &query);
    assert_eq!(expensive.len(), 1);
    assert_eq!(expensive[0].price_current, Some(51.77));
}
