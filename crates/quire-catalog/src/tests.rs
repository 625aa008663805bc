//! `HttpCatalog` against a local axum server standing in for the catalog.

use std::time::Duration;

use axum::{Router, response::Html, routing::get};
use quire_core::fetch::{FetchError, Fetcher};
use tokio::net::TcpListener;

use crate::{CatalogConfig, HttpCatalog};

const DIRECTORY: &str = r#"<html><body>
<div name="ibmMainContainer"><ul>
  <li><a href="/subjects/biology">Biology 2021 HSC exam pack</a></li>
  <li><a href="/subjects/physics">Physics 2021 HSC exam pack</a></li>
  <li><a href="/slow">Music 2021 HSC exam pack</a></li>
</ul></div>
</body></html>"#;

const BIOLOGY: &str = r#"<html><body><div class="right-col">
<h1>Biology</h1><p>Q1</p><p>Q2</p>
</div></body></html>"#;

async fn serve(router: Router) -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, router).await.unwrap();
  });
  format!("http://{addr}")
}

async fn catalog(timeout: Duration) -> HttpCatalog {
  let router = Router::new()
    .route("/exam-packs/", get(|| async { Html(DIRECTORY) }))
    .route("/subjects/biology", get(|| async { Html(BIOLOGY) }))
    .route(
      "/slow",
      get(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Html(BIOLOGY)
      }),
    );
  let base_url = serve(router).await;

  let config = CatalogConfig {
    base_url,
    directory_path: "/exam-packs/".into(),
    ..CatalogConfig::default()
  };
  HttpCatalog::new(&config, timeout).unwrap()
}

#[tokio::test]
async fn roster_is_read_from_the_directory_page() {
  let catalog = catalog(Duration::from_secs(5)).await;
  let listing = catalog.fetch_roster().await.unwrap();

  let names: Vec<_> = listing.keys().map(String::as_str).collect();
  assert_eq!(names, vec!["Biology", "Music", "Physics"]);
  assert!(listing["Biology"].ends_with("/subjects/biology"));
  assert!(listing["Biology"].starts_with("http://127.0.0.1:"));
}

#[tokio::test]
async fn subject_page_is_reduced_to_text() {
  let catalog = catalog(Duration::from_secs(5)).await;
  let listing = catalog.fetch_roster().await.unwrap();

  let text = catalog.fetch_content(&listing["Biology"]).await.unwrap();
  assert_eq!(text, "Biology\nQ1\nQ2\n");

  // Relative locators resolve against the base URL too.
  let relative = catalog.fetch_content("/subjects/biology").await.unwrap();
  assert_eq!(relative, text);
}

#[tokio::test]
async fn missing_page_is_a_status_error() {
  let catalog = catalog(Duration::from_secs(5)).await;
  let err = catalog.fetch_content("/subjects/physics").await.unwrap_err();
  assert!(matches!(err, FetchError::Status { status: 404, .. }), "{err:?}");
}

#[tokio::test]
async fn slow_page_times_out() {
  let catalog = catalog(Duration::from_millis(100)).await;
  let err = catalog.fetch_content("/slow").await.unwrap_err();
  assert!(matches!(err, FetchError::Timeout(_)), "{err:?}");
}

#[tokio::test]
async fn empty_directory_is_an_error() {
  let router = Router::new().route("/", get(|| async { Html("<ul></ul>") }));
  let config = CatalogConfig {
    base_url: serve(router).await,
    directory_path: "/".into(),
    ..CatalogConfig::default()
  };
  let catalog = HttpCatalog::new(&config, Duration::from_secs(5)).unwrap();
  assert!(matches!(
    catalog.fetch_roster().await,
    Err(FetchError::Parse { .. })
  ));
}
