//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the cost-of-living site and
//! exercise fetching, fallback, unification and persistence end-to-end.

use cost_atlas::catalog::DiscoveryRequest;
use cost_atlas::config::Config;
use cost_atlas::crawler::{
    build_http_client, scrape_with, Coordinator, FetchError, FetchPolicy, Fetcher, Sleeper,
    WaitKind,
};
use cost_atlas::output::CsvSink;
use cost_atlas::unify::Cell;
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records waits instead of sleeping
#[derive(Default)]
struct RecordingSleeper {
    waits: Mutex<Vec<(WaitKind, Duration)>>,
}

impl RecordingSleeper {
    fn waits_of(&self, kind: WaitKind) -> Vec<Duration> {
        self.waits
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, d)| *d)
            .collect()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, kind: WaitKind, duration: Duration) {
        self.waits.lock().unwrap().push((kind, duration));
    }
}

fn create_test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.source.base_url = format!("{}/col/", server.uri());
    config.fetch.timeout_secs = 5;
    config
}

fn create_fetcher(config: &Config) -> Fetcher<RecordingSleeper> {
    Fetcher::with_sleeper(
        build_http_client(&config.fetch).expect("Failed to build client"),
        FetchPolicy::from(&config.fetch),
        RecordingSleeper::default(),
    )
}

fn index_page(countries: &[&str]) -> String {
    let links: String = countries
        .iter()
        .map(|c| {
            format!(
                r#"<a href="country_result.jsp?country={}">{}</a>"#,
                c.replace(' ', "+"),
                c
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", links)
}

fn cost_page(rows: &[(&str, &str, &str)], entries: Option<u32>) -> String {
    let rows: String = rows
        .iter()
        .map(|(name, price, range)| {
            format!(
                "<tr><td>{}</td><td>{}&nbsp;$</td><td>{}</td></tr>",
                name, price, range
            )
        })
        .collect();
    let entries = entries
        .map(|n| format!("<p>This city had {} entries in the past 18 months.</p>", n))
        .unwrap_or_default();
    format!(
        r#"<html><body><table class="data_wide_table"><tr><th>Item</th></tr>{}</table>{}</body></html>"#,
        rows, entries
    )
}

async fn mount_page(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_index(server: &MockServer, countries: &[&str]) {
    mount_page(server, "/col/", index_page(countries)).await;
}

async fn mount_country(server: &MockServer, country: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/col/country_result.jsp"))
        .and(query_param("country", country))
        .and(query_param("displayCurrency", "USD"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn request(all: bool, include: &[&str]) -> DiscoveryRequest {
    DiscoveryRequest {
        all,
        include: include.iter().map(|s| s.to_string()).collect(),
        range: None,
    }
}

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

#[tokio::test]
async fn test_full_crawl_with_city() {
    let server = MockServer::start().await;
    mount_index(&server, &["Japan", "Mexico"]).await;
    mount_country(
        &server,
        "Japan",
        cost_page(&[("Rent", "1,000.00", "800.00-1,200.00")], Some(120)),
    )
    .await;
    mount_page(
        &server,
        "/col/in/Tokyo-Japan",
        cost_page(
            &[
                ("Rent", "1,100.00", "900.00-1,300.00"),
                ("Meal", "10.00", "8.00-15.00"),
            ],
            None,
        ),
    )
    .await;
    // Mexico is left unmounted: its aggregate page is a 404

    let config = create_test_config(&server);
    let coordinator = Coordinator::new(&config, create_fetcher(&config)).unwrap();
    let report = coordinator.run(&request(true, &["Japan", "Tokyo"])).await;

    let dataset = &report.dataset;
    assert_eq!(
        dataset.columns(),
        [
            "Country",
            "City",
            "Entries",
            "Rent",
            "Rent Low Range",
            "Rent High Range",
            "Meal",
            "Meal Low Range",
            "Meal High Range",
        ]
    );
    assert_eq!(dataset.len(), 2);

    assert_eq!(dataset.get(0, "Country"), Some(&text("Japan")));
    assert_eq!(dataset.get(0, "City"), Some(&text("average")));
    assert_eq!(dataset.get(0, "Entries"), Some(&Cell::Number(120.0)));
    assert_eq!(dataset.get(0, "Rent"), Some(&Cell::Number(1000.0)));
    assert_eq!(dataset.get(0, "Meal"), Some(&Cell::Empty));

    assert_eq!(dataset.get(1, "City"), Some(&text("Tokyo")));
    assert_eq!(dataset.get(1, "Rent High Range"), Some(&Cell::Number(1300.0)));
    assert_eq!(dataset.get(1, "Meal Low Range"), Some(&Cell::Number(8.0)));

    assert!(report.missing.is_empty());
    assert_eq!(report.stats.locations_planned, 2);
    assert_eq!(report.stats.aggregates_fetched, 1);
    assert_eq!(report.stats.aggregates_failed, 1);
    assert_eq!(report.stats.sub_locations_fetched, 1);
    assert_eq!(report.stats.fallbacks_used, 0);
}

#[tokio::test]
async fn test_fallback_used_when_primary_has_no_table() {
    let server = MockServer::start().await;
    mount_index(&server, &["Japan"]).await;
    mount_country(&server, "Japan", cost_page(&[("Rent", "1.00", "")], None)).await;

    Mock::given(method("GET"))
        .and(path("/col/in/Osaka-Japan"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>Not found</body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/col/in/Osaka"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(cost_page(&[("Bus", "2.50", "")], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let coordinator = Coordinator::new(&config, create_fetcher(&config)).unwrap();
    let report = coordinator.run(&request(false, &["Japan", "Osaka"])).await;

    assert!(report.missing.is_empty());
    assert_eq!(report.stats.fallbacks_used, 1);
    assert_eq!(report.dataset.len(), 2);
    assert_eq!(report.dataset.get(1, "City"), Some(&text("Osaka")));
    assert_eq!(report.dataset.get(1, "Bus"), Some(&Cell::Number(2.5)));
    assert_eq!(report.dataset.get(1, "Bus Low Range"), Some(&Cell::Empty));
}

#[tokio::test]
async fn test_missing_sub_location_recorded_and_run_continues() {
    let server = MockServer::start().await;
    mount_index(&server, &["Japan", "Norway"]).await;
    mount_country(&server, "Japan", cost_page(&[("Rent", "1.00", "")], None)).await;
    mount_country(&server, "Norway", cost_page(&[("Rent", "2.00", "")], None)).await;

    Mock::given(method("GET"))
        .and(path("/col/in/Osaka-Japan"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/col/in/Osaka"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let coordinator = Coordinator::new(&config, create_fetcher(&config)).unwrap();
    let report = coordinator
        .run(&request(false, &["Japan", "Osaka", "Norway"]))
        .await;

    assert_eq!(report.missing, vec!["Osaka, Japan".to_string()]);
    assert_eq!(report.stats.sub_locations_failed, 1);
    // Norway still processed after the failure
    assert_eq!(report.dataset.len(), 2);
    assert_eq!(report.dataset.get(1, "Country"), Some(&text("Norway")));
}

#[tokio::test]
async fn test_sub_locations_visited_in_order() {
    let server = MockServer::start().await;
    mount_index(&server, &["United States"]).await;
    mount_country(&server, "United States", cost_page(&[("Rent", "1.00", "")], None)).await;
    mount_page(
        &server,
        "/col/in/New-York-United+States",
        cost_page(&[("Rent", "3.00", "")], None),
    )
    .await;
    mount_page(
        &server,
        "/col/in/Boston-United+States",
        cost_page(&[("Rent", "2.00", "")], None),
    )
    .await;

    let config = create_test_config(&server);
    let coordinator = Coordinator::new(&config, create_fetcher(&config)).unwrap();
    let report = coordinator
        .run(&request(false, &["United-States", "New-York", "Boston"]))
        .await;

    let cities: Vec<_> = (0..report.dataset.len())
        .map(|i| report.dataset.get(i, "City").cloned())
        .collect();
    assert_eq!(
        cities,
        vec![
            Some(text("average")),
            Some(text("Boston")),
            Some(text("New York")),
        ]
    );
    assert_eq!(report.dataset.get(0, "Country"), Some(&text("United States")));
}

#[tokio::test]
async fn test_rate_limited_target_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let fetcher = create_fetcher(&config);
    let url = url::Url::parse(&format!("{}/limited", server.uri())).unwrap();

    let result = fetcher.fetch(&url).await;
    assert!(matches!(result, Err(FetchError::RateLimited { attempts: 3 })));

    let backoffs = fetcher.sleeper().waits_of(WaitKind::RateLimitBackoff);
    assert_eq!(backoffs.len(), 2);
    assert!(backoffs[0] >= Duration::from_secs(6) && backoffs[0] <= Duration::from_secs(8));
    assert!(backoffs[1] >= Duration::from_secs(11) && backoffs[1] <= Duration::from_secs(13));
    assert!(backoffs[0] < backoffs[1]);

    assert_eq!(fetcher.sleeper().waits_of(WaitKind::Pacing).len(), 3);
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let fetcher = create_fetcher(&config);
    let url = url::Url::parse(&format!("{}/flaky", server.uri())).unwrap();

    assert_eq!(fetcher.fetch(&url).await.unwrap(), "ok");
    assert_eq!(fetcher.sleeper().waits_of(WaitKind::RateLimitBackoff).len(), 1);
    // Pacing is observed on the success path too
    assert_eq!(fetcher.sleeper().waits_of(WaitKind::Pacing).len(), 2);
}

#[tokio::test]
async fn test_non_retryable_status_gives_up_at_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let fetcher = create_fetcher(&config);
    let url = url::Url::parse(&format!("{}/gone", server.uri())).unwrap();

    assert!(matches!(
        fetcher.fetch(&url).await,
        Err(FetchError::Status { status: 404 })
    ));
    assert!(fetcher.sleeper().waits_of(WaitKind::RetryBackoff).is_empty());
    assert_eq!(fetcher.sleeper().waits_of(WaitKind::Pacing).len(), 1);
}

#[tokio::test]
async fn test_scrape_writes_batch_file() {
    let server = MockServer::start().await;
    mount_index(&server, &["Japan", "Mexico", "Norway", "Austria"]).await;
    mount_country(&server, "Mexico", cost_page(&[("Rent", "5.00", "4.00-6.00")], Some(3))).await;
    mount_country(&server, "Norway", cost_page(&[("Meal", "20.00", "")], None)).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server);
    config.output.data_dir = dir.path().to_string_lossy().into_owned();

    let request = DiscoveryRequest {
        all: true,
        include: vec![],
        range: Some("M-Z".parse().unwrap()),
    };
    let sink = CsvSink::new(dir.path());
    let outcome = scrape_with(&config, &request, create_fetcher(&config), &sink)
        .await
        .unwrap();

    let saved = outcome.saved.unwrap();
    assert_eq!(saved, dir.path().join("batch_MZ.csv"));
    assert_eq!(outcome.stats.locations_planned, 2);

    let content = std::fs::read_to_string(saved).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines[0],
        "Country,City,Entries,Rent,Rent Low Range,Rent High Range,Meal,Meal Low Range,Meal High Range"
    );
    assert_eq!(lines[1], "Mexico,average,3,5,4,6,,,");
    assert_eq!(lines[2], "Norway,average,,,,,20,,");
}

#[tokio::test]
async fn test_unreachable_index_yields_empty_dataset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/col/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server);
    let sink = CsvSink::new(dir.path());
    let outcome = scrape_with(&config, &request(true, &[]), create_fetcher(&config), &sink)
        .await
        .unwrap();

    assert!(outcome.missing.is_empty());
    assert_eq!(outcome.stats.records(), 0);
    let saved = outcome.saved.unwrap();
    assert_eq!(saved, dir.path().join("all_countries.csv"));
}
