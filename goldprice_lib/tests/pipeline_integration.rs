use std::time::Duration;

use goldprice_lib::{
    Client, Config, Endpoint, MetaTag, Outcome, PayloadFormat, Pipeline, PipelineState,
    PlausibilityBand, PriceField, PriceLog, PriceRecord, RangedScan, RateTable, ScriptPrice,
    Stage, Status, TextWindow, MULTIPLE_SOURCES,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn client() -> Client {
    Client::new(Duration::from_millis(500)).unwrap()
}

async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn html_stage(server: &MockServer, route: &str) -> Stage {
    let ep = Endpoint::new(route, &format!("{}{}", server.uri(), route), PayloadFormat::Html)
        .unwrap();
    let band = PlausibilityBand::GOLD_USD;
    Stage::new(ep)
        .with_band(band)
        .with_strategy(MetaTag::new("gold"))
        .with_strategy(ScriptPrice)
        .with_strategy(TextWindow::new(&["gold", "usd"], 2))
        .with_strategy(RangedScan::new(band))
}

fn json_stage(server: &MockServer, route: &str) -> Stage {
    let ep = Endpoint::new(route, &format!("{}{}", server.uri(), route), PayloadFormat::Json)
        .unwrap();
    Stage::new(ep)
        .with_band(PlausibilityBand::GOLD_USD)
        .with_strategy(RateTable::new("/rates/XAU"))
}

async fn single_page(fixture: &str) -> (MockServer, Pipeline) {
    let server = MockServer::start().await;
    serve(
        &server,
        "/",
        ResponseTemplate::new(200).set_body_string(load_fixture(fixture)),
    )
    .await;
    let stage = html_stage(&server, "/");
    (server, Pipeline::new(client(), vec![stage]))
}

fn price_of(outcome: &Outcome) -> f64 {
    match outcome {
        Outcome::Found(c) => c.price,
        other => panic!("expected a price, got {:?}", other),
    }
}

#[tokio::test]
async fn meta_tag_wins_over_later_strategies() {
    let (server, pipeline) = single_page("goldprice_meta.html").await;
    let discovery = pipeline.run().await;

    assert_eq!(price_of(&discovery.outcome), 2345.67);
    assert_eq!(discovery.source, format!("{}/", server.uri()));
    assert_eq!(
        discovery.trace,
        vec![
            PipelineState::Idle,
            PipelineState::Trying(0),
            PipelineState::Validating(0),
            PipelineState::Success(0),
        ]
    );
    assert!(discovery.failures.is_empty());
}

#[tokio::test]
async fn script_scan_used_when_meta_has_no_price() {
    let (_server, pipeline) = single_page("goldprice_script.html").await;
    let discovery = pipeline.run().await;

    assert_eq!(price_of(&discovery.outcome), 2401.35);
    assert_eq!(discovery.failures.len(), 1);
    assert_eq!(discovery.failures[0].strategy, Some("meta_tag"));
}

#[tokio::test]
async fn text_window_finds_price_near_keyword() {
    let (_server, pipeline) = single_page("goldprice_text.html").await;
    let discovery = pipeline.run().await;

    assert_eq!(price_of(&discovery.outcome), 2388.40);
    let failed: Vec<_> = discovery.failures.iter().filter_map(|f| f.strategy).collect();
    assert_eq!(failed, vec!["meta_tag", "script_price"]);
}

#[tokio::test]
async fn ranged_scan_is_last_resort() {
    let (_server, pipeline) = single_page("goldprice_ranged.html").await;
    let discovery = pipeline.run().await;

    assert_eq!(price_of(&discovery.outcome), 2398.10);
    assert_eq!(discovery.failures.len(), 3);
}

#[tokio::test]
async fn single_page_without_price_is_parsing_failed() {
    let (server, pipeline) = single_page("no_price.html").await;
    let discovery = pipeline.run().await;

    assert_eq!(discovery.outcome, Outcome::ParsingFailed);
    assert_eq!(discovery.source, format!("{}/", server.uri()));
    assert_eq!(discovery.failures.len(), 4);
    assert_eq!(discovery.trace.last(), Some(&PipelineState::Exhausted));
}

#[tokio::test]
async fn out_of_band_page_exhausts_all_sources() {
    let server = MockServer::start().await;
    serve(&server, "/rates", ResponseTemplate::new(500)).await;
    serve(
        &server,
        "/page",
        ResponseTemplate::new(200).set_body_string(load_fixture("no_price.html")),
    )
    .await;

    let pipeline = Pipeline::new(
        client(),
        vec![json_stage(&server, "/rates"), html_stage(&server, "/page")],
    );
    let discovery = pipeline.run().await;

    assert_eq!(discovery.outcome, Outcome::AllMethodsFailed);
    assert_eq!(discovery.source, MULTIPLE_SOURCES);

    let record = PriceRecord::from_discovery(&discovery, goldprice_lib::record::capture_time(
        Config::default().offset().unwrap(),
    ));
    assert_eq!(record.status, Status::AllMethodsFailed);
    assert_eq!(record.price, "N/A");
}

#[tokio::test]
async fn timeout_on_first_source_falls_through_to_second() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/slow",
        ResponseTemplate::new(200)
            .set_body_string(load_fixture("goldprice_meta.html"))
            .set_delay(Duration::from_secs(3)),
    )
    .await;
    serve(
        &server,
        "/rates",
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"rates": {"XAU": 0.00040}})),
    )
    .await;

    let pipeline = Pipeline::new(
        client(),
        vec![html_stage(&server, "/slow"), json_stage(&server, "/rates")],
    );
    let discovery = pipeline.run().await;

    assert_eq!(price_of(&discovery.outcome), 2500.00);
    assert_eq!(discovery.source, format!("{}/rates", server.uri()));
    assert_eq!(discovery.failures.len(), 1);
    assert!(discovery.failures[0].strategy.is_none());
    assert!(matches!(
        discovery.failures[0].error,
        goldprice_lib::DiscoveryError::Transport(ref e) if e.is_timeout()
    ));
    assert_eq!(
        discovery.trace,
        vec![
            PipelineState::Idle,
            PipelineState::Trying(0),
            PipelineState::Trying(1),
            PipelineState::Validating(1),
            PipelineState::Success(1),
        ]
    );
}

#[tokio::test]
async fn success_stops_before_later_sources() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/rates",
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"rates": {"XAU": 0.0004}})),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Gold 2,999.99</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(
        client(),
        vec![json_stage(&server, "/rates"), html_stage(&server, "/page")],
    );
    let discovery = pipeline.run().await;
    assert_eq!(price_of(&discovery.outcome), 2500.00);
}

#[tokio::test]
async fn implausible_structured_value_is_rejected() {
    let server = MockServer::start().await;
    // 1 / 0.02 = 50.00, far outside the gold band.
    serve(
        &server,
        "/rates",
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"rates": {"XAU": 0.02}})),
    )
    .await;
    serve(
        &server,
        "/feed",
        ResponseTemplate::new(200).set_body_string(load_fixture("goldprice_data.json")),
    )
    .await;

    let feed = Stage::new(
        Endpoint::new("feed", &format!("{}/feed", server.uri()), PayloadFormat::Json).unwrap(),
    )
    .with_band(PlausibilityBand::GOLD_USD)
    .with_strategy(
        PriceField::new("/items/0/xauPrice").with_change("/items/0/chgXau", "/items/0/pcXau"),
    );

    let pipeline = Pipeline::new(client(), vec![json_stage(&server, "/rates"), feed]);
    let discovery = pipeline.run().await;

    assert!(matches!(
        discovery.failures[0].error,
        goldprice_lib::DiscoveryError::Validation(_)
    ));
    let candidate = discovery.candidate().unwrap();
    assert_eq!(candidate.price, 2331.05);
    assert_eq!(candidate.change, Some(12.4));
    assert_eq!(candidate.percent_change, Some(0.53));
}

#[tokio::test]
async fn malformed_json_counts_as_parse_failure() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/rates",
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;

    let pipeline = Pipeline::new(client(), vec![json_stage(&server, "/rates")]);
    let discovery = pipeline.run().await;

    assert_eq!(discovery.outcome, Outcome::ParsingFailed);
    assert_eq!(discovery.source, format!("{}/rates", server.uri()));
    assert!(matches!(
        discovery.failures[0].error,
        goldprice_lib::DiscoveryError::Parse(_)
    ));
}

#[tokio::test]
async fn single_source_transport_failure_is_all_methods_failed() {
    let server = MockServer::start().await;
    serve(&server, "/rates", ResponseTemplate::new(503)).await;

    let pipeline = Pipeline::new(client(), vec![json_stage(&server, "/rates")]);
    let discovery = pipeline.run().await;

    assert_eq!(discovery.outcome, Outcome::AllMethodsFailed);
    assert_eq!(discovery.source, format!("{}/rates", server.uri()));
}

#[tokio::test]
async fn repeated_runs_over_frozen_payloads_agree() {
    let (_server, pipeline) = single_page("goldprice_text.html").await;

    let first = pipeline.run().await;
    let second = pipeline.run().await;

    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.source, second.source);
    assert_eq!(first.trace, second.trace);
}

#[tokio::test]
async fn config_driven_run_appends_uniform_rows() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/feed",
        ResponseTemplate::new(200).set_body_string(load_fixture("goldprice_data.json")),
    )
    .await;
    serve(&server, "/down", ResponseTemplate::new(404)).await;

    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("data/gold_prices.csv");
    let text = format!(
        r#"
        log_path = "{log}"

        [[sources]]
        id = "down"
        url = "{uri}/down"
        format = "html"
        strategies = [{{ kind = "ranged_scan" }}]

        [[sources]]
        id = "feed"
        url = "{uri}/feed"
        format = "json"
        strategies = [{{ kind = "price_field", price = "/items/0/xauPrice", change = "/items/0/chgXau", percent_change = "/items/0/pcXau" }}]
        "#,
        log = log_path.display(),
        uri = server.uri(),
    );
    let config = Config::from_toml_str(&text).unwrap();
    let pipeline = config.build_pipeline().unwrap();
    let log = PriceLog::new(&config.log_path);
    let offset = config.offset().unwrap();

    let discovery = pipeline.run().await;
    let record = PriceRecord::from_discovery(&discovery, goldprice_lib::record::capture_time(offset));
    assert_eq!(record.price, "2,331.05");
    assert_eq!(record.change, "+12.40");
    assert_eq!(record.percent_change, "+0.53%");
    assert_eq!(record.url, format!("{}/feed", server.uri()));
    log.append(&record).unwrap();

    let failed = PriceRecord::from_error("simulated", &config.source_label(), goldprice_lib::record::capture_time(offset));
    log.append(&failed).unwrap();

    let rows = log.rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.len() == 6));
    assert_eq!(rows[0][5], "success");
    assert_eq!(rows[1][1], "ERROR");
    assert_eq!(rows[1][4], "multiple_sources");
    assert_eq!(rows[1][5], "error: simulated");
}
