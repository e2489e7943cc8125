use std::time::Duration;

use pricecrawl::config::{RetryConfig, Strategy};
use pricecrawl::partition::{PartitionerOptions, RangePartitioner};
use pricecrawl::{Domain, HttpCatalogClient, RangeQuery};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Serves `/products` like the real catalog: price filter, `total`, and a page cut at `limit`.
struct CatalogResponder {
    products: Vec<(u64, f64)>,
    limit: usize,
}

impl Respond for CatalogResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let bound = |name: &str| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.parse::<f64>().ok())
        };
        let (Some(min), Some(max)) = (bound("minPrice"), bound("maxPrice")) else {
            return ResponseTemplate::new(400);
        };

        let matches: Vec<_> = self
            .products
            .iter()
            .filter(|(_, price)| *price >= min - 1e-9 && *price <= max + 1e-9)
            .collect();
        let page: Vec<_> = matches
            .iter()
            .take(self.limit)
            .map(|(id, price)| json!({"id": id, "price": price, "name": format!("product {id}")}))
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({
            "total": matches.len(),
            "count": page.len(),
            "products": page,
        }))
    }
}

async fn catalog_server(prices: &[f64], limit: usize) -> MockServer {
    let server = MockServer::start().await;
    let mut products: Vec<(u64, f64)> = prices
        .iter()
        .enumerate()
        .map(|(id, price)| (id as u64, *price))
        .collect();
    products.sort_by(|a, b| a.1.total_cmp(&b.1));
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(CatalogResponder { products, limit })
        .mount(&server)
        .await;
    server
}

fn client(server: &MockServer) -> HttpCatalogClient {
    HttpCatalogClient::new(
        &format!("{}/products", server.uri()),
        Duration::from_secs(5),
        RetryConfig::disabled(),
    )
    .unwrap()
}

#[tokio::test]
async fn enumerates_a_cent_priced_catalog_over_http() {
    let prices: Vec<f64> = (0..120).map(|i| ((i * 7919) % 10_000) as f64 / 100.0).collect();
    let server = catalog_server(&prices, 10).await;
    let client = client(&server);
    let domain = Domain::new(0.0, 100.0, 0.01).unwrap();

    for strategy in [Strategy::Bisect, Strategy::Sweep] {
        let options = PartitionerOptions {
            strategy,
            use_overflow_cache: true,
        };
        let res = RangePartitioner::with_options(&client, domain, options)
            .run()
            .await
            .unwrap();

        let mut ids: Vec<u64> = res
            .records
            .iter()
            .map(|r| r.fields["id"].as_u64().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..120).collect::<Vec<u64>>(), "{strategy:?}");
        assert!(res.overflow_points.is_empty());
        assert!(res.records.iter().all(|r| r.fields.contains_key("name")));
    }
}

#[tokio::test]
async fn offset_and_unaligned_domains_lose_nothing() {
    let cases = [
        (Domain::new(0.25, 10.25, 0.5).unwrap(), vec![0.25, 0.75, 1.25]),
        (Domain::new(0.0, 10.0, 3.0).unwrap(), vec![6.0, 9.0, 10.0]),
    ];

    for (domain, prices) in cases {
        let server = catalog_server(&prices, 1).await;
        let client = client(&server);
        for strategy in [Strategy::Bisect, Strategy::Sweep] {
            let options = PartitionerOptions {
                strategy,
                use_overflow_cache: true,
            };
            let res = RangePartitioner::with_options(&client, domain, options)
                .run()
                .await
                .unwrap();

            let mut found: Vec<f64> = res.records.iter().map(|r| r.price).collect();
            found.sort_by(f64::total_cmp);
            assert_eq!(found, prices, "{domain:?} {strategy:?}");
            assert!(res.overflow_points.is_empty(), "{domain:?} {strategy:?}");
        }
    }
}

#[test]
fn offset_grid_renders_exact_bounds() {
    let client = HttpCatalogClient::new(
        "http://localhost/products",
        Duration::from_secs(1),
        RetryConfig::disabled(),
    )
    .unwrap();
    let domain = Domain::new(0.25, 10.25, 0.5).unwrap();

    let url = client.window_url(&domain, RangeQuery::new(0, 1));

    assert_eq!(url.query(), Some("minPrice=0.25&maxPrice=0.75"));
}

#[tokio::test]
async fn reports_the_crowded_price_point() {
    let server = catalog_server(&[1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 500.0, 999.0], 3).await;
    let client = client(&server);
    let domain = Domain::new(0.0, 1000.0, 1.0).unwrap();

    let res = RangePartitioner::new(&client, domain).run().await.unwrap();

    assert_eq!(res.records.len(), 8);
    assert_eq!(res.overflow_points.len(), 1);
    assert_eq!(res.overflow_points[0].price, 1.0);
    assert_eq!(res.overflow_points[0].lost(), 1);
}

#[tokio::test]
async fn server_failure_aborts_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let client = client(&server);
    let domain = Domain::new(0.0, 1000.0, 1.0).unwrap();

    let err = RangePartitioner::new(&client, domain).run().await.unwrap_err();

    assert!(err.is_transport());
}
