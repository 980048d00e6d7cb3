use mockito::Matcher;
use serde_json::json;
use sources::{search_pull_requests, ApiConfig, ProxyClient, SearchQuery, SEARCH_PAGE_SIZE};
use tokio_test::assert_ok;

fn items(start: u64, count: u64, every_nth_is_issue: u64) -> serde_json::Value {
    let items: Vec<serde_json::Value> = (start..start + count)
        .map(|n| {
            let mut item = json!({
                "number": n,
                "title": format!("Item {}", n),
                "state": "closed",
                "user": {"login": "octocat"},
                "repository_url": "https://api.github.com/repos/org/repo",
            });
            if every_nth_is_issue == 0 || n % every_nth_is_issue != 0 {
                item["pull_request"] = json!({"merged_at": "2024-05-01T10:00:00Z"});
            }
            item
        })
        .collect();
    json!({ "items": items })
}

fn client_for(server: &mockito::ServerGuard) -> ProxyClient {
    ProxyClient::new(ApiConfig::default().with_base_url(server.url())).unwrap()
}

#[tokio::test]
async fn test_search_stops_on_short_page() {
    let mut server = mockito::Server::new_async().await;
    let page_one = server
        .mock("GET", "/api/github/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "repo:org/repo is:pr".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("per_page".into(), SEARCH_PAGE_SIZE.to_string()),
        ]))
        .with_status(200)
        .with_body(items(1, 100, 0).to_string())
        .expect(1)
        .create_async()
        .await;
    let page_two = server
        .mock("GET", "/api/github/search")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_body(items(101, 30, 10).to_string())
        .expect(1)
        .create_async()
        .await;
    let page_three = server
        .mock("GET", "/api/github/search")
        .match_query(Matcher::UrlEncoded("page".into(), "3".into()))
        .with_status(200)
        .with_body(json!({"items": []}).to_string())
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server);
    let query = SearchQuery::pull_requests_in("org/repo", "");
    let results = assert_ok!(search_pull_requests(&client, &query).await);

    // 100 + 30 hits, of which 110, 120 and 130 are plain issues.
    assert_eq!(results.len(), 127);
    assert!(results.iter().all(|pr| pr.is_merged()));
    assert_eq!(results[0].repository.as_deref(), Some("org/repo"));
    assert_eq!(results[0].author(), "octocat");

    page_one.assert_async().await;
    page_two.assert_async().await;
    page_three.assert_async().await;
}

#[tokio::test]
async fn test_search_respects_max_pages() {
    let mut server = mockito::Server::new_async().await;
    let full_page = server
        .mock("GET", "/api/github/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(items(1, 100, 0).to_string())
        .expect(2)
        .create_async()
        .await;

    let client = client_for(&server);
    let query = SearchQuery::new("is:pr label:bug")
        .with_sort("updated")
        .with_max_pages(2);
    let results = assert_ok!(search_pull_requests(&client, &query).await);

    assert_eq!(results.len(), 200);
    full_page.assert_async().await;
}

#[tokio::test]
async fn test_search_error_is_propagated() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/github/search")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = search_pull_requests(&client, &SearchQuery::new("is:pr")).await;
    assert!(matches!(result, Err(sources::SourceError::RateLimit)));
}
