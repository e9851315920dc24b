//! Search filter composition through the provider trait

mod common;

use common::*;
use pretty_assertions::assert_eq;

use wmx_core::catalog::{CatalogProvider, Component, FixtureCatalog, SearchQuery};

fn tagged(id: &str, tags: &[&str], rating: f64) -> Component {
    let mut c = component(id, id, &format!("https://example/{id}.git"));
    c.tags = tags.iter().map(|t| t.to_string()).collect();
    c.rating = rating;
    c
}

fn catalog() -> FixtureCatalog {
    FixtureCatalog::new(vec![
        tagged("first", &["a", "b"], 4.0),
        tagged("second", &["b", "c"], 4.5),
        tagged("third", &["B"], 3.0),
    ])
}

async fn ids(query: SearchQuery) -> Vec<String> {
    catalog()
        .search(&query)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect()
}

fn by_tag(tag: &str) -> SearchQuery {
    SearchQuery {
        tags: vec![tag.to_string()],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_shared_tag_matches_both() {
    init_test_logging();
    let first_two = FixtureCatalog::new(vec![
        tagged("first", &["a", "b"], 4.0),
        tagged("second", &["b", "c"], 4.5),
    ]);

    let found: Vec<String> = first_two
        .search(&by_tag("b"))
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(found, vec!["first", "second"]);

    assert!(first_two.search(&by_tag("d")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tag_match_ignores_case() {
    assert_eq!(ids(by_tag("b")).await, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_limit_and_offset_select_second_item() {
    let query = SearchQuery {
        tags: vec!["b".to_string()],
        limit: 1,
        offset: 1,
        ..Default::default()
    };
    assert_eq!(ids(query).await, vec!["second"]);
}

#[tokio::test]
async fn test_filters_compose() {
    let query = SearchQuery {
        tags: vec!["b".to_string()],
        min_rating: Some(4.2),
        ..Default::default()
    };
    assert_eq!(ids(query).await, vec!["second"]);

    let query = SearchQuery {
        query: Some("THIRD".to_string()),
        author: Some("test".to_string()),
        ..Default::default()
    };
    assert_eq!(ids(query).await, vec!["third"]);

    let query = SearchQuery {
        author: Some("someone else".to_string()),
        ..Default::default()
    };
    assert!(ids(query).await.is_empty());
}

#[tokio::test]
async fn test_offset_past_end_is_empty() {
    let query = SearchQuery {
        offset: 10,
        ..Default::default()
    };
    assert!(ids(query).await.is_empty());
}
