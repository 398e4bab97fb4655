//! Foreach mode: one query per entry, answered in input order.

use pretty_assertions::assert_eq;
use quarry_tests::prelude::*;
use serde_json::json;

#[tokio::test]
async fn test_foreach_entries_keep_input_order() {
    // GIVEN
    let (session, _) = counted_session(catalogue()).await.unwrap();
    let request = json!({
        "table": ["Track"],
        "table_relationships": [],
        "query": {
            "fields": {"Name": {"type": "column", "column": "Name", "column_type": "string"}},
            "aggregates": {"count": {"type": "star_count"}}
        },
        "foreach": [
            {"AlbumId": {"value": 3, "value_type": "number"}},
            {"AlbumId": {"value": 1, "value_type": "number"}},
            {"AlbumId": {"value": 9, "value_type": "number"}}
        ]
    });

    // WHEN
    let response = session.execute_json(&request.to_string()).await.unwrap();

    // THEN
    let answers = nested(&response, "query");
    let counts: Vec<Option<&Value>> = answers.iter().map(|a| a.aggregate("count")).collect();
    assert_eq!(
        counts,
        vec![Some(&Value::Int(3)), Some(&Value::Int(2)), Some(&Value::Int(0))]
    );
    assert_eq!(
        values(answers[1], "Name"),
        vec![
            Value::from("For Those About To Rock (We Salute You)"),
            Value::from("Put The Finger On You"),
        ]
    );
    assert!(answers[2].rows().is_empty());
}

#[tokio::test]
async fn test_foreach_is_combined_with_the_query_filter() {
    // GIVEN
    let (session, _) = counted_session(catalogue()).await.unwrap();
    let entry = |album: i64| {
        let mut entry = std::collections::BTreeMap::new();
        entry.insert("AlbumId".to_string(), ScalarValue::new(album, "number"));
        entry
    };
    let request = QueryRequest::new(
        "Track",
        Query::new().column("Name").with_where(Expression::compare(
            "Milliseconds",
            BinaryComparisonOperator::GreaterThan,
            300000,
        )),
    )
    .with_foreach(vec![entry(3), entry(1)]);

    // WHEN
    let response = session.execute(&request).await.unwrap();

    // THEN
    let answers = nested(&response, "query");
    assert_eq!(values(answers[0], "Name"), vec![Value::from("Princess of the Dawn")]);
    assert_eq!(
        values(answers[1], "Name"),
        vec![Value::from("For Those About To Rock (We Salute You)")]
    );
}

#[tokio::test]
async fn test_foreach_repeated_entries_give_equal_answers() {
    // GIVEN the same album asked for twice, over a source that suspends
    let (session, source) = counted_session(YieldingSource::new(catalogue()))
        .await
        .unwrap();
    let entry = |album: i64| {
        let mut entry = std::collections::BTreeMap::new();
        entry.insert("AlbumId".to_string(), ScalarValue::new(album, "number"));
        entry
    };
    let request = QueryRequest::new(
        "Album",
        Query::new()
            .column("Title")
            .relationship("artist", "artist", Query::new().column("Name")),
    )
    .with_foreach(vec![entry(4), entry(4)]);

    // WHEN
    let response = session.execute(&request).await.unwrap();

    // THEN
    let answers = nested(&response, "query");
    assert_eq!(answers[0], answers[1]);
    let artist = nested(answers[0], "artist");
    assert_eq!(values(artist[0], "Name"), vec![Value::from("AC/DC")]);
    assert_eq!(source.fetches_of("Album").len(), 2);
    assert_eq!(source.fetches_of("Artist").len(), 1);
}

#[tokio::test]
async fn test_concurrent_entries_wait_on_an_in_flight_relationship_load() {
    // GIVEN two albums by the same artist, each its own foreach entry
    let (session, source) = counted_session(YieldingSource::new(catalogue()))
        .await
        .unwrap();
    let request = json!({
        "table": ["Album"],
        "table_relationships": [],
        "query": {
            "fields": {
                "Title": {"type": "column", "column": "Title", "column_type": "string"},
                "artist": {
                    "type": "relationship",
                    "relationship": "artist",
                    "query": {
                        "fields": {"Name": {"type": "column", "column": "Name", "column_type": "string"}}
                    }
                }
            }
        },
        "foreach": [
            {"AlbumId": {"value": 1, "value_type": "number"}},
            {"AlbumId": {"value": 4, "value_type": "number"}}
        ]
    });

    // WHEN
    let response = session.execute_json(&request.to_string()).await.unwrap();

    // THEN the artist is fetched once and shared by both entries
    assert_eq!(source.fetches_of("Artist").len(), 1);
    let answers = nested(&response, "query");
    assert_eq!(answers.len(), 2);
    assert_eq!(values(answers[1], "Title"), vec![Value::from("Let There Be Rock")]);
    for answer in answers {
        let artist = nested(answer, "artist");
        assert_eq!(values(artist[0], "Name"), vec![Value::from("AC/DC")]);
    }
}
