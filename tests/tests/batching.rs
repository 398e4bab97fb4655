//! Relationship loading: one fetch per relationship and subquery shape,
//! whatever the number of parent rows.

use pretty_assertions::assert_eq;
use quarry_tests::prelude::*;

#[tokio::test]
async fn test_fan_out_of_fifty_parents_uses_one_fetch_per_level() {
    // GIVEN
    let (session, source) = counted_session(wide_catalogue(50)).await.unwrap();
    let query = Query::new().column("Name").relationship(
        "albums",
        "albums",
        Query::new()
            .column("Title")
            .relationship("tracks", "tracks", Query::new().column("Name")),
    );

    // WHEN
    let response = session
        .execute(&QueryRequest::new("Artist", query))
        .await
        .unwrap();

    // THEN
    assert_eq!(source.fetches_of("Artist").len(), 1);
    assert_eq!(source.fetches_of("Album").len(), 1);
    assert_eq!(source.fetches_of("Track").len(), 1);
    assert_eq!(source.fetch_count(), 3);

    assert_eq!(response.rows().len(), 50);
    let albums = nested(&response, "albums");
    assert!(albums.iter().all(|a| a.rows().len() == 2));
    assert_eq!(
        values(albums[49], "Title"),
        vec![Value::from("Album 99"), Value::from("Album 100")]
    );
    let tracks = nested(albums[0], "tracks");
    assert_eq!(values(tracks[1], "Name"), vec![Value::from("Track 2")]);
}

#[tokio::test]
async fn test_fan_out_over_a_suspending_source_keeps_one_fetch_per_level() {
    // GIVEN
    let (session, source) = counted_session(YieldingSource::new(wide_catalogue(20)))
        .await
        .unwrap();
    let query = Query::new()
        .column("Name")
        .relationship(
            "albums",
            "albums",
            Query::new()
                .column("Title")
                .relationship("tracks", "tracks", Query::new().column("Name")),
        )
        .relationship(
            "album_count",
            "albums",
            Query::new().aggregate("count", Aggregate::StarCount),
        );

    // WHEN
    let response = session
        .execute(&QueryRequest::new("Artist", query))
        .await
        .unwrap();

    // THEN the two album shapes are fetched side by side, tracks once
    assert_eq!(source.fetches_of("Artist").len(), 1);
    assert_eq!(source.fetches_of("Album").len(), 2);
    assert_eq!(source.fetches_of("Track").len(), 1);
    let counts = nested(&response, "album_count");
    assert!(counts.iter().all(|c| c.aggregate("count") == Some(&Value::Int(2))));
    let tracks = nested(nested(&response, "albums")[19], "tracks");
    assert_eq!(tracks.len(), 2);
}

#[tokio::test]
async fn test_batch_filters_by_distinct_keys() {
    // GIVEN
    let (session, source) = counted_session(catalogue()).await.unwrap();
    let query = Query::new()
        .column("Title")
        .relationship("artist", "artist", Query::new().column("Name"));

    // WHEN
    session
        .execute(&QueryRequest::new("Album", query))
        .await
        .unwrap();

    // THEN
    let fetch = &source.fetches_of("Artist")[0];
    let Some(Expression::BinaryArrayOp { values, .. }) = &fetch.filter else {
        panic!("expected an `in` filter, got {:?}", fetch.filter);
    };
    assert_eq!(values, &vec![Value::Int(1), Value::Int(2)]);
}

#[tokio::test]
async fn test_identical_subqueries_share_one_fetch() {
    // GIVEN
    let (session, source) = counted_session(catalogue()).await.unwrap();
    let albums = Query::new().column("Title");
    let query = Query::new()
        .relationship("albums", "albums", albums.clone())
        .relationship("discography", "albums", albums);

    // WHEN
    let response = session
        .execute(&QueryRequest::new("Artist", query))
        .await
        .unwrap();

    // THEN
    assert_eq!(source.fetches_of("Album").len(), 1);
    assert_eq!(nested(&response, "albums"), nested(&response, "discography"));
}

#[tokio::test]
async fn test_object_relationship_returns_at_most_one_row() {
    // GIVEN two artist rows sharing a key
    let mut tables = catalogue_tables();
    tables[0].1.push(row! { "ArtistId" => 1, "Name" => "AC/DC (reissue)" });
    let source = tables
        .into_iter()
        .fold(MemorySource::new(), |s, (schema, rows)| s.with_table(schema, rows));
    let (session, _) = counted_session(source).await.unwrap();
    let query = Query::new()
        .column("Title")
        .relationship("artist", "artist", Query::new().column("Name"));

    // WHEN
    let response = session
        .execute(&QueryRequest::new("Album", query))
        .await
        .unwrap();

    // THEN
    let artists = nested(&response, "artist");
    assert!(artists.iter().all(|a| a.rows().len() == 1));
    assert_eq!(values(artists[0], "Name"), vec![Value::from("AC/DC")]);
}

#[tokio::test]
async fn test_null_and_invalid_keys_resolve_to_no_rows() {
    // GIVEN
    let mut tables = catalogue_tables();
    tables[1].1 = vec![
        row! { "AlbumId" => 1, "ArtistId" => Value::Null, "Title" => "Unknown Artist" },
        row! { "AlbumId" => 2, "ArtistId" => "not a number", "Title" => "Bad Key" },
        row! { "AlbumId" => 3, "ArtistId" => "2", "Title" => "Text Key" },
    ];
    let source = tables
        .into_iter()
        .fold(MemorySource::new(), |s, (schema, rows)| s.with_table(schema, rows));
    let (session, source) = counted_session(source).await.unwrap();
    let query = Query::new()
        .column("Title")
        .relationship("artist", "artist", Query::new().column("Name"));

    // WHEN
    let response = session
        .execute(&QueryRequest::new("Album", query))
        .await
        .unwrap();

    // THEN
    let artists = nested(&response, "artist");
    assert!(artists[0].rows().is_empty());
    assert!(artists[1].rows().is_empty());
    assert_eq!(values(artists[2], "Name"), vec![Value::from("Accept")]);
    assert_eq!(source.fetches_of("Artist").len(), 1);
}

#[tokio::test]
async fn test_parents_without_matches_get_empty_responses() {
    // GIVEN
    let (session, _) = counted_session(catalogue()).await.unwrap();
    let albums = Query::new()
        .column("Title")
        .aggregate("count", Aggregate::StarCount);
    let query = Query::new()
        .column("Name")
        .relationship("albums", "albums", albums);

    // WHEN
    let response = session
        .execute(&QueryRequest::new("Artist", query))
        .await
        .unwrap();

    // THEN
    let aerosmith = nested(&response, "albums")[2];
    assert!(aerosmith.rows().is_empty());
    assert_eq!(aerosmith.aggregate("count"), Some(&Value::Int(0)));
}

#[tokio::test]
async fn test_request_relationships_override_the_schema() {
    // GIVEN a relationship the schema does not declare
    let (session, source) = counted_session(catalogue()).await.unwrap();
    let mut relationships = std::collections::BTreeMap::new();
    relationships.insert(
        "same_album".to_string(),
        Relationship::new("Track", RelationshipKind::Array, [("AlbumId", "AlbumId")]),
    );
    let request = QueryRequest::new(
        "Track",
        Query::new()
            .column("Name")
            .relationship("same_album", "same_album", Query::new().column("TrackId"))
            .with_where(Expression::equal("TrackId", 3)),
    )
    .with_relationships(quarry_request::TableRelationships {
        source_table: TableName::single("Track"),
        relationships,
    });

    // WHEN
    let response = session.execute(&request).await.unwrap();

    // THEN
    let siblings = nested(&response, "same_album");
    assert_eq!(
        values(siblings[0], "TrackId"),
        vec![Value::Int(3), Value::Int(4), Value::Int(5)]
    );
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_unknown_relationship_fails_the_request() {
    let (session, source) = counted_session(catalogue()).await.unwrap();
    let query = Query::new().relationship("genre", "genre", Query::new().column("Name"));

    let result = session.execute(&QueryRequest::new("Track", query)).await;

    assert!(matches!(
        result,
        Err(SessionError::Query(QueryError::UnknownRelationship { .. }))
    ));
    assert_eq!(source.fetch_count(), 0);
}
