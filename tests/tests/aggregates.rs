//! Aggregates: bounds, per-parent evaluation and numeric edge cases.

use pretty_assertions::assert_eq;
use quarry_tests::prelude::*;

async fn run(table: &str, query: Query) -> Result<QueryResponse, SessionError> {
    let (session, _) = counted_session(catalogue()).await.unwrap();
    session.execute(&QueryRequest::new(table, query)).await
}

fn by_track_id() -> OrderBy {
    OrderBy::columns([("TrackId", OrderDirection::Asc)])
}

#[tokio::test]
async fn test_aggregates_limit_is_independent_of_limit() {
    // GIVEN
    let (session, source) = counted_session(catalogue()).await.unwrap();
    let query = Query::new()
        .column("Name")
        .aggregate("count", Aggregate::StarCount)
        .aggregate(
            "length",
            Aggregate::single_column("Milliseconds", AggregateFunction::Sum),
        )
        .with_order_by(by_track_id())
        .with_limit(2)
        .with_aggregates_limit(5);

    // WHEN
    let response = session
        .execute(&QueryRequest::new("Track", query))
        .await
        .unwrap();

    // THEN
    assert_eq!(response.rows().len(), 2);
    assert_eq!(response.aggregate("count"), Some(&Value::Int(5)));
    assert_eq!(response.aggregate("length"), Some(&Value::Int(1544369)));
    assert_eq!(source.fetches_of("Track")[0].limit, Some(5));
}

#[tokio::test]
async fn test_aggregates_over_a_whole_table() {
    // GIVEN
    let query = Query::new()
        .aggregate(
            "total_length",
            Aggregate::single_column("Milliseconds", AggregateFunction::Sum),
        )
        .aggregate(
            "albums",
            Aggregate::ColumnCount {
                column: "AlbumId".into(),
                distinct: true,
            },
        )
        .aggregate(
            "named",
            Aggregate::ColumnCount {
                column: "Name".into(),
                distinct: false,
            },
        )
        .aggregate("first_name", Aggregate::single_column("Name", AggregateFunction::Min))
        .aggregate(
            "longest_name",
            Aggregate::single_column("Name", AggregateFunction::Longest),
        )
        .aggregate(
            "top_price",
            Aggregate::single_column("UnitPrice", AggregateFunction::Max),
        );

    // WHEN
    let response = run("Track", query).await.unwrap();

    // THEN
    assert!(response.rows.is_none());
    assert_eq!(response.aggregate("total_length"), Some(&Value::Int(2081211)));
    assert_eq!(response.aggregate("albums"), Some(&Value::Int(4)));
    assert_eq!(response.aggregate("named"), Some(&Value::Int(7)));
    assert_eq!(
        response.aggregate("first_name"),
        Some(&Value::from("Balls to the Wall"))
    );
    assert_eq!(
        response.aggregate("longest_name"),
        Some(&Value::from("For Those About To Rock (We Salute You)"))
    );
    assert_eq!(response.aggregate("top_price"), Some(&Value::Float(0.99)));
}

#[tokio::test]
async fn test_nested_aggregates_are_computed_per_parent() {
    // GIVEN
    let tracks = Query::new()
        .column("Name")
        .aggregate("count", Aggregate::StarCount)
        .with_limit(1);
    let query = Query::new()
        .column("Title")
        .relationship("tracks", "tracks", tracks);

    // WHEN
    let response = run("Album", query).await.unwrap();

    // THEN
    let tracks = nested(&response, "tracks");
    let counts: Vec<Option<&Value>> = tracks.iter().map(|t| t.aggregate("count")).collect();
    assert_eq!(
        counts,
        vec![
            Some(&Value::Int(2)),
            Some(&Value::Int(1)),
            Some(&Value::Int(3)),
            Some(&Value::Int(1)),
        ]
    );
    assert!(tracks.iter().all(|t| t.rows().len() == 1));
}

#[tokio::test]
async fn test_variance_edge_cases() {
    // GIVEN one track on album 4, none above TrackId 100
    let single = Query::new()
        .aggregate(
            "sample",
            Aggregate::single_column("Milliseconds", AggregateFunction::VarSamp),
        )
        .aggregate(
            "population",
            Aggregate::single_column("Milliseconds", AggregateFunction::VarPop),
        )
        .with_where(Expression::equal("AlbumId", 4));
    let empty = Query::new()
        .aggregate("count", Aggregate::StarCount)
        .aggregate(
            "total",
            Aggregate::single_column("Milliseconds", AggregateFunction::Sum),
        )
        .with_where(Expression::compare(
            "TrackId",
            BinaryComparisonOperator::GreaterThan,
            100,
        ));

    // WHEN
    let single = run("Track", single).await.unwrap();
    let empty = run("Track", empty).await.unwrap();

    // THEN
    assert_eq!(single.aggregate("sample"), Some(&Value::Null));
    assert_eq!(single.aggregate("population"), Some(&Value::Float(0.0)));
    assert_eq!(empty.aggregate("count"), Some(&Value::Int(0)));
    assert_eq!(empty.aggregate("total"), Some(&Value::Null));
}

#[tokio::test]
async fn test_aggregate_errors() {
    let unknown = Query::new().aggregate(
        "median",
        Aggregate::single_column("Milliseconds", AggregateFunction::Other("median".into())),
    );
    assert!(matches!(
        run("Track", unknown).await,
        Err(SessionError::Query(QueryError::UnknownAggregateFunction { .. }))
    ));

    let non_numeric = Query::new().aggregate(
        "sum",
        Aggregate::single_column("Name", AggregateFunction::Sum),
    );
    assert!(matches!(
        run("Track", non_numeric).await,
        Err(SessionError::Query(QueryError::NonNumericValues { .. }))
    ));
}
