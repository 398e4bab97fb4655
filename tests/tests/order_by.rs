//! Ordering through relationship paths and over related aggregates.

use pretty_assertions::assert_eq;
use quarry_tests::prelude::*;
use std::collections::BTreeMap;

fn through(path: &[&str], target: OrderByTarget, direction: OrderDirection) -> OrderByElement {
    OrderByElement {
        target_path: path.iter().map(|s| s.to_string()).collect(),
        target,
        order_direction: direction,
    }
}

fn column(name: &str) -> OrderByTarget {
    OrderByTarget::Column {
        column: name.to_string(),
    }
}

fn ordered(elements: Vec<OrderByElement>) -> OrderBy {
    OrderBy {
        relations: BTreeMap::new(),
        elements,
    }
}

async fn names(table: &str, field: &str, order_by: OrderBy) -> Result<Vec<Value>, SessionError> {
    let (session, _) = counted_session(catalogue()).await.unwrap();
    let query = Query::new().column(field).with_order_by(order_by);
    let response = session.execute(&QueryRequest::new(table, query)).await?;
    Ok(values(&response, field))
}

#[tokio::test]
async fn test_order_by_object_relationship_column() {
    // GIVEN
    let order_by = ordered(vec![
        through(&["artist"], column("Name"), OrderDirection::Desc),
        OrderByElement::column("Title", OrderDirection::Asc),
    ]);

    // WHEN
    let titles = names("Album", "Title", order_by).await.unwrap();

    // THEN
    assert_eq!(
        titles,
        vec![
            Value::from("Balls to the Wall"),
            Value::from("Restless and Wild"),
            Value::from("For Those About To Rock"),
            Value::from("Let There Be Rock"),
        ]
    );
}

#[tokio::test]
async fn test_pagination_applies_after_relationship_ordering() {
    // GIVEN
    let (session, source) = counted_session(catalogue()).await.unwrap();
    let query = Query::new()
        .column("Title")
        .with_order_by(ordered(vec![
            through(&["artist"], column("Name"), OrderDirection::Desc),
            OrderByElement::column("Title", OrderDirection::Asc),
        ]))
        .with_offset(1)
        .with_limit(1);

    // WHEN
    let response = session
        .execute(&QueryRequest::new("Album", query))
        .await
        .unwrap();

    // THEN
    assert_eq!(values(&response, "Title"), vec![Value::from("Restless and Wild")]);
    let fetch = &source.fetches_of("Album")[0];
    assert_eq!(fetch.limit, None);
    assert!(fetch.order_by.is_empty());
}

#[tokio::test]
async fn test_order_by_two_hops_batches_each_hop() {
    // GIVEN
    let (session, source) = counted_session(catalogue()).await.unwrap();
    let query = Query::new().column("TrackId").with_order_by(ordered(vec![
        through(&["album", "artist"], column("Name"), OrderDirection::Asc),
        OrderByElement::column("TrackId", OrderDirection::Desc),
    ]));

    // WHEN
    let response = session
        .execute(&QueryRequest::new("Track", query))
        .await
        .unwrap();

    // THEN
    let ids: Vec<Value> = [7, 6, 1, 5, 4, 3, 2].into_iter().map(Value::Int).collect();
    assert_eq!(values(&response, "TrackId"), ids);
    assert_eq!(source.fetches_of("Album").len(), 1);
    assert_eq!(source.fetches_of("Artist").len(), 1);
}

#[tokio::test]
async fn test_order_by_star_count_of_array_relationship() {
    let order_by = ordered(vec![
        through(&["albums"], OrderByTarget::StarCountAggregate, OrderDirection::Asc),
        OrderByElement::column("Name", OrderDirection::Asc),
    ]);

    let artists = names("Artist", "Name", order_by).await.unwrap();

    assert_eq!(
        artists,
        vec![Value::from("Aerosmith"), Value::from("AC/DC"), Value::from("Accept")]
    );
}

#[tokio::test]
async fn test_max_over_no_related_rows_sorts_as_null() {
    // GIVEN Aerosmith has no albums
    let max_album = OrderByTarget::SingleColumnAggregate {
        column: "AlbumId".into(),
        function: AggregateFunction::Max,
        result_type: None,
    };
    let order_by = ordered(vec![through(&["albums"], max_album, OrderDirection::Asc)]);

    // WHEN
    let artists = names("Artist", "Name", order_by).await.unwrap();

    // THEN
    assert_eq!(
        artists,
        vec![Value::from("Aerosmith"), Value::from("Accept"), Value::from("AC/DC")]
    );
}

#[tokio::test]
async fn test_relation_filter_narrows_the_path() {
    // GIVEN only "Let There Be Rock" is visible through `albums`
    let mut order_by = ordered(vec![through(&["albums"], column("Title"), OrderDirection::Asc)]);
    order_by.relations.insert(
        "albums".into(),
        OrderByRelation {
            r#where: Some(Expression::equal("Title", "Let There Be Rock")),
            subrelations: BTreeMap::new(),
        },
    );

    // WHEN
    let artists = names("Artist", "Name", order_by).await.unwrap();

    // THEN
    assert_eq!(
        artists,
        vec![Value::from("Accept"), Value::from("Aerosmith"), Value::from("AC/DC")]
    );
}

#[tokio::test]
async fn test_column_through_array_relationship_is_ambiguous() {
    let order_by = ordered(vec![through(&["albums"], column("Title"), OrderDirection::Asc)]);

    let result = names("Artist", "Name", order_by).await;

    assert!(matches!(
        result,
        Err(SessionError::Query(QueryError::AmbiguousOrderByTarget { rows: 2, .. }))
    ));
}

#[tokio::test]
async fn test_aggregate_target_without_path_is_rejected() {
    let order_by = ordered(vec![through(&[], OrderByTarget::StarCountAggregate, OrderDirection::Asc)]);

    let result = names("Artist", "Name", order_by).await;

    assert!(matches!(
        result,
        Err(SessionError::Query(QueryError::InvalidRequest { .. }))
    ));
}
