//! The music catalogue used across integration tests.
//!
//! ```text
//! Artist 1 AC/DC      albums 1, 4
//! Artist 2 Accept     albums 2, 3
//! Artist 3 Aerosmith  no albums
//! Album 1 tracks 1, 6   Album 2 track 2   Album 3 tracks 3, 4, 5   Album 4 track 7
//! ```

use quarry_core::{row, Row, Value};
use quarry_registry::{Column, Relationship, RelationshipKind, TableSchema};
use quarry_request::{FieldValue, QueryResponse};
use quarry_source::MemorySource;

fn artist_schema() -> TableSchema {
    let mut artist = TableSchema::new("Artist");
    artist.columns = vec![Column::new("ArtistId", "number"), Column::new("Name", "string")];
    artist.primary_key = Some(vec!["ArtistId".into()]);
    artist.relationships.insert(
        "albums".into(),
        Relationship::new("Album", RelationshipKind::Array, [("ArtistId", "ArtistId")]),
    );
    artist
}

fn album_schema() -> TableSchema {
    let mut album = TableSchema::new("Album");
    album.columns = vec![
        Column::new("AlbumId", "number"),
        Column::new("ArtistId", "number").nullable(),
        Column::new("Title", "string"),
    ];
    album.primary_key = Some(vec!["AlbumId".into()]);
    album.relationships.insert(
        "artist".into(),
        Relationship::new("Artist", RelationshipKind::Object, [("ArtistId", "ArtistId")]),
    );
    album.relationships.insert(
        "tracks".into(),
        Relationship::new("Track", RelationshipKind::Array, [("AlbumId", "AlbumId")]),
    );
    album
}

fn track_schema() -> TableSchema {
    let mut track = TableSchema::new("Track");
    track.columns = vec![
        Column::new("TrackId", "number"),
        Column::new("AlbumId", "number"),
        Column::new("Name", "string"),
        Column::new("Milliseconds", "number"),
        Column::new("UnitPrice", "number"),
    ];
    track.primary_key = Some(vec!["TrackId".into()]);
    track.relationships.insert(
        "album".into(),
        Relationship::new("Album", RelationshipKind::Object, [("AlbumId", "AlbumId")]),
    );
    track
}

fn track(id: i64, album: i64, name: &str, milliseconds: i64) -> Row {
    row! {
        "TrackId" => id,
        "AlbumId" => album,
        "Name" => name,
        "Milliseconds" => milliseconds,
        "UnitPrice" => 0.99,
    }
}

/// Schemas and rows of the catalogue, for tests that alter a table before
/// serving it.
pub fn catalogue_tables() -> Vec<(TableSchema, Vec<Row>)> {
    vec![
        (
            artist_schema(),
            vec![
                row! { "ArtistId" => 1, "Name" => "AC/DC" },
                row! { "ArtistId" => 2, "Name" => "Accept" },
                row! { "ArtistId" => 3, "Name" => "Aerosmith" },
            ],
        ),
        (
            album_schema(),
            vec![
                row! { "AlbumId" => 1, "ArtistId" => 1, "Title" => "For Those About To Rock" },
                row! { "AlbumId" => 2, "ArtistId" => 2, "Title" => "Balls to the Wall" },
                row! { "AlbumId" => 3, "ArtistId" => 2, "Title" => "Restless and Wild" },
                row! { "AlbumId" => 4, "ArtistId" => 1, "Title" => "Let There Be Rock" },
            ],
        ),
        (
            track_schema(),
            vec![
                track(1, 1, "For Those About To Rock (We Salute You)", 343719),
                track(2, 2, "Balls to the Wall", 342562),
                track(3, 3, "Fast As a Shark", 230619),
                track(4, 3, "Restless and Wild", 252051),
                track(5, 3, "Princess of the Dawn", 375418),
                track(6, 1, "Put The Finger On You", 205662),
                track(7, 4, "Go Down", 331180),
            ],
        ),
    ]
}

pub fn catalogue() -> MemorySource {
    catalogue_tables()
        .into_iter()
        .fold(MemorySource::new(), |source, (schema, rows)| source.with_table(schema, rows))
}

/// `artists` artists with two albums each and one track per album.
pub fn wide_catalogue(artists: i64) -> MemorySource {
    let mut artist_rows = Vec::new();
    let mut album_rows = Vec::new();
    let mut track_rows = Vec::new();
    for artist in 1..=artists {
        artist_rows.push(row! { "ArtistId" => artist, "Name" => format!("Artist {}", artist) });
        for side in 0..2 {
            let album = artist * 2 - 1 + side;
            album_rows.push(row! {
                "AlbumId" => album,
                "ArtistId" => artist,
                "Title" => format!("Album {}", album),
            });
            track_rows.push(track(album, album, &format!("Track {}", album), 1000 * album));
        }
    }

    MemorySource::new()
        .with_table(artist_schema(), artist_rows)
        .with_table(album_schema(), album_rows)
        .with_table(track_schema(), track_rows)
}

/// The values of one column field across a response's rows.
pub fn values(response: &QueryResponse, field: &str) -> Vec<Value> {
    response
        .rows()
        .iter()
        .map(|row| {
            row.get(field)
                .and_then(FieldValue::as_value)
                .cloned()
                .unwrap_or_default()
        })
        .collect()
}

/// The nested responses of one relationship field across a response's rows.
pub fn nested<'r>(response: &'r QueryResponse, field: &str) -> Vec<&'r QueryResponse> {
    response
        .rows()
        .iter()
        .filter_map(|row| row.get(field).and_then(FieldValue::as_response))
        .collect()
}
