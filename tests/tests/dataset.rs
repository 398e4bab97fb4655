//! A data directory loaded end to end and queried through a session.

use pretty_assertions::assert_eq;
use quarry_source::load_directory;
use quarry_tests::prelude::*;
use serde_json::json;
use std::fs;

const CONFIG: &str = r#"{
    "nulls": ["NA"],
    "booleans": {"positive": ["yes"], "negative": ["no"]},
    "schema": {"tables": [
        {
            "name": ["artist"],
            "relationships": {
                "albums": {
                    "target_table": ["Album"],
                    "relationship_type": "array",
                    "column_mapping": {"ArtistId": "ArtistId"}
                }
            }
        },
        {
            "name": ["Album"],
            "columns": [{"name": "title", "description": "Album title"}],
            "relationships": {
                "tracks": {
                    "target_table": ["Track"],
                    "relationship_type": "array",
                    "column_mapping": {"AlbumId": "AlbumId"}
                }
            }
        }
    ]}
}"#;

fn data_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Artist.csv"), "ArtistId,Name\n1,AC/DC\n2,Accept\n").unwrap();
    fs::write(
        dir.path().join("Album.csv"),
        "AlbumId,ArtistId,Title,Remastered,Released\n\
         1,1,For Those About To Rock,yes,1981-11-23\n\
         4,1,Let There Be Rock,no,NA\n\
         2,2,Balls to the Wall,NA,1983-12-05\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("Track.json"),
        r#"[
            {"TrackId": 1, "AlbumId": 1, "Name": "For Those About To Rock (We Salute You)", "meta": {"genre": "Rock"}},
            {"TrackId": 2, "AlbumId": 2, "Name": "Balls to the Wall", "meta": {"genre": "Metal"}}
        ]"#,
    )
    .unwrap();
    fs::write(dir.path().join("config.json"), CONFIG).unwrap();
    dir
}

#[tokio::test]
async fn test_loaded_schema() {
    // GIVEN
    let dir = data_dir();

    // WHEN
    let (session, _) = counted_session(load_directory(dir.path()).unwrap())
        .await
        .unwrap();

    // THEN
    let schema = session.schema();
    let names: Vec<String> = schema.iter().map(|t| t.name.to_string()).collect();
    assert_eq!(names, vec!["[Album]", "[Artist]", "[Track]"]);

    let album = &schema[0];
    assert_eq!(album.primary_key, Some(vec!["AlbumId".to_string()]));
    assert_eq!(album.column("Remastered").unwrap().type_name, "boolean");
    assert!(album.column("Remastered").unwrap().nullable);
    assert_eq!(album.column("Released").unwrap().type_name, "DateTime");
    assert_eq!(
        album.column("Title").unwrap().description.as_deref(),
        Some("Album title")
    );
    assert!(album.relationship("tracks").is_some());
    assert!(schema[1].relationship("albums").is_some());
    assert!(schema[2].column("meta.genre").is_some());
}

#[tokio::test]
async fn test_query_across_files() {
    // GIVEN
    let dir = data_dir();
    let (session, source) = counted_session(load_directory(dir.path()).unwrap())
        .await
        .unwrap();
    let request = json!({
        "table": ["Artist"],
        "query": {
            "fields": {
                "Name": {"type": "column", "column": "Name"},
                "albums": {
                    "type": "relationship",
                    "relationship": "albums",
                    "query": {
                        "fields": {
                            "Title": {"type": "column", "column": "Title"},
                            "Remastered": {"type": "column", "column": "Remastered"},
                            "Released": {"type": "column", "column": "Released"},
                            "tracks": {
                                "type": "relationship",
                                "relationship": "tracks",
                                "query": {"fields": {"genre": {"type": "column", "column": "meta.genre"}}}
                            }
                        }
                    }
                }
            }
        }
    });

    // WHEN
    let response = session.execute_json(&request.to_string()).await.unwrap();

    // THEN
    let albums = nested(&response, "albums");
    assert_eq!(
        values(albums[0], "Title"),
        vec![Value::from("For Those About To Rock"), Value::from("Let There Be Rock")]
    );
    assert_eq!(
        values(albums[0], "Remastered"),
        vec![Value::Bool(true), Value::Bool(false)]
    );
    assert_eq!(
        values(albums[1], "Released"),
        vec![Value::from("1983-12-05T00:00:00.000Z")]
    );
    assert_eq!(values(albums[0], "Released")[1], Value::Null);

    let tracks = nested(albums[1], "tracks");
    assert_eq!(values(tracks[0], "genre"), vec![Value::from("Metal")]);
    assert_eq!(source.fetch_count(), 3);
}
