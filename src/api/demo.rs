use super::types::{DemoConnectionResponse, DemoQuery};
use crate::domain::{StorageConfig, StorageKind};

const SAMPLE_PATH: &str = "s3://movies/data/**/*.parquet";

/// Bundled MinIO deployment with the movies dataset.
pub fn demo_connection() -> DemoConnectionResponse {
    DemoConnectionResponse {
        connection: StorageConfig::new(
            StorageKind::ObjectGateway,
            "http://localhost:9000",
            "cloudfloe",
            "cloudfloe123",
        )
        .with_region("us-east-1"),
        sample_path: SAMPLE_PATH,
    }
}

pub static DEMO_QUERIES: [DemoQuery; 5] = [
    DemoQuery {
        name: "Sample Movies",
        description: "Preview first 10 movies",
        sql: "SELECT primaryTitle, startYear, runtimeMinutes, genres FROM read_parquet('s3://movies/data/**/*.parquet') WHERE titleType = 'movie' ORDER BY startYear DESC",
    },
    DemoQuery {
        name: "Row Count",
        description: "Count total rows in dataset",
        sql: "SELECT COUNT(*) as total_movies FROM read_parquet('s3://movies/data/**/*.parquet')",
    },
    DemoQuery {
        name: "Movies by Decade",
        description: "Count movies by decade",
        sql: "SELECT decade, COUNT(*) as movie_count FROM read_parquet('s3://movies/data/**/*.parquet') WHERE titleType = 'movie' GROUP BY decade ORDER BY decade DESC",
    },
    DemoQuery {
        name: "Long Movies",
        description: "Find movies over 3 hours",
        sql: "SELECT primaryTitle, startYear, runtimeMinutes FROM read_parquet('s3://movies/data/**/*.parquet') WHERE titleType = 'movie' AND runtimeMinutes > 180 ORDER BY runtimeMinutes DESC",
    },
    DemoQuery {
        name: "Popular Genres",
        description: "Most common genres",
        sql: "SELECT TRIM(genre) as genre, COUNT(*) as count FROM (SELECT UNNEST(string_split(genres, ',')) as genre FROM read_parquet('s3://movies/data/**/*.parquet') WHERE titleType = 'movie' AND genres IS NOT NULL) GROUP BY genre ORDER BY count DESC",
    },
];
