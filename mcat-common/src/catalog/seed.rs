//! Demo catalog content for local development

use super::{repo, FieldValue, ALBUM, ARTIST, SONG};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

const DEMO_ALBUMS: &[(&str, i64)] = &[
    ("Greatest Hits", 15),
    ("Summer Vibes", 20),
    ("Classic Collection", 12),
];

const DEMO_SONGS: &[(&str, &str)] = &[
    ("Bohemian Rhapsody", "Rock"),
    ("Blinding Lights", "Pop"),
    ("Hotel California", "Rock"),
    ("Shape of You", "Pop"),
    ("Stairway to Heaven", "Rock"),
];

const DEMO_ARTISTS: &[(&str, &str)] = &[
    ("Queen", "UK"),
    ("The Weeknd", "Canada"),
    ("Eagles", "USA"),
];

/// Rows inserted by [`seed_demo_data`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub albums: usize,
    pub songs: usize,
    pub artists: usize,
}

/// Replace the catalog contents with the demo rows, atomically
///
/// Attachment files of cleared rows are left on disk.
pub async fn seed_demo_data(pool: &SqlitePool) -> Result<SeedSummary> {
    let mut tx = pool.begin().await?;

    for descriptor in [&SONG, &ALBUM, &ARTIST] {
        repo::clear(&mut *tx, descriptor).await?;
    }

    for (title, tracks) in DEMO_ALBUMS {
        let values = vec![FieldValue::from(*title), FieldValue::from(*tracks)];
        repo::insert(&mut *tx, &ALBUM, values, None).await?;
    }
    for (name, genre) in DEMO_SONGS {
        let values = vec![FieldValue::from(*name), FieldValue::from(*genre)];
        repo::insert(&mut *tx, &SONG, values, None).await?;
    }
    for (name, country) in DEMO_ARTISTS {
        let values = vec![FieldValue::from(*name), FieldValue::from(*country)];
        repo::insert(&mut *tx, &ARTIST, values, None).await?;
    }

    tx.commit().await?;

    let summary = SeedSummary {
        albums: DEMO_ALBUMS.len(),
        songs: DEMO_SONGS.len(),
        artists: DEMO_ARTISTS.len(),
    };
    info!(
        "Demo data added: {} albums, {} songs, {} artists",
        summary.albums, summary.songs, summary.artists
    );
    Ok(summary)
}
