use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;

use crate::domain::{
    models::{
        verify_main_count, CommitReceipt, NewPhoto, Photo, PhotoChange, PhotoChangeSet, PhotoId,
        PublicId, UserId, UserPhotos,
    },
    ports::outbound::PhotoRepository,
    PersistenceError,
};

#[derive(sqlx::FromRow)]
struct PhotoRow {
    id: i32,
    user_id: i32,
    url: String,
    public_id: Option<String>,
    description: Option<String>,
    is_main: bool,
    date_added: OffsetDateTime,
}

impl From<PhotoRow> for Photo {
    fn from(row: PhotoRow) -> Self {
        Self {
            id: PhotoId::new(row.id),
            user_id: UserId::new(row.user_id),
            url: row.url,
            public_id: row.public_id.map(PublicId::from),
            description: row.description,
            date_added: row.date_added,
            is_main: row.is_main,
        }
    }
}

pub struct PostgresPhotoRepository {
    pool: PgPool,
}

impl PostgresPhotoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> PersistenceError {
    PersistenceError::Backend(err.to_string())
}

/// Maps errors raised inside a commit. A unique violation can only come from
/// the one-main-per-user index, i.e. a concurrent promotion.
fn commit_error(user_id: UserId) -> impl Fn(sqlx::Error) -> PersistenceError {
    move |err| {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return PersistenceError::Conflict(user_id);
            }
        }
        backend(err)
    }
}

async fn insert_photo(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    photo: &NewPhoto,
) -> Result<Photo, sqlx::Error> {
    let row = sqlx::query_as::<_, PhotoRow>(
        r#"
        INSERT INTO photos (user_id, url, public_id, description, is_main, date_added)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, url, public_id, description, is_main, date_added
        "#,
    )
    .bind(user_id.as_i32())
    .bind(&photo.url)
    .bind(photo.public_id.as_ref().map(PublicId::as_str))
    .bind(&photo.description)
    .bind(photo.is_main)
    .bind(photo.date_added)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row.into())
}

#[async_trait]
impl PhotoRepository for PostgresPhotoRepository {
    async fn get_photo(&self, photo_id: &PhotoId) -> Result<Option<Photo>, PersistenceError> {
        let row = sqlx::query_as::<_, PhotoRow>(
            r#"
            SELECT id, user_id, url, public_id, description, is_main, date_added
            FROM photos
            WHERE id = $1
            "#,
        )
        .bind(photo_id.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(Photo::from))
    }

    async fn get_user(&self, user_id: &UserId) -> Result<UserPhotos, PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let version = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT version
            FROM photo_collections
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .unwrap_or(0);

        let rows = sqlx::query_as::<_, PhotoRow>(
            r#"
            SELECT id, user_id, url, public_id, description, is_main, date_added
            FROM photos
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_all(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;

        Ok(UserPhotos {
            user_id: *user_id,
            version,
            photos: rows.into_iter().map(Photo::from).collect(),
        })
    }

    async fn get_main_photo(&self, user_id: &UserId) -> Result<Option<Photo>, PersistenceError> {
        let row = sqlx::query_as::<_, PhotoRow>(
            r#"
            SELECT id, user_id, url, public_id, description, is_main, date_added
            FROM photos
            WHERE user_id = $1 AND is_main
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(Photo::from))
    }

    async fn commit(&self, changes: PhotoChangeSet) -> Result<CommitReceipt, PersistenceError> {
        let user_id = changes.user_id;
        let map_err = commit_error(user_id);
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            r#"
            INSERT INTO photo_collections (user_id, version)
            VALUES ($1, 0)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_i32())
        .execute(&mut *tx)
        .await
        .map_err(&map_err)?;

        // Row lock serializes writers of the same collection.
        let version = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT version
            FROM photo_collections
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_one(&mut *tx)
        .await
        .map_err(&map_err)?;

        if version != changes.expected_version {
            return Err(PersistenceError::Conflict(user_id));
        }

        let mut inserted = Vec::new();
        for change in &changes.changes {
            match change {
                PhotoChange::Insert(new_photo) => {
                    let photo = insert_photo(&mut tx, user_id, new_photo)
                        .await
                        .map_err(&map_err)?;
                    inserted.push(photo);
                }
                PhotoChange::SetMain { photo_id, is_main } => {
                    let result = sqlx::query(
                        r#"
                        UPDATE photos
                        SET is_main = $1
                        WHERE id = $2 AND user_id = $3
                        "#,
                    )
                    .bind(*is_main)
                    .bind(photo_id.as_i32())
                    .bind(user_id.as_i32())
                    .execute(&mut *tx)
                    .await
                    .map_err(&map_err)?;

                    if result.rows_affected() != 1 {
                        return Err(PersistenceError::Conflict(user_id));
                    }
                }
                PhotoChange::Remove(photo_id) => {
                    let result = sqlx::query(
                        r#"
                        DELETE FROM photos
                        WHERE id = $1 AND user_id = $2
                        "#,
                    )
                    .bind(photo_id.as_i32())
                    .bind(user_id.as_i32())
                    .execute(&mut *tx)
                    .await
                    .map_err(&map_err)?;

                    if result.rows_affected() != 1 {
                        return Err(PersistenceError::Conflict(user_id));
                    }
                }
            }
        }

        let (total, mains) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE is_main)
            FROM photos
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_one(&mut *tx)
        .await
        .map_err(&map_err)?;

        verify_main_count(
            user_id,
            usize::try_from(total).unwrap_or_default(),
            usize::try_from(mains).unwrap_or_default(),
        )?;

        let version = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE photo_collections
            SET version = version + 1
            WHERE user_id = $1
            RETURNING version
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_one(&mut *tx)
        .await
        .map_err(&map_err)?;

        tx.commit().await.map_err(&map_err)?;

        Ok(CommitReceipt { version, inserted })
    }
}
