//! Authors repository for database operations

use sqlx::{Pool, Postgres};

use super::{begin_dirty_read, guarded_delete, DeleteOutcome};
use crate::{
    error::AppResult,
    models::author::{Author, AuthorBookRow, AuthorDetails},
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get an author with the books they wrote
    pub async fn get_by_id(&self, author_id: i32) -> AppResult<Option<AuthorDetails>> {
        let mut tx = begin_dirty_read(&self.pool).await?;

        let rows = sqlx::query_as::<_, AuthorBookRow>(
            r#"
            SELECT a.AuthorId AS author_id, a.Name AS name, a.Surname AS surname,
                   b.ISBN AS isbn, b.Title AS title
            FROM Author a
            LEFT JOIN Book_Author ba ON a.AuthorId = ba.AuthorId
            LEFT JOIN Book b ON ba.ISBN = b.ISBN
            WHERE a.AuthorId = $1
            ORDER BY b.ISBN
            "#,
        )
        .bind(author_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(AuthorDetails::from_rows(rows))
    }

    /// Get all authors ordered by ID
    pub async fn list(&self) -> AppResult<Vec<Author>> {
        let mut tx = begin_dirty_read(&self.pool).await?;

        let authors = sqlx::query_as::<_, Author>(
            "SELECT AuthorId AS author_id, Name AS name, Surname AS surname FROM Author ORDER BY AuthorId",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(authors)
    }

    /// Delete an author; their `Book_Author` links cascade
    pub async fn delete(&self, author_id: i32) -> AppResult<DeleteOutcome> {
        guarded_delete(
            &self.pool,
            None,
            "DELETE FROM Author WHERE AuthorId = $1",
            author_id,
        )
        .await
    }
}
