//! Books repository for database operations

use sqlx::{Pool, Postgres};

use super::{begin_dirty_read, guarded_delete, DeleteOutcome};
use crate::{
    error::AppResult,
    models::book::{BookAuthorRow, BookDetails, LoanedBook, LoanedBookRow},
};

const BOOK_COLUMNS: &str = r#"
    b.ISBN AS isbn, b.Title AS title, b.Edition_No::INT AS edition_no,
    b.NumOfCop::INT AS num_of_cop, b.NumLeft::INT AS num_left"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a book with its authors
    pub async fn get_by_isbn(&self, isbn: i32) -> AppResult<Option<BookDetails>> {
        let mut tx = begin_dirty_read(&self.pool).await?;

        let rows = sqlx::query_as::<_, BookAuthorRow>(&format!(
            r#"
            SELECT {BOOK_COLUMNS}, a.Surname AS surname
            FROM Book b
            LEFT JOIN Book_Author ba ON b.ISBN = ba.ISBN
            LEFT JOIN Author a ON ba.AuthorId = a.AuthorId
            WHERE b.ISBN = $1
            ORDER BY b.ISBN, ba.AuthorSeqNo
            "#
        ))
        .bind(isbn)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BookDetails::group_rows(rows).into_iter().next())
    }

    /// Get every real book (ISBN > 0), ordered by ISBN
    pub async fn list(&self) -> AppResult<Vec<BookDetails>> {
        let mut tx = begin_dirty_read(&self.pool).await?;

        let rows = sqlx::query_as::<_, BookAuthorRow>(&format!(
            r#"
            SELECT {BOOK_COLUMNS}, a.Surname AS surname
            FROM Book b
            LEFT JOIN Book_Author ba ON b.ISBN = ba.ISBN
            LEFT JOIN Author a ON ba.AuthorId = a.AuthorId
            WHERE b.ISBN > 0
            ORDER BY b.ISBN, ba.AuthorSeqNo
            "#
        ))
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BookDetails::group_rows(rows))
    }

    /// Get every book currently on loan with its borrowers
    pub async fn list_loaned(&self) -> AppResult<Vec<LoanedBook>> {
        let mut tx = begin_dirty_read(&self.pool).await?;

        let rows = sqlx::query_as::<_, LoanedBookRow>(&format!(
            r#"
            SELECT {BOOK_COLUMNS},
                   (SELECT ARRAY_AGG(TRIM(a.Surname) ORDER BY ba.AuthorSeqNo)
                    FROM Author a
                    JOIN Book_Author ba ON a.AuthorId = ba.AuthorId
                    WHERE ba.ISBN = b.ISBN) AS authors,
                   c.CustomerId AS customer_id, c.L_Name AS last_name,
                   c.F_Name AS first_name, c.City AS city
            FROM Book b
            JOIN Cust_Book cb ON b.ISBN = cb.ISBN
            JOIN Customer c ON cb.CustomerId = c.CustomerId
            ORDER BY b.ISBN, c.CustomerId
            "#
        ))
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(LoanedBook::group_rows(rows))
    }

    /// Delete a book unless it is on loan
    pub async fn delete(&self, isbn: i32) -> AppResult<DeleteOutcome> {
        guarded_delete(
            &self.pool,
            Some("SELECT COUNT(*) FROM Cust_Book WHERE ISBN = $1"),
            "DELETE FROM Book WHERE ISBN = $1",
            isbn,
        )
        .await
    }
}
