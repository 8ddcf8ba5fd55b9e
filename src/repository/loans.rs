//! Loans repository: the transactional side of borrow and return
//!
//! Every statement here runs on an explicitly owned transaction. Row locks are
//! taken with `SELECT ... FOR UPDATE` and held until the ledger is committed or
//! rolled back.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use crate::{error::AppResult, models::loan::Loan};

/// Statements the loan protocol issues inside one transaction.
///
/// Implementations must hold every lock they acquire until `commit` or
/// `rollback` consumes the ledger.
#[async_trait]
pub trait LoanLedger: Send {
    async fn customer_exists(&mut self, customer_id: i32) -> AppResult<bool>;

    async fn lock_customer(&mut self, customer_id: i32) -> AppResult<()>;

    /// Remaining copies; an unknown ISBN reads as 0
    async fn copies_left(&mut self, isbn: i32) -> AppResult<i32>;

    /// Lock the book row and return its remaining copies as seen under the lock
    async fn lock_book(&mut self, isbn: i32) -> AppResult<i32>;

    /// Lock the loan for this pair; `false` when no such loan exists
    async fn lock_loan(&mut self, isbn: i32, customer_id: i32) -> AppResult<bool>;

    async fn book_title(&mut self, isbn: i32) -> AppResult<String>;

    async fn customer_name(&mut self, customer_id: i32) -> AppResult<String>;

    async fn decrement_copies(&mut self, isbn: i32) -> AppResult<()>;

    async fn increment_copies(&mut self, isbn: i32) -> AppResult<()>;

    async fn insert_loan(&mut self, loan: &Loan) -> AppResult<()>;

    async fn delete_loan(&mut self, isbn: i32, customer_id: i32) -> AppResult<()>;

    async fn commit(self) -> AppResult<()>;

    async fn rollback(self) -> Result<(), sqlx::Error>;
}

/// Source of fresh loan transactions
#[async_trait]
pub trait LoanStore: Send + Sync {
    type Ledger: LoanLedger;

    async fn begin(&self) -> AppResult<Self::Ledger>;
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get the active loan for a (book, customer) pair
    pub async fn get(&self, isbn: i32, customer_id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            SELECT ISBN AS isbn, CustomerId AS customer_id, DueDate AS due_date
            FROM Cust_Book
            WHERE ISBN = $1 AND CustomerId = $2
            "#,
        )
        .bind(isbn)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    /// Count active loans of a book
    pub async fn count_for_book(&self, isbn: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Cust_Book WHERE ISBN = $1")
            .bind(isbn)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    type Ledger = PgLedger;

    async fn begin(&self) -> AppResult<PgLedger> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await?;
        Ok(PgLedger { tx })
    }
}

/// A loan transaction on a pooled PostgreSQL connection
pub struct PgLedger {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LoanLedger for PgLedger {
    async fn customer_exists(&mut self, customer_id: i32) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM Customer WHERE CustomerId = $1)")
                .bind(customer_id)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(exists)
    }

    async fn lock_customer(&mut self, customer_id: i32) -> AppResult<()> {
        sqlx::query("SELECT CustomerId FROM Customer WHERE CustomerId = $1 FOR UPDATE")
            .bind(customer_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn copies_left(&mut self, isbn: i32) -> AppResult<i32> {
        let left: Option<i32> = sqlx::query_scalar("SELECT NumLeft::INT FROM Book WHERE ISBN = $1")
            .bind(isbn)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(left.unwrap_or(0))
    }

    async fn lock_book(&mut self, isbn: i32) -> AppResult<i32> {
        let left: Option<i32> =
            sqlx::query_scalar("SELECT NumLeft::INT FROM Book WHERE ISBN = $1 FOR UPDATE")
                .bind(isbn)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(left.unwrap_or(0))
    }

    async fn lock_loan(&mut self, isbn: i32, customer_id: i32) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT ISBN FROM Cust_Book WHERE ISBN = $1 AND CustomerId = $2 FOR UPDATE",
        )
        .bind(isbn)
        .bind(customer_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.is_some())
    }

    async fn book_title(&mut self, isbn: i32) -> AppResult<String> {
        let title: Option<String> = sqlx::query_scalar("SELECT Title FROM Book WHERE ISBN = $1")
            .bind(isbn)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(title.map(|t| t.trim().to_string()).unwrap_or_default())
    }

    async fn customer_name(&mut self, customer_id: i32) -> AppResult<String> {
        let name: Option<(String, String)> =
            sqlx::query_as("SELECT F_Name, L_Name FROM Customer WHERE CustomerId = $1")
                .bind(customer_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(name
            .map(|(first, last)| format!("{} {}", first.trim(), last.trim()))
            .unwrap_or_default())
    }

    async fn decrement_copies(&mut self, isbn: i32) -> AppResult<()> {
        sqlx::query("UPDATE Book SET NumLeft = NumLeft - 1 WHERE ISBN = $1")
            .bind(isbn)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn increment_copies(&mut self, isbn: i32) -> AppResult<()> {
        sqlx::query("UPDATE Book SET NumLeft = NumLeft + 1 WHERE ISBN = $1")
            .bind(isbn)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_loan(&mut self, loan: &Loan) -> AppResult<()> {
        sqlx::query("INSERT INTO Cust_Book (CustomerId, DueDate, ISBN) VALUES ($1, $2, $3)")
            .bind(loan.customer_id)
            .bind(loan.due_date)
            .bind(loan.isbn)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_loan(&mut self, isbn: i32, customer_id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM Cust_Book WHERE ISBN = $1 AND CustomerId = $2")
            .bind(isbn)
            .bind(customer_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }
}
