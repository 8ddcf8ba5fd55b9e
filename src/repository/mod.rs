//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod customers;
pub mod loans;

use sqlx::{Pool, Postgres, Transaction};

use crate::error::{AppError, AppResult};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub customers: customers::CustomersRepository,
    pub authors: authors::AuthorsRepository,
    pub loans: loans::LoansRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            customers: customers::CustomersRepository::new(pool.clone()),
            authors: authors::AuthorsRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            pool,
        }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Execute a line-oriented SQL data file. Blank lines and `--` comments are
    /// skipped; a failing statement is logged and does not stop the load.
    pub async fn seed(&self, script: &str) -> AppResult<usize> {
        let mut applied = 0;
        for statement in script
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("--"))
        {
            match sqlx::query(statement).execute(&self.pool).await {
                Ok(_) => applied += 1,
                Err(e) => tracing::warn!(statement, error = %e, "Seed statement failed"),
            }
        }
        Ok(applied)
    }
}

/// Open a transaction that may read rows other sessions have not committed.
/// Reports use it so they never wait on rows locked by an in-flight loan.
pub(crate) async fn begin_dirty_read(
    pool: &Pool<Postgres>,
) -> AppResult<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

/// Roll back after `cause`, escalating when the rollback itself fails
pub(crate) async fn abort(tx: Transaction<'_, Postgres>, cause: AppError) -> AppError {
    match tx.rollback().await {
        Ok(()) => cause,
        Err(rollback) => AppError::RollbackFailed {
            cause: cause.to_string(),
            rollback,
        },
    }
}

/// A foreign-key violation on `Cust_Book`: a loan was created concurrently
pub(crate) fn is_loan_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == "23503")
}

/// Delete one row in its own READ COMMITTED transaction. When `loans_sql`
/// is given it must count the loans referencing `id`; any loan refuses the
/// delete. A loan committed between that check and the delete surfaces as a
/// foreign-key violation and is reported as [`DeleteOutcome::JustLoaned`].
pub(crate) async fn guarded_delete(
    pool: &Pool<Postgres>,
    loans_sql: Option<&str>,
    delete_sql: &str,
    id: i32,
) -> AppResult<DeleteOutcome> {
    let mut tx = pool.begin().await?;

    if let Some(loans_sql) = loans_sql {
        let loans: i64 = match sqlx::query_scalar(loans_sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
        {
            Ok(count) => count,
            Err(e) => return Err(abort(tx, e.into()).await),
        };

        if loans > 0 {
            tx.rollback().await?;
            return Ok(DeleteOutcome::OnLoan(loans));
        }
    }

    let deleted = match sqlx::query(delete_sql).bind(id).execute(&mut *tx).await {
        Ok(result) => result.rows_affected(),
        Err(e) if is_loan_conflict(&e) => {
            tracing::warn!(id, "Row was loaned while being deleted");
            return match tx.rollback().await {
                Ok(()) => Ok(DeleteOutcome::JustLoaned),
                Err(rollback) => Err(AppError::RollbackFailed {
                    cause: e.to_string(),
                    rollback,
                }),
            };
        }
        Err(e) => return Err(abort(tx, e.into()).await),
    };

    match tx.commit().await {
        Ok(()) if deleted > 0 => Ok(DeleteOutcome::Deleted),
        Ok(()) => Ok(DeleteOutcome::NotFound),
        Err(e) if is_loan_conflict(&e) => Ok(DeleteOutcome::JustLoaned),
        Err(e) => Err(e.into()),
    }
}

/// Result of a guarded delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// Refused: this many loans reference the row
    OnLoan(i64),
    /// A loan was inserted between the check and the delete
    JustLoaned,
}
