//! Loan management service
//!
//! Borrow and return run as one transaction each:
//!
//! ```text
//! START -> VALIDATED -> LOCKED -> AWAITING_CONFIRMATION -> COMMITTED
//!                                                       -> CANCELLED
//!                    (any failure or rejection)         -> ROLLED_BACK
//! ```
//!
//! Rows are locked customer first, then book, in both operations. The
//! operator is asked to confirm while both locks are held and before anything
//! is written; other transactions touching the same rows wait for the answer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        loan::{
            BorrowReceipt, BorrowRequest, Checkpoint, Confirmation, Loan, LoanOperation,
            LoanOutcome, LoanRejection, ReturnReceipt,
        },
        SENTINEL_ID,
    },
    repository::loans::{LoanLedger, LoanStore, LoansRepository},
};

/// How long past the deadline a port may take before the answer is dropped
const DEADLINE_GRACE: Duration = Duration::from_millis(250);

/// Synchronous decision taken while the loan's rows are locked.
///
/// Called at most once per borrow or return, on a blocking thread. When
/// `checkpoint.deadline` is set the port must return `Cancel` once it passes
/// and must not keep reading input afterwards.
#[cfg_attr(test, mockall::automock)]
pub trait ConfirmationPort: Send + Sync {
    fn confirm(&self, checkpoint: &Checkpoint) -> Confirmation;
}

/// Confirms every checkpoint without asking
pub struct AutoConfirm;

impl ConfirmationPort for AutoConfirm {
    fn confirm(&self, _checkpoint: &Checkpoint) -> Confirmation {
        Confirmation::Proceed
    }
}

/// How a transaction body ended, before commit or rollback
enum Step<T> {
    Commit(T),
    Abandon(LoanOutcome<T>),
}

#[derive(Clone)]
pub struct LoansService<S = LoansRepository> {
    store: S,
    confirmation: Arc<dyn ConfirmationPort>,
    config: LoansConfig,
}

impl<S: LoanStore> LoansService<S> {
    pub fn new(store: S, confirmation: Arc<dyn ConfirmationPort>, config: LoansConfig) -> Self {
        Self {
            store,
            confirmation,
            config,
        }
    }

    /// Borrow a book and return the formatted report; `None` when the
    /// operator cancelled at the checkpoint
    pub async fn borrow_book(
        &self,
        isbn: i32,
        customer_id: i32,
        day: u32,
        month: u32,
        year: i32,
    ) -> AppResult<Option<String>> {
        let request = BorrowRequest {
            isbn,
            customer_id,
            day,
            month,
            year,
        };
        let outcome = self.borrow(&request).await?;
        Ok(outcome.report(LoanOperation::Borrow))
    }

    /// Return a book and return the formatted report; `None` when cancelled
    pub async fn return_book(&self, isbn: i32, customer_id: i32) -> AppResult<Option<String>> {
        let outcome = self.return_loan(isbn, customer_id).await?;
        Ok(outcome.report(LoanOperation::Return))
    }

    /// Create a loan
    pub async fn borrow(&self, request: &BorrowRequest) -> AppResult<LoanOutcome<BorrowReceipt>> {
        let due_date = request.due_date()?;

        tracing::debug!(
            isbn = request.isbn,
            customer_id = request.customer_id,
            state = "START",
            "Borrow started"
        );

        let mut ledger = self.store.begin().await?;
        let step = self
            .borrow_steps(&mut ledger, request.isbn, request.customer_id, due_date)
            .await;
        self.finish(ledger, step, LoanOperation::Borrow).await
    }

    /// Remove a loan
    pub async fn return_loan(
        &self,
        isbn: i32,
        customer_id: i32,
    ) -> AppResult<LoanOutcome<ReturnReceipt>> {
        tracing::debug!(isbn, customer_id, state = "START", "Return started");

        let mut ledger = self.store.begin().await?;
        let step = self.return_steps(&mut ledger, isbn, customer_id).await;
        self.finish(ledger, step, LoanOperation::Return).await
    }

    async fn borrow_steps(
        &self,
        ledger: &mut S::Ledger,
        isbn: i32,
        customer_id: i32,
        due_date: NaiveDate,
    ) -> AppResult<Step<BorrowReceipt>> {
        if customer_id == SENTINEL_ID || !ledger.customer_exists(customer_id).await? {
            return Ok(reject(LoanRejection::CustomerNotFound { customer_id }));
        }

        ledger.lock_customer(customer_id).await?;

        let copies_left = if isbn == SENTINEL_ID {
            0
        } else {
            ledger.copies_left(isbn).await?
        };
        if copies_left <= 0 {
            return Ok(reject(LoanRejection::NoCopiesLeft { isbn }));
        }
        tracing::debug!(isbn, customer_id, copies_left, state = "VALIDATED");

        // Re-read under the lock: a concurrent borrow may have taken the last
        // copy while this transaction was waiting.
        if ledger.lock_book(isbn).await? <= 0 {
            tracing::info!(isbn, "Last copy taken by a concurrent borrow");
            return Ok(reject(LoanRejection::NoCopiesLeft { isbn }));
        }
        tracing::debug!(isbn, customer_id, state = "LOCKED");

        if self
            .checkpoint(LoanOperation::Borrow, isbn, customer_id)
            .await?
            == Confirmation::Cancel
        {
            return Ok(Step::Abandon(LoanOutcome::Cancelled));
        }

        ledger.decrement_copies(isbn).await?;
        ledger
            .insert_loan(&Loan {
                isbn,
                customer_id,
                due_date,
            })
            .await?;

        Ok(Step::Commit(BorrowReceipt {
            isbn,
            title: ledger.book_title(isbn).await?,
            customer_id,
            customer_name: ledger.customer_name(customer_id).await?,
            due_date,
        }))
    }

    async fn return_steps(
        &self,
        ledger: &mut S::Ledger,
        isbn: i32,
        customer_id: i32,
    ) -> AppResult<Step<ReturnReceipt>> {
        let not_loaned = LoanRejection::NotLoaned { isbn, customer_id };
        if isbn == SENTINEL_ID || customer_id == SENTINEL_ID {
            return Ok(reject(not_loaned));
        }
        if !ledger.lock_loan(isbn, customer_id).await? {
            return Ok(reject(not_loaned));
        }
        tracing::debug!(isbn, customer_id, state = "VALIDATED");

        ledger.lock_customer(customer_id).await?;
        ledger.lock_book(isbn).await?;
        tracing::debug!(isbn, customer_id, state = "LOCKED");

        if self
            .checkpoint(LoanOperation::Return, isbn, customer_id)
            .await?
            == Confirmation::Cancel
        {
            return Ok(Step::Abandon(LoanOutcome::Cancelled));
        }

        ledger.delete_loan(isbn, customer_id).await?;
        ledger.increment_copies(isbn).await?;

        Ok(Step::Commit(ReturnReceipt { isbn, customer_id }))
    }

    /// Ask the operator to confirm, blocking this transaction (not the runtime).
    ///
    /// With a timeout configured the port receives the deadline and is
    /// expected to answer `Cancel` by itself once it passes. The wait here is
    /// only a backstop for ports that ignore it.
    async fn checkpoint(
        &self,
        operation: LoanOperation,
        isbn: i32,
        customer_id: i32,
    ) -> AppResult<Confirmation> {
        let limit = self.config.confirmation_timeout();
        let checkpoint = Checkpoint {
            operation,
            isbn,
            customer_id,
            message: self.config.pause_message.clone(),
            deadline: limit.map(|limit| Instant::now() + limit),
        };
        tracing::debug!(isbn, customer_id, state = "AWAITING_CONFIRMATION");

        let port = Arc::clone(&self.confirmation);
        let pending = tokio::task::spawn_blocking(move || port.confirm(&checkpoint));

        let joined = match limit {
            Some(limit) => match tokio::time::timeout(limit + DEADLINE_GRACE, pending).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(
                        isbn,
                        customer_id,
                        timeout_secs = limit.as_secs(),
                        "Confirmation port ignored its deadline, cancelling"
                    );
                    return Ok(Confirmation::Cancel);
                }
            },
            None => pending.await,
        };

        joined.map_err(|e| AppError::Internal(format!("Confirmation prompt failed: {}", e)))
    }

    /// Commit or roll back according to how the body ended
    async fn finish<T>(
        &self,
        ledger: S::Ledger,
        step: AppResult<Step<T>>,
        operation: LoanOperation,
    ) -> AppResult<LoanOutcome<T>> {
        let title = operation.title();
        match step {
            Ok(Step::Commit(receipt)) => {
                ledger.commit().await?;
                tracing::info!(operation = title, state = "COMMITTED", "Loan transaction committed");
                Ok(LoanOutcome::Completed(receipt))
            }
            Ok(Step::Abandon(outcome)) => {
                let reason = match &outcome {
                    LoanOutcome::Rejected(rejection) => {
                        tracing::warn!(operation = title, state = "ROLLED_BACK", "{}", rejection);
                        rejection.to_string()
                    }
                    _ => {
                        tracing::info!(operation = title, state = "CANCELLED", "Cancelled by operator");
                        "cancelled by operator".to_string()
                    }
                };
                ledger
                    .rollback()
                    .await
                    .map_err(|rollback| AppError::RollbackFailed {
                        cause: reason,
                        rollback,
                    })?;
                Ok(outcome)
            }
            Err(err) => {
                tracing::error!(operation = title, state = "ROLLED_BACK", error = %err, "Loan transaction failed");
                match ledger.rollback().await {
                    Ok(()) => Err(err),
                    Err(rollback) => Err(AppError::RollbackFailed {
                        cause: err.to_string(),
                        rollback,
                    }),
                }
            }
        }
    }
}

fn reject<T>(rejection: LoanRejection) -> Step<T> {
    Step::Abandon(LoanOutcome::Rejected(rejection))
}
