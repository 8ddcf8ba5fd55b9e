//! Loan (borrow) model and related types

use std::fmt;
use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Active loan, one row of `Cust_Book`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub isbn: i32,
    pub customer_id: i32,
    pub due_date: NaiveDate,
}

/// Borrow request as typed by the operator
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BorrowRequest {
    pub isbn: i32,
    pub customer_id: i32,
    #[validate(range(min = 1, max = 31, message = "Day must be between 1 and 31"))]
    pub day: u32,
    #[validate(range(min = 1, max = 12, message = "Month must be between 1 and 12"))]
    pub month: u32,
    #[validate(range(min = 1, max = 9999, message = "Year must be between 1 and 9999"))]
    pub year: i32,
}

impl BorrowRequest {
    /// Validate the fields and resolve the calendar date
    pub fn due_date(&self) -> AppResult<NaiveDate> {
        self.validate()?;
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).ok_or_else(|| {
            AppError::Validation(format!(
                "{} {} {} is not a valid date",
                self.day, self.month, self.year
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoanOperation {
    Borrow,
    Return,
}

impl LoanOperation {
    pub fn title(self) -> &'static str {
        match self {
            LoanOperation::Borrow => "Borrow Book",
            LoanOperation::Return => "Return Book",
        }
    }
}

/// What the operator is asked to confirm while both rows are locked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub operation: LoanOperation,
    pub isbn: i32,
    pub customer_id: i32,
    pub message: String,
    /// When the answer stops counting; a port still waiting by then must
    /// give up and answer [`Confirmation::Cancel`]
    pub deadline: Option<Instant>,
}

impl Checkpoint {
    /// Time left until the deadline; `None` means wait indefinitely
    pub fn remaining(&self) -> Option<std::time::Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] book {} / customer {}: {}",
            self.operation.title(),
            self.isbn,
            self.customer_id,
            self.message
        )
    }
}

/// Operator's answer at the checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Proceed,
    Cancel,
}

/// Business-rule refusal; the transaction has been rolled back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanRejection {
    CustomerNotFound { customer_id: i32 },
    NoCopiesLeft { isbn: i32 },
    NotLoaned { isbn: i32, customer_id: i32 },
}

impl fmt::Display for LoanRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanRejection::CustomerNotFound { customer_id } => {
                write!(f, "Customer with ID {} does not exist", customer_id)
            }
            LoanRejection::NoCopiesLeft { isbn } => {
                write!(f, "No copies left of book with ISBN {}", isbn)
            }
            LoanRejection::NotLoaned { isbn, customer_id } => {
                write!(f, "Book {} is not loaned to customer {}", isbn, customer_id)
            }
        }
    }
}

/// Committed borrow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorrowReceipt {
    pub isbn: i32,
    pub title: String,
    pub customer_id: i32,
    pub customer_name: String,
    pub due_date: NaiveDate,
}

impl fmt::Display for BorrowReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\tBook: {} ({})\n\tLoaned to: {} ({})\n\tDue Date: {}",
            self.isbn,
            self.title,
            self.customer_id,
            self.customer_name,
            self.due_date.format("%-d %B %Y")
        )
    }
}

/// Committed return
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnReceipt {
    pub isbn: i32,
    pub customer_id: i32,
}

impl fmt::Display for ReturnReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\tBook {} returned for customer {}", self.isbn, self.customer_id)
    }
}

/// Terminal state of a borrow or return that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanOutcome<T> {
    Completed(T),
    Rejected(LoanRejection),
    Cancelled,
}

impl<T: fmt::Display> LoanOutcome<T> {
    /// Report text for the operator; `None` when the checkpoint was declined
    pub fn report(&self, operation: LoanOperation) -> Option<String> {
        match self {
            LoanOutcome::Completed(receipt) => Some(format!("{}:\n{}", operation.title(), receipt)),
            LoanOutcome::Rejected(rejection) => {
                Some(format!("{}:\n\t{}", operation.title(), rejection))
            }
            LoanOutcome::Cancelled => None,
        }
    }
}

impl<T> LoanOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, LoanOutcome::Completed(_))
    }
}
