//! Data models for Library Desk

pub mod author;
pub mod book;
pub mod customer;
pub mod loan;

/// ID reserved for the placeholder author, book and customer. It is rendered
/// from constants and never borrowed, returned or deleted.
pub const SENTINEL_ID: i32 = 0;

// Re-export commonly used types
pub use author::{Author, AuthorDetails};
pub use book::{BookDetails, LoanedBook};
pub use customer::{Customer, CustomerDetails};
pub use loan::{
    BorrowReceipt, BorrowRequest, Checkpoint, Confirmation, Loan, LoanOperation, LoanOutcome,
    LoanRejection, ReturnReceipt,
};
