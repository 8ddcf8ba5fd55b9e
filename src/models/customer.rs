//! Customer model and related types

use std::fmt;

use serde::Serialize;
use sqlx::FromRow;

use super::SENTINEL_ID;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Customer {
    pub customer_id: i32,
    pub last_name: String,
    pub first_name: String,
    pub city: Option<String>,
}

impl Customer {
    /// Placeholder rendered for customer 0
    pub fn default_entry() -> Self {
        Self {
            customer_id: SENTINEL_ID,
            last_name: "Default".to_string(),
            first_name: "Customer".to_string(),
            city: None,
        }
    }

    /// "First Last", as printed on loan receipts
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// Renders as `id: Last, First - City`
impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, {} - {}",
            self.customer_id,
            self.last_name.trim(),
            self.first_name.trim(),
            self.city.as_deref().map(str::trim).unwrap_or("(no city)")
        )
    }
}

/// Row of the customer lookup: the customer joined with each borrowed book
#[derive(Debug, Clone, FromRow)]
pub struct CustomerLoanRow {
    pub customer_id: i32,
    pub last_name: String,
    pub first_name: String,
    pub city: Option<String>,
    pub isbn: Option<i32>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorrowedBook {
    pub isbn: i32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerDetails {
    pub customer: Customer,
    pub books: Vec<BorrowedBook>,
}

impl CustomerDetails {
    /// Collapse the joined rows; `None` when the customer does not exist
    pub fn from_rows(rows: Vec<CustomerLoanRow>) -> Option<Self> {
        let mut rows = rows.into_iter();
        let first = rows.next()?;

        let mut details = CustomerDetails {
            customer: Customer {
                customer_id: first.customer_id,
                last_name: first.last_name,
                first_name: first.first_name,
                city: first.city,
            },
            books: Vec::new(),
        };

        for (isbn, title) in std::iter::once((first.isbn, first.title))
            .chain(rows.map(|r| (r.isbn, r.title)))
        {
            if let (Some(isbn), Some(title)) = (isbn, title) {
                details.books.push(BorrowedBook {
                    isbn,
                    title: title.trim().to_string(),
                });
            }
        }

        Some(details)
    }
}

impl fmt::Display for CustomerDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.customer)?;
        match self.books.len() {
            0 => write!(f, "\n\t(No books borrowed)"),
            n => {
                write!(f, "\n\t{}", if n == 1 { "Book Borrowed:" } else { "Books Borrowed:" })?;
                for book in &self.books {
                    write!(f, "\n\t\t{} - {}", book.isbn, book.title)?;
                }
                Ok(())
            }
        }
    }
}
