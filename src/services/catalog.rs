//! Catalogue service: book reports and guarded book deletion

use crate::{
    error::AppResult,
    models::{BookDetails, SENTINEL_ID},
    repository::{DeleteOutcome, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// "Book Lookup" report for one ISBN
    pub async fn book_lookup(&self, isbn: i32) -> AppResult<String> {
        let body = if isbn == SENTINEL_ID {
            BookDetails::default_entry().to_string()
        } else {
            match self.repository.books.get_by_isbn(isbn).await? {
                Some(book) => book.to_string(),
                None => format!("No such ISBN: {}", isbn),
            }
        };
        Ok(format!("Book Lookup:\n\t{}", body))
    }

    /// Every book, placeholder first
    pub async fn show_catalogue(&self) -> AppResult<String> {
        let books = self.repository.books.list().await?;

        let mut report = format!("Show Catalogue:\n\n{}", BookDetails::default_entry());
        for book in books {
            report.push_str(&format!("\n\n{}", book));
        }
        Ok(report)
    }

    /// Books currently out, with their borrowers
    pub async fn show_loaned_books(&self) -> AppResult<String> {
        let loaned = self.repository.books.list_loaned().await?;

        let mut report = String::from("Show Loaned Books:");
        if loaned.is_empty() {
            report.push_str("\n(No Loaned Books)");
        }
        for entry in loaned {
            report.push_str(&format!("\n\n{}", entry));
        }
        Ok(report)
    }

    pub async fn delete_book(&self, isbn: i32) -> AppResult<String> {
        let body = if isbn == SENTINEL_ID {
            "Cannot delete default book entry".to_string()
        } else {
            match self.repository.books.delete(isbn).await? {
                DeleteOutcome::Deleted => {
                    tracing::info!(isbn, "Book deleted");
                    format!("Book with ISBN {} deleted", isbn)
                }
                DeleteOutcome::NotFound => format!("No such ISBN: {}", isbn),
                DeleteOutcome::OnLoan(_) => format!(
                    "Cannot delete book with ISBN {} because it is currently loaned out",
                    isbn
                ),
                DeleteOutcome::JustLoaned => format!(
                    "Cannot delete book with ISBN {} because it has just been loaned out",
                    isbn
                ),
            }
        };
        Ok(format!("Delete Book:\n\t{}", body))
    }
}
