//! Book (catalogue entry) model and related types

use std::fmt;

use serde::Serialize;
use sqlx::FromRow;

use super::{author::authors_line, customer::Customer, SENTINEL_ID};

/// Flat row produced by the catalogue queries: one row per (book, author)
#[derive(Debug, Clone, FromRow)]
pub struct BookAuthorRow {
    pub isbn: i32,
    pub title: String,
    pub edition_no: i32,
    pub num_of_cop: i32,
    pub num_left: i32,
    pub surname: Option<String>,
}

/// Book with its authors in `AuthorSeqNo` order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookDetails {
    pub isbn: i32,
    pub title: String,
    pub edition_no: i32,
    pub total_copies: i32,
    pub copies_left: i32,
    pub authors: Vec<String>,
}

impl BookDetails {
    /// Placeholder rendered for ISBN 0 without touching the database
    pub fn default_entry() -> Self {
        Self {
            isbn: SENTINEL_ID,
            title: "Default Book Name".to_string(),
            edition_no: 0,
            total_copies: 1,
            copies_left: 1,
            authors: Vec::new(),
        }
    }

    /// Fold consecutive rows sharing an ISBN into one entry each.
    /// Rows must already be ordered by ISBN.
    pub fn group_rows(rows: Vec<BookAuthorRow>) -> Vec<BookDetails> {
        let mut books: Vec<BookDetails> = Vec::new();

        for row in rows {
            let surname = row.surname.map(|s| s.trim().to_string());
            match books.last_mut() {
                Some(book) if book.isbn == row.isbn => book.authors.extend(surname),
                _ => books.push(BookDetails {
                    isbn: row.isbn,
                    title: row.title.trim().to_string(),
                    edition_no: row.edition_no,
                    total_copies: row.num_of_cop,
                    copies_left: row.num_left,
                    authors: surname.into_iter().collect(),
                }),
            }
        }

        books
    }
}

impl fmt::Display for BookDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}\n\tEdition: {} - Number of copies: {} - Copies left: {}\n\t{}",
            self.isbn,
            self.title,
            self.edition_no,
            self.total_copies,
            self.copies_left,
            authors_line(&self.authors)
        )
    }
}

/// Row of the loaned-books query: one per (book, borrower)
#[derive(Debug, Clone, FromRow)]
pub struct LoanedBookRow {
    pub isbn: i32,
    pub title: String,
    pub edition_no: i32,
    pub num_of_cop: i32,
    pub num_left: i32,
    /// Surnames in `AuthorSeqNo` order; `NULL` when the book has no authors
    pub authors: Option<Vec<String>>,
    pub customer_id: i32,
    pub last_name: String,
    pub first_name: String,
    pub city: Option<String>,
}

/// A book currently out on loan together with everyone holding a copy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanedBook {
    pub book: BookDetails,
    pub borrowers: Vec<Customer>,
}

impl LoanedBook {
    pub fn group_rows(rows: Vec<LoanedBookRow>) -> Vec<LoanedBook> {
        let mut loaned: Vec<LoanedBook> = Vec::new();

        for row in rows {
            let borrower = Customer {
                customer_id: row.customer_id,
                last_name: row.last_name,
                first_name: row.first_name,
                city: row.city,
            };
            match loaned.last_mut() {
                Some(entry) if entry.book.isbn == row.isbn => entry.borrowers.push(borrower),
                _ => loaned.push(LoanedBook {
                    book: BookDetails {
                        isbn: row.isbn,
                        title: row.title.trim().to_string(),
                        edition_no: row.edition_no,
                        total_copies: row.num_of_cop,
                        copies_left: row.num_left,
                        authors: row.authors.unwrap_or_default(),
                    },
                    borrowers: vec![borrower],
                }),
            }
        }

        loaned
    }
}

impl fmt::Display for LoanedBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\tBorrowers:", self.book)?;
        for borrower in &self.borrowers {
            write!(f, "\n\t\t{}", borrower)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(isbn: i32, surname: Option<&str>) -> BookAuthorRow {
        BookAuthorRow {
            isbn,
            title: format!("Title {isbn}          "),
            edition_no: 1,
            num_of_cop: 3,
            num_left: 2,
            surname: surname.map(str::to_string),
        }
    }

    #[test]
    fn test_group_rows_collects_authors_in_order() {
        let books = BookDetails::group_rows(vec![
            row(111, Some("Date   ")),
            row(111, Some("Darwen")),
            row(222, None),
        ]);

        assert_eq!(books.len(), 2);
        assert_eq!(books[0].authors, vec!["Date", "Darwen"]);
        assert_eq!(books[0].title, "Title 111");
        assert!(books[1].authors.is_empty());
    }

    #[test]
    fn test_display_book() {
        let books = BookDetails::group_rows(vec![row(111, Some("Date")), row(111, Some("Darwen"))]);
        assert_eq!(
            books[0].to_string(),
            "111: Title 111\n\tEdition: 1 - Number of copies: 3 - Copies left: 2\n\tAuthors: Date, Darwen"
        );
    }

    #[test]
    fn test_default_entry() {
        assert_eq!(
            BookDetails::default_entry().to_string(),
            "0: Default Book Name\n\tEdition: 0 - Number of copies: 1 - Copies left: 1\n\t(no authors)"
        );
    }

    #[test]
    fn test_loaned_book_lists_each_borrower() {
        let base = LoanedBookRow {
            isbn: 111,
            title: "Databases".into(),
            edition_no: 2,
            num_of_cop: 3,
            num_left: 1,
            authors: Some(vec!["Date".into(), "Darwen".into()]),
            customer_id: 5,
            last_name: "Doe".into(),
            first_name: "Jane".into(),
            city: Some("Wellington".into()),
        };
        let second = LoanedBookRow {
            customer_id: 7,
            last_name: "Roe".into(),
            first_name: "Rick".into(),
            city: None,
            ..base.clone()
        };

        let loaned = LoanedBook::group_rows(vec![base, second]);
        assert_eq!(loaned.len(), 1);
        assert_eq!(
            loaned[0].to_string(),
            "111: Databases\n\tEdition: 2 - Number of copies: 3 - Copies left: 1\n\tAuthors: Date, Darwen\
             \n\tBorrowers:\n\t\t5: Doe, Jane - Wellington\n\t\t7: Roe, Rick - (no city)"
        );
    }

    #[test]
    fn test_loaned_book_keeps_surname_with_comma() {
        let row = LoanedBookRow {
            isbn: 222,
            title: "Letters".into(),
            edition_no: 1,
            num_of_cop: 1,
            num_left: 0,
            authors: Some(vec!["Smith, Jr.".into()]),
            customer_id: 5,
            last_name: "Doe".into(),
            first_name: "Jane".into(),
            city: None,
        };

        let loaned = LoanedBook::group_rows(vec![row]);
        assert_eq!(loaned[0].book.authors, vec!["Smith, Jr."]);
        assert!(loaned[0].to_string().contains("\tAuthor: Smith, Jr.\n"));
    }

    #[test]
    fn test_loaned_book_without_authors() {
        let row = LoanedBookRow {
            isbn: 333,
            title: "Anonymous".into(),
            edition_no: 1,
            num_of_cop: 1,
            num_left: 0,
            authors: None,
            customer_id: 7,
            last_name: "Roe".into(),
            first_name: "Rick".into(),
            city: None,
        };

        let loaned = LoanedBook::group_rows(vec![row]);
        assert!(loaned[0].book.authors.is_empty());
        assert!(loaned[0].to_string().contains("(no authors)"));
    }
}
