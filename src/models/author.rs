//! Author model and related types

use std::fmt;

use serde::Serialize;
use sqlx::FromRow;

use super::SENTINEL_ID;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Author {
    pub author_id: i32,
    pub name: String,
    pub surname: String,
}

impl Author {
    pub fn default_entry() -> Self {
        Self {
            author_id: SENTINEL_ID,
            name: "Default Name".to_string(),
            surname: "Default Surname".to_string(),
        }
    }
}

/// Listing form: `id: Surname, Name`
impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}, {}", self.author_id, self.surname.trim(), self.name.trim())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AuthorBookRow {
    pub author_id: i32,
    pub name: String,
    pub surname: String,
    pub isbn: Option<i32>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenBook {
    pub isbn: i32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorDetails {
    pub author: Author,
    pub books: Vec<WrittenBook>,
}

impl AuthorDetails {
    pub fn from_rows(rows: Vec<AuthorBookRow>) -> Option<Self> {
        let first = rows.first()?;
        let author = Author {
            author_id: first.author_id,
            name: first.name.trim().to_string(),
            surname: first.surname.trim().to_string(),
        };

        let books = rows
            .into_iter()
            .filter_map(|row| match (row.isbn, row.title) {
                (Some(isbn), Some(title)) => Some(WrittenBook {
                    isbn,
                    title: title.trim().to_string(),
                }),
                _ => None,
            })
            .collect();

        Some(Self { author, books })
    }
}

impl fmt::Display for AuthorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} {}",
            self.author.author_id,
            self.author.name.trim(),
            self.author.surname.trim()
        )?;
        match self.books.len() {
            0 => write!(f, "\n\t(No books written)"),
            n => {
                write!(f, "\n\t{}", if n == 1 { "Book written:" } else { "Books written:" })?;
                for book in &self.books {
                    write!(f, "\n\t\t{} - {}", book.isbn, book.title)?;
                }
                Ok(())
            }
        }
    }
}

/// Summarize the authors of a book: "Author: X", "Authors: X, Y" or "(no authors)"
pub fn authors_line(authors: &[String]) -> String {
    match authors {
        [] => "(no authors)".to_string(),
        [single] => format!("Author: {}", single),
        many => format!("Authors: {}", many.join(", ")),
    }
}
