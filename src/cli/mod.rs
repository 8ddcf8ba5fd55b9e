//! Command line front end

pub mod input;
pub mod prompt;
pub mod shell;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::{
    error::{AppError, AppResult},
    AppState,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Catalogue, customers and loan desk for a small library."
)]
pub struct Cli {
    /// Confirm every loan checkpoint without prompting.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Apply the schema migrations.
    Migrate,
    /// Execute a SQL data file, one statement per line.
    Seed {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Look up a book by ISBN.
    Book { isbn: i32 },
    /// List every book.
    Catalogue,
    /// List books currently on loan.
    Loaned,
    /// Show an author and the books they wrote.
    Author { author_id: i32 },
    /// List every author.
    Authors,
    /// Show a customer and the books they hold.
    Customer { customer_id: i32 },
    /// List every customer.
    Customers,
    /// Lend a book to a customer until the given date.
    Borrow {
        isbn: i32,
        customer_id: i32,
        day: u32,
        month: u32,
        year: i32,
    },
    /// Take a book back from a customer.
    Return { isbn: i32, customer_id: i32 },
    /// Delete a book that is not on loan.
    DeleteBook { isbn: i32 },
    /// Delete a customer who holds no books.
    DeleteCustomer { customer_id: i32 },
    /// Delete an author.
    DeleteAuthor { author_id: i32 },
    /// Read commands interactively until `quit`.
    Shell,
}

/// Run one command. `None` means there is nothing to print (a cancelled
/// loan). The interactive shell is started by the binary, not from here.
pub async fn execute(state: &AppState, command: Command) -> AppResult<Option<String>> {
    let services = &state.services;

    let report = match command {
        Command::Migrate => {
            state.repository.migrate().await?;
            "Migrations applied".to_string()
        }
        Command::Seed { path } => {
            let script = tokio::fs::read_to_string(&path).await?;
            let applied = state.repository.seed(&script).await?;
            format!("Executed {} statements from {}", applied, path.display())
        }
        Command::Book { isbn } => services.catalog.book_lookup(isbn).await?,
        Command::Catalogue => services.catalog.show_catalogue().await?,
        Command::Loaned => services.catalog.show_loaned_books().await?,
        Command::Author { author_id } => services.authors.show_author(author_id).await?,
        Command::Authors => services.authors.show_all_authors().await?,
        Command::Customer { customer_id } => services.customers.show_customer(customer_id).await?,
        Command::Customers => services.customers.show_all_customers().await?,
        Command::Borrow {
            isbn,
            customer_id,
            day,
            month,
            year,
        } => {
            return services
                .loans
                .borrow_book(isbn, customer_id, day, month, year)
                .await
        }
        Command::Return { isbn, customer_id } => {
            return services.loans.return_book(isbn, customer_id).await
        }
        Command::DeleteBook { isbn } => services.catalog.delete_book(isbn).await?,
        Command::DeleteCustomer { customer_id } => {
            services.customers.delete_customer(customer_id).await?
        }
        Command::DeleteAuthor { author_id } => services.authors.delete_author(author_id).await?,
        Command::Shell => {
            return Err(AppError::Validation("Already in the shell".to_string()))
        }
    };

    Ok(Some(report))
}
