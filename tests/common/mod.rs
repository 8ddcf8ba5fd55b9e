//! In-memory loan store with row locks, for exercising the loan protocol
//! without a database server.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::OwnedMutexGuard;

use library_desk::{
    models::loan::Loan,
    repository::loans::{LoanLedger, LoanStore},
    AppError, AppResult,
};

#[derive(Debug, Clone)]
struct BookRow {
    title: String,
    total: i32,
    left: i32,
}

#[derive(Default)]
struct Tables {
    books: HashMap<i32, BookRow>,
    customers: HashMap<i32, (String, String)>,
    loans: HashMap<(i32, i32), NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Customer(i32),
    Book(i32),
    Loan(i32, i32),
}

#[derive(Debug, Clone)]
enum Write {
    Decrement(i32),
    Increment(i32),
    Insert(Loan),
    Delete(i32, i32),
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    locks: Mutex<HashMap<RowKey, Arc<tokio::sync::Mutex<()>>>>,
    begun: AtomicUsize,
    committed: AtomicUsize,
    rolled_back: AtomicUsize,
    fail_on: Mutex<Option<&'static str>>,
    fail_rollback: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_book(self, isbn: i32, title: &str, total: i32, left: i32) -> Self {
        self.inner.tables.lock().unwrap().books.insert(
            isbn,
            BookRow {
                title: title.to_string(),
                total,
                left,
            },
        );
        self
    }

    pub fn with_customer(self, customer_id: i32, first: &str, last: &str) -> Self {
        self.inner
            .tables
            .lock()
            .unwrap()
            .customers
            .insert(customer_id, (first.to_string(), last.to_string()));
        self
    }

    pub fn with_loan(self, isbn: i32, customer_id: i32, due: NaiveDate) -> Self {
        self.inner
            .tables
            .lock()
            .unwrap()
            .loans
            .insert((isbn, customer_id), due);
        self
    }

    /// Make the named ledger operation fail with a storage error
    pub fn fail_on(&self, operation: &'static str) {
        *self.inner.fail_on.lock().unwrap() = Some(operation);
    }

    pub fn fail_rollback(&self) {
        self.inner.fail_rollback.store(true, Ordering::SeqCst);
    }

    pub fn copies_left(&self, isbn: i32) -> Option<i32> {
        self.inner.tables.lock().unwrap().books.get(&isbn).map(|b| b.left)
    }

    pub fn loan(&self, isbn: i32, customer_id: i32) -> Option<NaiveDate> {
        self.inner
            .tables
            .lock()
            .unwrap()
            .loans
            .get(&(isbn, customer_id))
            .copied()
    }

    pub fn loan_count(&self) -> usize {
        self.inner.tables.lock().unwrap().loans.len()
    }

    /// `total - left == active loans` for every book
    pub fn is_consistent(&self) -> bool {
        let tables = self.inner.tables.lock().unwrap();
        tables.books.iter().all(|(isbn, book)| {
            let loans = tables.loans.keys().filter(|(i, _)| i == isbn).count() as i32;
            book.left >= 0 && book.total - book.left == loans
        })
    }

    pub fn begun(&self) -> usize {
        self.inner.begun.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> usize {
        self.inner.committed.load(Ordering::SeqCst)
    }

    pub fn rolled_back(&self) -> usize {
        self.inner.rolled_back.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    type Ledger = MemoryLedger;

    async fn begin(&self) -> AppResult<MemoryLedger> {
        self.inner.begun.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryLedger {
            inner: Arc::clone(&self.inner),
            held: Vec::new(),
            held_keys: HashSet::new(),
            pending: Vec::new(),
        })
    }
}

pub struct MemoryLedger {
    inner: Arc<Inner>,
    held: Vec<OwnedMutexGuard<()>>,
    held_keys: HashSet<RowKey>,
    pending: Vec<Write>,
}

impl MemoryLedger {
    fn check(&self, operation: &'static str) -> AppResult<()> {
        if *self.inner.fail_on.lock().unwrap() == Some(operation) {
            return Err(AppError::Database(sqlx::Error::Protocol(format!(
                "injected failure in {}",
                operation
            ))));
        }
        Ok(())
    }

    async fn lock(&mut self, key: RowKey) {
        if self.held_keys.contains(&key) {
            return;
        }
        let row_lock = {
            let mut locks = self.inner.locks.lock().unwrap();
            Arc::clone(locks.entry(key).or_default())
        };
        self.held.push(row_lock.lock_owned().await);
        self.held_keys.insert(key);
    }

    /// Committed value plus this transaction's own pending changes
    fn visible_left(&self, isbn: i32) -> i32 {
        let committed = self
            .inner
            .tables
            .lock()
            .unwrap()
            .books
            .get(&isbn)
            .map_or(0, |b| b.left);
        self.pending.iter().fold(committed, |left, write| match write {
            Write::Decrement(i) if *i == isbn => left - 1,
            Write::Increment(i) if *i == isbn => left + 1,
            _ => left,
        })
    }
}

#[async_trait]
impl LoanLedger for MemoryLedger {
    async fn customer_exists(&mut self, customer_id: i32) -> AppResult<bool> {
        self.check("customer_exists")?;
        Ok(self
            .inner
            .tables
            .lock()
            .unwrap()
            .customers
            .contains_key(&customer_id))
    }

    async fn lock_customer(&mut self, customer_id: i32) -> AppResult<()> {
        self.check("lock_customer")?;
        self.lock(RowKey::Customer(customer_id)).await;
        Ok(())
    }

    async fn copies_left(&mut self, isbn: i32) -> AppResult<i32> {
        self.check("copies_left")?;
        Ok(self.visible_left(isbn))
    }

    async fn lock_book(&mut self, isbn: i32) -> AppResult<i32> {
        self.check("lock_book")?;
        self.lock(RowKey::Book(isbn)).await;
        Ok(self.visible_left(isbn))
    }

    async fn lock_loan(&mut self, isbn: i32, customer_id: i32) -> AppResult<bool> {
        self.check("lock_loan")?;
        self.lock(RowKey::Loan(isbn, customer_id)).await;
        Ok(self
            .inner
            .tables
            .lock()
            .unwrap()
            .loans
            .contains_key(&(isbn, customer_id)))
    }

    async fn book_title(&mut self, isbn: i32) -> AppResult<String> {
        self.check("book_title")?;
        Ok(self
            .inner
            .tables
            .lock()
            .unwrap()
            .books
            .get(&isbn)
            .map(|b| b.title.clone())
            .unwrap_or_default())
    }

    async fn customer_name(&mut self, customer_id: i32) -> AppResult<String> {
        self.check("customer_name")?;
        Ok(self
            .inner
            .tables
            .lock()
            .unwrap()
            .customers
            .get(&customer_id)
            .map(|(first, last)| format!("{} {}", first, last))
            .unwrap_or_default())
    }

    async fn decrement_copies(&mut self, isbn: i32) -> AppResult<()> {
        self.check("decrement_copies")?;
        self.pending.push(Write::Decrement(isbn));
        Ok(())
    }

    async fn increment_copies(&mut self, isbn: i32) -> AppResult<()> {
        self.check("increment_copies")?;
        self.pending.push(Write::Increment(isbn));
        Ok(())
    }

    async fn insert_loan(&mut self, loan: &Loan) -> AppResult<()> {
        self.check("insert_loan")?;
        self.pending.push(Write::Insert(loan.clone()));
        Ok(())
    }

    async fn delete_loan(&mut self, isbn: i32, customer_id: i32) -> AppResult<()> {
        self.check("delete_loan")?;
        self.pending.push(Write::Delete(isbn, customer_id));
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        self.check("commit")?;
        let mut tables = self.inner.tables.lock().unwrap();
        for write in &self.pending {
            match write {
                Write::Decrement(isbn) => {
                    let book = tables.books.get_mut(isbn).expect("book exists");
                    if book.left == 0 {
                        return Err(AppError::Internal("copies would go negative".into()));
                    }
                    book.left -= 1;
                }
                Write::Increment(isbn) => {
                    tables.books.get_mut(isbn).expect("book exists").left += 1;
                }
                Write::Insert(loan) => {
                    if tables
                        .loans
                        .insert((loan.isbn, loan.customer_id), loan.due_date)
                        .is_some()
                    {
                        return Err(AppError::Internal("duplicate loan".into()));
                    }
                }
                Write::Delete(isbn, customer_id) => {
                    tables.loans.remove(&(*isbn, *customer_id));
                }
            }
        }
        self.inner.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self) -> Result<(), sqlx::Error> {
        if self.inner.fail_rollback.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolClosed);
        }
        self.inner.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
