//! Customers repository for database operations

use sqlx::{Pool, Postgres};

use super::{begin_dirty_read, guarded_delete, DeleteOutcome};
use crate::{
    error::AppResult,
    models::customer::{Customer, CustomerDetails, CustomerLoanRow},
};

#[derive(Clone)]
pub struct CustomersRepository {
    pool: Pool<Postgres>,
}

impl CustomersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a customer with the books they currently hold
    pub async fn get_by_id(&self, customer_id: i32) -> AppResult<Option<CustomerDetails>> {
        let mut tx = begin_dirty_read(&self.pool).await?;

        let rows = sqlx::query_as::<_, CustomerLoanRow>(
            r#"
            SELECT c.CustomerId AS customer_id, c.L_Name AS last_name, c.F_Name AS first_name,
                   c.City AS city, b.ISBN AS isbn, b.Title AS title
            FROM Customer c
            LEFT JOIN Cust_Book cb ON c.CustomerId = cb.CustomerId
            LEFT JOIN Book b ON cb.ISBN = b.ISBN
            WHERE c.CustomerId = $1
            ORDER BY b.ISBN
            "#,
        )
        .bind(customer_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CustomerDetails::from_rows(rows))
    }

    /// Get all customers ordered by ID
    pub async fn list(&self) -> AppResult<Vec<Customer>> {
        let mut tx = begin_dirty_read(&self.pool).await?;

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT CustomerId AS customer_id, L_Name AS last_name, F_Name AS first_name, City AS city
            FROM Customer
            ORDER BY CustomerId
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(customers)
    }

    /// Delete a customer unless they hold a book
    pub async fn delete(&self, customer_id: i32) -> AppResult<DeleteOutcome> {
        guarded_delete(
            &self.pool,
            Some("SELECT COUNT(*) FROM Cust_Book WHERE CustomerId = $1"),
            "DELETE FROM Customer WHERE CustomerId = $1",
            customer_id,
        )
        .await
    }
}
