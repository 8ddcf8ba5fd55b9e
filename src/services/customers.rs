//! Customer reports and guarded customer deletion

use crate::{
    error::AppResult,
    models::{Customer, CustomerDetails, SENTINEL_ID},
    repository::{DeleteOutcome, Repository},
};

#[derive(Clone)]
pub struct CustomersService {
    repository: Repository,
}

impl CustomersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn show_customer(&self, customer_id: i32) -> AppResult<String> {
        let body = if customer_id == SENTINEL_ID {
            CustomerDetails {
                customer: Customer::default_entry(),
                books: Vec::new(),
            }
            .to_string()
        } else {
            match self.repository.customers.get_by_id(customer_id).await? {
                Some(details) => details.to_string(),
                None => format!("No such customer ID: {}", customer_id),
            }
        };
        Ok(format!("Show Customer:\n\t{}", body))
    }

    pub async fn show_all_customers(&self) -> AppResult<String> {
        let customers = self.repository.customers.list().await?;

        let mut report = String::from("Show All Customers:");
        for customer in customers {
            report.push_str(&format!("\n\t{}", customer));
        }
        Ok(report)
    }

    pub async fn delete_customer(&self, customer_id: i32) -> AppResult<String> {
        let body = if customer_id == SENTINEL_ID {
            "Cannot delete default customer entry".to_string()
        } else {
            delete_message(customer_id, self.repository.customers.delete(customer_id).await?)
        };
        Ok(format!("Delete Customer:\n\t{}", body))
    }
}

fn delete_message(customer_id: i32, outcome: DeleteOutcome) -> String {
    match outcome {
        DeleteOutcome::Deleted => {
            tracing::info!(customer_id, "Customer deleted");
            format!("Customer with ID {} deleted", customer_id)
        }
        DeleteOutcome::NotFound => format!("No such customer ID: {}", customer_id),
        DeleteOutcome::OnLoan(1) => format!(
            "Cannot delete customer with ID {} because they currently have a book loaned out",
            customer_id
        ),
        DeleteOutcome::OnLoan(count) => format!(
            "Cannot delete customer with ID {} because they currently have {} books loaned out",
            customer_id, count
        ),
        DeleteOutcome::JustLoaned => format!(
            "Cannot delete customer with ID {} because they have just borrowed a book",
            customer_id
        ),
    }
}
