use crate::domain::booking::CustomerInput;
use anyhow::Result;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct CustomersRepo {
    pub pool: sqlx::PgPool,
}

impl CustomersRepo {
    /// Upsert keyed on email; returns the customer id either way.
    pub async fn upsert_tx(
        tx: &mut Transaction<'_, Postgres>,
        customer: &CustomerInput,
    ) -> Result<Uuid> {
        let row = sqlx::query(
            r#"
            INSERT INTO customers (customer_id, first_name, last_name, email, phone)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                phone = COALESCE(EXCLUDED.phone, customers.phone),
                updated_at = now()
            RETURNING customer_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(customer.first_name.trim())
        .bind(customer.last_name.trim())
        .bind(customer.email.trim().to_lowercase())
        .bind(customer.phone.clone())
        .fetch_one(tx.as_mut())
        .await?;

        Ok(row.get("customer_id"))
    }
}
