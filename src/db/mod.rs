pub mod policy;
pub mod schema;
pub mod search;

use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::models::{supplied, Client, ClientFilter, ClientUpdate, Phone};

pub use policy::{plan_phone_update, PhoneChange};
pub use schema::OnClientDelete;
use search::{dedup_clients, looks_like_phone_number};

/// Contact store holding the single database connection.
///
/// Every mutating operation runs in its own transaction and commits before
/// returning. Reads go straight to the connection.
pub struct ContactStore {
    conn: PgConnection,
}

#[derive(Debug, Clone, Copy)]
enum ClientColumn {
    FirstName,
    LastName,
    Email,
}

impl ClientColumn {
    fn select_sql(self) -> &'static str {
        match self {
            ClientColumn::FirstName => {
                "SELECT client_id, first_name, last_name, email FROM client WHERE first_name = $1 ORDER BY client_id"
            }
            ClientColumn::LastName => {
                "SELECT client_id, first_name, last_name, email FROM client WHERE last_name = $1 ORDER BY client_id"
            }
            ClientColumn::Email => {
                "SELECT client_id, first_name, last_name, email FROM client WHERE email = $1 ORDER BY client_id"
            }
        }
    }

    fn update_sql(self) -> &'static str {
        match self {
            ClientColumn::FirstName => "UPDATE client SET first_name = $1 WHERE client_id = $2",
            ClientColumn::LastName => "UPDATE client SET last_name = $1 WHERE client_id = $2",
            ClientColumn::Email => "UPDATE client SET email = $1 WHERE client_id = $2",
        }
    }
}

impl ContactStore {
    /// Open the connection described by the configuration
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let options = config.connect_options()?;
        Ok(Self::connect_with(&options).await?)
    }

    pub async fn connect_with(options: &PgConnectOptions) -> StoreResult<Self> {
        let conn = PgConnection::connect_with(options)
            .await
            .map_err(StoreError::Connect)?;
        debug!("database connection established");

        Ok(Self { conn })
    }

    /// Close the connection, consuming the store
    pub async fn close(self) -> StoreResult<()> {
        self.conn.close().await?;
        debug!("database connection closed");
        Ok(())
    }

    /// Drop and recreate both tables. All existing data is lost.
    pub async fn initialize_schema(&mut self, on_delete: OnClientDelete) -> StoreResult<()> {
        let mut tx = self.conn.begin().await?;

        // phone references client, so it goes first
        sqlx::query(schema::DROP_PHONE).execute(&mut *tx).await?;
        sqlx::query(schema::DROP_CLIENT).execute(&mut *tx).await?;
        sqlx::query(schema::CREATE_CLIENT).execute(&mut *tx).await?;
        sqlx::query(schema::create_phone(on_delete))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(?on_delete, "schema initialized");

        Ok(())
    }

    /// Insert a client, plus its first phone number when one is given
    pub async fn add_client(
        &mut self,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<i32> {
        let mut tx = self.conn.begin().await?;

        let client_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO client (first_name, last_name, email)
            VALUES ($1, $2, $3)
            RETURNING client_id
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(number) = phone_number.filter(|n| !n.is_empty()) {
            insert_phone(&mut *tx, client_id, number).await?;
        }

        tx.commit().await?;
        debug!(client_id, "client added");

        Ok(client_id)
    }

    pub async fn add_phone_number(&mut self, client_id: i32, phone_number: &str) -> StoreResult<i32> {
        let mut tx = self.conn.begin().await?;
        let phone_id = insert_phone(&mut *tx, client_id, phone_number).await?;
        tx.commit().await?;
        debug!(client_id, phone_id, "phone number added");

        Ok(phone_id)
    }

    /// Apply each supplied field of `update` to the client.
    ///
    /// A new phone number replaces the client's only number, is added when the
    /// client has none, and needs `update.replace_phone` when it has several.
    pub async fn update_client(&mut self, client_id: i32, update: &ClientUpdate) -> StoreResult<()> {
        let mut tx = self.conn.begin().await?;

        let fields = [
            (ClientColumn::FirstName, supplied(&update.first_name)),
            (ClientColumn::LastName, supplied(&update.last_name)),
            (ClientColumn::Email, supplied(&update.email)),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                sqlx::query(column.update_sql())
                    .bind(value)
                    .bind(client_id)
                    .execute(&mut *tx)
                    .await?;
                debug!(client_id, ?column, "client field updated");
            }
        }

        if let Some(number) = supplied(&update.phone_number) {
            let current = phones_of(&mut *tx, client_id).await?;
            match plan_phone_update(client_id, &current, supplied(&update.replace_phone))? {
                PhoneChange::Insert => {
                    insert_phone(&mut *tx, client_id, number).await?;
                }
                PhoneChange::Replace { phone_id } => {
                    sqlx::query("UPDATE phone SET phone_number = $1 WHERE phone_id = $2")
                        .bind(number)
                        .bind(phone_id)
                        .execute(&mut *tx)
                        .await?;
                    debug!(client_id, phone_id, "phone number replaced");
                }
            }
        }

        tx.commit().await?;

        Ok(())
    }

    /// Delete the phone row holding this number. Returns the number of rows removed.
    pub async fn remove_phone_number(&mut self, phone_number: &str) -> StoreResult<u64> {
        let mut tx = self.conn.begin().await?;
        let removed = sqlx::query("DELETE FROM phone WHERE phone_number = $1")
            .bind(phone_number)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        info!(phone_number, removed, "phone number removed");

        Ok(removed)
    }

    /// Delete a client together with all of its phone numbers
    pub async fn remove_client(&mut self, client_id: i32) -> StoreResult<u64> {
        let mut tx = self.conn.begin().await?;

        let phones = sqlx::query("DELETE FROM phone WHERE client_id = $1")
            .bind(client_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let removed = sqlx::query("DELETE FROM client WHERE client_id = $1")
            .bind(client_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        info!(client_id, phones, removed, "client removed");

        Ok(removed)
    }

    /// Free-text search across names, email and (for 11-digit terms) phone numbers
    pub async fn search(&mut self, terms: &[String]) -> StoreResult<Vec<Client>> {
        let mut found = Vec::new();
        for term in terms {
            for column in [ClientColumn::FirstName, ClientColumn::LastName, ClientColumn::Email] {
                found.extend(clients_where(&mut self.conn, column, term).await?);
            }
            if looks_like_phone_number(term) {
                found.extend(clients_with_phone(&mut self.conn, term).await?);
            }
        }
        debug!(terms = terms.len(), rows = found.len(), "search finished");

        Ok(dedup_clients(found))
    }

    /// Search by named filters; the result is the union of every supplied filter's matches
    pub async fn find(&mut self, filter: &ClientFilter) -> StoreResult<Vec<Client>> {
        let mut found = Vec::new();
        let columns = [
            (ClientColumn::FirstName, supplied(&filter.first_name)),
            (ClientColumn::LastName, supplied(&filter.last_name)),
            (ClientColumn::Email, supplied(&filter.email)),
        ];
        for (column, value) in columns {
            if let Some(value) = value {
                found.extend(clients_where(&mut self.conn, column, value).await?);
            }
        }
        if let Some(number) = supplied(&filter.phone_number) {
            found.extend(clients_with_phone(&mut self.conn, number).await?);
        }

        Ok(dedup_clients(found))
    }

    pub async fn get_client(&mut self, client_id: i32) -> StoreResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT client_id, first_name, last_name, email FROM client WHERE client_id = $1",
        )
        .bind(client_id)
        .fetch_optional(&mut self.conn)
        .await?;

        Ok(client)
    }

    /// All phone rows owned by the client, oldest first
    pub async fn phone_numbers(&mut self, client_id: i32) -> StoreResult<Vec<Phone>> {
        Ok(phones_of(&mut self.conn, client_id).await?)
    }

    pub async fn phone_id(&mut self, phone_number: &str) -> StoreResult<Option<i32>> {
        let id = sqlx::query_scalar::<_, i32>("SELECT phone_id FROM phone WHERE phone_number = $1")
            .bind(phone_number)
            .fetch_optional(&mut self.conn)
            .await?;

        Ok(id)
    }
}

async fn insert_phone(conn: &mut PgConnection, client_id: i32, phone_number: &str) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO phone (client_id, phone_number)
        VALUES ($1, $2)
        RETURNING phone_id
        "#,
    )
    .bind(client_id)
    .bind(phone_number)
    .fetch_one(conn)
    .await
}

async fn phones_of(conn: &mut PgConnection, client_id: i32) -> Result<Vec<Phone>, sqlx::Error> {
    sqlx::query_as::<_, Phone>(
        "SELECT phone_id, client_id, phone_number FROM phone WHERE client_id = $1 ORDER BY phone_id",
    )
    .bind(client_id)
    .fetch_all(conn)
    .await
}

async fn clients_where(
    conn: &mut PgConnection,
    column: ClientColumn,
    value: &str,
) -> Result<Vec<Client>, sqlx::Error> {
    sqlx::query_as::<_, Client>(column.select_sql())
        .bind(value)
        .fetch_all(conn)
        .await
}

async fn clients_with_phone(conn: &mut PgConnection, phone_number: &str) -> Result<Vec<Client>, sqlx::Error> {
    sqlx::query_as::<_, Client>(
        r#"
        SELECT c.client_id, c.first_name, c.last_name, c.email
        FROM client c
        JOIN phone p ON p.client_id = c.client_id
        WHERE p.phone_number = $1
        "#,
    )
    .bind(phone_number)
    .fetch_all(conn)
    .await
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::str::FromStr;
    use std::sync::{Mutex, MutexGuard};

    use super::*;

    // Integration tests require a real database and share its tables
    // Run with: DATABASE_URL=postgres://... cargo test -- --ignored

    static DB_LOCK: Mutex<()> = Mutex::new(());

    pub(crate) async fn fresh_store(on_delete: OnClientDelete) -> (MutexGuard<'static, ()>, ContactStore) {
        let guard = DB_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let options = PgConnectOptions::from_str(&url).expect("invalid DATABASE_URL");
        let mut store = ContactStore::connect_with(&options)
            .await
            .expect("connection failed");
        store.initialize_schema(on_delete).await.expect("schema reset failed");
        (guard, store)
    }

    pub(crate) async fn count(store: &mut ContactStore, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&mut store.conn)
            .await
            .expect("count failed")
    }
}
