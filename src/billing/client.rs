//! Client management functionality

use tracing::info;
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_email;

/// Input for creating a client
#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub notes: Option<String>,
}

impl NewClient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Client manager for handling customer records
pub struct ClientManager<S: BillingStorage> {
    pub(crate) storage: S,
    validator: Box<dyn ClientValidator>,
}

impl<S: BillingStorage> ClientManager<S> {
    /// Create a new client manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultClientValidator),
        }
    }

    /// Create a new client manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn ClientValidator>) -> Self {
        Self { storage, validator }
    }

    /// Create a new client
    pub async fn create_client(&mut self, owner_id: &str, input: NewClient) -> BillingResult<Client> {
        let mut client = Client::new(owner_id.to_string(), input.name.trim().to_string());
        client.email = input.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        client.phone = input.phone;
        client.address = input.address;
        client.tax_id = input.tax_id;
        client.notes = input.notes;

        if let Some(email) = client.email.as_deref() {
            validate_email(email)?;
        }
        self.validator.validate_client(&client)?;
        self.storage.save_client(&client).await?;

        info!(owner_id, client_id = %client.id, "client created");
        Ok(client)
    }

    /// Get a client by ID
    pub async fn get_client(&self, owner_id: &str, client_id: Uuid) -> BillingResult<Option<Client>> {
        self.storage.get_client(owner_id, client_id).await
    }

    /// Get a client by ID, returning an error if not found
    pub async fn get_client_required(&self, owner_id: &str, client_id: Uuid) -> BillingResult<Client> {
        self.storage
            .get_client(owner_id, client_id)
            .await?
            .ok_or_else(|| BillingError::not_found("client", client_id))
    }

    /// List the owner's clients sorted by name
    pub async fn list_clients(&self, owner_id: &str) -> BillingResult<Vec<Client>> {
        let mut clients = self.storage.list_clients(owner_id).await?;
        clients.sort_by_key(|c| c.name.to_lowercase());
        Ok(clients)
    }

    /// Update a client
    pub async fn update_client(&mut self, client: &Client) -> BillingResult<Client> {
        self.validator.validate_client(client)?;

        let existing = self.get_client_required(&client.owner_id, client.id).await?;

        let mut updated = client.clone();
        updated.created_at = existing.created_at;
        updated.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_client(&updated).await?;
        Ok(updated)
    }

    /// Delete a client that no document or template refers to
    pub async fn delete_client(&mut self, owner_id: &str, client_id: Uuid) -> BillingResult<()> {
        self.get_client_required(owner_id, client_id).await?;

        let invoices = self
            .storage
            .list_invoices(owner_id, &InvoiceFilter::client(client_id))
            .await?;
        let quotes = self.storage.list_quotes(owner_id).await?;
        let templates = self.storage.list_templates(owner_id).await?;

        let referenced = !invoices.is_empty()
            || quotes.iter().any(|q| q.client_id == client_id)
            || templates.iter().any(|t| t.client_id == client_id);

        if referenced {
            return Err(BillingError::Validation(format!(
                "Client {} still has quotes, invoices or recurring templates",
                client_id
            )));
        }

        self.storage.delete_client(owner_id, client_id).await?;
        info!(owner_id, %client_id, "client deleted");
        Ok(())
    }
}
