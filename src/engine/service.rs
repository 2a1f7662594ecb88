//! The embedded record service: fetch, create, update, and delete over an
//! injected storage backend.

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::document::{collection_name, record_id, Document, Record};
use crate::engine::ident;
use crate::engine::materialize::{materialize_create, materialize_update};
use crate::engine::storage::Storage;
use crate::{
    DocumentReader, EntityScope, Error, RecordMutator, RecordStore, Result, DEFAULT_OPERATOR,
};

/// The record service every deployment mode runs on.
///
/// Each operation is one full load, one collection mutation, one full save.
/// Nothing is cached between operations and nothing locks across them, so
/// concurrent mutations race and the last save wins wholesale. Downstream
/// tooling relies on that baseline, simple as it is.
pub struct DataService<S> {
    storage: S,
    operator_id: String,
}

impl<S: Storage> DataService<S> {
    /// Creates a service with the default operator id.
    pub fn new(storage: S) -> Self {
        Self::with_operator(storage, DEFAULT_OPERATOR)
    }

    /// Creates a service whose unowned records get stamped with
    /// `operator_id`.
    pub fn with_operator(storage: S, operator_id: impl Into<String>) -> Self {
        Self {
            storage,
            operator_id: operator_id.into(),
        }
    }

    /// The operator id this service stamps into new records.
    pub fn operator_id(&self) -> &str {
        &self.operator_id
    }
}

fn find_record(records: &[Value], entity_type: &str, id: &str) -> Result<(usize, Record)> {
    records
        .iter()
        .enumerate()
        .find_map(|(index, record)| match record.as_object() {
            Some(fields) if record_id(record) == Some(id) => Some((index, fields.clone())),
            _ => None,
        })
        .ok_or_else(|| Error::RecordNotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        })
}

#[async_trait]
impl<S: Storage> DocumentReader for DataService<S> {
    async fn fetch(&self) -> Result<Document> {
        self.storage.load().await
    }
}

#[async_trait]
impl<S: Storage> RecordMutator for DataService<S> {
    async fn create(&self, entity_type: &str, mut fields: Record) -> Result<Record> {
        if entity_type.is_empty() {
            return Err(Error::Validation("type is required".to_string()));
        }
        fields.shift_remove("type");

        let mut document = self.storage.load().await?;
        let collection = collection_name(entity_type);
        let records = document.collection_or_insert(&collection);

        let id = ident::allocate(entity_type, &fields, records)?;
        materialize_create(entity_type, &mut fields, &id, &self.operator_id);

        records.push(Value::Object(fields.clone()));
        self.storage.save(&document).await?;
        Ok(fields)
    }

    async fn update(&self, entity_type: &str, id: &str, mut fields: Record) -> Result<Record> {
        if entity_type.is_empty() || id.is_empty() {
            return Err(Error::Validation("type and id are required".to_string()));
        }
        fields.shift_remove("type");
        fields.shift_remove("id");

        let mut document = self.storage.load().await?;
        let collection = collection_name(entity_type);
        let records = document
            .collection_mut(&collection)
            .ok_or(Error::CollectionNotFound(collection.clone()))?;

        let (index, existing) = find_record(records, entity_type, id)?;
        let updated = materialize_update(entity_type, &existing, &fields);
        records[index] = Value::Object(updated.clone());

        self.storage.save(&document).await?;
        Ok(updated)
    }

    async fn delete(&self, entity_type: &str, id: &str) -> Result<()> {
        if entity_type.is_empty() || id.is_empty() {
            return Err(Error::Validation("type and id are required".to_string()));
        }

        let mut document = self.storage.load().await?;
        let collection = collection_name(entity_type);
        let records = document
            .collection_mut(&collection)
            .ok_or(Error::CollectionNotFound(collection.clone()))?;

        let (index, _) = find_record(records, entity_type, id)?;
        records.remove(index);

        self.storage.save(&document).await?;
        Ok(())
    }
}

impl<S: Storage> RecordStore for DataService<S> {
    fn entity(&self, entity_type: &str) -> Box<dyn EntityScope + '_> {
        Box::new(ServiceEntityScope {
            service: self,
            entity_type: entity_type.to_string(),
        })
    }
}

/// [`EntityScope`] over the embedded service.
pub struct ServiceEntityScope<'a, S> {
    service: &'a DataService<S>,
    entity_type: String,
}

#[async_trait]
impl<'a, S: Storage> EntityScope for ServiceEntityScope<'a, S> {
    async fn records(&self) -> Result<Vec<Record>> {
        Ok(self.service.fetch().await?.records_of(&self.entity_type))
    }

    async fn create(&self, fields: Record) -> Result<Record> {
        self.service.create(&self.entity_type, fields).await
    }

    async fn update(&self, id: &str, fields: Record) -> Result<Record> {
        self.service.update(&self.entity_type, id, fields).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.service.delete(&self.entity_type, id).await
    }
}
