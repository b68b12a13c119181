//! Shared fixtures for integration tests: schema models and in-memory
//! store fakes.

use async_trait::async_trait;
use floe_core::{
    exec::{AsyncDocumentStore, DocumentStore, RowIter, RowStream, StoreError},
    exec::store::QueryText,
    model::{EntityModel, NavigationModel, PropertyModel},
    value::ScalarKind,
};
use serde_json::Value as Json;
use std::sync::{Arc, Mutex};

pub fn customer_model() -> Arc<EntityModel> {
    let address = Arc::new(
        EntityModel::new("Address", "customers")
            .with_property(PropertyModel::new("city", ScalarKind::Text)),
    );

    Arc::new(
        EntityModel::new("Customer", "customers")
            .with_property(PropertyModel::new("id", ScalarKind::Text))
            .with_property(PropertyModel::new("name", ScalarKind::Text))
            .with_property(PropertyModel::new("amount", ScalarKind::Int))
            .with_property(PropertyModel::new("score", ScalarKind::Float).nullable())
            .with_navigation(NavigationModel::embedded("address", address)),
    )
}

///
/// FakeStore
///
/// Canned-row synchronous store that records every query it receives.
///

pub struct FakeStore {
    rows: Vec<Json>,
    pub queries: Mutex<Vec<QueryText>>,
}

impl FakeStore {
    pub fn new(rows: Vec<Json>) -> Self {
        Self {
            rows,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

impl DocumentStore for FakeStore {
    fn query(&self, _container: &str, query: &QueryText) -> Result<RowIter, StoreError> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(Box::new(self.rows.clone().into_iter().map(Ok)))
    }
}

///
/// FailingStore
/// Fails the request itself.
///

pub struct FailingStore;

impl DocumentStore for FailingStore {
    fn query(&self, _container: &str, _query: &QueryText) -> Result<RowIter, StoreError> {
        Err(StoreError::new("socket reset by peer"))
    }
}

///
/// BrokenIterStore
/// Yields one row, then fails mid-iteration.
///

pub struct BrokenIterStore {
    row: Json,
}

impl BrokenIterStore {
    pub fn new(row: Json) -> Self {
        Self { row }
    }
}

impl DocumentStore for BrokenIterStore {
    fn query(&self, _container: &str, _query: &QueryText) -> Result<RowIter, StoreError> {
        let items = vec![
            Ok(self.row.clone()),
            Err(StoreError::new("connection dropped mid-page")),
        ];
        Ok(Box::new(items.into_iter()))
    }
}

///
/// FakeAsyncStore
/// Canned-row asynchronous store.
///

pub struct FakeAsyncStore {
    rows: Vec<Json>,
}

impl FakeAsyncStore {
    pub fn new(rows: Vec<Json>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl AsyncDocumentStore for FakeAsyncStore {
    async fn query(&self, _container: &str, _query: &QueryText) -> Result<RowStream, StoreError> {
        Ok(Box::pin(futures::stream::iter(
            self.rows.clone().into_iter().map(Ok),
        )))
    }
}
