use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value as Json;
use std::fmt;
use thiserror::Error as ThisError;

///
/// QueryText
///
/// Rendered query text plus its bound parameters, ready for the store
/// client. Parameter names carry their `@` prefix as rendered.
///

#[derive(Clone, Debug, PartialEq)]
pub struct QueryText {
    pub text: String,
    pub parameters: Vec<(String, Json)>,
}

impl fmt::Display for QueryText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

///
/// StoreError
///
/// Failure surfaced by the store client. Carried unchanged through the
/// runner's interception point; this crate never retries it.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Pull iterator of raw documents from a synchronous store client.
pub type RowIter = Box<dyn Iterator<Item = Result<Json, StoreError>> + Send>;

/// Pull stream of raw documents from an asynchronous store client.
pub type RowStream = BoxStream<'static, Result<Json, StoreError>>;

///
/// DocumentStore
///
/// Synchronous store-client boundary: given a container and rendered
/// query, return a pull iterator of raw documents. Iterators must
/// tolerate early drop.
///

pub trait DocumentStore: Send + Sync {
    fn query(&self, container: &str, query: &QueryText) -> Result<RowIter, StoreError>;
}

///
/// AsyncDocumentStore
///
/// Asynchronous store-client boundary with identical semantics to
/// [`DocumentStore`].
///

#[async_trait]
pub trait AsyncDocumentStore: Send + Sync {
    async fn query(&self, container: &str, query: &QueryText) -> Result<RowStream, StoreError>;
}
