pub mod conversations;
pub mod counters;
pub mod messages;
pub mod presence;

use std::sync::Arc;
use std::time::Duration;

use scylla::statement::Consistency;
use scylla::transport::errors::{NewSessionError, QueryError};
use scylla::transport::ExecutionProfile;
use scylla::{Session, SessionBuilder};
use thiserror::Error;

pub use presence::Presence;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session error: {0}")]
    Session(#[from] NewSessionError),
    #[error("query error: {0}")]
    Query(#[from] QueryError),
    #[error("row decode error: {0}")]
    Decode(String),
}

pub(crate) fn decode_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::Decode(err.to_string())
}

/// Handle on the wide-column store. Cheap to clone; the driver pools
/// connections internally.
#[derive(Clone)]
pub struct Store {
    session: Arc<Session>,
}

impl Store {
    /// Connect with quorum consistency. Schema bootstrapping is handled
    /// out of band; see `schema.cql` for the expected tables.
    pub async fn connect(hosts: &[String], keyspace: &str) -> Result<Store, StoreError> {
        let profile = ExecutionProfile::builder()
            .consistency(Consistency::Quorum)
            .build();
        let session = SessionBuilder::new()
            .known_nodes(hosts)
            .connection_timeout(Duration::from_secs(5))
            .default_execution_profile_handle(profile.into_handle())
            .build()
            .await?;
        session.use_keyspace(keyspace, false).await?;
        tracing::info!(keyspace, "connected to ScyllaDB cluster");
        Ok(Store {
            session: Arc::new(session),
        })
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }
}
