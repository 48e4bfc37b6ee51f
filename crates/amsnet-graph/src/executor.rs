//! Transactional statement execution.

use std::sync::Arc;

use amsnet_core::error::Result;
use amsnet_core::ServiceError;

use crate::client::GraphError;
use crate::cypher::Statement;
use crate::store::{GraphStore, Row, StoreTxn};

/// Runs statements inside a single transaction: all commit or none do.
///
/// This is the transaction boundary. Driver errors are logged here with the
/// failing statement and surface to callers only as [`ServiceError::Store`].
#[derive(Clone)]
pub struct Executor {
    store: Arc<dyn GraphStore>,
}

impl Executor {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Execute `statements` in order within one transaction.
    ///
    /// Returns the rows of each statement, in the same order. A statement
    /// built with a match requirement that affects nothing rolls the whole
    /// transaction back and yields [`ServiceError::NotFound`].
    pub async fn execute(&self, statements: &[Statement]) -> Result<Vec<Vec<Row>>> {
        let Some(first) = statements.first() else {
            return Ok(Vec::new());
        };

        let mut txn = self
            .store
            .begin()
            .await
            .map_err(|e| store_failure(first, "begin", e))?;

        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            let rows = match txn.run(statement).await {
                Ok(rows) => rows,
                Err(e) => {
                    let err = store_failure(statement, "run", e);
                    rollback(txn, statement).await;
                    return Err(err);
                }
            };

            if statement.requires_match() && rows.is_empty() {
                tracing::warn!(
                    op = statement.op().op_name(),
                    "Statement matched nothing, rolling back"
                );
                rollback(txn, statement).await;
                let (kind, name) = statement.op().target();
                return Err(ServiceError::not_found(kind, name));
            }
            results.push(rows);
        }

        let last = statements.last().unwrap_or(first);
        txn.commit()
            .await
            .map_err(|e| store_failure(last, "commit", e))?;

        Ok(results)
    }

    /// Execute a single statement in its own transaction.
    pub async fn execute_one(&self, statement: &Statement) -> Result<Vec<Row>> {
        let mut results = self.execute(std::slice::from_ref(statement)).await?;
        Ok(results.pop().unwrap_or_default())
    }
}

async fn rollback(txn: Box<dyn StoreTxn>, statement: &Statement) {
    if let Err(e) = txn.rollback().await {
        tracing::error!(
            op = statement.op().op_name(),
            error = %e,
            "Rollback failed"
        );
    }
}

fn store_failure(statement: &Statement, stage: &str, err: GraphError) -> ServiceError {
    let op = statement.op().op_name();
    tracing::error!(
        op,
        stage,
        statement = %statement,
        error = %err,
        "Graph transaction failed"
    );
    ServiceError::Store(format!("{op} failed: database error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher::QueryBuilder;
    use crate::memory::MemoryGraphStore;
    use amsnet_core::{EntityKind, PropertyMap};

    fn one_prop() -> PropertyMap {
        [("k".to_string(), "v".into())].into_iter().collect()
    }

    #[tokio::test]
    async fn commits_all_statements() {
        let store = MemoryGraphStore::new();
        let executor = Executor::new(Arc::new(store.clone()));
        let builder = QueryBuilder::default();

        let statements = vec![
            builder.create_node("a", &one_prop()).unwrap(),
            builder.create_node("b", &one_prop()).unwrap(),
        ];
        let results = executor.execute(&statements).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(store.node_count("a"), 1);
        assert_eq!(store.node_count("b"), 1);
    }

    #[tokio::test]
    async fn failure_rolls_back_earlier_statements() {
        let store = MemoryGraphStore::new();
        let executor = Executor::new(Arc::new(store.clone()));
        let builder = QueryBuilder::default();
        store.fail_on("update_node");

        let statements = vec![
            builder.create_node("a", &one_prop()).unwrap(),
            builder.update_node("a", &one_prop()).unwrap(),
        ];
        let err = executor.execute(&statements).await.unwrap_err();

        assert!(matches!(err, ServiceError::Store(_)));
        assert_eq!(store.node_count("a"), 0);
    }

    #[tokio::test]
    async fn unmatched_required_statement_is_not_found() {
        let store = MemoryGraphStore::new();
        let executor = Executor::new(Arc::new(store.clone()));
        let delete = QueryBuilder::default().delete_node("ghost").unwrap();

        let err = executor.execute_one(&delete).await.unwrap_err();
        assert_eq!(err, ServiceError::not_found(EntityKind::Node, "ghost"));
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let executor = Executor::new(Arc::new(MemoryGraphStore::new()));
        assert!(executor.execute(&[]).await.unwrap().is_empty());
    }
}
