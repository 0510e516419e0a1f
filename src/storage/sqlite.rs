//! SQLite storage backend

use super::traits::{GraphStore, OpenStore, StorageError, StorageResult};
use crate::graph::{Context, ContextId, Edge, EdgeId, Node, NodeId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// How long a writer waits on another process's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Node and edge ids last loaded or saved by this store instance.
///
/// A save deletes only ids in the baseline that the context no longer
/// holds; ids written by other processes since the last load survive.
#[derive(Debug, Default)]
struct Baseline {
    nodes: HashSet<String>,
    edges: HashSet<String>,
}

impl Baseline {
    fn of(context: &Context) -> Self {
        Self {
            nodes: context.nodes.keys().map(|id| id.to_string()).collect(),
            edges: context.edges.iter().map(|e| e.id.to_string()).collect(),
        }
    }
}

/// SQLite-backed graph store
///
/// Uses a single database file with tables for contexts, nodes and edges.
/// Runs in WAL mode so readers proceed while a write transaction is open.
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    /// Baselines keyed by context ID string.
    baselines: Mutex<HashMap<String, Baseline>>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // journal_mode returns a row, so it cannot go through execute_batch
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS contexts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                metadata_json TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT NOT NULL,
                context_id TEXT NOT NULL,
                node_type TEXT NOT NULL,
                dimension TEXT NOT NULL,
                properties_json TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                PRIMARY KEY (context_id, id),
                FOREIGN KEY (context_id) REFERENCES contexts(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_type
                ON nodes(context_id, node_type);
            CREATE INDEX IF NOT EXISTS idx_nodes_dimension
                ON nodes(context_id, dimension);

            CREATE TABLE IF NOT EXISTS edges (
                id TEXT NOT NULL,
                context_id TEXT NOT NULL,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                relationship TEXT NOT NULL,
                contributions_json TEXT NOT NULL,
                raw_weight REAL NOT NULL,
                created_at TEXT NOT NULL,
                properties_json TEXT NOT NULL,
                PRIMARY KEY (context_id, id),
                FOREIGN KEY (context_id) REFERENCES contexts(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_edges_source
                ON edges(context_id, source_id);
            CREATE INDEX IF NOT EXISTS idx_edges_target
                ON edges(context_id, target_id);
            CREATE INDEX IF NOT EXISTS idx_edges_relationship
                ON edges(context_id, relationship);
            "#,
        )?;
        Ok(())
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            baselines: Mutex::new(HashMap::new()),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn baselines(&self) -> StorageResult<MutexGuard<'_, HashMap<String, Baseline>>> {
        self.baselines.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn row_to_node(
        id: String,
        node_type: String,
        dimension: String,
        properties_json: String,
        metadata_json: String,
    ) -> StorageResult<Node> {
        Ok(Node {
            id: NodeId::from_string(id),
            node_type,
            dimension,
            properties: serde_json::from_str(&properties_json)?,
            metadata: serde_json::from_str(&metadata_json)?,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn row_to_edge(
        id: String,
        source_id: String,
        target_id: String,
        relationship: String,
        contributions_json: String,
        raw_weight: f64,
        created_at: String,
        properties_json: String,
    ) -> StorageResult<Edge> {
        Ok(Edge {
            id: EdgeId::from_string(id),
            source: NodeId::from_string(source_id),
            target: NodeId::from_string(target_id),
            relationship,
            contributions: serde_json::from_str(&contributions_json)?,
            raw_weight,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StorageError::DateParse(e.to_string()))?
                .with_timezone(&Utc),
            properties: serde_json::from_str(&properties_json)?,
        })
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

impl GraphStore for SqliteStore {
    fn save_context(&self, context: &Context) -> StorageResult<u64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let ctx_id = context.id.as_str();

        let version: i64 = tx.query_row(
            r#"
            INSERT INTO contexts (id, name, description, metadata_json, version)
            VALUES (?1, ?2, ?3, ?4, 1)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                metadata_json = excluded.metadata_json,
                version = contexts.version + 1
            RETURNING version
            "#,
            params![
                ctx_id,
                context.name,
                context.description,
                serde_json::to_string(&context.metadata)?,
            ],
            |row| row.get(0),
        )?;

        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO nodes (id, context_id, node_type, dimension, properties_json, metadata_json)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(context_id, id) DO UPDATE SET
                    node_type = excluded.node_type,
                    dimension = excluded.dimension,
                    properties_json = excluded.properties_json,
                    metadata_json = excluded.metadata_json
                "#,
            )?;
            for node in context.nodes.values() {
                stmt.execute(params![
                    node.id.as_str(),
                    ctx_id,
                    node.node_type,
                    node.dimension,
                    serde_json::to_string(&node.properties)?,
                    serde_json::to_string(&node.metadata)?,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO edges (id, context_id, source_id, target_id, relationship,
                                   contributions_json, raw_weight, created_at, properties_json)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(context_id, id) DO UPDATE SET
                    contributions_json = excluded.contributions_json,
                    raw_weight = excluded.raw_weight,
                    properties_json = excluded.properties_json
                "#,
            )?;
            for edge in &context.edges {
                stmt.execute(params![
                    edge.id.as_str(),
                    ctx_id,
                    edge.source.as_str(),
                    edge.target.as_str(),
                    edge.relationship,
                    serde_json::to_string(&edge.contributions)?,
                    edge.raw_weight,
                    edge.created_at.to_rfc3339(),
                    serde_json::to_string(&edge.properties)?,
                ])?;
            }
        }

        let current = Baseline::of(context);
        let mut baselines = self.baselines()?;
        if let Some(previous) = baselines.get(ctx_id) {
            for edge_id in previous.edges.difference(&current.edges) {
                tx.execute(
                    "DELETE FROM edges WHERE context_id = ?1 AND id = ?2",
                    params![ctx_id, edge_id],
                )?;
            }
            for node_id in previous.nodes.difference(&current.nodes) {
                tx.execute(
                    "DELETE FROM nodes WHERE context_id = ?1 AND id = ?2",
                    params![ctx_id, node_id],
                )?;
            }
        }

        tx.commit()?;
        baselines.insert(ctx_id.to_string(), current);
        debug!(context_id = ctx_id, version, "saved context");
        Ok(version as u64)
    }

    fn load_context(&self, id: &ContextId) -> StorageResult<Option<Context>> {
        let mut conn = self.conn()?;
        // One read transaction so nodes and edges come from the same snapshot
        let tx = conn.transaction()?;

        let context_row: Option<(String, Option<String>, String)> = tx
            .query_row(
                "SELECT name, description, metadata_json FROM contexts WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((name, description, metadata_json)) = context_row else {
            return Ok(None);
        };

        let mut nodes = HashMap::new();
        {
            let mut stmt = tx.prepare(
                "SELECT id, node_type, dimension, properties_json, metadata_json
                 FROM nodes WHERE context_id = ?1",
            )?;
            let rows = stmt.query_map(params![id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;
            for row in rows {
                let (node_id, node_type, dimension, properties, metadata) = row?;
                let node = Self::row_to_node(node_id, node_type, dimension, properties, metadata)?;
                nodes.insert(node.id.clone(), node);
            }
        }

        let mut edges = Vec::new();
        {
            let mut stmt = tx.prepare(
                "SELECT id, source_id, target_id, relationship, contributions_json,
                        raw_weight, created_at, properties_json
                 FROM edges WHERE context_id = ?1 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?;
            for row in rows {
                let (edge_id, source, target, rel, contributions, rw, created, props) = row?;
                let edge = Self::row_to_edge(edge_id, source, target, rel, contributions, rw, created, props)?;
                // Another process may have removed an endpoint after this edge was written
                if !nodes.contains_key(&edge.source) || !nodes.contains_key(&edge.target) {
                    debug!(context_id = %id, edge_id = %edge.id, "skipping edge with missing endpoint");
                    continue;
                }
                if edge.is_unsupported() {
                    continue;
                }
                edges.push(edge);
            }
        }
        tx.commit()?;

        let context = Context::from_parts(
            id.clone(),
            name,
            description,
            nodes,
            edges,
            serde_json::from_str(&metadata_json)?,
        );
        self.baselines()?.insert(id.to_string(), Baseline::of(&context));
        Ok(Some(context))
    }

    fn delete_context(&self, id: &ContextId) -> StorageResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM contexts WHERE id = ?1", params![id.as_str()])?;
        self.baselines()?.remove(id.as_str());
        Ok(rows > 0)
    }

    fn list_contexts(&self) -> StorageResult<Vec<ContextId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM contexts ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|r| r.map(ContextId::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn context_version(&self, id: &ContextId) -> StorageResult<Option<u64>> {
        let conn = self.conn()?;
        let version: Option<i64> = conn
            .query_row(
                "SELECT version FROM contexts WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version.map(|v| v as u64))
    }
}
