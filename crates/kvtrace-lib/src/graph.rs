//! Graph store access over the HTTP transaction API, with per-query
//! instrumentation.
//!
//! Scaffolds never talk to the store directly: they hold a
//! `&dyn QueryExecutor`, and the orchestrator decides whether that is the
//! bare client or an `InstrumentedExecutor` that emits one breakdown event
//! per query. The wrapper must not change results or error behavior.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

use crate::breakdown::{estimate_size_bytes, BreakdownLogger, PREVIEW_CHARS};
use crate::config::Config;
use crate::cypher::{classify_cypher_query, cypher_hash, normalize_query};
use crate::event_fields;

/// Write counters reported by the transaction API (`includeStats`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryCounters {
    #[serde(default)]
    pub nodes_created: u64,
    #[serde(default)]
    pub nodes_deleted: u64,
    #[serde(default)]
    pub relationships_created: u64,
    #[serde(default)]
    pub relationships_deleted: u64,
    #[serde(default)]
    pub properties_set: u64,
    #[serde(default)]
    pub labels_added: u64,
    #[serde(default)]
    pub indexes_added: u64,
    #[serde(default)]
    pub indexes_removed: u64,
}

/// Result of one Cypher statement: rows as column-keyed maps, plus write
/// counters when the server reported them.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub records: Vec<serde_json::Map<String, serde_json::Value>>,
    pub counters: QueryCounters,
}

impl QueryResult {
    /// First value of the named column in the first row, as i64.
    /// Missing rows or non-numeric values read as 0, matching how the
    /// snapshot queries treat empty stores.
    pub fn scalar_i64(&self, column: &str) -> i64 {
        self.records
            .first()
            .and_then(|row| row.get(column))
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }
}

/// The single entry point all graph-backed scaffolds run Cypher through.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str, params: serde_json::Value) -> Result<QueryResult>;
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TxData {
    #[serde(default)]
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxData>,
    #[serde(default)]
    stats: Option<QueryCounters>,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

/// Bare HTTP client for a Neo4j-compatible transaction endpoint.
pub struct GraphClient {
    client: Client,
    commit_url: String,
    username: String,
    password: String,
}

impl GraphClient {
    pub fn new(config: &Config) -> Self {
        let base = config.graph_http_uri.trim_end_matches('/');
        Self {
            client: Client::new(),
            commit_url: format!("{base}/db/{}/tx/commit", config.graph_database),
            username: config.graph_username.clone(),
            password: config.graph_password.clone(),
        }
    }
}

#[async_trait]
impl QueryExecutor for GraphClient {
    async fn execute(&self, query: &str, params: serde_json::Value) -> Result<QueryResult> {
        let body = serde_json::json!({
            "statements": [{
                "statement": query,
                "parameters": params,
                "includeStats": true,
            }]
        });
        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .context("Failed to send graph transaction request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Graph transaction request failed with status {status}: {error_body}");
        }

        let parsed: TxResponse = response
            .json()
            .await
            .context("Failed to decode graph transaction response")?;

        if let Some(error) = parsed.errors.first() {
            anyhow::bail!("Graph query failed [{}]: {}", error.code, error.message);
        }

        let Some(result) = parsed.results.into_iter().next() else {
            return Ok(QueryResult::default());
        };

        let records = result
            .data
            .into_iter()
            .map(|data| {
                result
                    .columns
                    .iter()
                    .cloned()
                    .zip(data.row)
                    .collect::<serde_json::Map<_, _>>()
            })
            .collect();

        Ok(QueryResult {
            records,
            counters: result.stats.unwrap_or_default(),
        })
    }
}

/// Instrumented wrapper: one breakdown event per query, ok or error.
pub struct InstrumentedExecutor<E: QueryExecutor> {
    inner: E,
    logger: Arc<BreakdownLogger>,
}

impl<E: QueryExecutor> InstrumentedExecutor<E> {
    pub fn new(inner: E, logger: Arc<BreakdownLogger>) -> Self {
        Self { inner, logger }
    }
}

#[async_trait]
impl<E: QueryExecutor> QueryExecutor for InstrumentedExecutor<E> {
    async fn execute(&self, query: &str, params: serde_json::Value) -> Result<QueryResult> {
        let params_size = estimate_size_bytes(&params);
        let preview: String = normalize_query(query).chars().take(PREVIEW_CHARS).collect();
        let base_fields = event_fields! {
            "query_hash" => cypher_hash(query),
            "query_tag" => classify_cypher_query(query),
            "query_preview" => preview,
            "params_size_bytes" => params_size,
        };

        let started = Instant::now();
        let result = self.inner.execute(query, params).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(result) => {
                let mut fields = base_fields;
                fields.insert(
                    "records_count".to_string(),
                    result.records.len().into(),
                );
                let rows = serde_json::Value::Array(
                    result
                        .records
                        .iter()
                        .map(|r| serde_json::Value::Object(r.clone()))
                        .collect(),
                );
                fields.insert(
                    "records_size_bytes".to_string(),
                    estimate_size_bytes(&rows).into(),
                );
                fields.insert(
                    "nodes_created".to_string(),
                    result.counters.nodes_created.into(),
                );
                fields.insert(
                    "nodes_deleted".to_string(),
                    result.counters.nodes_deleted.into(),
                );
                fields.insert(
                    "relationships_created".to_string(),
                    result.counters.relationships_created.into(),
                );
                fields.insert(
                    "relationships_deleted".to_string(),
                    result.counters.relationships_deleted.into(),
                );
                fields.insert(
                    "properties_set".to_string(),
                    result.counters.properties_set.into(),
                );
                fields.insert(
                    "labels_added".to_string(),
                    result.counters.labels_added.into(),
                );
                fields.insert(
                    "indexes_added".to_string(),
                    result.counters.indexes_added.into(),
                );
                fields.insert(
                    "indexes_removed".to_string(),
                    result.counters.indexes_removed.into(),
                );
                self.logger.log_best_effort(
                    "graph",
                    "cypher_query",
                    "ok",
                    Some(duration_ms),
                    fields,
                );
                Ok(result)
            }
            Err(e) => {
                let mut fields = base_fields;
                fields.insert("error".to_string(), e.to_string().into());
                self.logger.log_best_effort(
                    "graph",
                    "cypher_query",
                    "error",
                    Some(duration_ms),
                    fields,
                );
                Err(e)
            }
        }
    }
}

/// Capture coarse store state (index inventory, entity counts, property
/// size estimates) as one `db_snapshot` event. Best effort: a snapshot
/// failure is recorded but never aborts the run.
pub async fn capture_db_snapshot(
    executor: &dyn QueryExecutor,
    logger: &BreakdownLogger,
    stage: &str,
) {
    let started = Instant::now();
    match snapshot_fields(executor).await {
        Ok(fields) => {
            let mut merged = event_fields! { "stage" => stage };
            merged.extend(fields);
            logger.log_best_effort(
                "graph",
                "db_snapshot",
                "ok",
                Some(started.elapsed().as_secs_f64() * 1000.0),
                merged,
            );
        }
        Err(e) => {
            logger.log_best_effort(
                "graph",
                "db_snapshot",
                "error",
                Some(started.elapsed().as_secs_f64() * 1000.0),
                event_fields! { "stage" => stage, "error" => e.to_string() },
            );
        }
    }
}

/// Upper bound on index rows embedded verbatim in a snapshot event.
const SNAPSHOT_INDEX_ROWS: usize = 30;

async fn snapshot_fields(
    executor: &dyn QueryExecutor,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    let no_params = serde_json::json!({});

    let indexes = executor
        .execute(
            "SHOW INDEXES YIELD name, type, entityType, state, populationPercent \
             RETURN name, type, entityType, state, populationPercent",
            no_params.clone(),
        )
        .await?;
    let index_state = |row: &serde_json::Map<String, serde_json::Value>| {
        row.get("state")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_uppercase()
    };
    let online_indexes = indexes
        .records
        .iter()
        .filter(|row| index_state(row) == "ONLINE")
        .count();
    let building_indexes = indexes
        .records
        .iter()
        .filter(|row| {
            let state = index_state(row);
            !state.is_empty() && state != "ONLINE"
        })
        .count();

    let nodes = executor
        .execute("MATCH (n) RETURN count(n) AS c", no_params.clone())
        .await?;
    let relationships = executor
        .execute("MATCH ()-[r]->() RETURN count(r) AS c", no_params.clone())
        .await?;
    let node_props = executor
        .execute(
            "MATCH (n) UNWIND keys(n) AS k \
             RETURN count(*) AS prop_count, sum(size(toString(n[k]))) AS prop_chars",
            no_params.clone(),
        )
        .await?;
    let rel_props = executor
        .execute(
            "MATCH ()-[r]->() UNWIND keys(r) AS k \
             RETURN count(*) AS prop_count, sum(size(toString(r[k]))) AS prop_chars",
            no_params,
        )
        .await?;

    let index_entries: Vec<serde_json::Value> = indexes
        .records
        .iter()
        .take(SNAPSHOT_INDEX_ROWS)
        .cloned()
        .map(serde_json::Value::Object)
        .collect();

    Ok(event_fields! {
        "index_count" => indexes.records.len(),
        "online_indexes" => online_indexes,
        "building_indexes" => building_indexes,
        "index_entries" => index_entries,
        "node_count" => nodes.scalar_i64("c"),
        "relationship_count" => relationships.scalar_i64("c"),
        "node_property_count" => node_props.scalar_i64("prop_count"),
        "node_property_chars" => node_props.scalar_i64("prop_chars"),
        "relationship_property_count" => rel_props.scalar_i64("prop_count"),
        "relationship_property_chars" => rel_props.scalar_i64("prop_chars"),
    })
}
