//! Ordered catalog of read-only introspection queries.
//!
//! The built-in catalog covers the object kinds an operator checks after a
//! migration (tables, indexes, views, sequences, functions, triggers,
//! schemas, extensions, sizes included where they exist). A caller-supplied
//! JSON file with the same `{"name": "sql", ...}` shape replaces it wholesale;
//! entry order is preserved in both cases and drives report section order.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Named introspection queries, executed and reported in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryCatalog {
    sections: IndexMap<String, String>,
}

impl QueryCatalog {
    /// The built-in query set.
    pub fn builtin() -> Self {
        let mut sections = IndexMap::new();

        sections.insert(
            "tables".to_string(),
            "SELECT schemaname || '.' || tablename AS table_name, \
             pg_size_pretty(pg_total_relation_size(quote_ident(schemaname) || '.' || quote_ident(tablename))) AS total_size \
             FROM pg_tables \
             WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
             ORDER BY pg_total_relation_size(quote_ident(schemaname) || '.' || quote_ident(tablename)) DESC;"
                .to_string(),
        );

        sections.insert(
            "indexes".to_string(),
            "SELECT schemaname || '.' || indexname AS index_name, tablename, \
             pg_size_pretty(pg_relation_size(quote_ident(schemaname) || '.' || quote_ident(indexname))) AS index_size \
             FROM pg_indexes \
             WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
             ORDER BY 1;"
                .to_string(),
        );

        sections.insert(
            "views".to_string(),
            "SELECT schemaname || '.' || viewname AS view_name \
             FROM pg_views \
             WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
             ORDER BY 1;"
                .to_string(),
        );

        sections.insert(
            "sequences".to_string(),
            "SELECT schemaname || '.' || sequencename AS sequence_name, last_value \
             FROM pg_sequences \
             WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
             ORDER BY 1;"
                .to_string(),
        );

        sections.insert(
            "functions".to_string(),
            "SELECT n.nspname || '.' || p.proname AS function_name, \
             pg_get_function_identity_arguments(p.oid) AS arguments \
             FROM pg_proc p JOIN pg_namespace n ON n.oid = p.pronamespace \
             WHERE n.nspname NOT IN ('pg_catalog', 'information_schema') \
             ORDER BY 1;"
                .to_string(),
        );

        sections.insert(
            "triggers".to_string(),
            "SELECT trigger_name, event_object_schema || '.' || event_object_table AS table_name, \
             string_agg(event_manipulation, ', ') AS events \
             FROM information_schema.triggers \
             GROUP BY trigger_name, event_object_schema, event_object_table \
             ORDER BY table_name, trigger_name;"
                .to_string(),
        );

        sections.insert(
            "schemas".to_string(),
            "SELECT nspname AS schema_name \
             FROM pg_namespace \
             WHERE nspname NOT LIKE 'pg_%' AND nspname <> 'information_schema' \
             ORDER BY 1;"
                .to_string(),
        );

        sections.insert(
            "extensions".to_string(),
            "SELECT extname, extversion FROM pg_extension ORDER BY 1;".to_string(),
        );

        QueryCatalog { sections }
    }

    /// Load a caller-supplied catalog file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            crate::Error::Config(format!(
                "cannot read catalog file {}: {}",
                path.display(),
                e
            ))
        })?;
        let catalog: QueryCatalog = serde_json::from_str(&content)?;
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.sections.iter()
    }
}
