//! Query/prompt text normalization, hashing and classification.
//!
//! Hashes group repeated query/prompt shapes across a run; they must be
//! stable regardless of how whitespace was embedded at the call site.

use sha2::{Digest, Sha256};

/// Length of the truncated hex digest used for grouping.
const HASH_LEN: usize = 12;

/// Collapse all whitespace runs to single spaces and trim.
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncated content hash of the normalized text.
pub fn cypher_hash(query: &str) -> String {
    let normalized = normalize_query(query);
    let digest = Sha256::digest(normalized.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..HASH_LEN].to_string()
}

/// Coarse category of a Cypher statement for workload-composition stats.
pub fn classify_cypher_query(query: &str) -> &'static str {
    let q = normalize_query(query).to_lowercase();
    if q.is_empty() {
        return "unknown";
    }
    if q.contains("create index")
        || q.contains("drop index")
        || q.contains("show indexes")
        || q.contains("create constraint")
        || q.contains("drop constraint")
    {
        return "indexing";
    }
    if q.contains("vector.similarity")
        || q.contains("db.index.fulltext.query")
        || q.contains("vector.querynodes")
    {
        return "search";
    }
    if q.starts_with("merge")
        || q.starts_with("create")
        || q.starts_with("delete")
        || q.starts_with("set")
    {
        return "write";
    }
    if q.starts_with("match") || q.starts_with("with match") || q.contains(" return ") {
        return "read";
    }
    "other"
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn hash_is_stable_under_whitespace() {
        let q1 = "MATCH (n) RETURN n";
        let q2 = "  MATCH   (n)\n\tRETURN n  ";
        assert_eq!(cypher_hash(q1), cypher_hash(q2));
        assert_eq!(cypher_hash(q1).len(), 12);
    }

    #[test]
    fn hash_is_sensitive_to_content() {
        assert_ne!(
            cypher_hash("MATCH (n) RETURN n"),
            cypher_hash("MATCH (m) RETURN m")
        );
    }

    #[rstest]
    #[case("SHOW INDEXES", "indexing")]
    #[case("CREATE CONSTRAINT uniq FOR (n:Entity) REQUIRE n.id IS UNIQUE", "indexing")]
    #[case("MATCH (n) RETURN n LIMIT 10", "read")]
    #[case("MERGE (n:Node {id: 1}) RETURN n", "write")]
    #[case("DELETE n", "write")]
    #[case(
        "MATCH (n) WITH n, vector.similarity.cosine(n.embedding, $e) AS s RETURN s",
        "search"
    )]
    #[case("CALL db.index.fulltext.queryNodes('names', $q)", "search")]
    #[case("", "unknown")]
    #[case("EXPLAIN something", "other")]
    fn classification_table(#[case] query: &str, #[case] expected: &str) {
        assert_eq!(classify_cypher_query(query), expected);
    }
}
