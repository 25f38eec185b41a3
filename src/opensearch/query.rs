//! Request bodies for index creation and hybrid search.

use crate::opensearch::types::{HybridQuery, IndexSettings, NewDocument};
use serde_json::{Value, json};

/// Build the index creation body: k-NN enabled settings plus the document mapping.
pub fn build_index_body(settings: &IndexSettings) -> Value {
    json!({
        "settings": {
            "index": {
                "knn": true,
                "knn.algo_param.ef_search": settings.ef_search,
                "number_of_shards": settings.shards,
                "number_of_replicas": settings.replicas,
            }
        },
        "mappings": {
            "properties": {
                "title": { "type": "text" },
                "text": { "type": "text" },
                "vector": {
                    "type": "knn_vector",
                    "dimension": settings.dimension,
                    "space_type": settings.space_type,
                    "method": {
                        "name": "hnsw",
                        "engine": "nmslib",
                        "parameters": {
                            "ef_construction": settings.ef_construction,
                            "m": settings.m,
                        }
                    }
                }
            }
        }
    })
}

/// Build the disjunctive search body combining the k-NN, title, and body clauses.
///
/// `from`/`size` window the blended ranking; the stored vector is excluded from `_source` and
/// `track_total_hits` keeps `total` exact past the default 10k cap.
pub fn build_search_body(query: &HybridQuery, offset: usize, limit: usize) -> Value {
    json!({
        "from": offset,
        "size": limit,
        "track_total_hits": true,
        "_source": { "excludes": ["vector"] },
        "query": {
            "bool": {
                "should": [
                    { "knn": { "vector": { "vector": query.vector, "k": query.k } } },
                    { "match": { "title": { "query": query.text, "boost": query.title_boost } } },
                    { "match": { "text": { "query": query.text } } }
                ]
            }
        }
    })
}

/// Serialize a document for the `_doc` endpoint.
pub fn build_document_body(document: &NewDocument) -> Value {
    json!({
        "title": document.title,
        "text": document.text,
        "vector": document.vector,
    })
}
