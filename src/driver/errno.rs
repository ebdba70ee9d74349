//! ArangoDB error numbers used by the translator and the in-memory driver.

pub const INTERNAL: i64 = 4;
pub const BAD_PARAMETER: i64 = 10;
pub const HTTP_NOT_FOUND: i64 = 404;
pub const CONFLICT: i64 = 1200;
pub const DOCUMENT_NOT_FOUND: i64 = 1202;
pub const DATA_SOURCE_NOT_FOUND: i64 = 1203;
pub const DUPLICATE_NAME: i64 = 1207;
pub const UNIQUE_CONSTRAINT_VIOLATED: i64 = 1210;
pub const INDEX_NOT_FOUND: i64 = 1212;
pub const DOCUMENT_KEY_BAD: i64 = 1221;
pub const COLLECTION_TYPE_INVALID: i64 = 1218;
pub const INVALID_EDGE_ATTRIBUTE: i64 = 1233;
pub const QUERY_INVALID_REGEX: i64 = 1575;
pub const CURSOR_NOT_FOUND: i64 = 1600;
pub const GRAPH_NOT_FOUND: i64 = 1924;
pub const GRAPH_DUPLICATE: i64 = 1925;
pub const GRAPH_VERTEX_COLLECTION_NOT_USED: i64 = 1926;
pub const GRAPH_EDGE_COLLECTION_NOT_USED: i64 = 1930;
