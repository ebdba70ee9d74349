mod record;

use proc_macro::TokenStream;

use record::Kind;

/// Derive `arangodantic::Record` for a document struct.
///
/// The struct needs a `Meta` field, named `meta` or marked `#[arango(meta)]`,
/// that serde skips:
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Document)]
/// #[arango(collection = "people", before_save = "Self::normalize")]
/// struct Person {
///     #[serde(skip)]
///     meta: Meta,
///     name: String,
/// }
/// ```
///
/// Struct attributes:
/// - `collection = "..."`: explicit collection name (the prefix still applies)
/// - `before_save = "path"`: `fn(&mut Self, bool) -> Result<(), ArangodanticError>`
///   run before every save
#[proc_macro_derive(Document, attributes(arango))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    record::derive_record(input, Kind::Document)
}

/// Derive `arangodantic::Record` for an edge struct.
///
/// Like `Document`, plus an `Endpoints` field (named `endpoints` or marked
/// `#[arango(endpoints)]`) that serde skips.
#[proc_macro_derive(Edge, attributes(arango))]
pub fn derive_edge(input: TokenStream) -> TokenStream {
    record::derive_record(input, Kind::Edge)
}
