mod record;

use proc_macro::TokenStream;

/// Derive macro for the `Record` trait.
///
/// # Usage
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Record)]
/// #[record(collection = "notes")]
/// struct Note {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     pub native_id: Option<ObjectId>,
///     pub msg: String,
/// }
/// ```
///
/// - `#[record(collection = "...")]` names the collection handle the record
///   lives in. If omitted, defaults to snake_case struct name + "s".
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}
