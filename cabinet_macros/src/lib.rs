mod storable;

use proc_macro::TokenStream;

/// Derive macro implementing `cabinet::Storable` for a struct.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, Storable)]
/// #[storable(entity = "Invoice", foreign_key = "invoice_id", cascade = "LineItem")]
/// struct Invoice {
///     #[storable(id)]
///     id: Uuid,
///     number: String,
/// }
/// ```
///
/// Struct attributes:
/// - `entity = "..."`: entity name, defaults to the struct name
/// - `foreign_key = "..."`: field children use to reference this entity,
///   defaults to `<snake_case entity>_id`
/// - `cascade = "..."`: dependent entity purged on delete (repeatable)
///
/// The identifier is the field marked `#[storable(id)]`, or the field named
/// `id`. It must be a `Uuid`. The schema's primary key is the name the field
/// serializes under, honouring `#[serde(rename)]` on the field and
/// `#[serde(rename_all)]` on the struct.
#[proc_macro_derive(Storable, attributes(storable))]
pub fn derive_storable(input: TokenStream) -> TokenStream {
    storable::derive_storable(input)
}
