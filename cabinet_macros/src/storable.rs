use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Data, DeriveInput, Field, Fields, LitStr};

/// Struct-level `#[storable(...)]` settings.
struct EntityAttrs {
    entity: Option<String>,
    foreign_key: Option<String>,
    cascades: Vec<String>,
}

pub fn derive_storable(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let attrs = match extract_entity_attrs(&input) {
        Ok(attrs) => attrs,
        Err(err) => return err.to_compile_error().into(),
    };
    let id_field = match extract_id_field(&input) {
        Ok(field) => field,
        Err(err) => return err.to_compile_error().into(),
    };
    let primary_key = match serialized_name(&input.attrs, id_field) {
        Ok(name) => name,
        Err(err) => return err.to_compile_error().into(),
    };
    let Some(id_field) = &id_field.ident else {
        return syn::Error::new_spanned(id_field, "identifier field must be named")
            .to_compile_error()
            .into();
    };

    let entity = attrs.entity.unwrap_or_else(|| name.to_string());
    let foreign_key = attrs
        .foreign_key
        .unwrap_or_else(|| format!("{}_id", to_snake_case(&entity)));
    let cascades = &attrs.cascades;

    let expanded = quote! {
        impl cabinet::Storable for #name {
            const ENTITY: &'static str = #entity;

            fn id(&self) -> cabinet::Uuid {
                self.#id_field
            }

            fn schema() -> cabinet::Schema {
                cabinet::Schema::new(#entity)
                    .with_primary_key(#primary_key)
                    .with_foreign_key(#foreign_key)
                    #( .with_cascade(#cascades) )*
            }
        }
    };

    TokenStream::from(expanded)
}

fn extract_entity_attrs(input: &DeriveInput) -> syn::Result<EntityAttrs> {
    let mut attrs = EntityAttrs {
        entity: None,
        foreign_key: None,
        cascades: Vec::new(),
    };

    for attr in &input.attrs {
        if !attr.path().is_ident("storable") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("entity") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.entity = Some(value.value());
            } else if meta.path.is_ident("foreign_key") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.foreign_key = Some(value.value());
            } else if meta.path.is_ident("cascade") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.cascades.push(value.value());
            } else {
                return Err(meta.error("expected `entity`, `foreign_key` or `cascade`"));
            }
            Ok(())
        })?;
    }

    Ok(attrs)
}

fn extract_id_field(input: &DeriveInput) -> syn::Result<&Field> {
    if let Data::Struct(data_struct) = &input.data {
        if let Fields::Named(fields) = &data_struct.fields {
            for field in &fields.named {
                for attr in &field.attrs {
                    if attr.path().is_ident("storable") {
                        let mut is_id = false;
                        attr.parse_nested_meta(|meta| {
                            if meta.path.is_ident("id") {
                                is_id = true;
                            }
                            Ok(())
                        })?;
                        if is_id && field.ident.is_some() {
                            return Ok(field);
                        }
                    }
                }
            }

            // Fall back to a field literally named `id`.
            for field in &fields.named {
                if field.ident.as_ref().is_some_and(|ident| ident == "id") {
                    return Ok(field);
                }
            }
        }
    }

    Err(syn::Error::new_spanned(
        &input.ident,
        "Storable derive: no field marked with #[storable(id)] and no field named `id`",
    ))
}

/// Key the identifier field serializes under: its `#[serde(rename)]`, else
/// the field name converted by the struct's `#[serde(rename_all)]`.
fn serialized_name(struct_attrs: &[Attribute], field: &Field) -> syn::Result<String> {
    if let Some(rename) = serde_setting(&field.attrs, "rename")? {
        return Ok(rename);
    }

    let name = match &field.ident {
        Some(ident) => ident.unraw().to_string(),
        None => return Err(syn::Error::new_spanned(field, "identifier field must be named")),
    };
    match serde_setting(struct_attrs, "rename_all")? {
        Some(rule) => apply_rename_rule(&rule, &name)
            .ok_or_else(|| syn::Error::new_spanned(field, format!("unsupported rename_all rule `{}`", rule))),
        None => Ok(name),
    }
}

/// Serialized value of `#[serde(key = "...")]` or
/// `#[serde(key(serialize = "..."))]`. Other serde settings are skipped.
fn serde_setting(attrs: &[Attribute], key: &str) -> syn::Result<Option<String>> {
    let mut found = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident(key) {
                return skip_meta(&meta);
            }
            if meta.input.peek(syn::Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                found = Some(value.value());
                return Ok(());
            }
            meta.parse_nested_meta(|inner| {
                if inner.path.is_ident("serialize") {
                    let value: LitStr = inner.value()?.parse()?;
                    found = Some(value.value());
                    Ok(())
                } else {
                    skip_meta(&inner)
                }
            })
        })?;
    }
    Ok(found)
}

fn skip_meta(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse::<proc_macro2::TokenStream>()?;
    }
    Ok(())
}

/// Apply a serde `rename_all` rule to a snake_case field name.
fn apply_rename_rule(rule: &str, field: &str) -> Option<String> {
    let pascal = || {
        field
            .split('_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<String>()
    };

    let renamed = match rule {
        "lowercase" | "snake_case" => field.to_string(),
        "UPPERCASE" | "SCREAMING_SNAKE_CASE" => field.to_uppercase(),
        "kebab-case" => field.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => field.replace('_', "-").to_uppercase(),
        "PascalCase" => pascal(),
        "camelCase" => {
            let pascal = pascal();
            let mut chars = pascal.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        _ => return None,
    };
    Some(renamed)
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
