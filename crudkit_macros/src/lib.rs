//! Procedural macros for the `crudkit` repository library.
//!
//! Provides `#[derive(Entity)]`: a derive macro that inspects a struct and
//! generates the schema metadata (table name, column list with the primary-key
//! flag), the key accessor, the write-value extraction, and a default
//! `RowAdapter` for it to be used with a repository.
//!
//! The primary key is marked with `#[entity(id)]`; exactly one field must
//! carry it. Column names default to the field name and can be overridden
//! with `#[entity(column = "...")]`; `#[entity(skip)]` excludes a field from
//! persistence. The table name is the pluralized snake_case struct name
//! unless `#[entity(table = "...")]` overrides it.

use proc_macro::TokenStream;
use quote::{quote, ToTokens};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, LitStr, Type};

use inflections::Inflect;

/// Helper to check if a type is an `Option<T>`.
fn is_option(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if type_path.qself.is_none() && type_path.path.leading_colon.is_none() {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "Option";
            }
        }
    }
    false
}

/// Helper to get the inner type of an `Option<T>`.
fn get_option_inner(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        let path = &type_path.path;
        if path.segments.last().is_some_and(|s| s.ident == "Option") {
            if let Some(segment) = path.segments.last() {
                if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(syn::GenericArgument::Type(inner_ty)) = args.args.first() {
                        return Some(inner_ty);
                    }
                }
            }
        }
    }
    None
}

/// Holds parsed metadata about a single struct field.
#[derive(Clone)]
struct FieldMetadata {
    ident: Ident,
    ty: Type,
    ty_str: String,
    column_name: String,
    is_id: bool,
    is_skipped: bool,
}

/// Parses all named fields from a `DeriveInput` struct.
fn parse_field_metadata(input: &DeriveInput) -> Vec<FieldMetadata> {
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => named,
            _ => panic!("#[derive(Entity)] only supports structs with named fields."),
        },
        _ => panic!("#[derive(Entity)] can only be used on structs."),
    };

    fields
        .named
        .iter()
        .map(|field| {
            let ident = field.ident.as_ref().unwrap().clone();
            let ty = field.ty.clone();
            let ty_str = ty.to_token_stream().to_string().replace(' ', "");
            let mut column_name = ident.to_string();
            let mut is_id = false;
            let mut is_skipped = false;

            for attr in &field.attrs {
                if attr.path().is_ident("entity") {
                    if let Ok(list) = attr.meta.require_list() {
                        list.parse_nested_meta(|meta| {
                            if meta.path.is_ident("column") {
                                let value = meta
                                    .value()
                                    .expect("Invalid #[entity(column = \"...\")] syntax");
                                let s: LitStr = value
                                    .parse()
                                    .expect("Invalid #[entity(column = \"...\")] value");
                                column_name = s.value();
                            } else if meta.path.is_ident("id") {
                                is_id = true;
                            } else if meta.path.is_ident("skip") {
                                is_skipped = true;
                            }
                            Ok(())
                        })
                        .expect("Invalid #[entity(...)] attribute syntax");
                    }
                }
            }
            FieldMetadata {
                ident,
                ty,
                ty_str,
                column_name,
                is_id,
                is_skipped,
            }
        })
        .collect()
}

#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let struct_name = &input.ident;
    let fields_metadata = parse_field_metadata(&input);

    // --- Get table name ---
    // Look for a struct-level `#[entity(table = "...")]` first.
    let mut table_name_override: Option<String> = None;
    for attr in &input.attrs {
        if attr.path().is_ident("entity") {
            if let Ok(list) = attr.meta.require_list() {
                let _ = list.parse_nested_meta(|meta| {
                    if meta.path.is_ident("table") {
                        let value = meta.value()?;
                        let s: LitStr = value.parse()?;
                        table_name_override = Some(s.value());
                    }
                    Ok(())
                });
            }
        }
    }

    // If no override, deduce it from the struct name (`User` -> `users`).
    let table_name = table_name_override
        .unwrap_or_else(|| format!("{}s", struct_name.to_string().to_snake_case()));

    // Basic validation of table and column names to avoid handing invalid
    // identifiers to backends.
    fn is_valid_ident(s: &str) -> bool {
        let mut chars = s.chars();
        match chars.next() {
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
            _ => return false,
        }
        for ch in chars {
            if !(ch == '_' || ch.is_ascii_alphanumeric()) {
                return false;
            }
        }
        true
    }
    if !is_valid_ident(&table_name) {
        panic!(
            "Invalid table name `{}`. Use ASCII letters, digits, or `_`, starting with a letter or `_`.",
            table_name
        );
    }
    for f in &fields_metadata {
        if !f.is_skipped && !is_valid_ident(&f.column_name) {
            panic!(
                "Invalid column name `{}`. Use ASCII letters, digits, or `_`, starting with a letter or `_`.",
                f.column_name
            );
        }
    }

    // --- Implement `EntityMeta` ---
    let mapped_fields: Vec<_> = fields_metadata.iter().filter(|f| !f.is_skipped).collect();
    let column_metas: Vec<_> = mapped_fields
        .iter()
        .map(|f| {
            let name = &f.column_name;
            let pk = f.is_id;
            quote! {
                ::crudkit_core::ColumnMeta {
                    name: #name,
                    primary_key: #pk,
                }
            }
        })
        .collect();

    let entity_meta_impl = quote! {
        impl ::crudkit_core::EntityMeta for #struct_name {
            const TABLE: &'static str = #table_name;
            const COLUMNS: &'static [::crudkit_core::ColumnMeta] = &[#(#column_metas),*];
        }
    };

    // --- Implement `Identifiable` ---
    // Validate exactly one #[entity(id)]
    let id_count = fields_metadata.iter().filter(|f| f.is_id).count();
    if id_count == 0 {
        panic!("A field must be marked with #[entity(id)]. Hint: mark your primary key field like `#[entity(id)]`.");
    } else if id_count > 1 {
        panic!(
            "Exactly one field must be marked with #[entity(id)] (found {}). Remove extra #[entity(id)] attributes.",
            id_count
        );
    }

    let id_field = fields_metadata
        .iter()
        .find(|f| f.is_id)
        .expect("unreachable: validated id_count == 1");
    let id_ident = &id_field.ident;
    let id_ty = &id_field.ty;
    let key_ty = get_option_inner(id_ty).unwrap_or(id_ty);
    let id_column_name = &id_field.column_name;

    let id_accessor = if is_option(id_ty) {
        quote! { self.#id_ident.clone() }
    } else {
        quote! { Some(self.#id_ident.clone()) }
    };

    let identifiable_impl = quote! {
        impl ::crudkit_core::Identifiable for #struct_name {
            type Key = #key_ty;
            const ID_COLUMN: &'static str = #id_column_name;
            fn id(&self) -> Option<Self::Key> {
                #id_accessor
            }
        }
    };

    // --- Implement `Persistable` ---
    let to_param_value = |field: &FieldMetadata| {
        let ident = &field.ident;
        let ty_str = &field.ty_str;

        if is_option(&field.ty) {
            return match ty_str.as_str() {
                s if s.contains("String") => {
                    quote! { self.#ident.as_ref().cloned().map(::crudkit_core::ParamValue::String).unwrap_or(::crudkit_core::ParamValue::Null) }
                }
                s if s.contains("i32") => {
                    quote! { self.#ident.map_or(::crudkit_core::ParamValue::Null, ::crudkit_core::ParamValue::I32) }
                }
                s if s.contains("i64") => {
                    quote! { self.#ident.map_or(::crudkit_core::ParamValue::Null, ::crudkit_core::ParamValue::I64) }
                }
                s if s.contains("f64") => {
                    quote! { self.#ident.map_or(::crudkit_core::ParamValue::Null, ::crudkit_core::ParamValue::F64) }
                }
                s if s.contains("bool") => {
                    quote! { self.#ident.map_or(::crudkit_core::ParamValue::Null, ::crudkit_core::ParamValue::Bool) }
                }
                _ => panic!("Unsupported Option type for ParamValue: {}. Hint: map this field to a supported type (String/i32/i64/f64/bool), or mark it with #[entity(skip)] to exclude it from persistence.", ty_str),
            };
        }

        match ty_str.as_str() {
            "String" => quote! { ::crudkit_core::ParamValue::String(self.#ident.clone()) },
            "i32" => quote! { ::crudkit_core::ParamValue::I32(self.#ident) },
            "i64" => quote! { ::crudkit_core::ParamValue::I64(self.#ident) },
            "f64" => quote! { ::crudkit_core::ParamValue::F64(self.#ident) },
            "bool" => quote! { ::crudkit_core::ParamValue::Bool(self.#ident) },
            _ => panic!("Unsupported type for ParamValue: {}. Hint: map this field to a supported type (String/i32/i64/f64/bool) or mark it with #[entity(skip)].", ty_str),
        }
    };

    let insert_fields: Vec<_> = fields_metadata
        .iter()
        .filter(|f| !f.is_id && !f.is_skipped)
        .collect();
    let insert_columns: Vec<_> = insert_fields.iter().map(|f| &f.column_name).collect();
    let insert_values: Vec<_> = insert_fields.iter().map(|f| to_param_value(f)).collect();

    // Every mapped column, in COLUMNS order, including the key. Used for upserts.
    let column_values: Vec<_> = mapped_fields.iter().map(|f| to_param_value(f)).collect();

    let persistable_impl = quote! {
        impl ::crudkit_core::Persistable for #struct_name {
            const INSERT_COLUMNS: &'static [&'static str] = &[#(#insert_columns),*];
            fn insert_values(&self) -> Vec<::crudkit_core::ParamValue> {
                vec![#(#insert_values),*]
            }
            fn column_values(&self) -> Vec<::crudkit_core::ParamValue> {
                vec![#(#column_values),*]
            }
        }
    };

    // --- Generate `RowAdapter` ---
    let adapter_struct_name = Ident::new(&format!("{}RowAdapter", struct_name), struct_name.span());

    let libsql_get_mappings: Vec<_> = fields_metadata
        .iter()
        .filter(|f| !f.is_skipped)
        .enumerate()
        .map(|(i, f)| {
            let ident = &f.ident;
            let col_index = i as i32;
            quote! { #ident: row
                .get(#col_index)
                .map_err(|e| ::crudkit_core::RepoError::mapping(e))? }
        })
        .collect();
    let skipped_defaults: Vec<_> = fields_metadata
        .iter()
        .filter(|f| f.is_skipped)
        .map(|f| {
            let ident = &f.ident;
            quote! { #ident: ::core::default::Default::default() }
        })
        .collect();

    let row_adapter_impls = quote! {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct #adapter_struct_name;

        // Backend-specific adapter impls only exist when the consuming crate
        // opts in, so entity derives stay usable without driver crates linked.
        #[cfg(feature = "backend-adapters")]
        impl ::crudkit_core::RowAdapter<#struct_name> for #adapter_struct_name {
            type Row = ::libsql::Row;
            fn from_row(&self, row: &Self::Row) -> ::crudkit_core::RepoResult<#struct_name> {
                Ok(#struct_name {
                    #(#libsql_get_mappings,)*
                    #(#skipped_defaults,)*
                })
            }
        }
    };

    // --- Combine all generated code ---
    let expanded = quote! {
        #entity_meta_impl
        #identifiable_impl
        #persistable_impl
        #row_adapter_impls
    };

    TokenStream::from(expanded)
}
