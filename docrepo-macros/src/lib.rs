//! Procedural macros for the docrepo project.
//!
//! Provides `#[derive(Entity)]`, which implements the entity contract for a
//! struct carrying `id`, `created_at`, and `modified_at` fields.

#[allow(unused_extern_crates)]
extern crate self as docrepo_macros;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DataStruct, DeriveInput, Fields, LitStr, Path, parse_macro_input};

/// Derives the `Entity` trait.
///
/// The struct must have named fields `id` (`ObjectId`), `created_at`
/// (`Option<DateTime>`), and `modified_at` (`DateTime`). The stored
/// collection name defaults to the type's short name and can be overridden:
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
/// #[entity(collection = "users")]
/// pub struct User {
///     #[serde(rename = "_id")]
///     pub id: ObjectId,
///     pub created_at: Option<DateTime>,
///     pub modified_at: DateTime,
///     pub email: String,
/// }
/// ```
///
/// The expansion resolves the trait and BSON types through `docrepo_core` by
/// default. Crates that depend on `docrepo` alone can redirect it:
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
/// #[entity(crate = "docrepo", collection = "users")]
/// pub struct User { /* ... */ }
/// ```
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_entity(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand_entity(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(DataStruct { fields: Fields::Named(named), .. }) => &named.named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Entity can only be derived for structs with named fields",
            ));
        }
    };

    for required in ["id", "created_at", "modified_at"] {
        let present = fields
            .iter()
            .any(|field| field.ident.as_ref().is_some_and(|ident| ident == required));

        if !present {
            return Err(syn::Error::new_spanned(
                name,
                format!("Entity requires a named `{required}` field"),
            ));
        }
    }

    let attrs = entity_attributes(&input)?;
    let root = match &attrs.root {
        Some(path) => quote!(#path),
        None => quote!(::docrepo_core),
    };

    let collection_impl = attrs.collection.map(|lit| {
        quote! {
            fn collection_name() -> &'static str {
                #lit
            }
        }
    });

    Ok(quote! {
        impl #impl_generics #root::entity::Entity for #name #ty_generics #where_clause {
            fn id(&self) -> #root::bson::oid::ObjectId {
                self.id
            }

            fn set_id(&mut self, id: #root::bson::oid::ObjectId) {
                self.id = id;
            }

            fn created_at(&self) -> ::core::option::Option<#root::bson::DateTime> {
                self.created_at
            }

            fn modified_at(&self) -> #root::bson::DateTime {
                self.modified_at
            }

            #collection_impl
        }
    })
}

#[derive(Default)]
struct EntityAttributes {
    collection: Option<LitStr>,
    root: Option<Path>,
}

/// Extracts `#[entity(collection = "...", crate = "...")]`, if present.
///
/// `crate` names the path the expansion resolves `entity` and `bson` through,
/// for consumers that reach the core types via a re-exporting crate.
fn entity_attributes(input: &DeriveInput) -> syn::Result<EntityAttributes> {
    let mut attrs = EntityAttributes::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                attrs.collection = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("crate") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.root = Some(lit.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported entity attribute; expected `collection` or `crate`"))
            }
        })?;
    }

    Ok(attrs)
}
