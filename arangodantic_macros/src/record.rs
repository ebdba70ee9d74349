use proc_macro::TokenStream;
use proc_macro2::{TokenStream as TokenStream2, TokenTree};
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr, Path};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Document,
    Edge,
}

pub fn derive_record(input: TokenStream, kind: Kind) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input, kind) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

#[derive(Default)]
struct StructAttrs {
    collection: Option<LitStr>,
    before_save: Option<Path>,
}

fn expand(input: &DeriveInput, kind: Kind) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let attrs = extract_struct_attrs(input)?;
    let fields = named_fields(input)?;

    let meta = find_field(fields, "meta")?.ok_or_else(|| {
        syn::Error::new_spanned(
            name,
            "Record derive: no field marked with #[arango(meta)] and no field named `meta`",
        )
    })?;
    let meta_ident = serde_skipped(meta)?;

    let collection = attrs.collection.map(|lit| {
        quote! { const COLLECTION_NAME: ::core::option::Option<&'static str> = ::core::option::Option::Some(#lit); }
    });

    let before_save = attrs.before_save.map(|path| {
        quote! {
            fn before_save(&mut self, is_new: bool) -> ::core::result::Result<(), ::arangodantic::ArangodanticError> {
                #path(self, is_new)
            }
        }
    });

    let edge = match kind {
        Kind::Document => None,
        Kind::Edge => {
            let endpoints = find_field(fields, "endpoints")?.ok_or_else(|| {
                syn::Error::new_spanned(
                    name,
                    "Edge derive: no field marked with #[arango(endpoints)] and no field named `endpoints`",
                )
            })?;
            let endpoints_ident = serde_skipped(endpoints)?;
            Some(quote! {
                const KIND: ::arangodantic::CollectionKind = ::arangodantic::CollectionKind::Edge;

                fn endpoints(&self) -> ::core::option::Option<&::arangodantic::Endpoints> {
                    ::core::option::Option::Some(&self.#endpoints_ident)
                }

                fn endpoints_mut(&mut self) -> ::core::option::Option<&mut ::arangodantic::Endpoints> {
                    ::core::option::Option::Some(&mut self.#endpoints_ident)
                }
            })
        }
    };

    Ok(quote! {
        impl #impl_generics ::arangodantic::Record for #name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;
            #collection

            fn meta(&self) -> &::arangodantic::Meta {
                &self.#meta_ident
            }

            fn meta_mut(&mut self) -> &mut ::arangodantic::Meta {
                &mut self.#meta_ident
            }

            #edge
            #before_save
        }
    })
}

fn extract_struct_attrs(input: &DeriveInput) -> syn::Result<StructAttrs> {
    let mut attrs = StructAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("arango") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("collection name must not be empty"));
                }
                attrs.collection = Some(value);
                Ok(())
            } else if meta.path.is_ident("before_save") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.before_save = Some(value.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported arango attribute; expected `collection` or `before_save`"))
            }
        })?;
    }
    Ok(attrs)
}

fn named_fields(input: &DeriveInput) -> syn::Result<&syn::punctuated::Punctuated<Field, syn::Token![,]>> {
    if let Data::Struct(data_struct) = &input.data {
        if let Fields::Named(fields) = &data_struct.fields {
            return Ok(&fields.named);
        }
    }
    Err(syn::Error::new_spanned(
        &input.ident,
        "Record derive only supports structs with named fields",
    ))
}

/// The field marked `#[arango(<marker>)]`, or else the field named `<marker>`.
fn find_field<'a>(
    fields: &'a syn::punctuated::Punctuated<Field, syn::Token![,]>,
    marker: &str,
) -> syn::Result<Option<&'a Field>> {
    for field in fields {
        for attr in &field.attrs {
            if !attr.path().is_ident("arango") {
                continue;
            }
            let mut marked = false;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("meta") || meta.path.is_ident("endpoints") {
                    marked |= meta.path.is_ident(marker);
                    Ok(())
                } else {
                    Err(meta.error("unsupported arango field attribute; expected `meta` or `endpoints`"))
                }
            })?;
            if marked {
                return Ok(Some(field));
            }
        }
    }

    Ok(fields
        .iter()
        .find(|field| field.ident.as_ref().is_some_and(|ident| ident == marker)))
}

/// Identity fields must not reach serde, or they would collide with user fields.
fn serde_skipped(field: &Field) -> syn::Result<&Ident> {
    let skipped = field.attrs.iter().any(|attr| {
        attr.path().is_ident("serde")
            && attr.meta.require_list().is_ok_and(|list| {
                list.tokens
                    .clone()
                    .into_iter()
                    .any(|tt| matches!(tt, TokenTree::Ident(ref ident) if ident == "skip"))
            })
    });
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
    if skipped {
        Ok(ident)
    } else {
        Err(syn::Error::new_spanned(
            field,
            format!("field `{}` must be marked #[serde(skip)]", ident),
        ))
    }
}
