// Querymapper - maps query result sets to rows and structs
//
//-----------------------------------------------------------------------------
// Copyright (c) 2024 querymapper developers. All rights reserved.
// This program is free software: you can modify it and/or redistribute it
// under the terms of:
//
// (i)  the Universal Permissive License v 1.0 or at your option, any
//      later version (http://oss.oracle.com/licenses/upl); and/or
//
// (ii) the Apache License v 2.0. (http://www.apache.org/licenses/LICENSE-2.0)
//-----------------------------------------------------------------------------
use darling::FromField;
use proc_macro::TokenStream;
use proc_macro2::{Literal, TokenStream as TokenStream2};
use quote::quote;
use syn::{self, parse_macro_input, Data, DataStruct, DeriveInput, Fields, Ident, Path};

#[derive(FromField)]
#[darling(attributes(from_row))]
struct FieldAttrs {
    ident: Option<Ident>,
    #[darling(default)]
    rename: Option<String>,
    #[darling(default)]
    skip: bool,
    #[darling(default)]
    indexer: bool,
    #[darling(default)]
    with: Option<Path>,
}

pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input: DeriveInput = parse_macro_input!(input);
    match expand(input) {
        Ok(output) => output.into(),
        Err(err) => err.into(),
    }
}

fn expand(input: DeriveInput) -> Result<TokenStream2, TokenStream2> {
    let DeriveInput {
        ident,
        data,
        generics,
        ..
    } = input;

    let named = if let Data::Struct(DataStruct {
        fields: Fields::Named(named),
        ..
    }) = data
    {
        named
    } else {
        return Err(syn::Error::new(
            ident.span(),
            "FromRow can be derived only for structures with named fields",
        )
        .to_compile_error());
    };

    let mut names = Vec::new();
    let mut setters = Vec::new();
    let mut indexer: Option<Ident> = None;

    for field in named.named.iter() {
        let attrs = FieldAttrs::from_field(field).map_err(|err| err.write_errors())?;
        let field_ident = match attrs.ident {
            Some(ref ident) => ident.clone(),
            None => continue,
        };
        if attrs.skip {
            continue;
        }
        if attrs.indexer {
            if indexer.is_some() {
                return Err(syn::Error::new(
                    field_ident.span(),
                    "only one field can be marked as #[from_row(indexer)]",
                )
                .to_compile_error());
            }
            indexer = Some(field_ident);
            continue;
        }

        let name = attrs.rename.unwrap_or_else(|| {
            let name = field_ident.to_string();
            name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
        });
        let position = Literal::usize_unsuffixed(names.len());
        let convert = if let Some(function_name) = attrs.with {
            quote! { #function_name(value)? }
        } else {
            quote! { ::querymapper::FromValue::from_value(value)? }
        };
        setters.push(quote! {
            #position => { self.#field_ident = #convert; }
        });
        names.push(Literal::string(&name));
    }

    let indexer_fns = indexer.map(|field_ident| {
        quote! {
            fn has_indexer() -> bool {
                true
            }

            fn set_indexed(
                &mut self,
                index: usize,
                value: ::querymapper::Value,
            ) -> ::querymapper::Result<()> {
                ::querymapper::Indexer::set_index(&mut self.#field_ident, index, value)
            }
        }
    });

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::querymapper::FromRow for #ident #ty_generics #where_clause {
            fn field_names() -> &'static [&'static str] {
                &[#(#names),*]
            }

            #[allow(unused_variables, unreachable_code)]
            fn set_field(
                &mut self,
                field: usize,
                value: ::querymapper::Value,
            ) -> ::querymapper::Result<()> {
                match field {
                    #(#setters)*
                    _ => {
                        return ::std::result::Result::Err(
                            ::querymapper::Error::invalid_column_index(field),
                        )
                    }
                }
                ::std::result::Result::Ok(())
            }

            #indexer_fns
        }
    })
}
