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
use syn::{self, parse_macro_input, Data, DataStruct, DeriveInput, Fields, Ident};

#[derive(FromField)]
#[darling(attributes(params))]
struct FieldAttrs {
    ident: Option<Ident>,
    #[darling(default)]
    rename: Option<String>,
    #[darling(default)]
    skip: bool,
}

pub fn derive_to_params(input: TokenStream) -> TokenStream {
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
            "ToParams can be derived only for structures with named fields",
        )
        .to_compile_error());
    };

    let mut pairs = Vec::new();
    for field in named.named.iter() {
        let attrs = FieldAttrs::from_field(field).map_err(|err| err.write_errors())?;
        let field_ident = match attrs.ident {
            Some(ref ident) if !attrs.skip => ident.clone(),
            _ => continue,
        };
        let name = attrs.rename.unwrap_or_else(|| {
            let name = field_ident.to_string();
            name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
        });
        let name = Literal::string(&name);
        pairs.push(quote! {
            (
                ::std::string::String::from(#name),
                ::querymapper::Value::from(::std::clone::Clone::clone(&self.#field_ident)),
            )
        });
    }

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::querymapper::ToParams for #ident #ty_generics #where_clause {
            fn to_params(
                &self,
            ) -> ::std::vec::Vec<(::std::string::String, ::querymapper::Value)> {
                ::std::vec![#(#pairs),*]
            }
        }
    })
}
