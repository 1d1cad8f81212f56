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

//! See [`querymapper`] instead.
//! Macros in this crate are documented in the crate also
//! and some links in docs are valid only there.
//!
//! [`querymapper`]: https://docs.rs/querymapper

use proc_macro::TokenStream;

mod derive_from_row;
mod derive_to_params;

#[doc = include_str!("../docs/from_row.md")]
#[proc_macro_derive(FromRow, attributes(from_row))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    derive_from_row::derive_from_row(input)
}

/// Derives [`ToParams`] for a struct with named fields.
///
/// Each field becomes a parameter named after the field, its value
/// converted with `Value::from(field.clone())`. `#[params(rename = "...")]`
/// changes the name and `#[params(skip)]` leaves the field out.
///
/// [`ToParams`]: https://docs.rs/querymapper/*/querymapper/trait.ToParams.html
#[proc_macro_derive(ToParams, attributes(params))]
pub fn derive_to_params(input: TokenStream) -> TokenStream {
    derive_to_params::derive_to_params(input)
}
