use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::compared_members;

/// Generates the `canonical()` method implementation.
///
/// Structs become `[name, {member: canonical, ...}]`, enum variants the same
/// with `Type::Variant` as the name. Ignored fields are left out, so the
/// canonical form agrees with the derived equality.
pub fn generate_canonical(input: &DeriveInput, crate_path: &TokenStream) -> syn::Result<TokenStream> {
    let self_type = &input.ident;

    let body = match &input.data {
        syn::Data::Struct(data) => {
            let name = self_type.to_string();
            let members = compared_members(&data.fields)?;
            let entries = members.iter().map(|m| {
                let member = &m.member;
                let member_name = &m.name;
                quote! { (#member_name, #crate_path::DeepEqual::canonical(&self.#member)?) }
            });
            quote! { #crate_path::canonical::record(#name, vec![#(#entries),*]) }
        }
        syn::Data::Enum(data) => {
            let mut arms = Vec::new();
            for variant in &data.variants {
                let variant_ident = &variant.ident;
                let name = format!("{}::{}", self_type, variant_ident);
                let members = compared_members(&variant.fields)?;
                let fields = members.iter().map(|m| &m.member);
                let bindings: Vec<_> = members.iter().map(|m| m.binding("self")).collect();
                let entries = members.iter().zip(&bindings).map(|(m, binding)| {
                    let member_name = &m.name;
                    quote! { (#member_name, #crate_path::DeepEqual::canonical(#binding)?) }
                });
                arms.push(quote! {
                    Self::#variant_ident { #(#fields: #bindings,)* .. } => {
                        #crate_path::canonical::record(#name, vec![#(#entries),*])
                    }
                });
            }
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "DeepEqual cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        fn canonical(&self) -> ::std::option::Option<#crate_path::CborValue> {
            ::std::option::Option::Some(#body)
        }
    })
}

/// Generates the `requires_scan()` method implementation: a value has to be
/// scanned for as soon as one of its compared fields has to.
pub fn generate_requires_scan(input: &DeriveInput, crate_path: &TokenStream) -> syn::Result<TokenStream> {
    let body = match &input.data {
        syn::Data::Struct(data) => {
            let members = compared_members(&data.fields)?;
            let checks = members.iter().map(|m| {
                let member = &m.member;
                quote! { || #crate_path::DeepEqual::requires_scan(&self.#member) }
            });
            quote! { false #(#checks)* }
        }
        syn::Data::Enum(data) => {
            let mut arms = Vec::new();
            for variant in &data.variants {
                let variant_ident = &variant.ident;
                let members = compared_members(&variant.fields)?;
                let fields = members.iter().map(|m| &m.member);
                let bindings: Vec<_> = members.iter().map(|m| m.binding("self")).collect();
                arms.push(quote! {
                    Self::#variant_ident { #(#fields: #bindings,)* .. } => {
                        false #(|| #crate_path::DeepEqual::requires_scan(#bindings))*
                    }
                });
            }
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "DeepEqual cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        fn requires_scan(&self) -> bool {
            #body
        }
    })
}
