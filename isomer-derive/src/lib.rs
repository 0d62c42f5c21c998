use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{DeriveInput, parse_macro_input};

mod canonical;

/// Derive macro for the `DeepEqual` trait.
///
/// Generates `deep_equal_in()`, `canonical()` and `requires_scan()` from the
/// fields of a struct or enum. Two values are equal when they are the same
/// variant and every compared field is deeply equal.
///
/// # Example
///
/// ```ignore
/// use isomer_core::DeepEqual;
///
/// #[derive(Debug, DeepEqual)]
/// struct Entry {
///     name: String,
///     #[deep_equal(ignore)]
///     cached_len: usize,
/// }
/// ```
///
/// # Attributes
///
/// - `#[deep_equal(ignore)]` - Leave this field out of equality and the canonical form
#[proc_macro_derive(DeepEqual, attributes(deep_equal))]
pub fn derive_deep_equal(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_deep_equal_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_deep_equal_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let generics = &input.generics;
    let crate_path = quote! { ::isomer_core };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // Build where clause with DeepEqual bounds for type parameters
    let where_clause = build_where_clause(generics, where_clause, &crate_path);

    let equal_impl = generate_deep_equal(input, &crate_path)?;
    let canonical_impl = canonical::generate_canonical(input, &crate_path)?;
    let scan_impl = canonical::generate_requires_scan(input, &crate_path)?;

    Ok(quote! {
        impl #impl_generics #crate_path::DeepEqual for #name #ty_generics #where_clause {
            #equal_impl
            #canonical_impl
            #scan_impl
        }
    })
}

fn build_where_clause(
    generics: &syn::Generics,
    existing: Option<&syn::WhereClause>,
    crate_path: &TokenStream2,
) -> TokenStream2 {
    let type_params: Vec<_> = generics.type_params().map(|p| &p.ident).collect();

    if type_params.is_empty() && existing.is_none() {
        return quote! {};
    }

    let bounds = type_params.iter().map(|p| {
        quote! { #p: #crate_path::DeepEqual }
    });

    let existing_predicates = existing
        .map(|w| {
            let predicates = &w.predicates;
            quote! { #predicates, }
        })
        .unwrap_or_default();

    quote! {
        where
            #existing_predicates
            #(#bounds),*
    }
}

fn generate_deep_equal(input: &DeriveInput, crate_path: &TokenStream2) -> syn::Result<TokenStream2> {
    let body = match &input.data {
        syn::Data::Struct(data) => {
            let members = compared_members(&data.fields)?;
            let checks = members.iter().map(|m| {
                let member = &m.member;
                quote! { && #crate_path::DeepEqual::deep_equal_in(&self.#member, &other.#member, visited) }
            });
            quote! { true #(#checks)* }
        }
        syn::Data::Enum(data) => {
            let mut arms = Vec::new();
            for variant in &data.variants {
                let variant_ident = &variant.ident;
                let members = compared_members(&variant.fields)?;
                let left = members.iter().map(|m| m.binding("self"));
                let right = members.iter().map(|m| m.binding("other"));
                let fields: Vec<_> = members.iter().map(|m| &m.member).collect();
                let checks = members.iter().map(|m| {
                    let a = m.binding("self");
                    let b = m.binding("other");
                    quote! { && #crate_path::DeepEqual::deep_equal_in(#a, #b, visited) }
                });
                arms.push(quote! {
                    (
                        Self::#variant_ident { #(#fields: #left,)* .. },
                        Self::#variant_ident { #(#fields: #right,)* .. },
                    ) => true #(#checks)*,
                });
            }
            quote! {
                match (self, other) {
                    #(#arms)*
                    _ => false,
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
        #[allow(unused_variables, unreachable_patterns)]
        fn deep_equal_in(&self, other: &Self, visited: &mut #crate_path::Visited) -> bool {
            #body
        }
    })
}

/// A field that takes part in the comparison.
pub(crate) struct Member {
    pub member: syn::Member,
    pub name: String,
    pub index: usize,
}

impl Member {
    /// Identifier bound to this field when destructuring an enum variant.
    pub fn binding(&self, side: &str) -> syn::Ident {
        format_ident!("__{}_{}", side, self.index)
    }
}

/// Returns the fields not marked `#[deep_equal(ignore)]`, in declaration order.
pub(crate) fn compared_members(fields: &syn::Fields) -> syn::Result<Vec<Member>> {
    let mut members = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.ignore {
            continue;
        }
        let (member, name) = match &field.ident {
            Some(ident) => (syn::Member::Named(ident.clone()), ident.to_string()),
            None => (syn::Member::Unnamed(syn::Index::from(index)), index.to_string()),
        };
        members.push(Member { member, name, index });
    }
    Ok(members)
}

#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub ignore: bool,
}

pub(crate) fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("deep_equal") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("ignore") {
                result.ignore = true;
                Ok(())
            } else {
                Err(meta.error("unsupported deep_equal attribute, expected `ignore`"))
            }
        })?;
    }

    Ok(result)
}
