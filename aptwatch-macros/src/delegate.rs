use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use quote::quote;
use syn::{ImplItem, ItemImpl, Meta, Path, Token, parse_macro_input, punctuated::Punctuated};

use proc_macro_crate::{FoundCrate, crate_name};

fn resolve_crate_path(name: &str, fallback: &str) -> Path {
    let found = crate_name(name).unwrap_or(FoundCrate::Itself);
    match found {
        FoundCrate::Itself => syn::parse_str(fallback).expect("valid fallback path"),
        FoundCrate::Name(found_name) => {
            let ident = Ident::new(&found_name, Span::call_site());
            syn::parse_quote! { #ident }
        }
    }
}

fn parse_inner_ident(args: Punctuated<Meta, Token![,]>) -> Ident {
    args.into_iter()
        .find_map(|meta| match meta {
            Meta::Path(p) => p.get_ident().cloned(),
            _ => None,
        })
        .expect(
            "delegate_adapter_identity requires the inner field ident, e.g. #[delegate_adapter_identity(inner)]",
        )
}

/// Fills in the `source` and `as_any` boilerplate of a `ProviderAdapter` impl
/// from the wrapper's `inner` field, leaving `fetch` to the body the caller
/// already wrote.
///
/// Every middleware layer (cooldown gate, soft-failure guard, enrichment
/// cache) wraps one inner adapter and only changes `fetch`; `source` always
/// just forwards, and `as_any` always just returns the outer wrapper so test
/// harnesses can downcast to it.
pub fn delegate_adapter_identity_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr with Punctuated::<Meta, Token![,]>::parse_terminated);
    let mut input_impl = parse_macro_input!(item as ItemImpl);
    let inner_ident = parse_inner_ident(args);

    let aptwatch_types = resolve_crate_path("aptwatch-types", "aptwatch_types");

    let source_method: ImplItem = syn::parse_quote! {
        fn source(&self) -> #aptwatch_types::SourceKey {
            self.#inner_ident.source()
        }
    };
    let as_any_method: ImplItem = syn::parse_quote! {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    };

    input_impl.items.push(source_method);
    input_impl.items.push(as_any_method);

    quote! { #input_impl }.into()
}
