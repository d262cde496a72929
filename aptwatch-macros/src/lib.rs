mod delegate;

use delegate::delegate_adapter_identity_impl;

/// Fills in the `source`/`as_any` boilerplate of a `ProviderAdapter` impl
/// block from its `inner` field; the annotated impl provides `fetch`.
#[proc_macro_attribute]
pub fn delegate_adapter_identity(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    delegate_adapter_identity_impl(attr, item)
}
