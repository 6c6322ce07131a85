use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Derives `from_response`, decoding the JSON body of a
/// `crate::types::HttpResponse` into the annotated type.
///
/// A response without a body becomes `Error::Protocol`, an undecodable body
/// becomes `Error::JsonParse`. The status code is not inspected; callers
/// check it before decoding.
#[proc_macro_derive(FromResponse)]
pub fn derive_from_response(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            pub fn from_response(
                response: &crate::types::HttpResponse,
            ) -> crate::Result<Self> {
                let body = response.body.as_ref().ok_or_else(|| {
                    crate::Error::Protocol(format!(
                        "missing body in {} response",
                        stringify!(#name)
                    ))
                })?;
                ::serde_json::from_slice(body).map_err(crate::Error::JsonParse)
            }
        }
    };
    TokenStream::from(expanded)
}
