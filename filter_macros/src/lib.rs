extern crate proc_macro;
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemStruct, LitStr};

/// Registers a `Filter` implementation in the global `FilterRegistry` at start-up.
///
/// The registry key is the snake_case struct name (`StructuralSmoothing` becomes
/// `"structural_smoothing"`) and is also exposed as `REGISTRY_KEY` on the struct.
#[proc_macro_attribute]
pub fn register_filter(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    let struct_name = &input.ident;

    let key = heck::ToSnakeCase::to_snake_case(struct_name.to_string().as_str());
    let key_lit = LitStr::new(&key, struct_name.span());
    let fn_name = syn::Ident::new(&format!("register_filter_{}", key), struct_name.span());

    let expanded = quote! {
        #input

        impl #struct_name {
            /// Key under which this filter is found in the `FilterRegistry`.
            pub const REGISTRY_KEY: &'static str = #key_lit;
        }

        #[ctor::ctor]
        fn #fn_name() {
            crate::filters::filter::FilterRegistry::register_filter::<#struct_name>(#key_lit);
        }
    };

    TokenStream::from(expanded)
}
