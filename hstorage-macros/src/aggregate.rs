use crate::attrs::StorageAttrs;
use crate::entity::prepare;
use crate::utils::to_snake_case;
use proc_macro::TokenStream;
use quote::quote;
use syn::{Item, Result, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[aggregate] 宏实现
/// - 包含 #[entity] 的全部行为
/// - 实现 `::hstorage::aggregate::Aggregate`：`TYPE` 取 `tag`（默认为结构体名的 snake_case），
///   `COLLECTION` 取 `collection`（默认 `None`，使用映射配置的默认集合）
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as AggregateAttrs);
    let input = parse_macro_input!(item as Item);

    let (st, entity_impl) = match prepare(input, &cfg.0) {
        Ok(prepared) => prepared,
        Err(err) => return err.to_compile_error().into(),
    };

    let tag = match &cfg.0.tag {
        Some(lit) => lit.value(),
        None => to_snake_case(&st.ident.to_string()),
    };
    let collection = match &cfg.0.collection {
        Some(lit) => quote! { ::core::option::Option::Some(#lit) },
        None => quote! { ::core::option::Option::None },
    };

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    TokenStream::from(quote! {
        #st
        #entity_impl

        impl #impl_generics ::hstorage::aggregate::Aggregate for #ident #ty_generics #where_clause {
            const TYPE: &'static str = #tag;
            const COLLECTION: ::core::option::Option<&'static str> = #collection;
        }
    })
}

struct AggregateAttrs(StorageAttrs);

impl Parse for AggregateAttrs {
    fn parse(input: ParseStream) -> Result<Self> {
        StorageAttrs::parse_with(input, &["id", "tag", "collection", "debug"]).map(Self)
    }
}
