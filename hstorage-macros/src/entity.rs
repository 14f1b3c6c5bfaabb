use crate::attrs::StorageAttrs;
use crate::utils::{apply_derives, ensure_leading_field};
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, ItemStruct, Result, Type, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[entity] 宏实现
/// - 若缺失则追加字段 `id: IdType` 并置于字段最前
/// - 合并派生：Debug（可关闭）、Default、Serialize、Deserialize
/// - 自动实现 `::hstorage::entity::Entity`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityAttrs);
    let input = parse_macro_input!(item as Item);

    match prepare(input, &cfg.0) {
        Ok((st, entity_impl)) => TokenStream::from(quote! {
            #st
            #entity_impl
        }),
        Err(err) => err.to_compile_error().into(),
    }
}

/// 规范化结构体并生成 `Entity` 实现，供 #[entity] 与 #[aggregate] 共用
pub(crate) fn prepare(
    input: Item,
    cfg: &StorageAttrs,
) -> Result<(ItemStruct, proc_macro2::TokenStream)> {
    let mut st = match input {
        Item::Struct(s) => s,
        other => return Err(syn::Error::new(other.span(), "only supported on struct")),
    };

    let st_span = st.span();
    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => return Err(syn::Error::new(st_span, "only supports named-field struct")),
    };

    let default_id: Type = syn::parse_quote! { String };
    let id_type = cfg.id_ty.as_ref().unwrap_or(&default_id);
    ensure_leading_field(fields_named, "id", id_type);

    // 已有 id 字段时以其声明类型为准
    let id_type = fields_named
        .named
        .first()
        .map(|f| f.ty.clone())
        .unwrap_or_else(|| id_type.clone());

    let mut required: Vec<syn::Path> = vec![
        syn::parse_quote!(Default),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    if cfg.derive_debug.unwrap_or(true) {
        required.insert(0, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st.attrs, required);

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();
    let entity_impl = quote! {
        impl #impl_generics ::hstorage::entity::Entity for #ident #ty_generics #where_clause {
            type Id = #id_type;

            fn id(&self) -> &Self::Id { &self.id }
        }
    };

    Ok((st, entity_impl))
}

struct EntityAttrs(StorageAttrs);

impl Parse for EntityAttrs {
    fn parse(input: ParseStream) -> Result<Self> {
        StorageAttrs::parse_with(input, &["id", "debug"]).map(Self)
    }
}
