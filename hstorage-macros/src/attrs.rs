use syn::{Ident, LitBool, LitStr, Result, Token, Type, parse::ParseStream};

/// `#[entity(...)]` / `#[aggregate(...)]` 的键值参数
#[derive(Default)]
pub(crate) struct StorageAttrs {
    pub(crate) id_ty: Option<Type>,
    pub(crate) tag: Option<LitStr>,
    pub(crate) collection: Option<LitStr>,
    pub(crate) derive_debug: Option<bool>,
}

impl StorageAttrs {
    /// 解析 `key = value, ...`，仅接受 `allowed` 中列出的键，且每个键最多出现一次
    pub(crate) fn parse_with(input: ParseStream, allowed: &[&str]) -> Result<Self> {
        let mut attrs = Self::default();

        while !input.is_empty() {
            let key: Ident = input.parse()?;
            let name = key.to_string();
            if !allowed.contains(&name.as_str()) {
                return Err(syn::Error::new(
                    key.span(),
                    format!(
                        "unknown key '{name}' in attribute; expected one of: {}",
                        allowed.join(", ")
                    ),
                ));
            }
            let _eq: Token![=] = input.parse()?;

            let duplicated = match name.as_str() {
                "id" => attrs.id_ty.replace(input.parse()?).is_some(),
                "tag" => attrs.tag.replace(input.parse()?).is_some(),
                "collection" => attrs.collection.replace(input.parse()?).is_some(),
                "debug" => {
                    let lit: LitBool = input.parse()?;
                    attrs.derive_debug.replace(lit.value()).is_some()
                }
                _ => {
                    return Err(syn::Error::new(key.span(), "unsupported key in attribute"));
                }
            };
            if duplicated {
                return Err(syn::Error::new(
                    key.span(),
                    format!("duplicate key '{name}' in attribute"),
                ));
            }

            if input.is_empty() {
                break;
            }
            let _comma: Token![,] = input.parse()?;
        }

        Ok(attrs)
    }
}
