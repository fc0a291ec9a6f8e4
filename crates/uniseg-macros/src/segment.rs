use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, spanned::Spanned};

#[derive(Default)]
struct SegmentAttrs {
    tag: Option<String>,
    display: Option<LitStr>,
}

pub fn derive_custom_segment(input: &DeriveInput) -> syn::Result<TokenStream> {
    let attrs = parse_attrs(&input.attrs)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let tag = match attrs.tag {
        Some(tag) if tag.is_empty() => {
            return Err(syn::Error::new(input.span(), "segment tag must not be empty"));
        }
        Some(tag) => tag,
        None => to_snake_case(&name.to_string()),
    };

    let display = match (&attrs.display, &input.data) {
        (None, _) => quote! {},
        (Some(lit), Data::Struct(data)) if matches!(data.fields, Fields::Named(_)) => {
            let idents = data.fields.iter().filter_map(|f| f.ident.as_ref());
            quote! {
                fn display(&self) -> ::std::string::String {
                    #[allow(unused_variables)]
                    let Self { #(#idents),* } = self;
                    ::std::format!(#lit)
                }
            }
        }
        (Some(lit), _) => quote! {
            fn display(&self) -> ::std::string::String {
                ::std::string::String::from(#lit)
            }
        },
    };

    if let Data::Union(_) = input.data {
        return Err(syn::Error::new(
            input.span(),
            "CustomSegment cannot be derived for unions",
        ));
    }

    Ok(quote! {
        impl #impl_generics ::uniseg_core::CustomSegmentType for #name #ty_generics #where_clause {
            const TAG: &'static str = #tag;

            #display
        }
    })
}

fn parse_attrs(attrs: &[Attribute]) -> syn::Result<SegmentAttrs> {
    let mut parsed = SegmentAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("segment") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                parsed.tag = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("display") {
                parsed.display = Some(meta.value()?.parse::<LitStr>()?);
            } else {
                return Err(meta.error("expected `tag` or `display`"));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("MarketFace"), "market_face");
        assert_eq!(to_snake_case("Poke"), "poke");
    }

    #[test]
    fn test_rejects_unknown_key() {
        let input: DeriveInput = syn::parse_quote! {
            #[segment(kind = "x")]
            struct Poke;
        };
        assert!(derive_custom_segment(&input).is_err());
    }

    #[test]
    fn test_default_tag() {
        let input: DeriveInput = syn::parse_quote! {
            struct MarketFace { id: String }
        };
        let tokens = derive_custom_segment(&input).unwrap().to_string();
        assert!(tokens.contains("\"market_face\""));
    }
}
