//! `#[derive(Mcpack)]`: generates `Described`, `Encode`, and `Decode` impls for a struct.
//!
//! Each field becomes one raw field descriptor (name, optional `#[mcpack(rename = "...")]` tag
//! name, `#[mcpack(omit_empty)]`, and a declaration-order-preserving encode/decode closure).
//! `#[mcpack(embed)]` promotes a field's own descriptors into the parent at `depth + 1`, which is
//! how the runtime merge algorithm in `mcpackv2::field` recognizes an embedded/anonymous struct.
//! `#[mcpack(skip)]` fields are left out of the descriptor list entirely and must implement
//! `Default`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta, NestedMeta};

#[proc_macro_derive(Mcpack, attributes(mcpack))]
pub fn derive_mcpack(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => &named.named,
            _ => panic!("#[derive(Mcpack)] only supports structs with named fields"),
        },
        _ => panic!("#[derive(Mcpack)] only supports structs"),
    };

    let mut descriptor_pushes = TokenStream2::new();

    for field in fields {
        let attrs = FieldAttrs::parse(&field.attrs);
        if attrs.skip {
            continue;
        }

        let ident = field.ident.as_ref().expect("named field");
        let ty = &field.ty;
        let field_name = ident.to_string();
        let tag_name = match &attrs.rename {
            Some(r) => quote!(Some(#r)),
            None => quote!(None),
        };
        let omit_empty = attrs.omit_empty;

        if attrs.embed {
            // Promote the embedded type's own descriptors one depth level up, rewriting their
            // encode/decode closures to project through this field.
            descriptor_pushes.extend(quote! {
                for inner in <#ty as ::mcpackv2::Described>::raw_descriptors() {
                    let inner_name = inner.name;
                    let inner_tag_name = inner.tag_name;
                    let inner_omit_empty = inner.omit_empty;
                    let inner_depth = inner.depth + 1;
                    let inner_encode = inner.encode;
                    let inner_decode = inner.decode;
                    out.push(::mcpackv2::RawFieldDescriptor {
                        name: inner_name,
                        tag_name: inner_tag_name,
                        omit_empty: inner_omit_empty,
                        depth: inner_depth,
                        encode: Box::new(move |s: &#name, key: &str, enc: &mut ::mcpackv2::Encoder| {
                            inner_encode(&s.#ident, key, enc)
                        }),
                        decode: Box::new(move |s: &mut #name, dec: &mut ::mcpackv2::Decoder| {
                            inner_decode(&mut s.#ident, dec)
                        }),
                    });
                }
            });
            continue;
        }

        let encode_body = if omit_empty {
            quote! {
                if ::mcpackv2::IsEmpty::is_empty_value(&s.#ident) {
                    return Ok(false);
                }
                ::mcpackv2::Encode::encode(&s.#ident, key, enc)?;
                Ok(true)
            }
        } else {
            quote! {
                ::mcpackv2::Encode::encode(&s.#ident, key, enc)?;
                Ok(true)
            }
        };

        descriptor_pushes.extend(quote! {
            out.push(::mcpackv2::RawFieldDescriptor {
                name: #field_name,
                tag_name: #tag_name,
                omit_empty: #omit_empty,
                depth: 0,
                encode: Box::new(|s: &#name, key: &str, enc: &mut ::mcpackv2::Encoder| {
                    #encode_body
                }),
                decode: Box::new(|s: &mut #name, dec: &mut ::mcpackv2::Decoder| {
                    s.#ident = ::mcpackv2::Decode::decode(dec)?;
                    Ok(())
                }),
            });
        });
    }

    let described_impl = quote! {
        impl ::mcpackv2::Described for #name {
            fn raw_descriptors() -> Vec<::mcpackv2::RawFieldDescriptor<Self>> {
                let mut out = Vec::new();
                #descriptor_pushes
                out
            }
        }
    };

    let encode_impl = quote! {
        impl ::mcpackv2::Encode for #name {
            fn encode(&self, key: &str, enc: &mut ::mcpackv2::Encoder) -> ::mcpackv2::Result<()> {
                let descriptors = ::mcpackv2::field::descriptors::<#name>();
                // Members are encoded into a scratch buffer first so the real count of members
                // actually written (an `omit_empty` field may write nothing) is known before the
                // container's count field is written, rather than assuming one member per
                // descriptor.
                let mut body = ::mcpackv2::Encoder::new();
                let mut count: u32 = 0;
                for d in descriptors.iter() {
                    if d.encode(self, &mut body)? {
                        count += 1;
                    }
                }
                let handle = enc.start_container(::mcpackv2::Tag::Object, key, count)?;
                enc.write_raw(&body.into_bytes());
                enc.end_container(handle);
                Ok(())
            }
        }
    };

    let decode_impl = quote! {
        impl ::mcpackv2::Decode for #name {
            fn decode(dec: &mut ::mcpackv2::Decoder) -> ::mcpackv2::Result<Self> {
                let descriptors = ::mcpackv2::field::descriptors::<#name>();
                dec.read_container(::mcpackv2::Tag::Object, |sub| {
                    let mut value = Self::default();
                    while !sub.is_empty() {
                        let key = sub.peek_object_key()?;
                        let found = ::mcpackv2::field::find_match(descriptors, key);
                        match found {
                            Some(d) => d.decode(&mut value, sub)?,
                            None => sub.skip_item()?,
                        }
                        sub.finish_item();
                    }
                    Ok(value)
                })
            }
        }
    };

    let expanded = quote! {
        #described_impl
        #encode_impl
        #decode_impl
    };

    TokenStream::from(expanded)
}

struct FieldAttrs {
    rename: Option<String>,
    omit_empty: bool,
    skip: bool,
    embed: bool,
}

impl FieldAttrs {
    fn parse(attrs: &[syn::Attribute]) -> Self {
        let mut out = FieldAttrs { rename: None, omit_empty: false, skip: false, embed: false };

        for attr in attrs {
            if !attr.path.is_ident("mcpack") {
                continue;
            }
            let meta = match attr.parse_meta() {
                Ok(m) => m,
                Err(_) => continue,
            };
            let list = match meta {
                Meta::List(list) => list,
                _ => continue,
            };
            for nested in list.nested {
                match nested {
                    NestedMeta::Meta(Meta::Path(p)) if p.is_ident("omit_empty") => {
                        out.omit_empty = true;
                    }
                    NestedMeta::Meta(Meta::Path(p)) if p.is_ident("skip") => {
                        out.skip = true;
                    }
                    NestedMeta::Meta(Meta::Path(p)) if p.is_ident("embed") => {
                        out.embed = true;
                    }
                    NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("rename") => {
                        if let Lit::Str(s) = nv.lit {
                            out.rename = Some(s.value());
                        }
                    }
                    _ => {}
                }
            }
        }

        out
    }
}
