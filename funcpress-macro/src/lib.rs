//! Procedural macros for funcpress.
//!
//! This crate provides the `#[handler]` attribute macro, which turns an async
//! function into a unit struct implementing one of the handler traits.
//!
//! # Example
//!
//! ```ignore
//! use funcpress::prelude::*;
//!
//! #[handler]
//! async fn get_user(req: &mut Request, res: &mut Response) -> Result<(), Error> {
//!     res.ok(json!({"id": req.event.path_parameter("id")}))
//! }
//!
//! app.on("users")?.get("/users/{id}", HandlerKind::plain(GetUser))?;
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, punctuated::Punctuated, Expr, ExprLit, Ident, ItemFn, Lit, Meta, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Plain,
    Raw,
}

/// Attributes for the `#[handler]` macro.
#[derive(Debug)]
struct HandlerAttrs {
    kind: Kind,
    /// Overrides the generated struct name.
    name: Option<Ident>,
}

impl HandlerAttrs {
    fn parse_meta_list(metas: Punctuated<Meta, Token![,]>) -> syn::Result<Self> {
        let mut attrs = HandlerAttrs {
            kind: Kind::Plain,
            name: None,
        };

        for meta in metas {
            let Meta::NameValue(nv) = meta else {
                return Err(syn::Error::new_spanned(meta, "expected name = value"));
            };
            let ident = nv
                .path
                .get_ident()
                .ok_or_else(|| syn::Error::new_spanned(&nv.path, "expected identifier"))?
                .to_string();
            let value = match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }) => lit.clone(),
                _ => return Err(syn::Error::new_spanned(&nv.value, "expected string literal")),
            };

            match ident.as_str() {
                "kind" => {
                    attrs.kind = match value.value().as_str() {
                        "plain" => Kind::Plain,
                        "raw" => Kind::Raw,
                        other => {
                            return Err(syn::Error::new_spanned(
                                value,
                                format!("unknown handler kind: {}, expected \"plain\" or \"raw\"", other),
                            ))
                        }
                    }
                }
                "name" => attrs.name = Some(value.parse()?),
                _ => {
                    return Err(syn::Error::new_spanned(
                        nv.path,
                        format!("unknown attribute: {}", ident),
                    ));
                }
            }
        }

        Ok(attrs)
    }
}

/// Generate a handler struct from an async function.
///
/// The function is kept as written. A unit struct named after the function in
/// PascalCase (or `name = "..."`) delegates to it.
///
/// - `#[handler]`: `async fn(&mut Request, &mut Response) -> Result<(), Error>`,
///   implements `funcpress::function::Handler`.
/// - `#[handler(kind = "raw")]`: `async fn(&Event, &Context) -> Result<RawReply, Error>`,
///   implements `funcpress::function::RawHandler`.
#[proc_macro_attribute]
pub fn handler(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(input as ItemFn);

    match generate_handler(args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_handler(
    args: Punctuated<Meta, Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let attrs = HandlerAttrs::parse_meta_list(args)?;

    if input_fn.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            &input_fn.sig,
            "handler functions must be async",
        ));
    }
    if input_fn.sig.inputs.len() != 2 {
        return Err(syn::Error::new_spanned(
            &input_fn.sig.inputs,
            "handler functions take exactly two arguments",
        ));
    }

    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let struct_name = attrs
        .name
        .unwrap_or_else(|| format_ident!("{}", to_pascal_case(&fn_name.to_string())));

    let implementation = match attrs.kind {
        Kind::Plain => quote! {
            #[::funcpress::prelude::async_trait]
            impl ::funcpress::function::Handler for #struct_name {
                async fn handle(
                    &self,
                    req: &mut ::funcpress::http::Request,
                    res: &mut ::funcpress::http::Response,
                ) -> ::core::result::Result<(), ::funcpress::Error> {
                    #fn_name(req, res).await
                }
            }
        },
        Kind::Raw => quote! {
            #[::funcpress::prelude::async_trait]
            impl ::funcpress::function::RawHandler for #struct_name {
                async fn handle(
                    &self,
                    event: &::funcpress::http::Event,
                    context: &::funcpress::http::Context,
                ) -> ::core::result::Result<::funcpress::function::RawReply, ::funcpress::Error> {
                    #fn_name(event, context).await
                }
            }
        },
    };

    Ok(quote! {
        #input_fn

        #[derive(Debug, Clone, Copy, Default)]
        #fn_vis struct #struct_name;

        #implementation
    })
}

/// Convert a snake_case string to PascalCase.
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}
