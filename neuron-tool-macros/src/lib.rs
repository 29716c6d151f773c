//! `#[neuron_tool]` attribute macro.
//!
//! Turns a plain async function into a zero-sized [`neuron_types::Tool`]
//! implementation: a generated `Args` struct (one field per non-context
//! parameter, doc comments preserved as JSON Schema field descriptions via
//! `schemars`) and a generated `{Name}Tool` unit struct whose `call` body
//! is the original function body, with its parameters bound from the
//! generated `Args` struct.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, FnArg, GenericArgument, ItemFn, Lit, Meta, Pat, PathArguments, ReturnType, Token, Type};

/// See the [module docs](self) for the generated shape.
#[proc_macro_attribute]
pub fn neuron_tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = parse_macro_input!(attr with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(item as ItemFn);

    let mut name = None;
    let mut description = None;
    for meta in &attrs {
        let Meta::NameValue(nv) = meta else { continue };
        let Some(key) = nv.path.get_ident().map(ToString::to_string) else {
            continue;
        };
        let syn::Expr::Lit(expr_lit) = &nv.value else {
            continue;
        };
        let Lit::Str(s) = &expr_lit.lit else { continue };
        match key.as_str() {
            "name" => name = Some(s.value()),
            "description" => description = Some(s.value()),
            _ => {}
        }
    }

    let name = match name {
        Some(n) => n,
        None => {
            return syn::Error::new_spanned(&input_fn.sig.ident, "`#[neuron_tool]` requires a `name = \"...\"` argument")
                .to_compile_error()
                .into()
        }
    };
    let description = description.unwrap_or_default();

    let fn_name = input_fn.sig.ident.clone();
    let pascal = to_pascal_case(&fn_name.to_string());
    let tool_ident = format_ident!("{pascal}Tool");
    let args_ident = format_ident!("{pascal}Args");

    let mut field_defs = Vec::new();
    let mut field_names = Vec::new();
    let mut ctx_pat: Option<Box<Pat>> = None;

    for input in &input_fn.sig.inputs {
        let FnArg::Typed(pat_type) = input else { continue };
        if is_tool_context_ref(&pat_type.ty) {
            ctx_pat = Some(pat_type.pat.clone());
            continue;
        }
        let Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
            continue;
        };
        let field_name = pat_ident.ident.clone();
        let field_ty = &pat_type.ty;
        let docs: Vec<_> = pat_type
            .attrs
            .iter()
            .filter(|a| a.path().is_ident("doc"))
            .cloned()
            .collect();
        field_defs.push(quote! { #(#docs)* pub #field_name: #field_ty });
        field_names.push(field_name);
    }

    let ctx_pat: Box<Pat> = ctx_pat.unwrap_or_else(|| Box::new(syn::parse_quote!(_ctx)));

    let (output_ty, error_ty) = match extract_result_types(&input_fn.sig.output) {
        Some(pair) => pair,
        None => {
            return syn::Error::new_spanned(
                &input_fn.sig.output,
                "`#[neuron_tool]` functions must return `Result<Output, Error>`",
            )
            .to_compile_error()
            .into()
        }
    };

    let fn_body = &input_fn.block;

    let expanded = quote! {
        #[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
        #[allow(missing_docs)]
        pub struct #args_ident {
            #(#field_defs),*
        }

        #[doc = #description]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct #tool_ident;

        impl neuron_types::Tool for #tool_ident {
            const NAME: &'static str = #name;
            type Args = #args_ident;
            type Output = #output_ty;
            type Error = #error_ty;

            fn definition(&self) -> neuron_types::ToolDefinition {
                neuron_types::ToolDefinition {
                    name: Self::NAME.into(),
                    title: None,
                    description: #description.into(),
                    input_schema: serde_json::to_value(schemars::schema_for!(#args_ident)).unwrap(),
                    output_schema: None,
                    annotations: None,
                    cache_control: None,
                }
            }

            fn call(
                &self,
                args: Self::Args,
                #ctx_pat: &neuron_types::ToolContext,
            ) -> impl ::std::future::Future<Output = Result<Self::Output, Self::Error>> + Send {
                async move {
                    let #args_ident { #(#field_names),* } = args;
                    #fn_body
                }
            }
        }
    };

    expanded.into()
}

/// Whether `ty` is (syntactically) `&ToolContext`.
fn is_tool_context_ref(ty: &Type) -> bool {
    let Type::Reference(reference) = ty else {
        return false;
    };
    let Type::Path(path) = reference.elem.as_ref() else {
        return false;
    };
    path.path
        .segments
        .last()
        .is_some_and(|seg| seg.ident == "ToolContext")
}

/// Pull `(Output, Error)` out of a `-> Result<Output, Error>` return type.
fn extract_result_types(ret: &ReturnType) -> Option<(Type, Type)> {
    let ReturnType::Type(_, ty) = ret else {
        return None;
    };
    let Type::Path(path) = ty.as_ref() else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(generics) = &segment.arguments else {
        return None;
    };
    let mut types = generics.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(t) => Some(t.clone()),
        _ => None,
    });
    let output = types.next()?;
    let error = types.next()?;
    Some((output, error))
}

/// Convert `snake_case` to `PascalCase`.
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
