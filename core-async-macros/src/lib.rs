//! Attribute macros backing `#[core_async::main]` and `#[core_async::test]`.
//!
//! Both macros turn an `async fn` into a synchronous function that drives the
//! body on a multi-threaded runtime built by `core_async::runtime`. The worker
//! count defaults to the runtime's choice and can be pinned with
//! `worker_threads = N`, which tests use to get real parallelism for the
//! transfer pool without depending on the host's core count.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, ItemFn, LitInt};

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Test)
}

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Main)
}

enum MacroKind {
    Test,
    Main,
}

fn expand(attr: TokenStream, item: TokenStream, kind: MacroKind) -> TokenStream {
    let mut worker_threads: Option<usize> = None;
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("worker_threads") {
            let lit: LitInt = meta.value()?.parse()?;
            let count: usize = lit.base10_parse()?;
            if count == 0 {
                return Err(meta.error("`worker_threads` must be at least 1"));
            }
            worker_threads = Some(count);
            Ok(())
        } else {
            Err(meta.error("unsupported core_async attribute, expected `worker_threads = N`"))
        }
    });
    parse_macro_input!(attr with parser);

    let input = parse_macro_input!(item as ItemFn);

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            input.sig.fn_token,
            "core_async attribute macros require `async fn`",
        )
        .to_compile_error()
        .into();
    }

    let mut sync_sig = input.sig.clone();
    sync_sig.asyncness = None;

    let attrs = input.attrs;
    let vis = input.vis;
    let block = input.block;

    let runner: TokenStream2 = match worker_threads {
        Some(count) => quote! {
            core_async::runtime::block_on_with_workers(#count, async move #block)
        },
        None => quote! {
            core_async::runtime::block_on(async move #block)
        },
    };

    let test_attr = match kind {
        MacroKind::Test => quote!(#[test]),
        MacroKind::Main => TokenStream2::new(),
    };

    quote! {
        #(#attrs)*
        #test_attr
        #vis #sync_sig {
            #runner
        }
    }
    .into()
}
