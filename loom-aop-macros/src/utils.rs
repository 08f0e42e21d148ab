//! 工具函数

use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::{FnArg, ReturnType, Signature, Type};

/// 将错误转换为编译错误
pub fn to_compile_error(err: syn::Error) -> TokenStream {
    err.to_compile_error()
}

/// 返回值形态
pub enum ReturnShape {
    /// 无返回值或 `()`
    Unit,
    /// `Result<T, E>` 及以 `Result` 结尾的别名
    Fallible,
    /// 其他类型
    Plain,
}

/// 判断方法的返回值形态
pub fn return_shape(sig: &Signature) -> ReturnShape {
    match &sig.output {
        ReturnType::Default => ReturnShape::Unit,
        ReturnType::Type(_, ty) => match &**ty {
            Type::Tuple(tuple) if tuple.elems.is_empty() => ReturnShape::Unit,
            Type::Path(type_path) => {
                let is_result = type_path
                    .path
                    .segments
                    .last()
                    .map(|seg| seg.ident.to_string().ends_with("Result"))
                    .unwrap_or(false);
                if is_result {
                    ReturnShape::Fallible
                } else {
                    ReturnShape::Plain
                }
            }
            _ => ReturnShape::Plain,
        },
    }
}

/// 是否是 `&self` 方法
pub fn takes_shared_self(sig: &Signature) -> bool {
    matches!(
        sig.inputs.first(),
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none()
    )
}

/// 参数解码用的拥有所有权的类型，以及调用时是否需要借用
///
/// `&str` 解码为 `String`，`&[T]` 解码为 `Vec<T>`，其他 `&T` 解码为 `T`
pub fn owned_type(ty: &Type) -> syn::Result<(TokenStream, bool)> {
    let Type::Reference(reference) = ty else {
        return Ok((ty.to_token_stream(), false));
    };

    if reference.mutability.is_some() {
        return Err(syn::Error::new_spanned(
            ty,
            "#[aop_target] does not support `&mut` parameters",
        ));
    }

    let owned = match &*reference.elem {
        Type::Path(path) if path.path.is_ident("str") => quote!(::std::string::String),
        Type::Slice(slice) => {
            let elem = &slice.elem;
            quote!(::std::vec::Vec<#elem>)
        }
        elem => elem.to_token_stream(),
    };

    Ok((owned, true))
}

/// 类型的源码文本，写入参数描述符
pub fn type_text(ty: &Type) -> String {
    ty.to_token_stream().to_string()
}
