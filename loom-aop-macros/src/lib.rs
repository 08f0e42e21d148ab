//! Loom AOP 过程宏
//!
//! 提供 `#[aop_target]` 属性宏，作用于类型的固有 `impl` 块

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemImpl};

mod aop_target;
mod utils;

/// `#[aop_target]` 宏
///
/// 为 `impl` 块中的所有 `&self` 方法生成：
/// - `AopTarget` 实现：按方法名动态分派，参数和返回值经由 `serde_json::Value` 转换
/// - `type_descriptor()`：类型描述符，可直接注册到 `TypeRegistry`
///
/// 方法上的 `#[annotated(expr)]` 会作为注解标签写入方法描述符
///
/// 使用示例：
/// ```ignore
/// use loom_aop_macros::aop_target;
///
/// pub struct RealBillingService;
///
/// #[aop_target]
/// impl RealBillingService {
///     #[annotated(NotOnWeekends)]
///     pub fn charge_order(&self) -> String {
///         "Charged.".to_string()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn aop_target(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        let err = syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[aop_target] does not take arguments",
        );
        return err.to_compile_error().into();
    }

    let item_impl = parse_macro_input!(item as ItemImpl);
    aop_target::impl_aop_target(item_impl)
        .unwrap_or_else(utils::to_compile_error)
        .into()
}
