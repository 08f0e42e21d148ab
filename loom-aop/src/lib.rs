//! Loom AOP - 方法拦截与代理织入
//!
//! 给定目标对象和一组按方法匹配的拦截器绑定，生成代理：
//! 被匹配的方法调用依次经过拦截器链，未匹配的调用原样转发。
//!
//! - [`Bind`]：方法标识 → 有序拦截器列表
//! - [`MethodInvocation`]：拦截器链，拦截器可以短路或 `proceed()`
//! - [`ProxyCompiler`]：按固定模板为被绑定的方法合成代理方法体
//! - [`Weaver`]：不编译代理时的动态分派兜底方案
//!
//! ```ignore
//! use loom_aop::prelude::*;
//!
//! let mut bind = Bind::new();
//! bind.bind(MethodIdentity::new("RealBillingService", "charge_order"), vec![blocker], None);
//!
//! let inspector = Arc::new(TypeRegistry::new().with(RealBillingService::type_descriptor()));
//! let proxy = ProxyCompiler::new(inspector, CallableEmitter)
//!     .compile(&Arc::new(bind), "RealBillingService")?
//!     .instantiate(Arc::new(RealBillingService));
//!
//! proxy.call("charge_order", &[])?;
//! ```

pub mod bind;
pub mod compiler;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod inspector;
pub mod interceptor;
pub mod interceptors;
pub mod invocation;
pub mod logging;
pub mod matcher;
pub mod named_args;
pub mod target;
pub mod weaver;

// 重新导出核心类型
pub use bind::{Bind, BindingEntry};
pub use compiler::{
    CallableBody, CallableEmitter, CodeEmitter, CompiledProxy, MethodTemplate, ProxyCompiler,
    ProxyMethod, ProxyObject, SourceEmitter, TemplateSlots, Weaving, WovenMethod,
};
pub use config::{CompilerConfig, LoomConfig};
pub use descriptor::{
    Annotation, MethodDescriptor, MethodIdentity, Parameter, ReturnKind, TypeDescriptor, Visibility,
};
pub use error::{AopError, AopResult};
pub use inspector::{TypeInspector, TypeRegistry};
pub use interceptor::{interceptor, FnInterceptor, MethodInterceptor};
pub use interceptors::{LoggingInterceptor, PerformanceInterceptor};
pub use invocation::MethodInvocation;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use matcher::{Matcher, Pointcut};
pub use named_args::NamedArgs;
pub use target::{AopTarget, Indexable};
pub use weaver::Weaver;

// 导出给宏和生成代码使用
pub use anyhow;
pub use serde_json;
pub use serde_json::{json, to_value, Value};

/// 预导入模块
pub mod prelude {
    pub use crate::bind::{Bind, BindingEntry};
    pub use crate::compiler::{CallableEmitter, ProxyCompiler, ProxyObject, SourceEmitter};
    pub use crate::config::CompilerConfig;
    pub use crate::descriptor::{Annotation, MethodDescriptor, MethodIdentity, TypeDescriptor};
    pub use crate::error::{AopError, AopResult};
    pub use crate::inspector::{TypeInspector, TypeRegistry};
    pub use crate::interceptor::{interceptor, MethodInterceptor};
    pub use crate::interceptors::{LoggingInterceptor, PerformanceInterceptor};
    pub use crate::invocation::MethodInvocation;
    pub use crate::matcher::{Matcher, Pointcut};
    pub use crate::named_args::NamedArgs;
    pub use crate::target::{AopTarget, Indexable};
    pub use crate::weaver::Weaver;
    pub use serde_json::{json, Value};
    pub use std::sync::Arc;
}
