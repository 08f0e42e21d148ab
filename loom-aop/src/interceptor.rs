//! 方法拦截器（MethodInterceptor）定义
//!
//! 拦截器接收调用链，要么调用 `proceed()` 继续执行，
//! 要么直接返回自己的结果让调用短路。

use crate::error::AopResult;
use crate::invocation::MethodInvocation;
use serde_json::Value;
use std::sync::Arc;

/// 方法拦截器 Trait
///
/// 拦截器在多个调用之间共享，因此必须是无状态的或自行同步
pub trait MethodInterceptor: Send + Sync {
    /// 执行拦截逻辑
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> AopResult<Value>;

    /// 拦截器名称
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// 闭包拦截器
pub struct FnInterceptor<F> {
    name: String,
    func: F,
}

impl<F> FnInterceptor<F>
where
    F: Fn(&MethodInvocation<'_>) -> AopResult<Value> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> MethodInterceptor for FnInterceptor<F>
where
    F: Fn(&MethodInvocation<'_>) -> AopResult<Value> + Send + Sync,
{
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> AopResult<Value> {
        (self.func)(invocation)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 用闭包创建共享拦截器
pub fn interceptor<F>(name: impl Into<String>, func: F) -> Arc<dyn MethodInterceptor>
where
    F: Fn(&MethodInvocation<'_>) -> AopResult<Value> + Send + Sync + 'static,
{
    Arc::new(FnInterceptor::new(name, func))
}
