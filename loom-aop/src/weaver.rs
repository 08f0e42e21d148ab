//! 动态织入器（Weaver）
//!
//! 不需要编译代理时的兜底方案：把目标对象包装起来，按方法名动态分派。
//! 分派表在构造时一次性建好，之后只读。

use crate::bind::Bind;
use crate::descriptor::MethodDescriptor;
use crate::error::{AopError, AopResult};
use crate::inspector::TypeInspector;
use crate::invocation::MethodInvocation;
use crate::target::{AopTarget, Indexable};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 动态织入器
pub struct Weaver {
    target: Arc<dyn AopTarget>,
    bind: Arc<Bind>,
    type_name: String,
    methods: HashMap<String, MethodDescriptor>,
}

impl Weaver {
    /// 创建织入器
    ///
    /// 目标类型无法通过 inspector 解析时返回 InvalidSourceClass
    pub fn new(
        target: Arc<dyn AopTarget>,
        bind: Arc<Bind>,
        inspector: &dyn TypeInspector,
    ) -> AopResult<Self> {
        let ty = inspector.resolve(target.type_name())?;
        let methods: HashMap<String, MethodDescriptor> = inspector
            .all_methods(&ty)
            .into_iter()
            .map(|method| (method.name.clone(), method))
            .collect();

        tracing::debug!(
            "Weaving {} ({} methods, {} bindings)",
            ty.name,
            methods.len(),
            bind.len()
        );

        Ok(Self {
            target,
            bind,
            type_name: ty.name,
            methods,
        })
    }

    /// 调用方法
    ///
    /// 非公开方法与目标无法响应的方法返回 MethodNotFound；
    /// 没有绑定的方法直接转发给目标，不经过调用链
    pub fn call(&self, method: &str, args: &[Value]) -> AopResult<Value> {
        let descriptor = self.dispatchable(method)?;

        let binding = self
            .bind
            .lookup_method(&self.type_name, method)
            .or_else(|| self.bind.lookup(&descriptor.identity()));

        let Some(binding) = binding else {
            tracing::trace!("{}::{} has no binding, dispatching directly", self.type_name, method);
            return self.target.invoke(method, args);
        };

        let invocation = MethodInvocation::new(
            self.target.as_ref(),
            descriptor,
            args.to_vec(),
            &binding.interceptors,
            &binding.annotations,
        )?;
        invocation.proceed()
    }

    /// 先由 resolver 从查询参数中解析出位置参数，再调用方法
    pub fn call_with<R>(&self, resolver: R, method: &str, query: &Value) -> AopResult<Value>
    where
        R: Fn(&dyn AopTarget, &MethodDescriptor, &Value) -> AopResult<Vec<Value>>,
    {
        let descriptor = self.dispatchable(method)?;
        let args = resolver(self.target.as_ref(), descriptor, query)?;
        self.call(method, &args)
    }

    /// 可从外部调用的方法：已描述、公开、且目标能响应
    fn dispatchable(&self, method: &str) -> AopResult<&MethodDescriptor> {
        self.methods
            .get(method)
            .filter(|descriptor| descriptor.is_public() && self.target.responds_to(method))
            .ok_or_else(|| AopError::method_not_found(&self.type_name, method))
    }

    /// 读取目标属性
    pub fn get(&self, name: &str) -> AopResult<Value> {
        self.target
            .get_property(name)
            .ok_or_else(|| AopError::UndefinedProperty {
                type_name: self.type_name.clone(),
                property: name.to_string(),
            })
    }

    /// 写入目标属性
    pub fn set(&self, name: &str, value: Value) -> AopResult<()> {
        self.target.set_property(name, value)
    }

    pub fn offset_exists(&self, offset: &Value) -> AopResult<bool> {
        Ok(self.indexable()?.offset_exists(offset))
    }

    pub fn offset_get(&self, offset: &Value) -> AopResult<Option<Value>> {
        Ok(self.indexable()?.offset_get(offset))
    }

    pub fn offset_set(&self, offset: Value, value: Value) -> AopResult<()> {
        self.indexable()?.offset_set(offset, value);
        Ok(())
    }

    pub fn offset_unset(&self, offset: &Value) -> AopResult<()> {
        self.indexable()?.offset_unset(offset);
        Ok(())
    }

    fn indexable(&self) -> AopResult<&dyn Indexable> {
        self.target.as_indexable().ok_or_else(|| {
            AopError::CapabilityNotSupported(format!("{} is not indexable", self.type_name))
        })
    }

    /// 被包装的目标对象
    pub fn target(&self) -> &Arc<dyn AopTarget> {
        &self.target
    }

    /// 使用的绑定注册表
    pub fn bind(&self) -> &Arc<Bind> {
        &self.bind
    }
}

impl fmt::Display for Weaver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target.display())
    }
}

impl fmt::Debug for Weaver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("Weaver")
            .field("target", &self.type_name)
            .field("methods", &names)
            .field("bindings", &self.bind.len())
            .finish()
    }
}
