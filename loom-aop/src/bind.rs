//! 绑定注册表（Bind）
//!
//! 方法标识 → 有序拦截器列表 + 注解标签。
//! 构建阶段由单一所有者写入，之后只读，可通过 Arc 在多个调用之间共享。

use crate::descriptor::{Annotation, MethodDescriptor, MethodIdentity};
use crate::interceptor::MethodInterceptor;
use crate::matcher::Pointcut;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 绑定条目
#[derive(Clone)]
pub struct BindingEntry {
    /// 方法标识
    pub identity: MethodIdentity,

    /// 有序拦截器列表，第一个在最外层
    pub interceptors: Vec<Arc<dyn MethodInterceptor>>,

    /// 注解标签
    pub annotations: Vec<Annotation>,
}

impl BindingEntry {
    /// 拦截器名称列表
    pub fn interceptor_names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }
}

impl fmt::Debug for BindingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingEntry")
            .field("identity", &self.identity)
            .field("interceptors", &self.interceptor_names())
            .field("annotations", &self.annotations)
            .finish()
    }
}

/// 绑定注册表
///
/// 每个方法标识至多一个条目，按标识排序遍历
#[derive(Clone, Default)]
pub struct Bind {
    bindings: BTreeMap<MethodIdentity, BindingEntry>,
}

impl Bind {
    /// 创建空的绑定注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册或覆盖绑定
    pub fn bind(
        &mut self,
        identity: MethodIdentity,
        interceptors: Vec<Arc<dyn MethodInterceptor>>,
        annotations: Option<Vec<Annotation>>,
    ) -> &mut Self {
        let entry = BindingEntry {
            identity: identity.clone(),
            interceptors,
            annotations: annotations.unwrap_or_default(),
        };

        tracing::debug!(
            "Binding {} -> {:?}",
            identity,
            entry.interceptor_names()
        );

        if self.bindings.insert(identity.clone(), entry).is_some() {
            tracing::debug!("  ├─ Overwrote existing binding for {}", identity);
        }
        self
    }

    /// 按切点批量绑定
    ///
    /// 每个公开方法依次与所有切点比对，命中的切点按顺序追加拦截器，
    /// 方法自身的注解作为绑定的注解标签
    pub fn bind_matching<'m>(
        &mut self,
        methods: impl IntoIterator<Item = &'m MethodDescriptor>,
        pointcuts: &[Pointcut],
    ) -> &mut Self {
        for method in methods {
            if !method.is_public() {
                continue;
            }

            let interceptors: Vec<_> = pointcuts
                .iter()
                .filter(|pointcut| pointcut.matcher.matches(method))
                .flat_map(|pointcut| pointcut.interceptors.iter().cloned())
                .collect();

            if interceptors.is_empty() {
                continue;
            }

            let mut fresh = Bind::new();
            fresh.bind(method.identity(), interceptors, Some(method.annotations.clone()));
            self.absorb(fresh);
        }
        self
    }

    /// 查找绑定
    pub fn lookup(&self, identity: &MethodIdentity) -> Option<&BindingEntry> {
        self.bindings.get(identity)
    }

    /// 按类型名和方法名查找绑定
    pub fn lookup_method(&self, owning_type: &str, method: &str) -> Option<&BindingEntry> {
        self.lookup(&MethodIdentity::new(owning_type, method))
    }

    /// 是否存在绑定
    pub fn has_binding(&self, identity: &MethodIdentity) -> bool {
        self.bindings.contains_key(identity)
    }

    /// 所有已绑定的方法标识（有序）
    pub fn all_bound_identities(&self) -> Vec<MethodIdentity> {
        self.bindings.keys().cloned().collect()
    }

    /// 合并两个注册表
    ///
    /// 相同标识的拦截器列表拼接，self 的拦截器在外层
    pub fn merge(mut self, other: Bind) -> Self {
        tracing::debug!("Merging {} binding(s) into {}", other.len(), self.len());
        self.absorb(other);
        self
    }

    fn absorb(&mut self, other: Bind) {
        for (identity, entry) in other.bindings {
            match self.bindings.get_mut(&identity) {
                Some(existing) => {
                    existing.interceptors.extend(entry.interceptors);
                    existing.annotations.extend(entry.annotations);
                }
                None => {
                    self.bindings.insert(identity, entry);
                }
            }
        }
    }

    /// 获取绑定数量
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// 检查是否没有任何绑定
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// 遍历全部绑定条目
    pub fn entries(&self) -> impl Iterator<Item = &BindingEntry> {
        self.bindings.values()
    }
}

impl fmt::Debug for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.bindings.values()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::interceptor;
    use crate::matcher::Matcher;
    use serde_json::Value;

    fn named(name: &'static str) -> Arc<dyn MethodInterceptor> {
        interceptor(name, |invocation| invocation.proceed())
    }

    fn noop() -> Arc<dyn MethodInterceptor> {
        interceptor("noop", |_| Ok(Value::Null))
    }

    struct Audited;

    #[test]
    fn test_bind_and_lookup() {
        let mut bind = Bind::new();
        let identity = MethodIdentity::new("RealBillingService", "charge_order");
        bind.bind(identity.clone(), vec![named("weekend")], None);

        assert!(bind.has_binding(&identity));
        assert_eq!(bind.lookup(&identity).unwrap().interceptor_names(), vec!["weekend"]);
        assert!(bind.lookup_method("RealBillingService", "refund").is_none());
        assert_eq!(bind.all_bound_identities(), vec![identity]);
    }

    #[test]
    fn test_bind_overwrites() {
        let mut bind = Bind::new();
        let identity = MethodIdentity::new("S", "m");
        bind.bind(identity.clone(), vec![named("a")], None)
            .bind(identity.clone(), vec![named("b"), noop()], None);

        assert_eq!(bind.len(), 1);
        assert_eq!(bind.lookup(&identity).unwrap().interceptor_names(), vec!["b", "noop"]);
    }

    #[test]
    fn test_merge_concatenates_in_precedence_order() {
        let shared = MethodIdentity::new("S", "shared");
        let only_right = MethodIdentity::new("S", "right");

        let mut left = Bind::new();
        left.bind(shared.clone(), vec![named("l1"), named("l2")], None);

        let mut right = Bind::new();
        right
            .bind(shared.clone(), vec![named("r1")], Some(vec![Annotation::new(Audited)]))
            .bind(only_right.clone(), vec![named("r2")], None);

        let merged = left.merge(right);
        assert_eq!(merged.len(), 2);
        let entry = merged.lookup(&shared).unwrap();
        assert_eq!(entry.interceptor_names(), vec!["l1", "l2", "r1"]);
        assert!(entry.annotations[0].is::<Audited>());
        assert_eq!(merged.lookup(&only_right).unwrap().interceptor_names(), vec!["r2"]);
    }

    #[test]
    fn test_bind_matching_with_pointcuts() {
        let methods = vec![
            MethodDescriptor::new("S", "charge_order").with_annotation(Annotation::new(Audited)),
            MethodDescriptor::new("S", "charge_fee").private(),
            MethodDescriptor::new("S", "list"),
        ];
        let pointcuts = vec![
            Pointcut::new(Matcher::method_name("charge*"), vec![named("first")]),
            Pointcut::new(Matcher::annotated_with::<Audited>(), vec![named("audit")]),
        ];

        let mut bind = Bind::new();
        bind.bind_matching(&methods, &pointcuts);

        assert_eq!(bind.len(), 1);
        let entry = bind.lookup_method("S", "charge_order").unwrap();
        assert_eq!(entry.interceptor_names(), vec!["first", "audit"]);
        assert!(entry.annotations[0].is::<Audited>());
        // 非公开方法不绑定
        assert!(bind.lookup_method("S", "charge_fee").is_none());
    }
}
