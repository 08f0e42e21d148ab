//! 方法匹配器（Matcher）
//!
//! 基于方法描述符的谓词，用于决定哪些方法需要绑定拦截器

use crate::descriptor::{MethodDescriptor, ReturnKind};
use crate::interceptor::MethodInterceptor;
use regex::Regex;
use std::any::TypeId;
use std::sync::Arc;

/// 方法匹配器
#[derive(Clone)]
pub enum Matcher {
    /// 匹配所有方法
    Any,

    /// 匹配所属类型名称（支持 * 通配符）
    TypeName(String),

    /// 匹配方法名称（支持 * 通配符）
    MethodName(String),

    /// 使用正则表达式匹配类型
    TypeRegex(Regex),

    /// 使用正则表达式匹配方法
    MethodRegex(Regex),

    /// 匹配带有指定注解的方法
    AnnotatedWith(TypeId),

    /// 匹配无返回值的方法
    ReturnsVoid,

    /// 自定义匹配函数
    Custom(Arc<dyn Fn(&MethodDescriptor) -> bool + Send + Sync>),

    /// 与运算（AND）
    And(Box<Matcher>, Box<Matcher>),

    /// 或运算（OR）
    Or(Box<Matcher>, Box<Matcher>),

    /// 非运算（NOT）
    Not(Box<Matcher>),
}

impl Matcher {
    /// 检查方法是否匹配
    pub fn matches(&self, method: &MethodDescriptor) -> bool {
        match self {
            Matcher::Any => true,

            Matcher::TypeName(pattern) => Self::pattern_matches(pattern, &method.owning_type),

            Matcher::MethodName(pattern) => Self::pattern_matches(pattern, &method.name),

            Matcher::TypeRegex(regex) => regex.is_match(&method.owning_type),

            Matcher::MethodRegex(regex) => regex.is_match(&method.name),

            Matcher::AnnotatedWith(type_id) => {
                method.annotations.iter().any(|a| a.type_id() == *type_id)
            }

            Matcher::ReturnsVoid => method.return_kind == ReturnKind::Void,

            Matcher::Custom(func) => func(method),

            Matcher::And(left, right) => left.matches(method) && right.matches(method),

            Matcher::Or(left, right) => left.matches(method) || right.matches(method),

            Matcher::Not(inner) => !inner.matches(method),
        }
    }

    /// 通配符匹配，不构造正则
    ///
    /// - `*` 匹配任意字符串
    /// - `charge*` 以 charge 开头
    /// - `*Service` 以 Service 结尾
    /// - 其余字符按字面量比较
    fn pattern_matches(pattern: &str, target: &str) -> bool {
        let mut segments = pattern.split('*');
        let head = segments.next().unwrap_or_default();
        let Some(mut rest) = target.strip_prefix(head) else {
            return false;
        };

        let mut middle: Vec<&str> = segments.collect();
        let Some(tail) = middle.pop() else {
            return rest.is_empty();
        };

        for segment in middle {
            match rest.find(segment) {
                Some(index) => rest = &rest[index + segment.len()..],
                None => return false,
            }
        }
        rest.ends_with(tail)
    }

    /// 按方法名称匹配（支持 * 通配符）
    pub fn method_name(pattern: impl Into<String>) -> Self {
        Matcher::MethodName(pattern.into())
    }

    /// 按所属类型名称匹配（支持 * 通配符）
    pub fn type_name(pattern: impl Into<String>) -> Self {
        Matcher::TypeName(pattern.into())
    }

    /// 匹配带有注解 T 的方法
    pub fn annotated_with<T: 'static>() -> Self {
        Matcher::AnnotatedWith(TypeId::of::<T>())
    }

    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(&MethodDescriptor) -> bool + Send + Sync + 'static,
    {
        Matcher::Custom(Arc::new(func))
    }

    /// 与运算
    pub fn and(self, other: Matcher) -> Self {
        Matcher::And(Box::new(self), Box::new(other))
    }

    /// 或运算
    pub fn or(self, other: Matcher) -> Self {
        Matcher::Or(Box::new(self), Box::new(other))
    }

    /// 非运算
    pub fn not(self) -> Self {
        Matcher::Not(Box::new(self))
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Matcher::Any => write!(f, "Any"),
            Matcher::TypeName(p) => write!(f, "TypeName({})", p),
            Matcher::MethodName(p) => write!(f, "MethodName({})", p),
            Matcher::TypeRegex(r) => write!(f, "TypeRegex({})", r.as_str()),
            Matcher::MethodRegex(r) => write!(f, "MethodRegex({})", r.as_str()),
            Matcher::AnnotatedWith(_) => write!(f, "AnnotatedWith(...)"),
            Matcher::ReturnsVoid => write!(f, "ReturnsVoid"),
            Matcher::Custom(_) => write!(f, "Custom(...)"),
            Matcher::And(l, r) => write!(f, "And({:?}, {:?})", l, r),
            Matcher::Or(l, r) => write!(f, "Or({:?}, {:?})", l, r),
            Matcher::Not(e) => write!(f, "Not({:?})", e),
        }
    }
}

/// 切点：匹配器 + 拦截器列表
#[derive(Clone)]
pub struct Pointcut {
    pub matcher: Matcher,
    pub interceptors: Vec<Arc<dyn MethodInterceptor>>,
}

impl Pointcut {
    pub fn new(matcher: Matcher, interceptors: Vec<Arc<dyn MethodInterceptor>>) -> Self {
        Self {
            matcher,
            interceptors,
        }
    }
}

impl std::fmt::Debug for Pointcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.interceptors.iter().map(|i| i.name()).collect();
        f.debug_struct("Pointcut")
            .field("matcher", &self.matcher)
            .field("interceptors", &names)
            .finish()
    }
}
