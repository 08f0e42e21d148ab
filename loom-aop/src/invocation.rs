//! 方法调用链（MethodInvocation）
//!
//! 每次被拦截的调用都会创建一条调用链。链上保存目标对象、方法描述符、
//! 位置参数和拦截器列表，并用游标记录下一个要执行的拦截器。
//!
//! 游标状态：
//! - pending：游标小于拦截器数量，`proceed()` 执行游标处的拦截器
//! - exhausted：游标等于拦截器数量，`proceed()` 调用真实方法

use crate::descriptor::{Annotation, MethodDescriptor};
use crate::error::{AopError, AopResult};
use crate::interceptor::MethodInterceptor;
use crate::named_args::NamedArgs;
use crate::target::AopTarget;
use serde_json::{Map, Value};
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

/// 方法调用链
///
/// 目标、描述符和拦截器都是借用的，调用链只在一次调用期间存在。
/// 游标放在 `Cell` 里，调用链因此不能跨线程共享。
pub struct MethodInvocation<'a> {
    target: &'a dyn AopTarget,
    method: &'a MethodDescriptor,
    arguments: Vec<Value>,
    interceptors: &'a [Arc<dyn MethodInterceptor>],
    annotations: &'a [Annotation],
    cursor: Cell<usize>,
}

impl<'a> MethodInvocation<'a> {
    /// 创建调用链
    ///
    /// 目标上不存在该方法时立即返回 MethodNotFound，任何拦截器都不会执行
    pub fn new(
        target: &'a dyn AopTarget,
        method: &'a MethodDescriptor,
        arguments: Vec<Value>,
        interceptors: &'a [Arc<dyn MethodInterceptor>],
        annotations: &'a [Annotation],
    ) -> AopResult<Self> {
        if !target.responds_to(&method.name) {
            return Err(AopError::method_not_found(target.type_name(), &method.name));
        }

        Ok(Self {
            target,
            method,
            arguments,
            interceptors,
            annotations,
            cursor: Cell::new(0),
        })
    }

    /// 继续执行调用链
    ///
    /// 游标处的拦截器执行期间游标前移一位，因此拦截器内部的 `proceed()`
    /// 会进入下一个拦截器。拦截器返回（无论成功还是出错）后游标恢复原位。
    ///
    /// 由此得到重试语义：同一个拦截器每调用一次 `proceed()`，它之后的
    /// 拦截器和真实方法就完整地再执行一次，副作用也会重复；它之前的
    /// 拦截器不受影响。调用链结束后在外部再次 `proceed()` 则从头执行。
    /// 是否允许重复执行由拦截器自己决定，调用链不做限制。
    pub fn proceed(&self) -> AopResult<Value> {
        let position = self.cursor.get();

        let Some(interceptor) = self.interceptors.get(position) else {
            tracing::trace!("Invoking target method {}", self.method.signature());
            return self.target.invoke(&self.method.name, &self.arguments);
        };

        tracing::trace!(
            "  ├─ [{}/{}] {} -> {}",
            position + 1,
            self.interceptors.len(),
            interceptor.name(),
            self.method.name
        );

        self.cursor.set(position + 1);
        let result = interceptor.invoke(self);
        self.cursor.set(position);

        result
    }

    /// 调用链是否已经走到真实方法
    pub fn is_exhausted(&self) -> bool {
        self.cursor.get() >= self.interceptors.len()
    }

    /// 获取方法描述符
    pub fn method(&self) -> &MethodDescriptor {
        self.method
    }

    /// 获取位置参数
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// 获取目标对象
    pub fn this(&self) -> &dyn AopTarget {
        self.target
    }

    /// 获取绑定时附带的注解
    pub fn annotations(&self) -> &[Annotation] {
        self.annotations
    }

    /// 按参数名获取实参
    pub fn named_arguments(&self) -> AopResult<Map<String, Value>> {
        NamedArgs::get(self)
    }
}

impl fmt::Debug for MethodInvocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvocation")
            .field("target", &self.target.type_name())
            .field("method", &self.method.signature())
            .field("arguments", &self.arguments)
            .field("interceptors", &self.interceptors.len())
            .field("cursor", &self.cursor.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::interceptor;
    use parking_lot::Mutex;
    use serde_json::json;

    /// 累加器，每次 add 都会修改内部状态
    struct MockMethod {
        a: Mutex<i64>,
    }

    impl MockMethod {
        fn new() -> Self {
            Self { a: Mutex::new(0) }
        }
    }

    impl AopTarget for MockMethod {
        fn type_name(&self) -> &str {
            "MockMethod"
        }

        fn responds_to(&self, method: &str) -> bool {
            method == "add"
        }

        fn invoke(&self, method: &str, args: &[Value]) -> AopResult<Value> {
            match method {
                "add" => {
                    let n = args.first().and_then(Value::as_i64).unwrap_or(0);
                    let mut a = self.a.lock();
                    *a += n;
                    Ok(json!(*a))
                }
                _ => Err(AopError::method_not_found("MockMethod", method)),
            }
        }
    }

    struct Marker;

    fn add_method() -> MethodDescriptor {
        MethodDescriptor::new("MockMethod", "add").param("n", "i64")
    }

    /// 记录执行顺序的拦截器
    fn recorder(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<dyn MethodInterceptor> {
        interceptor(name, move |invocation| {
            log.lock().push(format!("{}:before", name));
            let result = invocation.proceed();
            log.lock().push(format!("{}:after", name));
            result
        })
    }

    #[test]
    fn test_accessors() {
        let mock = MockMethod::new();
        let method = add_method();
        let annotations = vec![Annotation::new(Marker)];
        let invocation = MethodInvocation::new(&mock, &method, vec![json!(1)], &[], &annotations).unwrap();

        assert_eq!(invocation.method().owning_type, "MockMethod");
        assert_eq!(invocation.method().name, "add");
        assert_eq!(invocation.arguments(), &[json!(1)]);
        assert_eq!(invocation.this().type_name(), "MockMethod");
        assert!(invocation.annotations()[0].is::<Marker>());
    }

    #[test]
    fn test_proceed_without_interceptors() {
        let mock = MockMethod::new();
        let method = add_method();
        let invocation = MethodInvocation::new(&mock, &method, vec![json!(1)], &[], &[]).unwrap();

        assert!(invocation.is_exhausted());
        assert_eq!(invocation.proceed().unwrap(), json!(1));
        assert_eq!(*mock.a.lock(), 1);
    }

    #[test]
    fn test_proceed_two_times() {
        let mock = MockMethod::new();
        let method = add_method();
        let invocation = MethodInvocation::new(&mock, &method, vec![json!(1)], &[], &[]).unwrap();

        invocation.proceed().unwrap();
        invocation.proceed().unwrap();
        assert_eq!(*mock.a.lock(), 2);
    }

    #[test]
    fn test_interceptors_run_in_order() {
        let mock = MockMethod::new();
        let method = add_method();
        let log = Arc::new(Mutex::new(Vec::new()));
        let interceptors = vec![
            recorder("first", log.clone()),
            recorder("second", log.clone()),
            recorder("third", log.clone()),
        ];

        let invocation = MethodInvocation::new(&mock, &method, vec![json!(5)], &interceptors, &[]).unwrap();
        assert_eq!(invocation.proceed().unwrap(), json!(5));

        assert_eq!(
            *log.lock(),
            vec![
                "first:before",
                "second:before",
                "third:before",
                "third:after",
                "second:after",
                "first:after",
            ]
        );
    }

    #[test]
    fn test_short_circuit_skips_rest() {
        let mock = MockMethod::new();
        let method = add_method();
        let log = Arc::new(Mutex::new(Vec::new()));
        let interceptors = vec![
            recorder("first", log.clone()),
            interceptor("blocker", |_| Ok(json!("blocked"))),
            recorder("never", log.clone()),
        ];

        let invocation = MethodInvocation::new(&mock, &method, vec![json!(5)], &interceptors, &[]).unwrap();
        assert_eq!(invocation.proceed().unwrap(), json!("blocked"));
        assert_eq!(*log.lock(), vec!["first:before", "first:after"]);
        assert_eq!(*mock.a.lock(), 0);
    }

    #[test]
    fn test_double_proceed_reruns_downstream_only() {
        let mock = MockMethod::new();
        let method = add_method();
        let log = Arc::new(Mutex::new(Vec::new()));
        let interceptors = vec![
            recorder("outer", log.clone()),
            interceptor("retry", |invocation| {
                invocation.proceed()?;
                invocation.proceed()
            }),
            recorder("inner", log.clone()),
        ];

        let invocation = MethodInvocation::new(&mock, &method, vec![json!(1)], &interceptors, &[]).unwrap();
        assert_eq!(invocation.proceed().unwrap(), json!(2));

        // outer 只执行一次，inner 和真实方法各执行两次
        assert_eq!(
            *log.lock(),
            vec![
                "outer:before",
                "inner:before",
                "inner:after",
                "inner:before",
                "inner:after",
                "outer:after",
            ]
        );
        assert_eq!(*mock.a.lock(), 2);
    }

    #[test]
    fn test_retry_after_downstream_failure() {
        let mock = MockMethod::new();
        let method = add_method();
        let attempts = Arc::new(Mutex::new(0));
        let counted = attempts.clone();
        let interceptors = vec![
            interceptor("retry", |invocation| {
                invocation.proceed().or_else(|_| invocation.proceed())
            }),
            interceptor("flaky", move |invocation| {
                let mut attempts = counted.lock();
                *attempts += 1;
                if *attempts == 1 {
                    return Err(anyhow::anyhow!("first attempt fails").into());
                }
                drop(attempts);
                invocation.proceed()
            }),
        ];

        let invocation = MethodInvocation::new(&mock, &method, vec![json!(5)], &interceptors, &[]).unwrap();
        assert_eq!(invocation.proceed().unwrap(), json!(5));
        assert_eq!(*attempts.lock(), 2);
        assert_eq!(*mock.a.lock(), 5);

        // 出错返回后游标同样复位，外部再次调用从头执行
        assert!(!invocation.is_exhausted());
        assert_eq!(invocation.proceed().unwrap(), json!(10));
        assert_eq!(*attempts.lock(), 3);
    }

    #[test]
    fn test_interceptor_can_convert_error() {
        let mock = MockMethod::new();
        let method = MethodDescriptor::new("MockMethod", "add");
        let interceptors = vec![
            interceptor("fallback", |invocation| match invocation.proceed() {
                Ok(value) => Ok(value),
                Err(_) => Ok(json!(-1)),
            }),
            interceptor("failing", |_| Err(anyhow::anyhow!("boom").into())),
        ];

        let invocation = MethodInvocation::new(&mock, &method, vec![], &interceptors, &[]).unwrap();
        assert_eq!(invocation.proceed().unwrap(), json!(-1));
    }

    #[test]
    fn test_missing_method_fails_before_interceptors() {
        let mock = MockMethod::new();
        let method = MethodDescriptor::new("MockMethod", "missing");
        let log = Arc::new(Mutex::new(Vec::new()));
        let interceptors = vec![recorder("first", log.clone())];

        let err = MethodInvocation::new(&mock, &method, vec![], &interceptors, &[]).unwrap_err();
        assert!(matches!(err, AopError::MethodNotFound { method, .. } if method == "missing"));
        assert!(log.lock().is_empty());
    }
}
