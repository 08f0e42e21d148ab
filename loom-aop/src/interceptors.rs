//! 预定义的常用拦截器

use crate::error::AopResult;
use crate::interceptor::MethodInterceptor;
use crate::invocation::MethodInvocation;
use serde_json::Value;
use std::time::{Duration, Instant};

/// 日志拦截器 - 记录方法进入、退出和异常
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor {
    log_args: bool,
    log_result: bool,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args(mut self) -> Self {
        self.log_args = true;
        self
    }

    pub fn with_result(mut self) -> Self {
        self.log_result = true;
        self
    }
}

impl MethodInterceptor for LoggingInterceptor {
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> AopResult<Value> {
        let method = invocation.method();
        if self.log_args {
            tracing::info!("→ Entering: {} with {:?}", method, invocation.arguments());
        } else {
            tracing::info!("→ Entering: {}", method);
        }

        let started = Instant::now();
        let result = invocation.proceed();
        let elapsed = started.elapsed();

        match &result {
            Ok(value) if self.log_result => {
                tracing::info!("← Exiting: {} = {} (took {:?})", method, value, elapsed)
            }
            Ok(_) => tracing::info!("← Exiting: {} (took {:?})", method, elapsed),
            Err(e) => tracing::error!("❌ Exception in {}: {} (took {:?})", method, e, elapsed),
        }

        result
    }

    fn name(&self) -> &str {
        "LoggingInterceptor"
    }
}

/// 性能监控拦截器 - 超过阈值时告警
#[derive(Debug, Clone)]
pub struct PerformanceInterceptor {
    threshold: Duration,
}

impl PerformanceInterceptor {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn threshold_ms(threshold_ms: u64) -> Self {
        Self::new(Duration::from_millis(threshold_ms))
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

impl MethodInterceptor for PerformanceInterceptor {
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> AopResult<Value> {
        let started = Instant::now();
        let result = invocation.proceed();
        let elapsed = started.elapsed();

        if elapsed > self.threshold {
            tracing::warn!(
                "⚠️ Slow method detected: {} took {:?} (threshold: {:?})",
                invocation.method(),
                elapsed,
                self.threshold
            );
        }

        result
    }

    fn name(&self) -> &str {
        "PerformanceInterceptor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MethodDescriptor;
    use crate::error::AopError;
    use crate::target::AopTarget;
    use serde_json::json;
    use std::sync::Arc;

    struct Echo;

    impl AopTarget for Echo {
        fn type_name(&self) -> &str {
            "Echo"
        }

        fn responds_to(&self, method: &str) -> bool {
            matches!(method, "echo" | "fail")
        }

        fn invoke(&self, method: &str, args: &[Value]) -> AopResult<Value> {
            match method {
                "echo" => Ok(args.first().cloned().unwrap_or(Value::Null)),
                _ => Err(anyhow::anyhow!("boom").into()),
            }
        }
    }

    fn run(interceptor: Arc<dyn MethodInterceptor>, method: &str) -> AopResult<Value> {
        let descriptor = MethodDescriptor::new("Echo", method).param("value", "");
        let interceptors = vec![interceptor];
        MethodInvocation::new(&Echo, &descriptor, vec![json!("hi")], &interceptors, &[])?.proceed()
    }

    #[test]
    fn test_logging_interceptor_passes_through() {
        let interceptor = Arc::new(LoggingInterceptor::new().with_args().with_result());
        assert_eq!(run(interceptor.clone(), "echo").unwrap(), json!("hi"));
        assert_eq!(interceptor.name(), "LoggingInterceptor");
    }

    #[test]
    fn test_logging_interceptor_keeps_error() {
        let err = run(Arc::new(LoggingInterceptor::new()), "fail").unwrap_err();
        assert!(matches!(err, AopError::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_performance_interceptor() {
        let interceptor = PerformanceInterceptor::threshold_ms(0);
        assert_eq!(interceptor.threshold(), Duration::ZERO);
        assert_eq!(run(Arc::new(interceptor), "echo").unwrap(), json!("hi"));
    }
}
