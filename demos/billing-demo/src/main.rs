//! 账单服务示例
//!
//! 周末禁止扣款：`charge_order` 带有 `NotOnWeekends` 注解，
//! 匹配该注解的切点为其绑定 `WeekendBlocker` 拦截器。
//!
//! 运行：`LOOM_LOG=debug cargo run -p billing-demo`

use anyhow::Context;
use loom_aop::prelude::*;
use loom_aop::LoggingConfig;
use loom_aop_macros::aop_target;
use std::time::{SystemTime, UNIX_EPOCH};

/// 注解：周末不可调用
struct NotOnWeekends;

pub struct RealBillingService;

#[aop_target]
impl RealBillingService {
    #[annotated(NotOnWeekends)]
    pub fn charge_order(&self) -> String {
        tracing::info!("Charging order...");
        "Charged.".to_string()
    }

    pub fn refund(&self, order_id: u64) -> String {
        format!("Refunded order #{}.", order_id)
    }
}

/// 周末拦截器
struct WeekendBlocker;

impl WeekendBlocker {
    /// 1970-01-01 是星期四，0 表示星期日
    fn today() -> u64 {
        let days = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() / 86_400)
            .unwrap_or_default();
        (days + 4) % 7
    }
}

impl MethodInterceptor for WeekendBlocker {
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> AopResult<Value> {
        let today = Self::today();
        if today == 0 || today == 6 {
            return Err(anyhow::anyhow!(
                "{} not allowed on weekends!",
                invocation.method().name
            )
            .into());
        }
        invocation.proceed()
    }

    fn name(&self) -> &str {
        "WeekendBlocker"
    }
}

fn main() -> anyhow::Result<()> {
    LoggingConfig::from_env().init()?;

    let inspector = Arc::new(TypeRegistry::new().with(RealBillingService::type_descriptor()));

    let blocker: Arc<dyn MethodInterceptor> = Arc::new(WeekendBlocker);
    let logging: Arc<dyn MethodInterceptor> = Arc::new(LoggingInterceptor::new().with_result());
    let mut bind = Bind::new();
    bind.bind_matching(
        &RealBillingService::type_descriptor().methods,
        &[
            Pointcut::new(Matcher::Any, vec![logging]),
            Pointcut::new(Matcher::annotated_with::<NotOnWeekends>(), vec![blocker]),
        ],
    );
    let bind = Arc::new(bind);

    let proxy = ProxyCompiler::new(inspector.clone(), CallableEmitter)
        .compile(&bind, "RealBillingService")
        .context("Failed to compile billing proxy")?
        .instantiate(Arc::new(RealBillingService));

    match proxy.call("charge_order", &[]) {
        Ok(result) => println!("charge_order: {}", result),
        Err(e) => println!("charge_order: {}", e),
    }
    println!("refund: {}", proxy.call("refund", &[json!(42)])?);

    let source = ProxyCompiler::new(inspector, SourceEmitter::default())
        .compile(&bind, "RealBillingService")?
        .render("::loom_aop")?;
    println!("\n{}", source);

    Ok(())
}
