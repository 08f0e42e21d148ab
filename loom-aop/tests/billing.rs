//! 账单服务端到端测试：周末禁止扣款

use loom_aop::prelude::*;
use loom_aop_macros::aop_target;
use parking_lot::Mutex;

/// 禁止在周末调用的注解标签
struct NotOnWeekends;

struct RealBillingService {
    charged: Mutex<u32>,
}

#[aop_target]
impl RealBillingService {
    #[annotated(NotOnWeekends)]
    pub fn charge_order(&self) -> String {
        *self.charged.lock() += 1;
        "Charged.".to_string()
    }

    pub fn charged_count(&self) -> u32 {
        *self.charged.lock()
    }
}

impl RealBillingService {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            charged: Mutex::new(0),
        })
    }
}

/// 周末拦截器，当前星期由外部注入
struct WeekendBlocker {
    weekday: &'static str,
}

impl MethodInterceptor for WeekendBlocker {
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> AopResult<Value> {
        if matches!(self.weekday, "Sat" | "Sun") {
            return Err(anyhow::anyhow!(
                "{} not allowed on weekends!",
                invocation.method().name
            )
            .into());
        }
        invocation.proceed()
    }
}

fn compile(weekday: &'static str, target: Arc<RealBillingService>) -> ProxyObject {
    let inspector = Arc::new(TypeRegistry::new().with(RealBillingService::type_descriptor()));
    let blocker: Arc<dyn MethodInterceptor> = Arc::new(WeekendBlocker { weekday });
    let mut bind = Bind::new();
    bind.bind_matching(
        &RealBillingService::type_descriptor().methods,
        &[Pointcut::new(Matcher::annotated_with::<NotOnWeekends>(), vec![blocker])],
    );

    ProxyCompiler::new(inspector, CallableEmitter)
        .compile(&Arc::new(bind), "RealBillingService")
        .unwrap()
        .instantiate(target)
}

#[test]
fn charges_on_weekday() {
    let service = RealBillingService::new();
    let proxy = compile("Wed", service.clone());

    assert_eq!(proxy.call("charge_order", &[]).unwrap(), json!("Charged."));
    assert_eq!(service.charged_count(), 1);
}

#[test]
fn blocks_on_weekend_without_running_body() {
    let service = RealBillingService::new();
    let proxy = compile("Sun", service.clone());

    let err = proxy.call("charge_order", &[]).unwrap_err();
    assert_eq!(err.to_string(), "charge_order not allowed on weekends!");
    assert_eq!(service.charged_count(), 0);
}

#[test]
fn unannotated_method_passes_through() {
    let service = RealBillingService::new();
    let proxy = compile("Sat", service.clone());

    assert!(!proxy.is_intercepted("charged_count"));
    assert_eq!(proxy.call("charged_count", &[]).unwrap(), json!(0));
}

#[test]
fn interceptor_sees_annotation() {
    let mut bind = Bind::new();
    bind.bind_matching(
        &RealBillingService::type_descriptor().methods,
        &[Pointcut::new(
            Matcher::method_name("charge_*"),
            vec![interceptor("inspect", |invocation| {
                assert!(invocation.annotations().iter().any(|a| a.is::<NotOnWeekends>()));
                invocation.proceed()
            })],
        )],
    );

    let inspector = Arc::new(TypeRegistry::new().with(RealBillingService::type_descriptor()));
    let proxy = ProxyCompiler::new(inspector, CallableEmitter)
        .compile(&Arc::new(bind), "RealBillingService")
        .unwrap()
        .instantiate(RealBillingService::new());

    assert_eq!(proxy.call("charge_order", &[]).unwrap(), json!("Charged."));
}

#[test]
fn weaver_blocks_on_weekend() {
    let blocker: Arc<dyn MethodInterceptor> = Arc::new(WeekendBlocker { weekday: "Sat" });
    let mut bind = Bind::new();
    bind.bind(
        MethodIdentity::new("RealBillingService", "charge_order"),
        vec![blocker],
        None,
    );

    let registry = TypeRegistry::new().with(RealBillingService::type_descriptor());
    let service = RealBillingService::new();
    let weaver = Weaver::new(service.clone(), Arc::new(bind), &registry).unwrap();

    assert!(weaver.call("charge_order", &[]).is_err());
    assert_eq!(weaver.call("charged_count", &[]).unwrap(), json!(0));
}
