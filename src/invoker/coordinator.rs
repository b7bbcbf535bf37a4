//! 调用协调器
//!
//! 对外的统一入口：选择实例、执行调用方闭包、按重试策略重试，失败时交给错误回调。

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::balancer::{InstanceSelector, LoadBalancer, LoadBalancerRegistry};
use crate::config::LbConfig;
use crate::discovery::backend::InstanceDirectory;
use crate::discovery::cache::InstanceCache;
use crate::discovery::factory::DirectoryFactory;
use crate::discovery::filter::InstanceFilter;
use crate::discovery::instance::{RegistrationEvent, ServiceInstance};
use crate::error::{BoxError, DiscoveryError, Result};
use crate::invoker::InvokerContext;
use crate::retry::{RetryEngine, RetryPolicy, RetryPolicyCache};
use crate::stats::{StatsAggregator, StatsRegistry};

/// 调用协调器
///
/// 持有实例缓存、统计、负载均衡与重试策略缓存。显式构造并注入注册中心，
/// 可以在同一进程中创建多个互不影响的实例。
///
/// # 示例
///
/// ```rust,no_run
/// use flare_discovery_client::{InvocationCoordinator, LbConfig, StaticDirectory, ServiceInstance};
/// use std::sync::Arc;
///
/// # async fn example() -> flare_discovery_client::Result<()> {
/// let directory = StaticDirectory::default()
///     .with_instances("order", vec![ServiceInstance::new("order", "10.0.0.1", 8080)]);
/// let coordinator = InvocationCoordinator::new(LbConfig::default(), Arc::new(directory))?;
/// coordinator.start().await;
///
/// let body = coordinator
///     .invoke(
///         |ctx| async move { Ok::<_, std::io::Error>(format!("GET {}/orders", ctx.base_url())) },
///         |_err| None,
///         "order",
///     )
///     .await;
/// # let _ = body;
/// coordinator.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct InvocationCoordinator {
    config: LbConfig,
    directory: Arc<dyn InstanceDirectory>,
    cache: Arc<InstanceCache>,
    stats: Arc<StatsRegistry>,
    selector: Arc<InstanceSelector>,
    engine: RetryEngine,
    policies: RetryPolicyCache,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl InvocationCoordinator {
    /// 使用注入的注册中心创建协调器
    pub fn new(config: LbConfig, directory: Arc<dyn InstanceDirectory>) -> Result<Self> {
        config.validate()?;

        let cache = Arc::new(InstanceCache::new(
            Arc::clone(&directory),
            config.cache_ttl(),
            config.cache_concurrency_level,
        ));
        let stats = Arc::new(StatsRegistry::new(config.stats_cache_expire()));

        let balancers = LoadBalancerRegistry::new(Arc::clone(&stats));
        if balancers.find(&config.load_balancer_type).is_none() {
            warn!(
                load_balancer = %config.load_balancer_type,
                "Unknown load balancer type, RoundRobin will be used"
            );
        }
        let selector = Arc::new(InstanceSelector::new(
            Arc::clone(&cache),
            balancers,
            config.load_balancer_type.clone(),
        ));
        let engine = RetryEngine::new(
            Arc::clone(&selector),
            Arc::clone(&stats),
            config.prefer_ip_over_host,
        );
        let policies = RetryPolicyCache::new(
            RetryPolicy::from_config(&config),
            config.max_retry_config_cache_size,
        );

        Ok(Self {
            config,
            directory,
            cache,
            stats,
            selector,
            engine,
            policies,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// 按配置中的后端创建注册中心，再创建协调器
    pub fn from_config(config: LbConfig) -> Result<Self> {
        let directory = DirectoryFactory::create(&config.directory)?;
        Self::new(config, directory)
    }

    /// 启动
    ///
    /// 初始化注册中心并启动权重聚合与缓存刷新任务。注册中心初始化失败只记录日志，
    /// 之后的查询失败会回退到缓存。
    pub async fn start(&self) {
        if let Err(e) = self.directory.init().await {
            warn!(error = %format!("{e:#}"), "Failed to initialize instance directory");
        }

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if !tasks.is_empty() {
            debug!("Background tasks already running");
            return;
        }

        if let Some(interval) = self.config.stats_aggregation_interval() {
            let aggregator = StatsAggregator::new(Arc::clone(&self.stats), Arc::clone(&self.selector));
            tasks.push(aggregator.start(interval));
        }
        if let Some(interval) = self.config.cache_refresh_interval() {
            tasks.push(self.cache.start_refresh_task(interval));
        }

        info!(
            load_balancer = %self.config.load_balancer_type,
            background_tasks = tasks.len(),
            "Invocation coordinator started"
        );
    }

    /// 关闭
    ///
    /// 停止后台任务，注销本进程实例并关闭注册中心
    pub async fn shutdown(&self) {
        self.stop_tasks();

        if let Err(e) = self.directory.unregister().await {
            warn!(error = %format!("{e:#}"), "Failed to unregister instance");
        }
        if let Err(e) = self.directory.close().await {
            warn!(error = %format!("{e:#}"), "Failed to close instance directory");
        }
        info!("Invocation coordinator stopped");
    }

    /// 使用默认重试策略调用
    ///
    /// 无可用实例、重试耗尽或不可重试的失败都会交给 `on_error`，
    /// 返回值只在 `on_error` 返回 None 时为 None。
    pub async fn invoke<T, E, F, Fut, H>(&self, work: F, on_error: H, service_name: &str) -> Option<T>
    where
        T: 'static,
        E: Into<BoxError>,
        F: FnMut(InvokerContext) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        H: FnOnce(DiscoveryError) -> Option<T>,
    {
        match self.try_invoke(work, service_name, None).await {
            Ok(result) => Some(result),
            Err(e) => on_error(e),
        }
    }

    /// 使用指定重试策略调用
    ///
    /// 策略按名称缓存，同名策略以第一次传入的为准
    pub async fn invoke_with_policy<T, E, F, Fut, H>(
        &self,
        work: F,
        on_error: H,
        service_name: &str,
        policy: RetryPolicy,
    ) -> Option<T>
    where
        T: 'static,
        E: Into<BoxError>,
        F: FnMut(InvokerContext) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        H: FnOnce(DiscoveryError) -> Option<T>,
    {
        match self.try_invoke(work, service_name, Some(policy)).await {
            Ok(result) => Some(result),
            Err(e) => on_error(e),
        }
    }

    /// 调用并直接返回错误
    pub async fn try_invoke<T, E, F, Fut>(
        &self,
        work: F,
        service_name: &str,
        policy: Option<RetryPolicy>,
    ) -> Result<T>
    where
        T: 'static,
        E: Into<BoxError>,
        F: FnMut(InvokerContext) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let policy = self.policies.resolve(policy);
        self.engine.execute(service_name, &policy, work).await
    }

    /// 使用配置的负载均衡策略选择一个实例
    pub async fn choose_instance(&self, service_name: &str) -> Option<ServiceInstance> {
        self.selector.choose(service_name).await
    }

    /// 注册本进程实例
    pub async fn registry(&self, instance: ServiceInstance) -> Result<()> {
        let service_name = instance.service_name.clone();
        let label = instance.to_string();
        self.directory.register(instance).await.map_err(|e| {
            let error = DiscoveryError::directory_unavailable(&service_name, &e);
            warn!(instance = %label, error = %error, "Failed to register instance");
            error
        })?;
        info!(instance = %label, "Instance registered");
        Ok(())
    }

    /// 由注册事件生成本进程实例并注册，返回注册的实例
    pub async fn register_event(&self, event: RegistrationEvent) -> Result<ServiceInstance> {
        if self.config.service_name.is_empty() {
            return Err(DiscoveryError::config("service_name is required for registration"));
        }
        let instance = event.into_instance(self.config.service_name.clone());
        self.registry(instance.clone()).await?;
        Ok(instance)
    }

    /// 追加实例过滤器
    pub fn add_filter(&self, filter: Arc<dyn InstanceFilter>) {
        self.selector.filters().add(filter);
    }

    /// 注册自定义负载均衡策略
    pub fn register_load_balancer(&self, balancer: Arc<dyn LoadBalancer>) {
        info!(load_balancer = %balancer.lb_type(), "Load balancer registered");
        self.selector.balancers().register(balancer);
    }

    pub fn config(&self) -> &LbConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<InstanceCache> {
        &self.cache
    }

    pub fn selector(&self) -> &Arc<InstanceSelector> {
        &self.selector
    }

    pub fn stats(&self) -> &Arc<StatsRegistry> {
        &self.stats
    }

    pub fn policies(&self) -> &RetryPolicyCache {
        &self.policies
    }

    fn stop_tasks(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for InvocationCoordinator {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}
