//! 最小并发负载均衡

use std::sync::Arc;

use super::LoadBalancer;
use crate::discovery::instance::ServiceInstance;
use crate::stats::StatsRegistry;

/// 选择正在进行的请求数最少的实例，相同时取列表中靠前的
pub struct BestAvailable {
    stats: Arc<StatsRegistry>,
}

impl BestAvailable {
    pub const NAME: &'static str = "BestAvailable";

    pub fn new(stats: Arc<StatsRegistry>) -> Self {
        Self { stats }
    }
}

impl LoadBalancer for BestAvailable {
    fn lb_type(&self) -> &str {
        Self::NAME
    }

    fn select<'a>(
        &self,
        _service_name: &str,
        instances: &'a [ServiceInstance],
    ) -> Option<&'a ServiceInstance> {
        let mut best: Option<(&ServiceInstance, u64)> = None;
        for instance in instances {
            let active = self.stats.instance_stats(instance).active_requests();
            match best {
                Some((_, min)) if active >= min => {}
                _ => best = Some((instance, active)),
            }
        }
        best.map(|(instance, _)| instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn picks_least_active_first_on_ties() {
        let stats = Arc::new(StatsRegistry::new(Duration::from_secs(600)));
        let a = ServiceInstance::new("order", "10.0.0.1", 80);
        let b = ServiceInstance::new("order", "10.0.0.2", 80);
        let c = ServiceInstance::new("order", "10.0.0.3", 80);
        let lb = BestAvailable::new(Arc::clone(&stats));
        let list = vec![a.clone(), b.clone(), c.clone()];

        assert_eq!(lb.choose("order", &list).unwrap(), a);

        stats.before_call(&a);
        stats.before_call(&a);
        stats.before_call(&b);
        stats.before_call(&c);
        assert_eq!(lb.choose("order", &list).unwrap(), b);
    }
}
