//! 随机负载均衡

use rand::Rng;

use super::LoadBalancer;
use crate::discovery::instance::ServiceInstance;

#[derive(Debug, Default)]
pub struct RandomBalancer;

impl RandomBalancer {
    pub const NAME: &'static str = "Random";
}

impl LoadBalancer for RandomBalancer {
    fn lb_type(&self) -> &str {
        Self::NAME
    }

    fn select<'a>(
        &self,
        _service_name: &str,
        instances: &'a [ServiceInstance],
    ) -> Option<&'a ServiceInstance> {
        let index = rand::thread_rng().gen_range(0..instances.len());
        instances.get(index)
    }
}
