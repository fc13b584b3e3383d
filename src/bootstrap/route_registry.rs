use actix_web::web;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

/// 路由配置函数类型
pub type RouteConfigFn = fn(&mut web::ServiceConfig);

/// 路由信息结构
#[derive(Debug, Clone)]
pub struct RouteInfo {
    pub name: String,
    pub description: String,
    pub module: String,
    pub config_fn: RouteConfigFn,
}

/// 全局路由注册器
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: HashMap<String, RouteInfo>,
}

impl RouteRegistry {
    /// 注册路由
    pub fn register_route(&mut self, route_info: RouteInfo) {
        self.routes.insert(route_info.name.clone(), route_info);
    }

    /// 配置所有路由到 ServiceConfig
    pub fn configure_all_routes(&self, cfg: &mut web::ServiceConfig) {
        for route_info in self.routes.values() {
            (route_info.config_fn)(cfg);
        }
    }

    /// 获取路由统计信息：总数 + 涉及的模块
    pub fn get_stats(&self) -> (usize, Vec<String>) {
        let total = self.routes.len();
        let modules: Vec<String> = self
            .routes
            .values()
            .map(|route| route.module.clone())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        (total, modules)
    }

    /// 打印路由信息
    pub fn print_routes_info(&self) {
        let (total, mut modules) = self.get_stats();
        modules.sort();
        info!("已注册 {} 个路由，模块: {:?}", total, modules);
        for route in self.routes.values() {
            info!("  - [{}] {}: {}", route.module, route.name, route.description);
        }
    }
}

// 全局路由注册器实例
lazy_static! {
    static ref GLOBAL_ROUTE_REGISTRY: RwLock<RouteRegistry> = RwLock::new(RouteRegistry::default());
}

/// 注册路由到全局注册器
pub fn register_global_route(route_info: RouteInfo) {
    let mut registry = GLOBAL_ROUTE_REGISTRY.write().unwrap();
    registry.register_route(route_info);
}

/// 配置所有全局路由
pub fn configure_global_routes(cfg: &mut web::ServiceConfig) {
    let registry = GLOBAL_ROUTE_REGISTRY.read().unwrap();
    registry.configure_all_routes(cfg);
}

/// 打印全局路由信息
pub fn print_global_routes_info() {
    let registry = GLOBAL_ROUTE_REGISTRY.read().unwrap();
    registry.print_routes_info();
}

/// 便捷宏：注册路由
#[macro_export]
macro_rules! register_route {
    ($name:expr, $description:expr, $module:expr, $config_fn:expr) => {
        $crate::bootstrap::route_registry::register_global_route(
            $crate::bootstrap::route_registry::RouteInfo {
                name: $name.to_string(),
                description: $description.to_string(),
                module: $module.to_string(),
                config_fn: $config_fn,
            },
        );
    };
}
