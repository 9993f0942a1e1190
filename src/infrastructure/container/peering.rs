//! 对等容器链 - 本地未命中后依次查询

use super::locator::ServiceLocator;
use locator_types::{ContainerError, Service};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// 对等容器链 - 有序的次级定位器列表
///
/// 询问对等容器时总是关闭对等查找，互为对等的两个容器不会来回转发请求。
#[derive(Default)]
pub struct PeeringChain {
    peers: RwLock<Vec<Arc<dyn ServiceLocator>>>,
}

impl PeeringChain {
    /// 创建空的对等容器链
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加对等容器，按添加顺序查询
    pub fn add(&self, peer: Arc<dyn ServiceLocator>) {
        self.peers.write().push(peer);
    }

    /// 对等容器数量
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// 是否没有对等容器
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// 检查是否有对等容器能提供该服务
    pub fn contains(&self, name: &str) -> bool {
        self.snapshot()
            .iter()
            .any(|peer| peer.can_locate(name, false))
    }

    /// 返回第一个对等容器的解析结果，都没有时返回 `None`
    ///
    /// 对等容器找到名称但构建失败时返回其错误；单纯的未找到则继续询问下一个。
    pub fn locate(&self, name: &str) -> Result<Option<Service>, ContainerError> {
        for (index, peer) in self.snapshot().iter().enumerate() {
            if !peer.can_locate(name, false) {
                continue;
            }
            match peer.locate(name, false) {
                Ok(service) => {
                    tracing::debug!(service = name, peer = index, "resolved through peer");
                    return Ok(Some(service));
                }
                Err(ContainerError::ServiceNotFound { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    // Peers may call back into us, so never hold the lock while asking them.
    fn snapshot(&self) -> Vec<Arc<dyn ServiceLocator>> {
        self.peers.read().clone()
    }
}

impl fmt::Debug for PeeringChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeeringChain")
            .field("peers", &self.len())
            .finish()
    }
}
