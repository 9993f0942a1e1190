//! 解析栈 - 跟踪正在解析的名称
//!
//! 每个条目由 [`ResolutionGuard`] 管理，包括 `?` 提前返回和 panic 展开在内的所有退出路径都会弹出名称。

use locator_types::ContainerError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::thread::{self, ThreadId};

/// 按线程记录的正在解析的名称
#[derive(Debug, Default)]
pub struct ResolutionStack {
    stacks: Mutex<HashMap<ThreadId, Vec<String>>>,
}

impl ResolutionStack {
    /// 创建空解析栈
    pub fn new() -> Self {
        Self::default()
    }

    /// 压入名称；当前线程已在解析该名称时返回 [`ContainerError::CircularDependency`]
    pub fn enter(&self, name: &str) -> Result<ResolutionGuard<'_>, ContainerError> {
        let thread = thread::current().id();
        let mut stacks = self.stacks.lock();
        let stack = stacks.entry(thread).or_default();

        if stack.iter().any(|entry| entry == name) {
            let mut chain = stack.clone();
            chain.push(name.to_string());
            return Err(ContainerError::CircularDependency {
                name: name.to_string(),
                chain,
            });
        }

        stack.push(name.to_string());
        Ok(ResolutionGuard {
            owner: self,
            thread,
            name: name.to_string(),
        })
    }

    /// 当前线程是否正在解析该名称
    pub fn contains(&self, name: &str) -> bool {
        let thread = thread::current().id();
        self.stacks
            .lock()
            .get(&thread)
            .is_some_and(|stack| stack.iter().any(|entry| entry == name))
    }

    /// 当前线程解析栈快照（外层在前）
    pub fn chain(&self) -> Vec<String> {
        let thread = thread::current().id();
        self.stacks.lock().get(&thread).cloned().unwrap_or_default()
    }

    /// 当前线程的解析深度
    pub fn depth(&self) -> usize {
        let thread = thread::current().id();
        self.stacks.lock().get(&thread).map_or(0, Vec::len)
    }

    fn leave(&self, thread: ThreadId, name: &str) {
        let mut stacks = self.stacks.lock();
        if let Some(stack) = stacks.get_mut(&thread) {
            if let Some(pos) = stack.iter().rposition(|entry| entry == name) {
                stack.remove(pos);
            }
            if stack.is_empty() {
                stacks.remove(&thread);
            }
        }
    }
}

/// 释放时从 [`ResolutionStack`] 弹出名称
#[must_use = "the name is popped as soon as the guard is dropped"]
pub struct ResolutionGuard<'a> {
    owner: &'a ResolutionStack,
    thread: ThreadId,
    name: String,
}

impl ResolutionGuard<'_> {
    /// 守卫对应的名称
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        self.owner.leave(self.thread, &self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_reentry_reports_chain() {
        let stack = ResolutionStack::new();
        let _a = stack.enter("a").unwrap();
        let _b = stack.enter("b").unwrap();

        match stack.enter("a") {
            Err(ContainerError::CircularDependency { name, chain }) => {
                assert_eq!(name, "a");
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("expected cycle, got {:?}", other.map(|g| g.name().to_string())),
        }
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_guard_pops_on_drop() {
        let stack = ResolutionStack::new();
        {
            let _guard = stack.enter("x").unwrap();
            assert!(stack.contains("x"));
        }
        assert!(!stack.contains("x"));
        assert!(stack.enter("x").is_ok());
    }

    #[test]
    fn test_guard_pops_on_error_path() {
        fn failing(stack: &ResolutionStack) -> Result<(), ContainerError> {
            let _guard = stack.enter("x")?;
            Err(ContainerError::UnsupportedScope { operation: "test" })
        }

        let stack = ResolutionStack::new();
        assert!(failing(&stack).is_err());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_out_of_order_drop() {
        let stack = ResolutionStack::new();
        let a = stack.enter("a").unwrap();
        let b = stack.enter("b").unwrap();
        drop(a);
        assert_eq!(stack.chain(), vec!["b"]);
        drop(b);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_threads_do_not_share_stacks() {
        let stack = Arc::new(ResolutionStack::new());
        let _outer = stack.enter("shared").unwrap();

        let other = Arc::clone(&stack);
        let entered = std::thread::spawn(move || {
            let entered = other.enter("shared").is_ok();
            entered
        })
        .join()
        .unwrap();
        assert!(entered);
    }
}
