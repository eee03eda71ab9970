// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::utils::errors::SchedulerError;

/// 每个主机的并发上限
pub const HOST_CAPACITY: usize = 1;

/// 两级并发准入控制器
///
/// - 全局池：限制所有运行合计的在途抓取数；
/// - 主机池：每个主机一个容量为1的信号量，串行化同一主机的请求。
///
/// tokio 信号量按 FIFO 顺序唤醒等待者。槽位随许可的释放而归还，
/// 任何退出路径（成功、出错、取消、panic展开）都会释放。
#[derive(Clone, Debug)]
pub struct AdmissionController {
    global: Arc<Semaphore>,
    capacity: usize,
    /// 存储每个主机的信号量
    hosts: Arc<DashMap<String, Arc<Semaphore>>>,
}

/// 全局槽位
#[derive(Debug)]
pub struct GlobalSlot {
    _permit: OwnedSemaphorePermit,
}

/// 主机槽位
#[derive(Debug)]
pub struct HostSlot {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionController {
    /// 创建新的准入控制器
    ///
    /// # 参数
    ///
    /// * `global_capacity` - 全局并发槽位数，至少为1
    pub fn new(global_capacity: usize) -> Self {
        let capacity = global_capacity.max(1);
        Self {
            global: Arc::new(Semaphore::new(capacity)),
            capacity,
            hosts: Arc::new(DashMap::new()),
        }
    }

    /// 获取一个全局槽位
    ///
    /// 在槽位可用或运行被取消之前挂起。
    pub async fn acquire_global(
        &self,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> Result<GlobalSlot, SchedulerError> {
        let permit = acquire(self.global.clone(), run_id, cancel).await?;
        Ok(GlobalSlot { _permit: permit })
    }

    /// 获取指定主机的槽位
    ///
    /// 主机的信号量在第一次使用时创建，并发的首次访问共享同一个信号量。
    pub async fn acquire_host(
        &self,
        host: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> Result<HostSlot, SchedulerError> {
        let permit = acquire(self.get_or_create(host), run_id, cancel).await?;
        Ok(HostSlot { _permit: permit })
    }

    /// 全局容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前占用的全局槽位数
    pub fn in_flight(&self) -> usize {
        self.capacity - self.global.available_permits()
    }

    /// 主机当前是否有在途请求
    pub fn host_busy(&self, host: &str) -> bool {
        self.hosts
            .get(host)
            .map(|sem| sem.available_permits() < HOST_CAPACITY)
            .unwrap_or(false)
    }

    fn get_or_create(&self, host: &str) -> Arc<Semaphore> {
        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(HOST_CAPACITY)))
            .clone()
    }
}

async fn acquire(
    semaphore: Arc<Semaphore>,
    run_id: &str,
    cancel: &CancellationToken,
) -> Result<OwnedSemaphorePermit, SchedulerError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SchedulerError::Cancelled(run_id.to_string())),
        permit = semaphore.acquire_owned() => permit.map_err(|_| SchedulerError::PoolClosed),
    }
}
