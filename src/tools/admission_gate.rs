//! 併發許可閘
//!
//! 以有界號誌搭配資源回呼控管同時存在的外部解碼程序數量。
//! 資源不足時在條件變數上等待，而不是輪詢式的忙等待。

use log::debug;
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::Duration;
use sysinfo::System;

type ResourceCheck = Box<dyn Fn() -> bool + Send + Sync>;

/// 資源檢查不通過時的重新評估間隔
const RESOURCE_RECHECK: Duration = Duration::from_millis(200);

pub struct AdmissionGate {
    limit: usize,
    in_flight: Mutex<usize>,
    released: Condvar,
    resource_ok: Option<ResourceCheck>,
}

impl AdmissionGate {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            in_flight: Mutex::new(0),
            released: Condvar::new(),
            resource_ok: None,
        }
    }

    /// 附帶資源回呼的許可閘
    ///
    /// 已有許可在外時，新的許可還須通過資源檢查；
    /// 完全沒有許可在外時永遠放行，避免整體停滯。
    #[must_use]
    pub fn with_resource_check(
        limit: usize,
        check: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            resource_ok: Some(Box::new(check)),
            ..Self::new(limit)
        }
    }

    /// 取得一個許可；許可在釋放（drop）前佔用一個名額
    pub fn acquire(&self) -> AdmissionPermit<'_> {
        let mut in_flight = self.in_flight.lock().unwrap();
        loop {
            if *in_flight < self.limit && self.resource_allows(*in_flight) {
                *in_flight += 1;
                return AdmissionPermit { gate: self };
            }

            in_flight = if self.resource_ok.is_some() {
                // 資源狀態會自行改變，定期重新評估
                self.released
                    .wait_timeout(in_flight, RESOURCE_RECHECK)
                    .unwrap()
                    .0
            } else {
                self.released.wait(in_flight).unwrap()
            };
        }
    }

    fn resource_allows(&self, in_flight: usize) -> bool {
        if in_flight == 0 {
            return true;
        }
        match &self.resource_ok {
            Some(check) => check(),
            None => true,
        }
    }

    fn release(&self) {
        let mut in_flight = self.in_flight.lock().unwrap();
        *in_flight = in_flight.saturating_sub(1);
        drop(in_flight);
        self.released.notify_one();
    }
}

/// RAII 許可，drop 時歸還名額
pub struct AdmissionPermit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

/// CPU 使用率回呼
///
/// 全域 CPU 使用率低於門檻時放行新的解碼程序。
/// sysinfo 需要兩次間隔取樣才有有效讀數；暖機延後到第一次
/// 呼叫才進行，建構本身不阻塞。
#[must_use]
pub fn cpu_resource_check(usage_threshold: f32) -> impl Fn() -> bool + Send + Sync + 'static {
    let system: Mutex<Option<System>> = Mutex::new(None);
    move || {
        let mut guard = system.lock().unwrap();
        let system = guard.get_or_insert_with(|| {
            let mut system = System::new_all();
            system.refresh_cpu_all();
            thread::sleep(Duration::from_millis(200));
            system
        });
        system.refresh_cpu_all();
        let usage = system.global_cpu_usage();
        let allowed = usage < usage_threshold;
        if !allowed {
            debug!("CPU 使用率 {usage:.1}% 超過門檻 {usage_threshold:.1}%，暫緩新程序");
        }
        allowed
    }
}
