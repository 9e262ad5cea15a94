use crate::core::snapshot::GraphSnapshot;
use crate::utils::error::Result;
use chrono::NaiveDateTime;

/// 整份讀寫：寫入完成前讀者看不到半成品
pub trait Storage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

pub trait SnapshotCodec {
    fn encode(&self, snapshot: &GraphSnapshot) -> Result<Vec<u8>>;
    fn decode(&self, data: &[u8]) -> Result<GraphSnapshot>;
}

pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
