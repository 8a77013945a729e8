use async_trait::async_trait;

use super::{Device, DeviceKind};
use crate::error::TermError;

/// `/dev/null`: reads are empty, writes vanish.
#[derive(Debug, Default)]
pub struct NullDevice;

#[async_trait]
impl Device for NullDevice {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Null
    }

    async fn read(&self, _buffer: &mut Vec<String>, _max: usize, _offset: usize) -> Result<usize, TermError> {
        Ok(0)
    }

    async fn write(&self, buffer: &mut Vec<String>, _offset: usize) -> Result<usize, TermError> {
        Ok(buffer.drain(..).count())
    }
}
