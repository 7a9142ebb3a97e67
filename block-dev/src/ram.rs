use std::io;
use std::sync::Arc;

use spin::Mutex;

use crate::{check_request, BlockDevice};

/// 内存中的块设备。
///
/// 克隆得到的句柄共享同一块内存，可以用来模拟"重新打开"磁盘。
#[derive(Debug, Clone)]
pub struct RamDisk {
    data: Arc<Mutex<Vec<u8>>>,
    block_size: usize,
    num_blocks: usize,
}

impl RamDisk {
    pub fn new(block_size: usize, num_blocks: usize) -> Self {
        Self {
            data: Arc::new(Mutex::new(vec![0; block_size * num_blocks])),
            block_size,
            num_blocks,
        }
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> io::Result<()> {
        check_request(self, block_id, buf.len())?;
        let data = self.data.lock();
        let start = block_id * self.block_size;
        buf.copy_from_slice(&data[start..start + self.block_size]);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> io::Result<()> {
        check_request(self, block_id, buf.len())?;
        let mut data = self.data.lock();
        let start = block_id * self.block_size;
        data[start..start + self.block_size].copy_from_slice(buf);
        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> usize {
        self.num_blocks
    }
}
