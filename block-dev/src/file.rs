use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use send_wrapper::SendWrapper;

use crate::{check_request, BlockDevice};

/// 以宿主文件为介质的块设备，即"虚拟磁盘"。
///
/// 只能在创建它的线程上使用。
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
    block_size: usize,
    num_blocks: usize,
}

impl BlockFile {
    pub fn new(fd: File, block_size: usize, num_blocks: usize) -> Self {
        Self {
            inner: SendWrapper::new(RefCell::new(fd)),
            block_size,
            num_blocks,
        }
    }

    /// 创建新的虚拟磁盘，大小为`block_size * num_blocks`，内容全零。
    ///
    /// 文件已存在时报错，不会覆盖。
    pub fn create(path: impl AsRef<Path>, block_size: usize, num_blocks: usize) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        fd.set_len((block_size * num_blocks) as u64)?;

        Ok(Self::new(fd, block_size, num_blocks))
    }

    /// 打开已有的虚拟磁盘，并校验其大小与配置一致。
    pub fn open(path: impl AsRef<Path>, block_size: usize, num_blocks: usize) -> io::Result<Self> {
        let fd = OpenOptions::new().read(true).write(true).open(path)?;

        let len = fd.metadata()?.len();
        let expected = (block_size * num_blocks) as u64;
        if len != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("disk image is {len} bytes, configured for {expected}"),
            ));
        }

        Ok(Self::new(fd, block_size, num_blocks))
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> io::Result<()> {
        check_request(self, block_id, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * self.block_size) as u64))?;
        file.read_exact(buf)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> io::Result<()> {
        check_request(self, block_id, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * self.block_size) as u64))?;
        file.write_all(buf)
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn flush(&self) -> io::Result<()> {
        let mut file = self.inner.borrow_mut();
        file.flush()?;
        file.sync_data()
    }
}
