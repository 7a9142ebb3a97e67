//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备；[`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 文件系统只通过块设备驱动读写数据，不关心数据究竟落在宿主文件还是内存里。

mod file;
mod ram;

use core::any::Any;
use core::fmt::Debug;
use std::io;

pub use self::{file::BlockFile, ram::RamDisk};

/// 块设备驱动特质
///
/// 块的大小在设备创建时确定，`buf`的长度必须恰好为[`BlockDevice::block_size`]。
pub trait BlockDevice: Send + Sync + Any + Debug {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> io::Result<()>;

    fn write_block(&self, block_id: usize, buf: &[u8]) -> io::Result<()>;

    /// 每块的字节数
    fn block_size(&self) -> usize;

    /// 设备的总块数
    fn num_blocks(&self) -> usize;

    /// 把设备自身的缓冲刷入底层介质
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

fn check_request(dev: &dyn BlockDevice, block_id: usize, len: usize) -> io::Result<()> {
    if block_id >= dev.num_blocks() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("block {block_id} beyond device end {}", dev.num_blocks()),
        ));
    }
    if len != dev.block_size() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("buffer of {len} bytes, expected {}", dev.block_size()),
        ));
    }
    Ok(())
}
