//! 文件内容：把目录项的字节内容映射到簇链表上。

use crate::dir_entry::DirEntry;
use crate::volume::Volume;
use crate::{Error, Result};

/// 目录项以`u32`记录文件大小
pub const MAX_FILE_SIZE: usize = u32::MAX as usize;

/// 存放`len`字节的文件内容需要的簇数；写过的文件至少占一个簇
pub fn clusters_for(len: usize, vol: &Volume) -> usize {
    vol.clusters_for(len).max(1)
}

/// 读出文件的全部内容
pub fn read(entry: &DirEntry, vol: &Volume) -> Result<Vec<u8>> {
    if !entry.is_file() {
        return Err(Error::NotAFile(entry.name().to_owned()));
    }

    match entry.first_cluster() {
        Some(head) => vol.read_chain(head, entry.size()),
        None => Ok(Vec::new()),
    }
}

/// 用`data`替换文件内容。
///
/// 先确认空间足够再释放旧链表，失败时目录项和旧内容保持不变。
pub fn write(entry: &mut DirEntry, data: &[u8], vol: &mut Volume) -> Result<()> {
    if !entry.is_file() {
        return Err(Error::NotAFile(entry.name().to_owned()));
    }

    check_len(data.len())?;
    let needed = clusters_for(data.len(), vol);
    let reclaimed = match entry.first_cluster() {
        Some(head) => vol.fat().chain(head)?.len(),
        None => 0,
    };
    if vol.fat().free_clusters() + reclaimed < needed {
        return Err(Error::NoSpace);
    }

    if let Some(head) = entry.first_cluster() {
        vol.release_chain(head)?;
        entry.set_content(None, 0);
    }
    let head = vol.alloc_chain(needed)?;
    vol.write_chain(head, data)?;
    entry.set_content(Some(head), data.len());
    log::debug!(
        "wrote {} bytes to {:?} starting at {head}",
        data.len(),
        entry.name()
    );

    Ok(())
}

/// 释放文件的簇链表，文件变回未分配的空文件
pub fn delete(entry: &mut DirEntry, vol: &mut Volume) -> Result<()> {
    if !entry.is_file() {
        return Err(Error::NotAFile(entry.name().to_owned()));
    }

    if let Some(head) = entry.first_cluster() {
        let released = vol.release_chain(head)?;
        log::debug!("released {released} cluster(s) of {:?}", entry.name());
    }
    entry.set_content(None, 0);

    Ok(())
}

/// 超出目录项能记录的大小时报[`Error::NoSpace`]
fn check_len(len: usize) -> Result<()> {
    if len > MAX_FILE_SIZE {
        return Err(Error::NoSpace);
    }
    Ok(())
}
