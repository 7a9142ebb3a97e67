//! 在单个宿主文件（虚拟磁盘）里模拟的FAT式文件系统。
//!
//! 整体架构，自上而下：
//!
//! - [`FatFileSystem`]：一次打开的会话，提供目录与文件操作、路径解析、空间统计；
//! - 目录层：[`Directory`]节点与目录树，目录项列表序列化在目录自身的簇链表里；
//! - 文件内容层（[`file`]）：把目录项的字节内容映射到簇链表；
//! - 分配表（[`volume::fat`]）：唯一能分配、释放簇的组件；
//! - 块存储层：以簇为单位读写虚拟磁盘，带写回缓存。

mod cluster;
mod config;
mod control;
mod dir_entry;
mod directory;
mod disk;
mod error;
pub mod file;
pub mod name;
mod path;
pub mod volume;

pub use self::{
    cluster::{ClusterError, ClusterId},
    config::{FsConfig, DEFAULT_CLUSTER_COUNT, DEFAULT_CLUSTER_SIZE},
    control::FatFileSystem,
    dir_entry::{DirEntry, EntryKind},
    directory::{DirId, DirTree, Directory, ROOT_NAME, SEPARATOR},
    disk::{Cluster, Disk},
    error::{Error, Result},
    volume::{Space, Volume},
};
