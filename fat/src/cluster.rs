use derive_more::{Display, From, Into};

/// 簇编号，同时也是FAT条目的原始值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[repr(transparent)]
pub struct ClusterId(u32);

#[derive(Debug, PartialEq, Eq)]
pub enum ClusterError {
    Free,
    Reserved,
    Eof,
}

impl From<ClusterId> for usize {
    fn from(id: ClusterId) -> Self {
        id.0 as usize
    }
}

impl ClusterId {
    /// 未分配
    pub const FREE: Self = Self(0);

    /// 控制区与FAT区所占的簇
    pub const RESERVED: Self = Self(0x0FFF_FFF8);

    /// 链表的最后一个簇
    pub const EOF: Self = Self(u32::MAX);

    /// 大于等于此值的编号都是哨兵，不能指向真实的簇
    pub const SENTINEL_MIN: Self = Self(0x0FFF_FFF0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// 磁盘上的第`index`个簇
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn validate(self) -> Result<Self, ClusterError> {
        match self {
            ClusterId::FREE => Err(ClusterError::Free),
            ClusterId::EOF => Err(ClusterError::Eof),
            id if id >= Self::SENTINEL_MIN => Err(ClusterError::Reserved),
            id => Ok(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels() {
        assert_eq!(Err(ClusterError::Free), ClusterId::FREE.validate());
        assert_eq!(Err(ClusterError::Eof), ClusterId::EOF.validate());
        assert_eq!(Err(ClusterError::Reserved), ClusterId::RESERVED.validate());
        assert_eq!(Ok(ClusterId::new(7)), ClusterId::new(7).validate());
        assert_eq!(7, usize::from(ClusterId::from_index(7)));
    }
}
