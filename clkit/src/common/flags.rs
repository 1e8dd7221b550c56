use std::ops::{BitOr, BitOrAssign};

/// 存储对象的创建标志，取值与 `cl_mem_flags` 一致。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
#[repr(transparent)]
pub struct MemFlags(u64);

impl MemFlags {
    pub const READ_WRITE: Self = Self(1 << 0);
    pub const WRITE_ONLY: Self = Self(1 << 1);
    pub const READ_ONLY: Self = Self(1 << 2);
    pub const USE_HOST_PTR: Self = Self(1 << 3);
    pub const ALLOC_HOST_PTR: Self = Self(1 << 4);
    pub const COPY_HOST_PTR: Self = Self(1 << 5);

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for MemFlags {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MemFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}

/// 设备分类，决定存储分配策略。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DeviceClass {
    Cpu,
    Gpu,
    Other,
}

impl DeviceClass {
    #[inline]
    pub const fn is_cpu(self) -> bool {
        matches!(self, Self::Cpu)
    }
}

/// 命令队列属性。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct QueueProperties {
    pub out_of_order: bool,
    pub profiling: bool,
}

impl QueueProperties {
    pub const OUT_OF_ORDER: Self = Self {
        out_of_order: true,
        profiling: false,
    };
}

/// 可查询的设备字符串信息。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DeviceInfo {
    Name,
    Vendor,
    Version,
    DriverVersion,
    Extensions,
}
