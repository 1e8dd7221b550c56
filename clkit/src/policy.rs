use crate::{DeviceClass, MemFlags};

/// 根据设备分类和是否带有初始数据补全存储对象的创建标志。
///
/// CPU 类设备尽量零拷贝：有初始数据时直接使用主机存储，否则由驱动分配主机可访问的存储。
/// 其他设备有初始数据时由驱动立即拷贝。
/// 调用者给出的读写权限标志原样保留。
pub fn allocation_flags(class: DeviceClass, access: MemFlags, has_initial_data: bool) -> MemFlags {
    let mut flags = access;
    if class.is_cpu() {
        flags |= if has_initial_data {
            MemFlags::USE_HOST_PTR
        } else {
            MemFlags::ALLOC_HOST_PTR
        }
    } else if has_initial_data {
        flags |= MemFlags::COPY_HOST_PTR
    }
    flags
}
