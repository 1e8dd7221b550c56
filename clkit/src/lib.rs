// #![deny(warnings)]

mod args;
mod call;
mod codegen;
mod common;
mod context;
mod group;
mod handle;
mod policy;

pub use args::{Arg, ArgumentBinder, Scalar};
pub use call::KernelCall;
pub use codegen::{ClType, CodeGen, SourceModule};
pub use common::*;
pub use context::{DeviceContext, QueueId};
pub use group::DeviceGroup;
pub use policy::allocation_flags;

#[cfg(use_cl)]
pub use handle::opencl;
#[cfg(use_cl)]
pub extern crate opencl3;

use std::ffi::c_void;

/// 算力硬件抽象。
///
/// 约定程序如何编译、核函数如何发射、存储如何分配。
/// 这个特质应该由管理单个设备的映射类型实现，通常是**设备加上它所在的驱动上下文**。
pub trait Hardware {
    /// 编译完成的程序。
    type Program;
    /// 程序中的一个核函数入口。
    type Kernel;
    /// 硬件的任务队列类型。
    type Queue;
    /// 硬件上的存储对象。
    type Buffer;
    /// 命令完成事件。
    type Event;

    /// 查询设备的字符串信息。
    fn info(&self, query: DeviceInfo) -> Result<String, Error>;

    /// 查询设备分类。
    fn class(&self) -> Result<DeviceClass, Error>;

    fn create_queue(&self, props: QueueProperties) -> Result<Self::Queue, Error>;

    /// 编译源码，成功时同时返回编译日志。
    fn build_program(
        &self,
        source: &str,
        options: &str,
    ) -> Result<(Self::Program, String), BuildError>;

    fn create_kernel(&self, program: &Self::Program, name: &str) -> Result<Self::Kernel, Error>;

    /// 创建存储对象。
    ///
    /// # Safety
    ///
    /// `host` 非空时必须指向至少 `size` 字节的数据；
    /// 带有 [`MemFlags::USE_HOST_PTR`] 时这块数据将作为存储对象的后备存储，必须比存储对象活得更久。
    unsafe fn create_buffer(
        &self,
        flags: MemFlags,
        size: usize,
        host: *mut c_void,
    ) -> Result<Self::Buffer, Error>;

    /// 设置核函数第 `index` 个参数。
    ///
    /// # Safety
    ///
    /// `value` 为空或指向至少 `size` 字节的可读数据。
    unsafe fn set_arg(
        kernel: &Self::Kernel,
        index: u32,
        size: usize,
        value: *const c_void,
    ) -> Result<(), Error>;

    fn set_buffer_arg(kernel: &Self::Kernel, index: u32, buffer: &Self::Buffer)
        -> Result<(), Error>;

    /// 发射核函数到任务队列，不等待执行完成。
    fn enqueue_kernel(
        queue: &Self::Queue,
        kernel: &Self::Kernel,
        launch: &Launch,
        wait: &[Self::Event],
    ) -> Result<Self::Event, Error>;

    /// 从主机向存储对象拷贝。
    ///
    /// # Safety
    ///
    /// 非阻塞时 `data` 必须在传输完成前保持有效。
    unsafe fn enqueue_write(
        queue: &Self::Queue,
        buffer: &mut Self::Buffer,
        blocking: bool,
        offset: usize,
        data: &[u8],
        wait: &[Self::Event],
    ) -> Result<Self::Event, Error>;

    /// 从存储对象向主机拷贝。
    ///
    /// # Safety
    ///
    /// 非阻塞时 `data` 必须在传输完成前保持有效且不被访问。
    unsafe fn enqueue_read(
        queue: &Self::Queue,
        buffer: &Self::Buffer,
        blocking: bool,
        offset: usize,
        data: &mut [u8],
        wait: &[Self::Event],
    ) -> Result<Self::Event, Error>;

    /// 阻塞直到队列中所有命令完成。
    fn finish(queue: &Self::Queue) -> Result<(), Error>;
}
