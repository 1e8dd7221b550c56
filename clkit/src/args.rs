use crate::{Error, Hardware};
use std::{
    ffi::c_void,
    mem::{size_of, size_of_val},
    ptr::null,
    slice::{from_raw_parts, from_raw_parts_mut},
};

/// 可以按值传给核函数、也可以在主机与设备之间按字节拷贝的类型。
///
/// # Safety
///
/// 实现者必须没有填充字节，且任意位模式都是合法值。
pub unsafe trait Scalar: Copy + 'static {}

macro_rules! scalar {
    ($($ty:ty)*) => { $(unsafe impl Scalar for $ty {})* };
}

scalar!(i8 u8 i16 u16 i32 u32 i64 u64 isize usize f32 f64 half::f16);

// 向量类型
unsafe impl<T: Scalar, const N: usize> Scalar for [T; N] {}

#[inline]
pub(crate) fn bytes_of<T: Scalar>(data: &[T]) -> &[u8] {
    unsafe { from_raw_parts(data.as_ptr().cast(), size_of_val(data)) }
}

#[inline]
pub(crate) fn bytes_of_mut<T: Scalar>(data: &mut [T]) -> &mut [u8] {
    unsafe { from_raw_parts_mut(data.as_mut_ptr().cast(), size_of_val(data)) }
}

/// 一个核函数参数。
pub enum Arg<'a, B> {
    /// 按值传递的参数。
    Value(&'a [u8]),
    /// 存储对象。
    Buffer(&'a B),
    /// 指定字节数的局部存储，没有初始内容。
    Local(usize),
    /// 任意大小的主机数据块。
    Raw(&'a [u8]),
}

impl<'a, B> Arg<'a, B> {
    #[inline]
    pub fn value<T: Scalar>(value: &'a T) -> Self {
        Self::Value(bytes_of(std::slice::from_ref(value)))
    }

    #[inline]
    pub fn buffer(buffer: &'a B) -> Self {
        Self::Buffer(buffer)
    }

    /// `n` 个 `T` 的局部存储。
    #[inline]
    pub fn local<T>(n: usize) -> Self {
        let Some(size) = n.checked_mul(size_of::<T>()) else {
            panic!("local memory of {n} elements overflows usize")
        };
        Self::Local(size)
    }

    #[inline]
    pub fn raw<T: Scalar>(data: &'a [T]) -> Self {
        Self::Raw(bytes_of(data))
    }
}

/// 按位置自动计数的参数设置器。
pub struct ArgumentBinder<'k, H: Hardware> {
    kernel: &'k H::Kernel,
    next: u32,
}

impl<'k, H: Hardware> ArgumentBinder<'k, H> {
    #[inline]
    pub fn new(kernel: &'k H::Kernel) -> Self {
        Self { kernel, next: 0 }
    }

    #[inline]
    pub fn kernel(&self) -> &'k H::Kernel {
        self.kernel
    }

    /// 已经设置的参数个数。
    #[inline]
    pub fn pushed(&self) -> u32 {
        self.next
    }

    #[inline]
    pub fn reset(&mut self) {
        self.next = 0
    }

    #[inline]
    pub fn push<T: Scalar>(&mut self, value: &T) -> Result<(), Error> {
        unsafe { self.push_raw((value as *const T).cast(), size_of::<T>()) }
    }

    /// 在当前位置设置 `size` 字节的参数。无论驱动是否接受，位置都会前进。
    ///
    /// # Safety
    ///
    /// `data` 为空或指向至少 `size` 字节的可读数据。
    pub unsafe fn push_raw(&mut self, data: *const c_void, size: usize) -> Result<(), Error> {
        let index = self.next;
        self.next += 1;
        H::set_arg(self.kernel, index, size, data)
    }

    pub fn push_buffer(&mut self, buffer: &H::Buffer) -> Result<(), Error> {
        let index = self.next;
        self.next += 1;
        H::set_buffer_arg(self.kernel, index, buffer)
    }

    #[inline]
    pub fn push_local(&mut self, size: usize) -> Result<(), Error> {
        unsafe { self.push_raw(null(), size) }
    }

    pub fn push_arg(&mut self, arg: &Arg<H::Buffer>) -> Result<(), Error> {
        match *arg {
            Arg::Value(bytes) | Arg::Raw(bytes) => unsafe {
                self.push_raw(bytes.as_ptr().cast(), bytes.len())
            },
            Arg::Buffer(buffer) => self.push_buffer(buffer),
            Arg::Local(size) => self.push_local(size),
        }
    }
}
