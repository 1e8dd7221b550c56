use crate::{DeviceContext, Error, Hardware, SourceModule};
use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};

/// 一组设备上下文，其中一个是当前活动的设备。
///
/// 注册操作广播到所有设备，各设备并行编译。
pub struct DeviceGroup<H: Hardware> {
    contexts: Vec<DeviceContext<H>>,
    active: usize,
}

impl<H: Hardware> DeviceGroup<H> {
    pub fn new(contexts: impl IntoIterator<Item = DeviceContext<H>>) -> Self {
        Self {
            contexts: contexts.into_iter().collect(),
            active: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    #[inline]
    pub fn active(&self) -> usize {
        self.active
    }

    #[inline]
    pub fn set_active(&mut self, index: usize) {
        assert!(
            index < self.contexts.len(),
            "device {index} out of range, {} devices available",
            self.contexts.len()
        );
        self.active = index
    }

    /// 当前活动的设备。
    ///
    /// # Panics
    ///
    /// 设备组为空时。
    #[inline]
    pub fn device(&self) -> &DeviceContext<H> {
        &self.contexts[self.active]
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut DeviceContext<H> {
        &mut self.contexts[self.active]
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&DeviceContext<H>> {
        self.contexts.get(index)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &DeviceContext<H>> {
        self.contexts.iter()
    }
}

impl<H: Hardware> DeviceGroup<H>
where
    DeviceContext<H>: Send,
{
    /// 在所有设备上注册，遇到第一个错误时返回。
    pub fn register_all<S: AsRef<str> + Sync>(
        &mut self,
        source: &str,
        kernel_names: &[S],
        program_id: &str,
        scope: &str,
    ) -> Result<(), Error> {
        self.contexts
            .par_iter_mut()
            .try_for_each(|ctx| ctx.register(source, kernel_names, program_id, scope))
    }

    pub fn register_source_code_all<S: AsRef<str> + Sync>(
        &mut self,
        source: &str,
        kernel_names: &[S],
    ) -> Result<(), Error> {
        self.contexts
            .par_iter_mut()
            .try_for_each(|ctx| ctx.register_source_code(source, kernel_names))
    }

    pub fn register_module_all(&mut self, module: &SourceModule) -> Result<(), Error> {
        self.contexts
            .par_iter_mut()
            .try_for_each(|ctx| ctx.register_module(module))
    }
}
