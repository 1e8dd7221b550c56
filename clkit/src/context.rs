use crate::{
    allocation_flags,
    args::{bytes_of, bytes_of_mut},
    build_failed, io_error, kernel_not_found, resolve_global_size, BuildError, ContextConfig,
    DeviceClass, DeviceInfo, Error, Hardware, KernelCall, Launch, MemFlags, NdRange,
    QueueProperties, Scalar, SourceModule,
};
use log::{debug, trace, warn};
use std::{
    collections::{hash_map::Entry, HashMap},
    fs,
    mem::size_of,
    ops::Range,
    path::Path,
    ptr::null_mut,
};

/// 命令队列在设备上下文中的序号。
pub type QueueId = usize;

/// 单个设备的上下文。
///
/// 独占设备的命令队列、编译好的程序和核函数。
/// 程序按程序名缓存，每个程序名在一个上下文中至多编译一次；
/// 核函数按 `作用域::名字` 缓存，重复注册没有任何效果。
pub struct DeviceContext<H: Hardware> {
    device: H,
    name: String,
    class: DeviceClass,
    build_options: String,
    queue_properties: QueueProperties,
    queues: Vec<H::Queue>,
    programs: HashMap<String, H::Program>,
    kernels: HashMap<String, H::Kernel>,
}

#[inline]
fn scoped_name(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.into()
    } else {
        format!("{scope}::{name}")
    }
}

impl<H: Hardware> DeviceContext<H> {
    pub fn new(device: H, config: ContextConfig) -> Result<Self, Error> {
        let ContextConfig {
            queues,
            queue_properties,
            build_options,
        } = config;

        let class = device.class()?;
        // 有些驱动返回的字符串带有 '\0'
        let name = device.info(DeviceInfo::Name)?.replace('\0', "");

        let mut ans = Self {
            device,
            name,
            class,
            build_options,
            queue_properties,
            queues: Vec::with_capacity(queues.max(1)),
            programs: HashMap::new(),
            kernels: HashMap::new(),
        };
        ans.require_queues(queues.max(1))?;
        Ok(ans)
    }

    #[inline]
    pub fn device(&self) -> &H {
        &self.device
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn class(&self) -> DeviceClass {
        self.class
    }

    #[inline]
    pub fn is_cpu_device(&self) -> bool {
        self.class == DeviceClass::Cpu
    }

    #[inline]
    pub fn is_gpu_device(&self) -> bool {
        self.class == DeviceClass::Gpu
    }

    fn info(&self, query: DeviceInfo) -> Result<String, Error> {
        Ok(self.device.info(query)?.replace('\0', ""))
    }

    pub fn vendor(&self) -> Result<String, Error> {
        self.info(DeviceInfo::Vendor)
    }

    pub fn cl_version(&self) -> Result<String, Error> {
        self.info(DeviceInfo::Version)
    }

    pub fn driver_version(&self) -> Result<String, Error> {
        self.info(DeviceInfo::DriverVersion)
    }

    pub fn extensions(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .info(DeviceInfo::Extensions)?
            .split_whitespace()
            .map(String::from)
            .collect())
    }

    pub fn is_extension_supported(&self, extension: &str) -> Result<bool, Error> {
        Ok(self
            .info(DeviceInfo::Extensions)?
            .split_whitespace()
            .any(|ext| ext == extension))
    }
}

/// 程序与核函数缓存。
impl<H: Hardware> DeviceContext<H> {
    /// 编译 `source` 并为其中的 `kernel_names` 创建核函数。
    ///
    /// 核函数注册在 `scope::name` 下，`scope` 为空时直接用 `name`。
    /// 所有核函数都已注册时不做任何事；否则，`program_id` 对应的程序仅在首次使用时编译。
    pub fn register<S: AsRef<str>>(
        &mut self,
        source: &str,
        kernel_names: &[S],
        program_id: &str,
        scope: &str,
    ) -> Result<(), Error> {
        let new_kernels = kernel_names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.kernels.contains_key(&scoped_name(scope, name)))
            .collect::<Vec<_>>();
        if new_kernels.is_empty() {
            trace!("all kernels of program `{program_id}` are registered");
            return Ok(());
        }

        let program = match self.programs.entry(program_id.into()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!("{}: compiling program `{program_id}`", self.name);
                let program = match self.device.build_program(source, &self.build_options) {
                    Ok((program, log)) => {
                        if !log.trim().is_empty() {
                            warn!("{}: {log}", self.name);
                        }
                        program
                    }
                    Err(BuildError::BuildFailed(log)) => return Err(build_failed(&self.name, &log)),
                    Err(BuildError::Others(e)) => return Err(e),
                };
                entry.insert(program)
            }
        };

        for name in new_kernels {
            let scoped = scoped_name(scope, name);
            if self.kernels.contains_key(&scoped) {
                continue;
            }
            debug!("{}: loading kernel `{scoped}`", self.name);
            let kernel = self.device.create_kernel(program, name)?;
            self.kernels.insert(scoped, kernel);
        }
        Ok(())
    }

    /// 以核函数名的拼接作为程序名注册，不带作用域。
    pub fn register_source_code<S: AsRef<str>>(
        &mut self,
        source: &str,
        kernel_names: &[S],
    ) -> Result<(), Error> {
        let program_id = kernel_names
            .iter()
            .map(AsRef::as_ref)
            .collect::<String>();
        self.register(source, kernel_names, &program_id, "")
    }

    /// 读取源码文件并以文件路径作为程序名注册。
    pub fn register_source_file<S: AsRef<str>>(
        &mut self,
        path: impl AsRef<Path>,
        kernel_names: &[S],
        scope: &str,
    ) -> Result<(), Error> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            io_error(format!(
                "Could not open CL source file {}: {e}",
                path.display()
            ))
        })?;
        self.register(&source, kernel_names, &path.display().to_string(), scope)
    }

    /// 注册源码模块，模块名同时作为程序名和作用域。
    #[inline]
    pub fn register_module(&mut self, module: &SourceModule) -> Result<(), Error> {
        self.register(
            module.source(),
            module.kernels(),
            module.id(),
            module.id(),
        )
    }

    pub fn get_kernel(&self, name: &str) -> Result<&H::Kernel, Error> {
        self.kernels.get(name).ok_or_else(|| {
            kernel_not_found(format!("Requested kernel `{name}` could not be found!"))
        })
    }

    #[inline]
    pub fn contains_kernel(&self, name: &str) -> bool {
        self.kernels.contains_key(name)
    }

    #[inline]
    pub fn num_programs(&self) -> usize {
        self.programs.len()
    }

    #[inline]
    pub fn num_kernels(&self) -> usize {
        self.kernels.len()
    }

    /// 以函数调用的形式发射已注册的核函数。
    pub fn call(
        &self,
        name: &str,
        minimum: impl Into<NdRange>,
        local: impl Into<NdRange>,
    ) -> Result<KernelCall<H>, Error> {
        Ok(KernelCall::new(self, self.get_kernel(name)?, minimum, local))
    }

    /// 按需注册模块后以函数调用的形式发射其中的核函数。
    pub fn module_call(
        &mut self,
        module: &SourceModule,
        kernel: &str,
        minimum: impl Into<NdRange>,
        local: impl Into<NdRange>,
    ) -> Result<KernelCall<H>, Error> {
        self.register(module.source(), &[kernel], module.id(), module.id())?;
        let this = &*self;
        this.call(&module.scoped(kernel), minimum, local)
    }
}

/// 命令队列。
impl<H: Hardware> DeviceContext<H> {
    /// # Panics
    ///
    /// `id` 不小于 [`num_queues`](Self::num_queues) 时。
    #[inline]
    pub fn queue(&self, id: QueueId) -> &H::Queue {
        assert!(
            id < self.queues.len(),
            "queue {id} out of range, {} queues available",
            self.queues.len()
        );
        &self.queues[id]
    }

    #[inline]
    pub fn num_queues(&self) -> usize {
        self.queues.len()
    }

    pub fn add_queue(&mut self, props: QueueProperties) -> Result<QueueId, Error> {
        let queue = self.device.create_queue(props)?;
        self.queues.push(queue);
        Ok(self.queues.len() - 1)
    }

    #[inline]
    pub fn add_out_of_order_queue(&mut self) -> Result<QueueId, Error> {
        self.add_queue(QueueProperties::OUT_OF_ORDER)
    }

    /// 补足至少 `n` 个命令队列，新队列使用配置中的默认属性。
    pub fn require_queues(&mut self, n: usize) -> Result<(), Error> {
        while self.queues.len() < n {
            self.add_queue(self.queue_properties)?;
        }
        Ok(())
    }

    #[inline]
    pub fn finish(&self, queue: QueueId) -> Result<(), Error> {
        H::finish(self.queue(queue))
    }

    /// 发射核函数。实际的全局规模是不小于 `minimum` 的 `local` 的整数倍。
    pub fn enqueue_ndrange(
        &self,
        kernel: &H::Kernel,
        minimum: &NdRange,
        local: &NdRange,
        offset: Option<NdRange>,
        wait: &[H::Event],
        queue: QueueId,
    ) -> Result<H::Event, Error> {
        if let Some(offset) = &offset {
            assert_eq!(offset.ndim(), local.ndim());
        }
        let queue = self.queue(queue);
        let launch = Launch {
            offset,
            global: resolve_global_size(minimum, local),
            local: *local,
        };
        H::enqueue_kernel(queue, kernel, &launch, wait)
    }
}

/// 存储对象与数据传输。
impl<H: Hardware> DeviceContext<H> {
    /// 创建容纳 `len` 个 `T` 的存储对象。
    pub fn create_buffer<T>(&self, access: MemFlags, len: usize) -> Result<H::Buffer, Error> {
        let Some(size) = len.checked_mul(size_of::<T>()) else {
            panic!("buffer of {len} elements overflows usize")
        };
        let flags = allocation_flags(self.class, access, false);
        unsafe { self.device.create_buffer(flags, size, null_mut()) }
    }

    /// 创建以 `data` 为初始内容的存储对象。
    ///
    /// # Safety
    ///
    /// CPU 类设备上 `data` 直接成为存储对象的后备存储，
    /// 必须在存储对象的整个生命周期内保持有效，且不能在主机上修改。
    pub unsafe fn create_buffer_from<T: Scalar>(
        &self,
        access: MemFlags,
        data: &[T],
    ) -> Result<H::Buffer, Error> {
        let flags = allocation_flags(self.class, access, true);
        let bytes = bytes_of(data);
        self.device
            .create_buffer(flags, bytes.len(), bytes.as_ptr().cast_mut().cast())
    }

    /// 设备只读的存储对象。
    #[inline]
    pub fn create_input_buffer<T>(&self, len: usize) -> Result<H::Buffer, Error> {
        self.create_buffer::<T>(MemFlags::READ_ONLY, len)
    }

    /// 设备只写的存储对象。
    #[inline]
    pub fn create_output_buffer<T>(&self, len: usize) -> Result<H::Buffer, Error> {
        self.create_buffer::<T>(MemFlags::WRITE_ONLY, len)
    }

    pub fn memcpy_h2d<T: Scalar>(
        &self,
        buffer: &mut H::Buffer,
        data: &[T],
        queue: QueueId,
    ) -> Result<(), Error> {
        let queue = self.queue(queue);
        unsafe { H::enqueue_write(queue, buffer, true, 0, bytes_of(data), &[]) }.map(drop)
    }

    /// 把 `data` 的前 `range.len()` 个元素写到存储对象的 `range` 处。
    pub fn memcpy_h2d_range<T: Scalar>(
        &self,
        buffer: &mut H::Buffer,
        data: &[T],
        range: Range<usize>,
        queue: QueueId,
    ) -> Result<(), Error> {
        let (offset, data) = sub_range(data, range);
        let queue = self.queue(queue);
        unsafe { H::enqueue_write(queue, buffer, true, offset, bytes_of(data), &[]) }.map(drop)
    }

    /// # Safety
    ///
    /// 返回的事件完成前 `data` 必须保持有效。
    pub unsafe fn memcpy_h2d_async<T: Scalar>(
        &self,
        buffer: &mut H::Buffer,
        data: &[T],
        range: Option<Range<usize>>,
        wait: &[H::Event],
        queue: QueueId,
    ) -> Result<H::Event, Error> {
        let (offset, data) = match range {
            Some(range) => sub_range(data, range),
            None => (0, data),
        };
        H::enqueue_write(self.queue(queue), buffer, false, offset, bytes_of(data), wait)
    }

    pub fn memcpy_d2h<T: Scalar>(
        &self,
        data: &mut [T],
        buffer: &H::Buffer,
        queue: QueueId,
    ) -> Result<(), Error> {
        let queue = self.queue(queue);
        unsafe { H::enqueue_read(queue, buffer, true, 0, bytes_of_mut(data), &[]) }.map(drop)
    }

    /// 把存储对象的 `range` 处读到 `data` 的前 `range.len()` 个元素。
    pub fn memcpy_d2h_range<T: Scalar>(
        &self,
        data: &mut [T],
        buffer: &H::Buffer,
        range: Range<usize>,
        queue: QueueId,
    ) -> Result<(), Error> {
        let (offset, data) = sub_range_mut(data, range);
        let queue = self.queue(queue);
        unsafe { H::enqueue_read(queue, buffer, true, offset, bytes_of_mut(data), &[]) }.map(drop)
    }

    /// # Safety
    ///
    /// 返回的事件完成前 `data` 必须保持有效且不被访问。
    pub unsafe fn memcpy_d2h_async<T: Scalar>(
        &self,
        data: &mut [T],
        buffer: &H::Buffer,
        range: Option<Range<usize>>,
        wait: &[H::Event],
        queue: QueueId,
    ) -> Result<H::Event, Error> {
        let (offset, data) = match range {
            Some(range) => sub_range_mut(data, range),
            None => (0, data),
        };
        H::enqueue_read(self.queue(queue), buffer, false, offset, bytes_of_mut(data), wait)
    }
}

fn sub_range<T>(data: &[T], range: Range<usize>) -> (usize, &[T]) {
    assert!(range.end > range.start, "empty range {range:?}");
    let len = range.len();
    assert!(data.len() >= len, "{} elements for range {range:?}", data.len());
    (range.start * size_of::<T>(), &data[..len])
}

fn sub_range_mut<T>(data: &mut [T], range: Range<usize>) -> (usize, &mut [T]) {
    assert!(range.end > range.start, "empty range {range:?}");
    let len = range.len();
    assert!(data.len() >= len, "{} elements for range {range:?}", data.len());
    (range.start * size_of::<T>(), &mut data[..len])
}

#[cfg(test)]
mod test {
    use super::DeviceContext;
    use crate::{
        test_utils::{MockDevice, TransferRecord, INVALID_KERNEL_NAME},
        Arg, CodeGen, ContextConfig, DeviceClass, ErrorKind, MemFlags, NdRange, QueueProperties,
    };
    use std::{env, fs, process};

    const P1: &str = "
__kernel void k1(__global float* a) {}
__kernel void k2(__global float* a, int n) {}
";

    fn gpu() -> DeviceContext<MockDevice> {
        DeviceContext::new(MockDevice::gpu(), ContextConfig::default()).unwrap()
    }

    fn builds(ctx: &DeviceContext<MockDevice>) -> usize {
        ctx.device().journal().lock().unwrap().builds.len()
    }

    #[test]
    fn test_construct() {
        let ctx = gpu();
        assert_eq!(ctx.name(), "mock gpu");
        assert_eq!(ctx.class(), DeviceClass::Gpu);
        assert!(ctx.is_gpu_device());
        assert!(!ctx.is_cpu_device());
        assert_eq!(ctx.num_queues(), 1);
        assert_eq!(ctx.num_programs(), 0);
        assert!(ctx.is_extension_supported("cl_khr_fp16").unwrap());
        assert!(!ctx.is_extension_supported("cl_khr_fp").unwrap());
        assert_eq!(ctx.extensions().unwrap().len(), 3);
    }

    #[test]
    fn test_register_and_lookup() {
        let mut ctx = gpu();
        assert_eq!(
            ctx.get_kernel("k1").err().map(|e| e.kind),
            Some(ErrorKind::NotFound)
        );

        ctx.register(P1, &["k1", "k2"], "P1", "").unwrap();
        assert!(ctx.get_kernel("k1").is_ok());
        assert!(ctx.get_kernel("k2").is_ok());
        let e = ctx.get_kernel("k3").err().unwrap();
        assert_eq!(e.kind, ErrorKind::NotFound);
        assert!(e.to_string().contains("k3"));
    }

    #[test]
    fn test_compile_once() {
        let mut ctx = gpu();
        ctx.register(P1, &["k1", "k2"], "P1", "").unwrap();
        ctx.register(P1, &["k1", "k2"], "P1", "").unwrap();
        assert_eq!(builds(&ctx), 1);
        assert_eq!(ctx.num_kernels(), 2);

        // 同一程序的其他核函数复用缓存的程序
        let mut ctx = gpu();
        ctx.register(P1, &["k1"], "P1", "").unwrap();
        ctx.register(P1, &["k2"], "P1", "").unwrap();
        assert_eq!(builds(&ctx), 1);
        assert_eq!(ctx.num_programs(), 1);
        assert_eq!(ctx.device().journal().lock().unwrap().kernels, ["k1", "k2"]);
    }

    #[test]
    fn test_scope() {
        let mut ctx = gpu();
        ctx.register(P1, &["k1"], "P1", "S").unwrap();
        assert!(ctx.get_kernel("S::k1").is_ok());
        assert_eq!(
            ctx.get_kernel("k1").err().map(|e| e.kind),
            Some(ErrorKind::NotFound)
        );

        // 同样的源码在不同的作用域下得到相互独立的核函数
        ctx.register(P1, &["k1"], "P1-other", "T").unwrap();
        assert!(ctx.contains_kernel("S::k1"));
        assert!(ctx.contains_kernel("T::k1"));
        assert_eq!(ctx.num_kernels(), 2);
        assert_eq!(builds(&ctx), 2);
        assert!(!std::ptr::eq(
            ctx.get_kernel("S::k1").unwrap(),
            ctx.get_kernel("T::k1").unwrap()
        ));
    }

    #[test]
    fn test_scope_shared_program() {
        let mut ctx = gpu();
        ctx.register(P1, &["k1"], "P1", "S").unwrap();
        ctx.register(P1, &["k1"], "P1", "T").unwrap();
        assert_eq!(builds(&ctx), 1);
        assert_eq!(ctx.num_programs(), 1);
        assert_eq!(ctx.num_kernels(), 2);

        let a = ctx.create_buffer::<f32>(MemFlags::READ_WRITE, 16).unwrap();
        let b = ctx.create_buffer::<f32>(MemFlags::READ_WRITE, 16).unwrap();
        ctx.call("S::k1", 16, 16)
            .unwrap()
            .invoke(&[Arg::buffer(&a)])
            .unwrap();
        ctx.call("T::k1", 32, 16)
            .unwrap()
            .invoke(&[Arg::buffer(&b)])
            .unwrap();

        let journal = ctx.device().journal();
        let journal = journal.lock().unwrap();
        assert_eq!(journal.kernels, ["k1", "k1"]);
        assert_eq!(
            journal
                .args
                .iter()
                .map(|r| (r.index, r.bytes.clone()))
                .collect::<Vec<_>>(),
            [
                (0, Some((a.id as u64).to_ne_bytes().to_vec())),
                (0, Some((b.id as u64).to_ne_bytes().to_vec())),
            ]
        );
        assert_eq!(journal.launches.len(), 2);
        assert_eq!(journal.launches[0].launch.global, NdRange::from(16));
        assert_eq!(journal.launches[1].launch.global, NdRange::from(32));
    }

    #[test]
    fn test_build_failure() {
        let mut ctx = gpu();
        let e = ctx
            .register("#error expected ';'", &["bad"], "bad", "")
            .unwrap_err();
        assert_eq!(e.kind, ErrorKind::Compilation);
        assert!(e.info.contains("mock gpu"));
        assert!(e.info.contains("expected ';'"));
        assert_eq!(ctx.num_programs(), 0);

        // 失败不影响其他程序
        ctx.register(P1, &["k1"], "P1", "").unwrap();
        assert!(ctx.get_kernel("k1").is_ok());

        // 也不会缓存失败的程序
        let e = ctx
            .register("#error expected ';'", &["bad"], "bad", "")
            .unwrap_err();
        assert_eq!(e.kind, ErrorKind::Compilation);
    }

    #[test]
    fn test_build_warning() {
        let mut ctx = gpu();
        ctx.register("#warning unused\n__kernel void k() {}", &["k"], "w", "")
            .unwrap();
        assert!(ctx.contains_kernel("k"));
    }

    #[test]
    fn test_missing_kernel() {
        let mut ctx = gpu();
        let e = ctx.register(P1, &["k1", "k9"], "P1", "").unwrap_err();
        assert_eq!(e.kind, ErrorKind::Driver);
        assert_eq!(e.code, Some(INVALID_KERNEL_NAME));
        // 程序仍然在缓存中
        assert_eq!(ctx.num_programs(), 1);
        ctx.register(P1, &["k2"], "P1", "").unwrap();
        assert_eq!(builds(&ctx), 1);
    }

    #[test]
    fn test_source_code() {
        let mut ctx = gpu();
        ctx.register_source_code(P1, &["k1", "k2"]).unwrap();
        ctx.register(P1, &["k1"], "k1k2", "").unwrap();
        assert_eq!(builds(&ctx), 1);
        assert!(ctx.contains_kernel("k2"));
    }

    #[test]
    fn test_source_file() {
        let path = env::temp_dir().join(format!("clkit-{}.cl", process::id()));
        fs::write(&path, P1).unwrap();

        let mut ctx = gpu();
        ctx.register_source_file(&path, &["k2"], "file").unwrap();
        assert!(ctx.contains_kernel("file::k2"));
        fs::remove_file(&path).unwrap();

        let e = ctx
            .register_source_file(&path, &["k1"], "file")
            .unwrap_err();
        assert_eq!(e.kind, ErrorKind::Io);
    }

    #[test]
    fn test_module() {
        let add = |ty: &str| {
            CodeGen::new("add")
                .define("T", ty)
                .code("__kernel void add(__global T* a, __global T* b) {}")
                .entry("add")
                .build()
        };
        let float = add("float");
        let int = add("int");

        let mut ctx = gpu();
        ctx.register_module(&float).unwrap();
        ctx.register_module(&float).unwrap();
        ctx.register_module(&int).unwrap();
        assert_eq!(builds(&ctx), 2);
        assert!(ctx.contains_kernel(&float.scoped("add")));
        assert!(ctx.contains_kernel(&int.scoped("add")));
        assert_ne!(float.scoped("add"), int.scoped("add"));
    }

    #[test]
    fn test_queues() {
        let config = ContextConfig::default().with_queues(2);
        let mut ctx = DeviceContext::new(MockDevice::gpu(), config).unwrap();
        assert_eq!(ctx.num_queues(), 2);

        ctx.require_queues(4).unwrap();
        assert_eq!(ctx.num_queues(), 4);
        ctx.require_queues(1).unwrap();
        assert_eq!(ctx.num_queues(), 4);

        assert_eq!(ctx.add_out_of_order_queue().unwrap(), 4);
        let journal = ctx.device().journal();
        let journal = journal.lock().unwrap();
        assert_eq!(journal.queues[..4], [QueueProperties::default(); 4]);
        assert!(journal.queues[4].out_of_order);
        ctx.finish(4).unwrap();
    }

    #[test]
    #[should_panic]
    fn test_queue_out_of_range() {
        gpu().queue(1);
    }

    #[test]
    fn test_buffer_flags() {
        let data = [1.0f32; 16];

        let cpu = DeviceContext::new(MockDevice::cpu(), ContextConfig::default()).unwrap();
        cpu.create_buffer::<f32>(MemFlags::READ_WRITE, 16).unwrap();
        let buf = unsafe { cpu.create_buffer_from(MemFlags::READ_ONLY, &data) }.unwrap();
        assert_eq!(buf.flags, MemFlags::READ_ONLY | MemFlags::USE_HOST_PTR);

        let gpu = gpu();
        gpu.create_output_buffer::<f32>(16).unwrap();
        let buf = unsafe { gpu.create_buffer_from(MemFlags::READ_ONLY, &data) }.unwrap();
        assert_eq!(buf.flags, MemFlags::READ_ONLY | MemFlags::COPY_HOST_PTR);

        let journal = cpu.device().journal();
        let journal = journal.lock().unwrap();
        assert_eq!(
            journal.buffers,
            [
                (MemFlags::READ_WRITE | MemFlags::ALLOC_HOST_PTR, 64, false),
                (MemFlags::READ_ONLY | MemFlags::USE_HOST_PTR, 64, true),
            ]
        );
        let journal = gpu.device().journal();
        let journal = journal.lock().unwrap();
        assert_eq!(
            journal.buffers,
            [
                (MemFlags::WRITE_ONLY, 64, false),
                (MemFlags::READ_ONLY | MemFlags::COPY_HOST_PTR, 64, true),
            ]
        );
    }

    #[test]
    #[should_panic]
    fn test_buffer_overflow() {
        let _ = gpu().create_buffer::<u32>(MemFlags::READ_WRITE, usize::MAX / 2);
    }

    #[test]
    fn test_memcpy() {
        let ctx = gpu();
        let mut buf = ctx.create_buffer::<u32>(MemFlags::READ_WRITE, 8).unwrap();

        ctx.memcpy_h2d(&mut buf, &[1u32, 2, 3, 4, 5, 6, 7, 8], 0)
            .unwrap();
        ctx.memcpy_h2d_range(&mut buf, &[30u32, 40], 2..4, 0)
            .unwrap();

        let mut all = [0u32; 8];
        ctx.memcpy_d2h(&mut all, &buf, 0).unwrap();
        assert_eq!(all, [1, 2, 30, 40, 5, 6, 7, 8]);

        let mut part = [0u32; 3];
        ctx.memcpy_d2h_range(&mut part, &buf, 5..8, 0).unwrap();
        assert_eq!(part, [6, 7, 8]);

        let journal = ctx.device().journal();
        let journal = journal.lock().unwrap();
        assert_eq!(
            journal.transfers[1],
            TransferRecord {
                write: true,
                blocking: true,
                offset: 8,
                len: 8,
                wait: vec![],
            }
        );
        assert_eq!(journal.transfers[3].offset, 20);
        assert_eq!(journal.transfers[3].len, 12);
    }

    #[test]
    fn test_memcpy_async() {
        let ctx = gpu();
        let mut buf = ctx.create_buffer::<i16>(MemFlags::READ_WRITE, 4).unwrap();

        let src = [1i16, 2, 3, 4];
        let mut dst = [0i16; 2];
        let write = unsafe { ctx.memcpy_h2d_async(&mut buf, &src, None, &[], 0) }.unwrap();
        let read = unsafe {
            ctx.memcpy_d2h_async(&mut dst, &buf, Some(1..3), std::slice::from_ref(&write), 0)
        }
        .unwrap();
        assert_ne!(write, read);
        assert_eq!(dst, [2, 3]);

        let journal = ctx.device().journal();
        let journal = journal.lock().unwrap();
        assert!(!journal.transfers[1].blocking);
        assert_eq!(journal.transfers[1].wait, [write.0]);
        assert_eq!(journal.transfers[1].offset, 2);
    }

    #[test]
    #[should_panic]
    fn test_empty_range() {
        let ctx = gpu();
        let mut buf = ctx.create_buffer::<u8>(MemFlags::READ_WRITE, 4).unwrap();
        let _ = ctx.memcpy_h2d_range(&mut buf, &[1u8], 2..2, 0);
    }
}
