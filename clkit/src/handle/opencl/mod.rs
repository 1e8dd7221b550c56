use crate::{
    driver_error, BuildError, DeviceClass, DeviceInfo, Error, Hardware, Launch, MemFlags,
    QueueProperties,
};
use opencl3::{
    command_queue::{
        CommandQueue, CL_QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE, CL_QUEUE_PROFILING_ENABLE,
    },
    context::Context,
    device::{Device, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_GPU},
    error_codes::ClError,
    event::Event,
    kernel::Kernel,
    memory::{Buffer, ClMem},
    program::Program,
    types::{cl_event, CL_BLOCKING, CL_NON_BLOCKING},
};
use std::{ffi::c_void, mem::size_of_val, ptr::null};

/// 一个 OpenCL 设备及其独占的驱动上下文。
pub struct ClDevice {
    device: Device,
    context: Context,
}

#[inline]
fn cl_error(e: ClError, info: &str) -> Error {
    driver_error(e.0, info)
}

impl ClDevice {
    pub fn new(device: Device) -> Result<Self, Error> {
        let context =
            Context::from_device(&device).map_err(|e| cl_error(e, "Could not spawn CL context!"))?;
        Ok(Self { device, context })
    }

    /// 使用已有的驱动上下文，`device` 必须属于 `context`。
    #[inline]
    pub fn from_context(device: Device, context: Context) -> Self {
        Self { device, context }
    }

    #[inline]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[inline]
    pub fn context(&self) -> &Context {
        &self.context
    }
}

#[inline]
fn wait_list(events: &[Event]) -> Vec<cl_event> {
    events.iter().map(Event::get).collect()
}

impl Hardware for ClDevice {
    type Program = Program;
    type Kernel = Kernel;
    type Queue = CommandQueue;
    type Buffer = Buffer<u8>;
    type Event = Event;

    fn info(&self, query: DeviceInfo) -> Result<String, Error> {
        let device = &self.device;
        match query {
            DeviceInfo::Name => device.name(),
            DeviceInfo::Vendor => device.vendor(),
            DeviceInfo::Version => device.version(),
            DeviceInfo::DriverVersion => device.driver_version(),
            DeviceInfo::Extensions => device.extensions(),
        }
        .map_err(|e| cl_error(e, "Could not query device info!"))
    }

    fn class(&self) -> Result<DeviceClass, Error> {
        let ty = self
            .device
            .dev_type()
            .map_err(|e| cl_error(e, "Could not query device type!"))?;
        Ok(if ty & CL_DEVICE_TYPE_CPU != 0 {
            DeviceClass::Cpu
        } else if ty & CL_DEVICE_TYPE_GPU != 0 {
            DeviceClass::Gpu
        } else {
            DeviceClass::Other
        })
    }

    fn create_queue(&self, props: QueueProperties) -> Result<CommandQueue, Error> {
        let mut bits = 0;
        if props.out_of_order {
            bits |= CL_QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE
        }
        if props.profiling {
            bits |= CL_QUEUE_PROFILING_ENABLE
        }
        #[allow(deprecated)]
        CommandQueue::create_default(&self.context, bits)
            .map_err(|e| cl_error(e, "Could not create command queue!"))
    }

    fn build_program(&self, source: &str, options: &str) -> Result<(Program, String), BuildError> {
        let mut program = Program::create_from_source(&self.context, source)
            .map_err(|e| cl_error(e, "Could not create program object!"))?;
        let id = self.device.id();
        let built = program.build(&[id], options);
        let log = program.get_build_log(id).unwrap_or_default();
        match built {
            Ok(()) => Ok((program, log)),
            Err(_) => Err(BuildError::BuildFailed(log)),
        }
    }

    fn create_kernel(&self, program: &Program, name: &str) -> Result<Kernel, Error> {
        Kernel::create(program, name).map_err(|e| cl_error(e, "Could not create kernel object!"))
    }

    unsafe fn create_buffer(
        &self,
        flags: MemFlags,
        size: usize,
        host: *mut c_void,
    ) -> Result<Buffer<u8>, Error> {
        Buffer::create(&self.context, flags.bits(), size, host)
            .map_err(|e| cl_error(e, "Could not create buffer object!"))
    }

    unsafe fn set_arg(
        kernel: &Kernel,
        index: u32,
        size: usize,
        value: *const c_void,
    ) -> Result<(), Error> {
        unsafe { cl3::kernel::set_kernel_arg(kernel.get(), index, size, value) }
            .map_err(|code| driver_error(code, "Could not set kernel argument!"))
    }

    fn set_buffer_arg(kernel: &Kernel, index: u32, buffer: &Buffer<u8>) -> Result<(), Error> {
        let mem = buffer.get();
        unsafe {
            Self::set_arg(
                kernel,
                index,
                size_of_val(&mem),
                (&mem as *const _).cast(),
            )
        }
    }

    fn enqueue_kernel(
        queue: &CommandQueue,
        kernel: &Kernel,
        launch: &Launch,
        wait: &[Event],
    ) -> Result<Event, Error> {
        let Launch {
            offset,
            global,
            local,
        } = launch;
        let offset = offset.as_ref().map_or(null(), |o| o.as_slice().as_ptr());
        unsafe {
            queue.enqueue_nd_range_kernel(
                kernel.get(),
                global.ndim() as _,
                offset,
                global.as_slice().as_ptr(),
                local.as_slice().as_ptr(),
                &wait_list(wait),
            )
        }
        .map_err(|e| cl_error(e, "Could not enqueue kernel!"))
    }

    unsafe fn enqueue_write(
        queue: &CommandQueue,
        buffer: &mut Buffer<u8>,
        blocking: bool,
        offset: usize,
        data: &[u8],
        wait: &[Event],
    ) -> Result<Event, Error> {
        let blocking = if blocking { CL_BLOCKING } else { CL_NON_BLOCKING };
        unsafe { queue.enqueue_write_buffer(buffer, blocking, offset, data, &wait_list(wait)) }
            .map_err(|e| cl_error(e, "Could not enqueue buffer write!"))
    }

    unsafe fn enqueue_read(
        queue: &CommandQueue,
        buffer: &Buffer<u8>,
        blocking: bool,
        offset: usize,
        data: &mut [u8],
        wait: &[Event],
    ) -> Result<Event, Error> {
        let blocking = if blocking { CL_BLOCKING } else { CL_NON_BLOCKING };
        unsafe { queue.enqueue_read_buffer(buffer, blocking, offset, data, &wait_list(wait)) }
            .map_err(|e| cl_error(e, "Could not enqueue buffer read!"))
    }

    fn finish(queue: &CommandQueue) -> Result<(), Error> {
        queue
            .finish()
            .map_err(|e| cl_error(e, "Could not finish command queue!"))
    }
}
