use crate::{Arg, ArgumentBinder, DeviceContext, Error, Hardware, NdRange, QueueId};

/// 以函数调用的形式发射核函数。
///
/// 发射规模、依赖事件和目标队列在构造后设置，
/// 参数可以一次给全，也可以分批设置后再发射。
pub struct KernelCall<'a, H: Hardware> {
    ctx: &'a DeviceContext<H>,
    args: ArgumentBinder<'a, H>,
    minimum: NdRange,
    local: NdRange,
    offset: Option<NdRange>,
    wait: &'a [H::Event],
    queue: QueueId,
}

impl<'a, H: Hardware> KernelCall<'a, H> {
    pub fn new(
        ctx: &'a DeviceContext<H>,
        kernel: &'a H::Kernel,
        minimum: impl Into<NdRange>,
        local: impl Into<NdRange>,
    ) -> Self {
        let minimum = minimum.into();
        let local = local.into();
        assert_eq!(
            minimum.ndim(),
            local.ndim(),
            "global {minimum:?} and local {local:?} differ in dimensions"
        );
        Self {
            ctx,
            args: ArgumentBinder::new(kernel),
            minimum,
            local,
            offset: None,
            wait: &[],
            queue: 0,
        }
    }

    /// 发射前需要等待的事件。
    #[inline]
    pub fn wait_for(mut self, events: &'a [H::Event]) -> Self {
        self.set_dependencies(events);
        self
    }

    #[inline]
    pub fn set_dependencies(&mut self, events: &'a [H::Event]) {
        self.wait = events
    }

    #[inline]
    pub fn offset(mut self, offset: impl Into<NdRange>) -> Self {
        let offset = offset.into();
        assert_eq!(offset.ndim(), self.local.ndim());
        self.offset = Some(offset);
        self
    }

    #[inline]
    pub fn on_queue(mut self, queue: QueueId) -> Self {
        assert!(queue < self.ctx.num_queues());
        self.queue = queue;
        self
    }

    /// 已经设置的参数个数。
    #[inline]
    pub fn pushed(&self) -> u32 {
        self.args.pushed()
    }

    /// 从第 0 个参数开始设置所有参数并发射。
    ///
    /// 发射后参数位置归零，同一个调用可以用新的参数再次发射。
    pub fn invoke(&mut self, args: &[Arg<H::Buffer>]) -> Result<H::Event, Error> {
        self.args.reset();
        let ans = self.bind(args).and_then(|()| self.enqueue());
        self.args.reset();
        ans
    }

    /// 接着已经设置的参数继续设置，不发射。
    pub fn partial_argument_list(&mut self, args: &[Arg<H::Buffer>]) -> Result<(), Error> {
        self.bind(args)
    }

    /// 丢弃分批设置的参数，下一个参数从第 0 个开始。
    #[inline]
    pub fn discard_partial_arguments(&mut self) {
        self.args.reset()
    }

    /// 以当前已设置的参数发射。
    pub fn enqueue(&self) -> Result<H::Event, Error> {
        self.ctx.enqueue_ndrange(
            self.args.kernel(),
            &self.minimum,
            &self.local,
            self.offset,
            self.wait,
            self.queue,
        )
    }

    // 每个参数都会占据一个位置，出错的参数也不例外
    fn bind(&mut self, args: &[Arg<H::Buffer>]) -> Result<(), Error> {
        let mut ans = Ok(());
        for arg in args {
            let result = self.args.push_arg(arg);
            if ans.is_ok() {
                ans = result
            }
        }
        ans
    }
}
