use crate::QueueProperties;

/// 设备上下文的构造配置。
#[derive(Clone, Debug)]
pub struct ContextConfig {
    /// 构造时创建的命令队列数，至少为 1。
    pub queues: usize,
    /// 构造时创建的命令队列的属性。
    pub queue_properties: QueueProperties,
    /// 传给编译器的选项，对所有程序生效。
    pub build_options: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            queues: 1,
            queue_properties: QueueProperties::default(),
            build_options: String::new(),
        }
    }
}

impl ContextConfig {
    #[inline]
    pub fn with_build_options(mut self, options: impl Into<String>) -> Self {
        self.build_options = options.into();
        self
    }

    #[inline]
    pub fn with_queues(mut self, n: usize) -> Self {
        self.queues = n;
        self
    }
}
