use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// 驱动返回的错误码。
    Driver,
    /// 程序编译失败，信息中携带编译日志。
    Compilation,
    /// 查询了未注册的核函数。
    NotFound,
    /// 读取源码文件失败。
    Io,
}

#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: Option<i32>,
    pub info: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "OpenCL error {code}: {}", self.info),
            None => write!(f, "{}", self.info),
        }
    }
}

impl std::error::Error for Error {}

/// 后端编译程序的结果。
#[derive(Clone, Debug)]
pub enum BuildError {
    /// 编译器拒绝了源码，携带编译日志。
    BuildFailed(String),
    Others(Error),
}

impl From<Error> for BuildError {
    #[inline]
    fn from(e: Error) -> Self {
        Self::Others(e)
    }
}

pub(super) mod functions {
    use super::{Error, ErrorKind::*};

    /// `CL_BUILD_PROGRAM_FAILURE`
    pub const BUILD_PROGRAM_FAILURE: i32 = -11;

    macro_rules! builder {
        ($ty:ident: $name:ident $kind:expr) => {
            #[inline]
            pub fn $name(info: impl Into<String>) -> $ty {
                $ty {
                    kind: $kind,
                    code: None,
                    info: info.into(),
                }
            }
        };
    }

    builder!(Error: kernel_not_found NotFound);
    builder!(Error: io_error         Io      );

    #[inline]
    pub fn driver_error(code: i32, info: impl Into<String>) -> Error {
        Error {
            kind: Driver,
            code: Some(code),
            info: info.into(),
        }
    }

    #[inline]
    pub fn build_failed(device: &str, log: &str) -> Error {
        Error {
            kind: Compilation,
            code: Some(BUILD_PROGRAM_FAILURE),
            info: format!("{device}: Could not compile CL source: {log}"),
        }
    }
}
