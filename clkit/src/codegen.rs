use std::fmt::{self, Display, Write};

/// 在 OpenCL C 中有同名对应的类型。
pub trait ClType {
    const CL_NAME: &'static str;
}

macro_rules! cl_type {
    (@vector $ty:ty => $name:literal; $($n:literal)*) => {
        $(
            impl ClType for [$ty; $n] {
                const CL_NAME: &'static str = concat!($name, $n);
            }
        )*
    };
    ($($ty:ty => $name:literal)*) => {
        $(
            impl ClType for $ty {
                const CL_NAME: &'static str = $name;
            }
            cl_type!(@vector $ty => $name; 2 3 4 8 16);
        )*
    };
}

cl_type! {
    i8        => "char"
    u8        => "uchar"
    i16       => "short"
    u16       => "ushort"
    i32       => "int"
    u32       => "uint"
    i64       => "long"
    u64       => "ulong"
    f32       => "float"
    f64       => "double"
    half::f16 => "half"
}

enum Part {
    Define(String, String),
    Include(SourceModule),
    Code(String),
}

/// 源码模块生成器。
///
/// 模块由宏定义、被包含的模块和代码片段按加入顺序拼接而成。
/// 模块名由名字、宏定义、被包含模块的模块名和生成源码的散列组成，
/// 因此源码不同的模块一定得到不同的模块名。
///
/// ```
/// use clkit::CodeGen;
///
/// let module = CodeGen::new("scale")
///     .import_type::<f32>("T")
///     .import_constant("N", 256)
///     .code("__kernel void scale(__global T* x, T k) { x[get_global_id(0) % N] *= k; }")
///     .entry("scale")
///     .build();
/// assert!(module.id().starts_with("scale<T=float,N=(256)>#"));
/// assert!(module.source().contains("#define N (256)"));
/// assert_eq!(module.scoped("scale"), format!("{}::scale", module.id()));
/// ```
pub struct CodeGen {
    name: String,
    parts: Vec<Part>,
    kernels: Vec<String>,
}

impl CodeGen {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parts: Vec::new(),
            kernels: Vec::new(),
        }
    }

    /// 一段 OpenCL C 代码。
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.parts.push(Part::Code(code.into()));
        self
    }

    /// `#define key value`
    pub fn define(mut self, key: impl Display, value: impl Display) -> Self {
        self.parts
            .push(Part::Define(key.to_string(), value.to_string()));
        self
    }

    /// 把 `key` 定义为 `T` 在 OpenCL C 中的类型名。
    #[inline]
    pub fn import_type<T: ClType>(self, key: impl Display) -> Self {
        self.define(key, T::CL_NAME)
    }

    /// 把 `key` 定义为带括号的常数。
    #[inline]
    pub fn import_constant(self, key: impl Display, value: impl Display) -> Self {
        self.define(key, format!("({value})"))
    }

    /// 把另一个模块的源码原样拼接进来。
    pub fn include(mut self, module: &SourceModule) -> Self {
        self.parts.push(Part::Include(module.clone()));
        self
    }

    /// 声明模块中的一个核函数入口。
    pub fn entry(mut self, kernel: impl Into<String>) -> Self {
        let kernel = kernel.into();
        if !self.kernels.contains(&kernel) {
            self.kernels.push(kernel)
        }
        self
    }

    pub fn build(&self) -> SourceModule {
        let (id, source) = self.render();
        SourceModule {
            id,
            source,
            kernels: self.kernels.clone(),
        }
    }

    fn render(&self) -> (String, String) {
        let mut body = String::new();
        let mut params = Vec::new();
        for part in &self.parts {
            let _ = match part {
                Part::Define(key, value) => {
                    params.push(format!("{}={}", escape(key), escape(value)));
                    writeln!(body, "#define {key} {value}")
                }
                Part::Include(module) => {
                    params.push(format!("@{}", escape(&module.id)));
                    writeln!(body, "{}", module.source.trim_end())
                }
                Part::Code(code) => writeln!(body, "{}", code.trim_end()),
            };
        }

        let mut id = escape(&self.name);
        if !params.is_empty() {
            let _ = write!(id, "<{}>", params.join(","));
        }
        let _ = write!(id, "#{:016x}", fnv1a(&body));

        let guard = include_guard(&self.name, &id);
        let source = format!("#ifndef {guard}\n#define {guard}\n{body}#endif // {guard}\n");
        (id, source)
    }
}

impl Display for CodeGen {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.render().1)
    }
}

// 模块名中的分隔符
fn escape(text: &str) -> String {
    let mut ans = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | ',' | '=' | '<' | '>' | '@' | '#') {
            ans.push('\\')
        }
        ans.push(c)
    }
    ans
}

fn include_guard(name: &str, id: &str) -> String {
    let mut guard = String::from("CLKIT_MODULE_");
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            guard.push(c.to_ascii_uppercase())
        } else {
            guard.push('_')
        }
    }
    let _ = write!(guard, "_{:016X}", fnv1a(id));
    guard
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// 生成好的源码模块。
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SourceModule {
    id: String,
    source: String,
    kernels: Vec<String>,
}

impl SourceModule {
    /// 模块名，同时作为程序名和核函数的作用域。
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn kernels(&self) -> &[String] {
        &self.kernels
    }

    /// 核函数在设备上下文中注册的名字。
    #[inline]
    pub fn scoped(&self, kernel: &str) -> String {
        format!("{}::{kernel}", self.id)
    }
}
