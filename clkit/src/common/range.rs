use std::fmt;

/// 1~3 维的工作项范围。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NdRange {
    dims: [usize; 3],
    ndim: u8,
}

impl NdRange {
    pub fn new(dims: &[usize]) -> Self {
        assert!(
            (1..=3).contains(&dims.len()),
            "NdRange must have 1 to 3 dimensions, got {}",
            dims.len()
        );
        let mut ans = Self {
            dims: [1; 3],
            ndim: dims.len() as _,
        };
        ans.dims[..dims.len()].copy_from_slice(dims);
        ans
    }

    #[inline]
    pub const fn ndim(&self) -> usize {
        self.ndim as _
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.dims[..self.ndim()]
    }

    /// 所有维度的乘积。
    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for NdRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.as_slice())
    }
}

impl From<usize> for NdRange {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(&[value])
    }
}

impl<const N: usize> From<[usize; N]> for NdRange {
    #[inline]
    fn from(value: [usize; N]) -> Self {
        Self::new(&value)
    }
}

impl From<(usize, usize)> for NdRange {
    #[inline]
    fn from((x, y): (usize, usize)) -> Self {
        Self::new(&[x, y])
    }
}

impl From<(usize, usize, usize)> for NdRange {
    #[inline]
    fn from((x, y, z): (usize, usize, usize)) -> Self {
        Self::new(&[x, y, z])
    }
}

/// 一次核函数发射的几何形状。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Launch {
    pub offset: Option<NdRange>,
    pub global: NdRange,
    pub local: NdRange,
}

/// 计算每个维度上不小于 `minimum` 且为 `local` 整数倍的最小全局规模。
///
/// 维度不一致或 `local` 存在 0 是调用方的错误，直接断言失败。
pub fn resolve_global_size(minimum: &NdRange, local: &NdRange) -> NdRange {
    assert_eq!(
        minimum.ndim(),
        local.ndim(),
        "work size {minimum:?} and group size {local:?} differ in dimensionality"
    );

    let mut global = *minimum;
    for (g, &l) in global.dims[..local.ndim()].iter_mut().zip(local.as_slice()) {
        assert_ne!(l, 0, "group size {local:?} has an empty dimension");

        let work_items = *g;
        let mut multiple = work_items / l * l;
        if multiple != work_items {
            multiple += l;
        }

        debug_assert!(multiple % l == 0 && multiple >= work_items);
        *g = multiple;
    }
    global
}
