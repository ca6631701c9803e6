//! Random array layouts and fill patterns.

/// A shape with non-overlapping element strides and the buffer length they need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomLayout {
    pub shape: Vec<usize>,
    pub strides: Vec<isize>,
    pub buffer_len: usize,
}

impl RandomLayout {
    /// Element offset of `index` under the layout's strides.
    pub fn offset(&self, index: &[usize]) -> usize {
        index
            .iter()
            .zip(&self.strides)
            .map(|(&i, &s)| i * s as usize)
            .sum()
    }

    /// All indices of the shape in row-major order.
    pub fn indices(&self) -> Vec<Vec<usize>> {
        let mut res = vec![vec![]];
        for &extent in &self.shape {
            res = res
                .into_iter()
                .flat_map(|prefix| {
                    (0..extent).map(move |i| {
                        let mut index = prefix.clone();
                        index.push(i);
                        index
                    })
                })
                .collect();
        }
        res
    }
}

/// Generates a random layout of rank `1..=max_ndim` with extents in `1..=max_extent`.
///
/// Dimensions are laid out in a random order, each stride optionally padded past
/// the reach of the faster dimensions, so the layout is rarely contiguous but never
/// addresses an element twice.
pub fn random_layout(rng: &mut fastrand::Rng, max_ndim: usize, max_extent: usize) -> RandomLayout {
    let ndim = rng.usize(1..=max_ndim);
    let shape = (0..ndim)
        .map(|_| rng.usize(1..=max_extent))
        .collect::<Vec<_>>();

    let mut order = (0..ndim).collect::<Vec<_>>();
    rng.shuffle(&mut order);

    let mut strides = vec![0isize; ndim];
    let mut reach = 1usize;
    for &dim in &order {
        let stride = reach + rng.usize(0..3);
        strides[dim] = stride as isize;
        reach = stride * shape[dim];
    }

    let buffer_len = 1 + shape
        .iter()
        .zip(&strides)
        .map(|(&e, &s)| (e - 1) * s as usize)
        .sum::<usize>();
    RandomLayout {
        shape,
        strides,
        buffer_len,
    }
}

/// `start, start + 1, ...` converted to `T`, `len` values.
pub fn sequence<T: From<u8>>(len: usize, start: u8) -> Vec<T>
where
    T: std::ops::Add<Output = T> + Copy,
{
    let mut values = Vec::with_capacity(len);
    let mut next = T::from(start);
    for _ in 0..len {
        values.push(next);
        next = next + T::from(1);
    }
    values
}
