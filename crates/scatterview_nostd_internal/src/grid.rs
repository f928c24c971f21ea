use alloc::boxed::Box;
use alloc::vec::Vec;
use ndarray::{ArrayD, ArrayViewD, IxDyn};

use crate::element::Element;
use crate::error::ScatterError;

/// Check if a grid shape is valid
fn check_extents(extents: &[usize]) -> Result<(), ScatterError> {
    if extents.is_empty() || extents.contains(&0) {
        Err(ScatterError::InvalidShape {
            extents: extents.to_vec(),
        })
    } else {
        Ok(())
    }
}

/// GridShape specifies how an N-dimensional grid is laid out in a contiguous
/// buffer. The layout is always row-major (the last axis is contiguous), which
/// matches the standard layout used by ndarray.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridShape {
    extents: Box<[usize]>,
    strides: Box<[usize]>,
    n_cells: usize,
}

impl GridShape {
    pub fn new(extents: &[usize]) -> Result<GridShape, ScatterError> {
        check_extents(extents)?;
        let mut strides = alloc::vec![1_usize; extents.len()];
        let mut n_cells = 1_usize;
        for ax in (0..extents.len()).rev() {
            strides[ax] = n_cells;
            // ndarray can't hold more than isize::MAX elements
            n_cells = n_cells
                .checked_mul(extents[ax])
                .filter(|&n| n <= isize::MAX as usize)
                .ok_or_else(|| ScatterError::InvalidShape {
                    extents: extents.to_vec(),
                })?;
        }
        Ok(GridShape {
            extents: extents.into(),
            strides: strides.into_boxed_slice(),
            n_cells,
        })
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    pub fn ndim(&self) -> usize {
        self.extents.len()
    }

    /// the total number of cells
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// map an N-dimensional coordinate to its offset in a contiguous buffer
    ///
    /// Coordinates with the wrong number of axes or with a component that
    /// meets or exceeds the corresponding extent are rejected.
    #[inline]
    pub fn offset(&self, coords: &[usize]) -> Result<usize, ScatterError> {
        if coords.len() != self.extents.len() {
            return Err(self.out_of_bounds(coords));
        }
        let mut offset = 0;
        for ((&c, &extent), &stride) in coords.iter().zip(&self.extents).zip(&self.strides) {
            if c >= extent {
                return Err(self.out_of_bounds(coords));
            }
            offset += c * stride;
        }
        Ok(offset)
    }

    /// the inverse of [`GridShape::offset`]
    pub fn coords(&self, mut offset: usize) -> Option<Vec<usize>> {
        if offset >= self.n_cells {
            return None;
        }
        let mut out = Vec::with_capacity(self.ndim());
        for &stride in self.strides.iter() {
            out.push(offset / stride);
            offset %= stride;
        }
        Some(out)
    }

    pub(crate) fn out_of_bounds(&self, coords: &[usize]) -> ScatterError {
        ScatterError::OutOfBoundsIndex {
            coords: coords.to_vec(),
            shape: self.extents.to_vec(),
        }
    }

    /// Returns an error if `other` doesn't describe the same extents as self
    pub fn check_same(&self, other: &GridShape) -> Result<(), ScatterError> {
        if self == other {
            Ok(())
        } else {
            Err(ScatterError::ShapeMismatch {
                expected: self.extents.to_vec(),
                actual: other.extents.to_vec(),
            })
        }
    }
}

/// The grid that holds the final merged values of a scatter operation.
///
/// This is passive storage: it does no synchronization of its own. Every
/// mutating method requires `&mut self`, so a target can't be modified while
/// anybody is reading from it.
#[derive(Clone, Debug)]
pub struct AccumulationTarget<T: Element> {
    shape: GridShape,
    // always in standard layout (we never hand out anything that could
    // change that)
    data: ArrayD<T>,
}

impl<T: Element> AccumulationTarget<T> {
    /// Create a zero-filled grid with the specified extents
    pub fn new(extents: &[usize]) -> Result<Self, ScatterError> {
        Self::from_elem(extents, T::zero())
    }

    /// Create a grid with the specified extents, where every cell holds `value`
    pub fn from_elem(extents: &[usize], value: T) -> Result<Self, ScatterError> {
        let shape = GridShape::new(extents)?;
        Ok(Self {
            data: ArrayD::from_elem(IxDyn(extents), value),
            shape,
        })
    }

    pub fn shape(&self) -> &[usize] {
        self.shape.extents()
    }

    pub fn grid_shape(&self) -> &GridShape {
        &self.shape
    }

    /// the number of cells in the grid
    pub fn len(&self) -> usize {
        self.shape.n_cells()
    }

    /// Always `false`: `GridShape::new` rejects zero extents, so a grid holds
    /// at least one cell
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, coords: &[usize]) -> Result<T, ScatterError> {
        self.data
            .get(coords)
            .copied()
            .ok_or_else(|| self.shape.out_of_bounds(coords))
    }

    pub fn set(&mut self, coords: &[usize], value: T) -> Result<(), ScatterError> {
        match self.data.get_mut(coords) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(self.shape.out_of_bounds(coords)),
        }
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// the sum of every cell in the grid
    pub fn total(&self) -> T {
        let mut total = T::zero();
        for &v in self.data.iter() {
            T::add_into(&mut total, v);
        }
        total
    }

    pub fn view(&self) -> ArrayViewD<'_, T> {
        self.data.view()
    }

    /// the cells in row-major order
    pub fn as_slice(&self) -> &[T] {
        self.data
            .as_slice()
            .expect("the target's array is always in standard layout")
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
            .as_slice_mut()
            .expect("the target's array is always in standard layout")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn shape_offsets() {
        let shape = GridShape::new(&[2, 3, 4]).unwrap();
        assert_eq!(shape.n_cells(), 24);
        assert_eq!(shape.offset(&[0, 0, 0]), Ok(0));
        assert_eq!(shape.offset(&[0, 0, 3]), Ok(3));
        assert_eq!(shape.offset(&[0, 1, 0]), Ok(4));
        assert_eq!(shape.offset(&[1, 1, 0]), Ok(16));
        assert_eq!(shape.offset(&[1, 2, 3]), Ok(23));
        assert_eq!(shape.coords(16), Some(vec![1, 1, 0]));
        assert_eq!(shape.coords(24), None);
    }

    #[test]
    fn shape_errs() {
        assert!(GridShape::new(&[]).is_err());
        assert!(GridShape::new(&[2, 0, 4]).is_err());
        // the cell count overflows
        assert_eq!(
            GridShape::new(&[usize::MAX, 2]),
            Err(ScatterError::InvalidShape {
                extents: vec![usize::MAX, 2]
            })
        );
        assert!(GridShape::new(&[usize::MAX / 2, 3]).is_err());
        // more cells than ndarray can address
        assert!(GridShape::new(&[isize::MAX as usize + 1]).is_err());
        assert!(AccumulationTarget::<u8>::new(&[usize::MAX, 2]).is_err());

        let shape = GridShape::new(&[2, 3, 4]).unwrap();
        assert!(matches!(
            shape.offset(&[2, 0, 0]),
            Err(ScatterError::OutOfBoundsIndex { .. })
        ));
        assert!(shape.offset(&[0, 0, 4]).is_err());
        assert!(shape.offset(&[0, 0]).is_err());
        assert!(shape.offset(&[0, 0, 0, 0]).is_err());

        let other = GridShape::new(&[2, 4, 3]).unwrap();
        assert!(matches!(
            shape.check_same(&other),
            Err(ScatterError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn target_get_set() {
        let mut target = AccumulationTarget::<i32>::new(&[2, 2]).unwrap();
        assert_eq!(target.shape(), &[2, 2]);
        assert_eq!(target.len(), 4);
        assert!(!target.is_empty());
        target.set(&[1, 0], 7).unwrap();
        assert_eq!(target.get(&[1, 0]), Ok(7));
        assert_eq!(target.as_slice(), &[0, 0, 7, 0]);
        assert_eq!(target.total(), 7);

        assert!(matches!(
            target.set(&[2, 0], 1),
            Err(ScatterError::OutOfBoundsIndex { .. })
        ));
        assert!(target.get(&[0, 0, 0]).is_err());
        assert_eq!(target.total(), 7);

        target.fill(1);
        assert_eq!(target.total(), 4);
        assert_eq!(target.view()[[1, 1]], 1);
    }
}
