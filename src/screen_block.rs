use std::{iter::FusedIterator, num::NonZeroU32};

use itertools::Itertools;

use crate::geometry::{ScreenBlock, ScreenPoint};

pub trait ScreenBlockExt {
    fn internal_points(&self) -> InternalPoints;
    fn tile_ordering(&self, tile_size: NonZeroU32) -> Vec<ScreenBlock>;
}

impl ScreenBlockExt for ScreenBlock {
    /// Iterator over pixels inside the block, row by row.
    fn internal_points(&self) -> InternalPoints {
        if self.is_empty_or_negative() {
            InternalPoints::empty()
        } else {
            InternalPoints {
                min_x: self.min.x,
                max: self.max,
                cursor: self.min,
            }
        }
    }

    /// Splits the block into tiles of `tile_size` (clipped at the right and bottom edge) and
    /// orders them in rings of growing distance around the middle tile.
    fn tile_ordering(&self, tile_size: NonZeroU32) -> Vec<ScreenBlock> {
        if self.is_empty_or_negative() {
            return Vec::new();
        }

        let tile_size = tile_size.get();
        let columns = self.width().div_ceil(tile_size) as i64;
        let rows = self.height().div_ceil(tile_size) as i64;
        let (center_x, center_y) = (columns / 2, rows / 2);

        (0..rows)
            .cartesian_product(0..columns)
            .map(|(row, column)| {
                let (dx, dy) = (column - center_x, row - center_y);
                let ring = dx.abs().max(dy.abs());
                let angle = (dy as f64).atan2(dx as f64);
                (ring, angle, column as u32, row as u32)
            })
            .sorted_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)))
            .map(|(_, _, column, row)| {
                let min = self.min + ScreenPoint::new(column, row).coords * tile_size;
                let max = ScreenPoint::new(
                    (min.x + tile_size).min(self.max.x),
                    (min.y + tile_size).min(self.max.y),
                );
                ScreenBlock::new(min, max)
            })
            .collect()
    }
}

#[derive(Copy, Clone, Debug)]
pub struct InternalPoints {
    min_x: u32,
    max: ScreenPoint,

    cursor: ScreenPoint,
}

impl InternalPoints {
    fn empty() -> Self {
        InternalPoints {
            min_x: 0,
            max: ScreenPoint::origin(),
            cursor: ScreenPoint::origin(),
        }
    }
}

impl Iterator for InternalPoints {
    type Item = ScreenPoint;

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.y >= self.max.y {
            return None;
        }

        let ret = self.cursor;

        self.cursor.x += 1;
        if self.cursor.x >= self.max.x {
            self.cursor.x = self.min_x;
            self.cursor.y += 1;
        }

        Some(ret)
    }
}

impl ExactSizeIterator for InternalPoints {
    fn len(&self) -> usize {
        if self.cursor.y >= self.max.y {
            0
        } else {
            let row_width = (self.max.x - self.min_x) as usize;
            let whole_rows = (self.max.y - self.cursor.y - 1) as usize;
            whole_rows * row_width + (self.max.x - self.cursor.x) as usize
        }
    }
}

impl FusedIterator for InternalPoints {}
