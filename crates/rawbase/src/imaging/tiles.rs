use crate::error::ImageOpError;

/// One tile of a multi-crop, numbered from 1 in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub index: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Splits a `width`x`height` image into a `g`x`g` grid with
/// `g = ceil(sqrt(count))`.
///
/// The step on each axis is `ceil(side / g)`, so edge tiles are clipped
/// rather than padded. Tiles that would start past the edge are dropped.
pub fn tile_grid(width: u32, height: u32, count: u32) -> Result<Vec<TileRect>, ImageOpError> {
    if count == 0 {
        return Err(ImageOpError::InvalidTileCount(count));
    }
    let grid = (count as f64).sqrt().ceil() as u32;
    let step_x = width.div_ceil(grid).max(1);
    let step_y = height.div_ceil(grid).max(1);

    let mut tiles = Vec::with_capacity((grid * grid) as usize);
    let mut index = 1;
    for y in (0..height).step_by(step_y as usize) {
        for x in (0..width).step_by(step_x as usize) {
            tiles.push(TileRect {
                index,
                x,
                y,
                width: step_x.min(width - x),
                height: step_y.min(height - y),
            });
            index += 1;
        }
    }
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition(width: u32, height: u32, tiles: &[TileRect]) {
        let mut covered = vec![0u8; (width * height) as usize];
        for t in tiles {
            assert!(t.x + t.width <= width && t.y + t.height <= height);
            for y in t.y..t.y + t.height {
                for x in t.x..t.x + t.width {
                    covered[(y * width + x) as usize] += 1;
                }
            }
        }
        assert!(covered.iter().all(|c| *c == 1), "overlap or gap in tiling");
    }

    #[test]
    fn test_sixteen_even_tiles() {
        let tiles = tile_grid(1024, 1024, 16).unwrap();
        assert_eq!(tiles.len(), 16);
        assert!(tiles.iter().all(|t| t.width == 256 && t.height == 256));
        assert_eq!(tiles[0].index, 1);
        assert_eq!((tiles[1].x, tiles[1].y), (256, 0));
        assert_eq!((tiles[4].x, tiles[4].y), (0, 256));
        assert_partition(1024, 1024, &tiles);
    }

    #[test]
    fn test_clipped_edges() {
        let tiles = tile_grid(1000, 770, 16).unwrap();
        assert_eq!(tiles.len(), 16);
        let last = tiles.last().unwrap();
        assert_eq!((last.width, last.height), (1000 - 3 * 250, 770 - 3 * 193));
        assert_partition(1000, 770, &tiles);
    }

    #[test]
    fn test_non_square_count_rounds_grid_up() {
        let tiles = tile_grid(90, 90, 5).unwrap();
        assert_eq!(tiles.len(), 9);
        assert_partition(90, 90, &tiles);
    }

    #[test]
    fn test_tiny_image_drops_empty_tiles() {
        let tiles = tile_grid(2, 3, 16).unwrap();
        assert_eq!(tiles.len(), 6);
        assert_partition(2, 3, &tiles);
    }

    #[test]
    fn test_zero_tiles_rejected() {
        assert!(matches!(
            tile_grid(10, 10, 0),
            Err(ImageOpError::InvalidTileCount(0))
        ));
    }
}
