use colony_common::BoundaryType;

/// Offsets of the four orthogonal neighbours: left, right, up, down.
pub const ORTHOGONAL_OFFSETS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, 1), (0, -1)];

// Resolves one axis coordinate, wrapping on periodic lattices and rejecting it otherwise.
#[inline(always)]
fn resolve_axis(coord: usize, offset: isize, len: usize, boundary: BoundaryType) -> Option<usize> {
    let moved = coord as isize + offset;
    if moved >= 0 && (moved as usize) < len {
        return Some(moved as usize);
    }
    match boundary {
        BoundaryType::Periodic => Some(moved.rem_euclid(len as isize) as usize),
        BoundaryType::Reflecting | BoundaryType::Absorbent => None,
    }
}

/// Flat index of the cell at `(x + dx, y + dy)`, or `None` when that position
/// falls off a non-periodic lattice.
#[inline(always)]
pub fn neighbor_index(
    x: usize,
    y: usize,
    dx: isize,
    dy: isize,
    width: usize,
    height: usize,
    boundary: BoundaryType,
) -> Option<usize> {
    let nx = resolve_axis(x, dx, width, boundary)?;
    let ny = resolve_axis(y, dy, height, boundary)?;
    Some(nx + ny * width)
}

/// Calls `f` with the flat index of each of the 8 Moore-neighbourhood positions
/// around `(x, y)` that exist under `boundary`. The cell itself is never visited.
///
/// On small periodic lattices a wrapped position can land on the same cell more
/// than once, or on `(x, y)` itself; positions equal to the centre are skipped,
/// repeats are visited once per position.
#[inline(always)]
pub fn for_each_moore_neighbor<F>(
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    boundary: BoundaryType,
    mut f: F,
) where
    F: FnMut(usize),
{
    let center = x + y * width;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            if let Some(idx) = neighbor_index(x, y, dx, dy, width, height, boundary) {
                if idx != center {
                    f(idx);
                }
            }
        }
    }
}
