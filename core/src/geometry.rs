//! Hexagonal map geometry with odd rows shifted to the right.

use serde::{Deserialize, Serialize};

/// Location of a single node on the hexagonal map.
///
/// Points order by column first and row second. Searches and registries rely
/// on this total order whenever they need a deterministic tie-break.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MapPoint {
    x: u16,
    y: u16,
}

impl MapPoint {
    /// Creates a new map point.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Column of the point.
    #[must_use]
    pub const fn x(&self) -> u16 {
        self.x
    }

    /// Row of the point.
    #[must_use]
    pub const fn y(&self) -> u16 {
        self.y
    }

    const fn is_odd_row(&self) -> bool {
        self.y & 1 == 1
    }

    fn cube(&self) -> (i64, i64) {
        let x = i64::from(self.x);
        let y = i64::from(self.y);
        (x - (y - (y & 1)) / 2, y)
    }
}

/// One of the six hex directions, in the order the engine enumerates them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Towards decreasing x on the same row.
    West,
    /// Up and to the left.
    NorthWest,
    /// Up and to the right.
    NorthEast,
    /// Towards increasing x on the same row.
    East,
    /// Down and to the right. A building's flag lies in this direction.
    SouthEast,
    /// Down and to the left.
    SouthWest,
}

impl Direction {
    /// All directions in enumeration order.
    pub const ALL: [Direction; 6] = [
        Direction::West,
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    /// Position of the direction within [`Direction::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Direction::West => 0,
            Direction::NorthWest => 1,
            Direction::NorthEast => 2,
            Direction::East => 3,
            Direction::SouthEast => 4,
            Direction::SouthWest => 5,
        }
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn reverse(self) -> Self {
        Self::ALL[(self.index() + 3) % 6]
    }
}

/// Bounds of the map. The grid does not wrap around its edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapExtent {
    width: u16,
    height: u16,
}

impl MapExtent {
    /// Creates a new extent with the provided dimensions.
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Total number of nodes covered by the extent.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Reports whether the point lies inside the extent.
    #[must_use]
    pub const fn contains(&self, point: MapPoint) -> bool {
        point.x < self.width && point.y < self.height
    }

    /// Row-major storage index of the point, if it lies inside the extent.
    #[must_use]
    pub fn index(&self, point: MapPoint) -> Option<usize> {
        if !self.contains(point) {
            return None;
        }
        let row = usize::from(point.y).checked_mul(usize::from(self.width))?;
        row.checked_add(usize::from(point.x))
    }

    /// Iterates every point of the extent in row-major order.
    pub fn points(&self) -> impl Iterator<Item = MapPoint> {
        let width = self.width;
        (0..self.height).flat_map(move |y| (0..width).map(move |x| MapPoint::new(x, y)))
    }

    /// Neighbour of `point` in `direction`, or `None` beyond the map edge.
    #[must_use]
    pub fn neighbour(&self, point: MapPoint, direction: Direction) -> Option<MapPoint> {
        let x = i32::from(point.x);
        let y = i32::from(point.y);
        let odd = i32::from(point.is_odd_row());
        let (nx, ny) = match direction {
            Direction::West => (x - 1, y),
            Direction::East => (x + 1, y),
            Direction::NorthWest => (x - 1 + odd, y - 1),
            Direction::NorthEast => (x + odd, y - 1),
            Direction::SouthWest => (x - 1 + odd, y + 1),
            Direction::SouthEast => (x + odd, y + 1),
        };
        let candidate = MapPoint::new(u16::try_from(nx).ok()?, u16::try_from(ny).ok()?);
        self.contains(candidate).then_some(candidate)
    }

    /// Walks `route` starting at `from` and returns every point stepped on,
    /// excluding `from` itself. Returns `None` if the route leaves the map.
    #[must_use]
    pub fn route_points(&self, from: MapPoint, route: &[Direction]) -> Option<Vec<MapPoint>> {
        let mut current = from;
        let mut points = Vec::with_capacity(route.len());
        for &direction in route {
            current = self.neighbour(current, direction)?;
            points.push(current);
        }
        Some(points)
    }

    /// Flag position belonging to a building placed at `building`.
    #[must_use]
    pub fn flag_of(&self, building: MapPoint) -> Option<MapPoint> {
        self.neighbour(building, Direction::SouthEast)
    }

    /// Building position served by the flag at `flag`.
    #[must_use]
    pub fn building_of(&self, flag: MapPoint) -> Option<MapPoint> {
        self.neighbour(flag, Direction::NorthWest)
    }

    /// Hex distance between two points.
    #[must_use]
    pub fn distance(&self, a: MapPoint, b: MapPoint) -> u32 {
        let (aq, ar) = a.cube();
        let (bq, br) = b.cube();
        let dq = aq - bq;
        let dr = ar - br;
        let sum = (dq.abs() + dr.abs() + (dq + dr).abs()) / 2;
        u32::try_from(sum).unwrap_or(u32::MAX)
    }

    /// Every point within `radius` of `center`, including the centre, in
    /// row-major order.
    #[must_use]
    pub fn points_in_radius(&self, center: MapPoint, radius: u32) -> Vec<MapPoint> {
        let r = i32::try_from(radius).unwrap_or(i32::MAX);
        let cx = i32::from(center.x);
        let cy = i32::from(center.y);
        let y_range = (cy - r).max(0)..=(cy + r).min(i32::from(self.height) - 1);
        let mut points = Vec::new();
        for y in y_range {
            for x in (cx - r).max(0)..=(cx + r).min(i32::from(self.width) - 1) {
                let (Ok(px), Ok(py)) = (u16::try_from(x), u16::try_from(y)) else {
                    continue;
                };
                let point = MapPoint::new(px, py);
                if self.distance(center, point) <= radius {
                    points.push(point);
                }
            }
        }
        points
    }

    /// Visits the points within `radius` of `center` until `visitor` returns
    /// `true`. Reports whether the visit stopped early.
    pub fn any_in_radius(
        &self,
        center: MapPoint,
        radius: u32,
        include_center: bool,
        mut visitor: impl FnMut(MapPoint, u32) -> bool,
    ) -> bool {
        self.points_in_radius(center, radius)
            .into_iter()
            .filter(|point| include_center || *point != center)
            .any(|point| visitor(point, self.distance(center, point)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbours_follow_odd_row_shift() {
        let extent = MapExtent::new(10, 10);
        let even = MapPoint::new(4, 4);
        let odd = MapPoint::new(4, 5);

        assert_eq!(
            extent.neighbour(even, Direction::NorthWest),
            Some(MapPoint::new(3, 3))
        );
        assert_eq!(
            extent.neighbour(even, Direction::SouthEast),
            Some(MapPoint::new(4, 5))
        );
        assert_eq!(
            extent.neighbour(odd, Direction::NorthWest),
            Some(MapPoint::new(4, 4))
        );
        assert_eq!(
            extent.neighbour(odd, Direction::SouthEast),
            Some(MapPoint::new(5, 6))
        );
    }

    #[test]
    fn every_neighbour_is_one_step_away_and_reversible() {
        let extent = MapExtent::new(12, 12);
        for point in [MapPoint::new(5, 5), MapPoint::new(6, 6)] {
            for direction in Direction::ALL {
                let next = extent
                    .neighbour(point, direction)
                    .expect("interior point has all neighbours");
                assert_eq!(extent.distance(point, next), 1);
                assert_eq!(
                    extent.neighbour(next, direction.reverse()),
                    Some(point),
                    "reverse direction must lead back to {point:?}"
                );
            }
        }
    }

    #[test]
    fn edges_do_not_wrap() {
        let extent = MapExtent::new(4, 4);
        assert_eq!(extent.neighbour(MapPoint::new(0, 0), Direction::West), None);
        assert_eq!(
            extent.neighbour(MapPoint::new(3, 3), Direction::SouthEast),
            None
        );
    }

    #[test]
    fn flag_and_building_mapping_are_inverse() {
        let extent = MapExtent::new(8, 8);
        let building = MapPoint::new(3, 3);
        let flag = extent.flag_of(building).expect("flag inside map");
        assert_eq!(extent.building_of(flag), Some(building));
    }

    #[test]
    fn radius_contains_expected_number_of_points() {
        let extent = MapExtent::new(20, 20);
        let center = MapPoint::new(10, 10);
        assert_eq!(extent.points_in_radius(center, 0), vec![center]);
        assert_eq!(extent.points_in_radius(center, 1).len(), 7);
        assert_eq!(extent.points_in_radius(center, 2).len(), 19);
    }

    #[test]
    fn radius_is_clipped_at_map_edge() {
        let extent = MapExtent::new(20, 20);
        let corner = extent.points_in_radius(MapPoint::new(0, 0), 1);
        assert!(corner.len() < 7, "corner must lose out-of-map neighbours");
        assert!(corner.iter().all(|point| extent.contains(*point)));
    }

    #[test]
    fn points_order_by_column_then_row() {
        assert!(MapPoint::new(1, 9) < MapPoint::new(2, 0));
        assert!(MapPoint::new(2, 0) < MapPoint::new(2, 1));
    }
}
