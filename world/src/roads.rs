use std::collections::BTreeSet;

use settler_ai_core::{Direction, MapExtent, MapPoint};

/// Road links stored per node and direction. Every link is recorded at both
/// of its ends so either side can be queried.
#[derive(Clone, Debug, Default)]
pub(crate) struct RoadNetwork {
    links: BTreeSet<(MapPoint, Direction)>,
    donkey: BTreeSet<(MapPoint, Direction)>,
}

impl RoadNetwork {
    pub(crate) fn has(&self, point: MapPoint, direction: Direction) -> bool {
        self.links.contains(&(point, direction))
    }

    pub(crate) fn touches(&self, point: MapPoint) -> bool {
        Direction::ALL
            .iter()
            .any(|direction| self.has(point, *direction))
    }

    pub(crate) fn link(&mut self, extent: &MapExtent, point: MapPoint, direction: Direction) {
        let Some(next) = extent.neighbour(point, direction) else {
            return;
        };
        let _ = self.links.insert((point, direction));
        let _ = self.links.insert((next, direction.reverse()));
    }

    pub(crate) fn unlink(&mut self, extent: &MapExtent, point: MapPoint, direction: Direction) {
        let _ = self.links.remove(&(point, direction));
        let _ = self.donkey.remove(&(point, direction));
        if let Some(next) = extent.neighbour(point, direction) {
            let _ = self.links.remove(&(next, direction.reverse()));
            let _ = self.donkey.remove(&(next, direction.reverse()));
        }
    }

    pub(crate) fn lay(&mut self, extent: &MapExtent, origin: MapPoint, route: &[Direction]) {
        let mut current = origin;
        for &direction in route {
            self.link(extent, current, direction);
            let Some(next) = extent.neighbour(current, direction) else {
                return;
            };
            current = next;
        }
    }

    /// Follows the road leaving `start` in `direction` until it reaches a
    /// node for which `stops` holds or the road ends.
    pub(crate) fn trace(
        &self,
        extent: &MapExtent,
        start: MapPoint,
        direction: Direction,
        stops: impl Fn(MapPoint) -> bool,
    ) -> Option<(MapPoint, Vec<Direction>)> {
        if !self.has(start, direction) {
            return None;
        }
        let mut route = vec![direction];
        let mut current = extent.neighbour(start, direction)?;
        let mut came_from = direction.reverse();
        while !stops(current) && current != start {
            let Some(next_direction) = Direction::ALL
                .into_iter()
                .find(|candidate| *candidate != came_from && self.has(current, *candidate))
            else {
                break;
            };
            route.push(next_direction);
            current = extent.neighbour(current, next_direction)?;
            came_from = next_direction.reverse();
        }
        Some((current, route))
    }

    pub(crate) fn remove_route(&mut self, extent: &MapExtent, start: MapPoint, route: &[Direction]) {
        let mut current = start;
        for &direction in route {
            self.unlink(extent, current, direction);
            let Some(next) = extent.neighbour(current, direction) else {
                return;
            };
            current = next;
        }
    }

    pub(crate) fn upgrade(&mut self, extent: &MapExtent, start: MapPoint, route: &[Direction]) {
        let mut current = start;
        for &direction in route {
            let _ = self.donkey.insert((current, direction));
            let Some(next) = extent.neighbour(current, direction) else {
                return;
            };
            let _ = self.donkey.insert((next, direction.reverse()));
            current = next;
        }
    }

    pub(crate) fn is_donkey_road(&self, point: MapPoint, direction: Direction) -> bool {
        self.donkey.contains(&(point, direction))
    }

    pub(crate) fn link_count(&self) -> usize {
        self.links.len() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_stops_at_flags() {
        let extent = MapExtent::new(10, 10);
        let mut network = RoadNetwork::default();
        let origin = MapPoint::new(2, 2);
        network.lay(&extent, origin, &[Direction::East, Direction::East, Direction::East]);
        let flag = MapPoint::new(4, 2);

        let (end, route) = network
            .trace(&extent, origin, Direction::East, |point| point == flag)
            .expect("road exists");

        assert_eq!(end, flag);
        assert_eq!(route, vec![Direction::East, Direction::East]);
    }

    #[test]
    fn removing_a_route_clears_both_ends() {
        let extent = MapExtent::new(10, 10);
        let mut network = RoadNetwork::default();
        let origin = MapPoint::new(2, 2);
        network.lay(&extent, origin, &[Direction::East]);
        network.remove_route(&extent, origin, &[Direction::East]);
        assert!(!network.touches(origin));
        assert!(!network.touches(MapPoint::new(3, 2)));
        assert_eq!(network.link_count(), 0);
    }
}
