use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use settler_ai_core::{Deposit, DepositKind, MapExtent, MapPoint, NodeObject};
use settler_ai_world::{Terrain, World, WorldBuilder};

/// A square map with the headquarters in the middle, a lake to the west,
/// a mountain to the east and trees and granite scattered by `seed`.
pub(crate) fn demo_world(size: u16, seed: u64) -> World {
    let extent = MapExtent::new(size, size);
    let center = MapPoint::new(size / 2, size / 2);
    let quarter = size / 4;
    let lake = MapPoint::new(center.x().saturating_sub(quarter), center.y());
    let mountain = MapPoint::new(center.x() + quarter, center.y().saturating_sub(2));

    let mut builder = WorldBuilder::new(extent)
        .territory(center, u32::from(quarter) + 3)
        .terrain(lake, 2, Terrain::Water)
        .terrain(mountain, 2, Terrain::Mountain);
    for (index, point) in extent.points_in_radius(mountain, 2).into_iter().enumerate() {
        let kind = match index % 3 {
            0 => DepositKind::Coal,
            1 => DepositKind::Iron,
            _ => DepositKind::Granite,
        };
        builder = builder.deposit(point, Deposit { kind, amount: 5 });
    }
    for point in extent.points_in_radius(lake, 2) {
        builder = builder.deposit(
            point,
            Deposit {
                kind: DepositKind::Fish,
                amount: 4,
            },
        );
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let keep_clear: Vec<MapPoint> = [center, lake, mountain].into();
    for point in extent.points() {
        if keep_clear
            .iter()
            .any(|clear| extent.distance(*clear, point) <= 3)
        {
            continue;
        }
        let roll: u32 = rng.gen_range(0..100);
        if roll < 12 {
            builder = builder.object(
                point,
                NodeObject::Tree {
                    produces_wood: true,
                },
            );
        } else if roll < 15 {
            builder = builder.object(point, NodeObject::Granite { size: 4 });
        } else if roll < 17 {
            builder = builder.animal(point);
        }
    }

    builder.headquarters(center).build()
}
