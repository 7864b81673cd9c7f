use ai_core::StringHash;
use ai_perception::{
    NullEventSink, PerceptionState, ProcessingParameters, SandboxBody, SandboxWorld,
    SensorConfiguration, SensorFlags,
};
use glam::Vec3;

const PERCEIVER: u64 = 1;
const TARGET: u64 = 2;
const WALL: u64 = 3;

fn scene(wall_radius: f32, wall_tags: &str) -> SandboxWorld {
    let mut world = SandboxWorld::new();
    world.insert(PERCEIVER, SandboxBody::new(Vec3::ZERO).with_tags("guard"));
    world.insert(
        TARGET,
        SandboxBody::new(Vec3::new(8.0, 0.0, 0.0)).with_tags("thief"),
    );
    world.insert(
        WALL,
        SandboxBody::new(Vec3::new(4.0, 0.0, 0.0))
            .with_radius(wall_radius)
            .with_tags(wall_tags),
    );
    world
}

fn sensor(line_of_sight: bool) -> SensorConfiguration<u64> {
    let sensor = SensorConfiguration::new(StringHash::new("spotted"), 10.0).with_aspect_tags("thief");
    if line_of_sight {
        sensor.with_line_of_sight(Vec3::ZERO, 1.0)
    } else {
        sensor
    }
}

fn scan(sensor: &mut SensorConfiguration<u64>, world: &SandboxWorld) {
    let params = ProcessingParameters::forced(PERCEIVER, world);
    let mut rng = ai_core::SplitMix64::new(1);
    assert!(sensor.update(&params, &mut rng, &mut NullEventSink));
}

#[test]
fn large_obstacle_hides_target_when_line_of_sight_is_required() {
    let world = scene(1.5, "wall");
    let mut with_los = sensor(true);
    scan(&mut with_los, &world);
    assert!(!with_los.perceives(TARGET));
    assert_eq!(with_los.occluded_perceptions(), &[TARGET]);
    assert_eq!(with_los.perception_count(), 0);

    let mut without_los = sensor(false);
    scan(&mut without_los, &world);
    assert!(without_los.perceives(TARGET));
    assert!(without_los.occluded_perceptions().is_empty());
}

#[test]
fn small_obstacles_are_ignored() {
    // Extent 0.8 is below the 1.0 threshold.
    let world = scene(0.4, "crate");
    let mut sensor = sensor(true);
    scan(&mut sensor, &world);
    assert!(sensor.perceives(TARGET));
}

#[test]
fn obstacles_matching_the_ignored_aspect_do_not_block() {
    let world = scene(1.5, "foliage");
    let mut sensor = sensor(true).with_ignored_obstacles_aspect("foliage, glass");
    scan(&mut sensor, &world);
    assert!(sensor.perceives(TARGET));

    let mut strict = self::sensor(true).with_ignored_obstacles_aspect("glass");
    scan(&mut strict, &world);
    assert!(!strict.perceives(TARGET));
}

#[test]
fn obstacle_off_the_ray_does_not_block() {
    let mut world = scene(1.5, "wall");
    world.set_position(WALL, Vec3::new(4.0, 0.0, 5.0));
    let mut sensor = sensor(true);
    scan(&mut sensor, &world);
    assert_eq!(
        sensor.find_perception(TARGET).map(|p| p.state),
        Some(PerceptionState::Began)
    );
}

#[test]
fn line_of_sight_offset_lifts_the_ray_over_low_obstacles() {
    let mut world = scene(1.5, "wall");
    world.insert(
        TARGET,
        SandboxBody::new(Vec3::new(8.0, 4.0, 0.0)).with_tags("thief"),
    );
    let mut sensor = SensorConfiguration::new(StringHash::new("spotted"), 10.0)
        .with_aspect_tags("thief")
        .with_line_of_sight(Vec3::new(0.0, 4.0, 0.0), 1.0);
    scan(&mut sensor, &world);
    assert!(sensor.perceives(TARGET));
    assert!(sensor.flags().line_of_sight_required);
    assert_ne!(*sensor.flags(), SensorFlags::default());
}
